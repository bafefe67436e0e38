/// Host platform clipboard as seen by the bridge.
///
/// Setting is infallible from the bridge's point of view; a clipboard that cannot be read (or is
/// empty) reports `None`.
pub trait HostClipboard {
    fn set_text(&mut self, text: &str);

    fn text(&mut self) -> Option<String>;
}

impl<T: HostClipboard + ?Sized> HostClipboard for Box<T> {
    fn set_text(&mut self, text: &str) {
        <T as HostClipboard>::set_text(&mut **self, text);
    }

    fn text(&mut self) -> Option<String> {
        <T as HostClipboard>::text(&mut **self)
    }
}

impl<T: HostClipboard + ?Sized> HostClipboard for &mut T {
    fn set_text(&mut self, text: &str) {
        <T as HostClipboard>::set_text(&mut **self, text);
    }

    fn text(&mut self) -> Option<String> {
        <T as HostClipboard>::text(&mut **self)
    }
}

/// Process-local clipboard, for headless hosts and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            contents: Some(text.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    pub fn clear(&mut self) {
        self.contents = None;
    }
}

impl HostClipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) {
        self.contents = Some(text.to_string());
    }

    fn text(&mut self) -> Option<String> {
        self.contents.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_round_trips_text() {
        let mut clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.text(), None);

        clipboard.set_text("hello");
        assert_eq!(clipboard.text().as_deref(), Some("hello"));

        clipboard.clear();
        assert_eq!(clipboard.contents(), None);
    }

    #[test]
    fn clipboard_is_implemented_for_boxes_and_references() {
        fn copy_with<C: HostClipboard>(mut clipboard: C, text: &str) {
            clipboard.set_text(text);
        }

        let mut inner = MemoryClipboard::new();
        copy_with(&mut inner, "via ref");
        assert_eq!(inner.contents(), Some("via ref"));

        let mut boxed: Box<dyn HostClipboard> = Box::new(MemoryClipboard::with_text("boxed"));
        assert_eq!(boxed.text().as_deref(), Some("boxed"));
    }
}
