use pda_suspend::SuspendRegistry;

use crate::{DispatchReport, HostClipboard, SuspendDispatcher};

/// The guest side of the bridge: CPU stepping plus the trap layer.
///
/// During a slice the core may install at most one request into `registry` (checking
/// [`SuspendRegistry::is_suspended`] first) and must stop stepping at that point. At the start of
/// the next slice it claims the [`Resolution`](pda_suspend::Resolution) with
/// [`SuspendRegistry::take_resolution`] and writes the result into the suspended guest call.
pub trait GuestCore {
    fn run_slice(&mut self, registry: &mut SuspendRegistry);
}

impl<T: GuestCore + ?Sized> GuestCore for &mut T {
    fn run_slice(&mut self, registry: &mut SuspendRegistry) {
        <T as GuestCore>::run_slice(&mut **self, registry);
    }
}

impl<T: GuestCore + ?Sized> GuestCore for Box<T> {
    fn run_slice(&mut self, registry: &mut SuspendRegistry) {
        <T as GuestCore>::run_slice(&mut **self, registry);
    }
}

/// Per-session bridge state owned by the driver loop.
///
/// Each [`iterate`](Self::iterate) call is one driver iteration:
/// 1. Run a guest slice, unless a request is still pending (no guest instruction executes while
///    the guest is suspended).
/// 2. Dispatch once.
#[derive(Debug)]
pub struct BridgeSession<C> {
    registry: SuspendRegistry,
    dispatcher: SuspendDispatcher<C>,
}

impl<C: HostClipboard> BridgeSession<C> {
    pub fn new(dispatcher: SuspendDispatcher<C>) -> Self {
        Self {
            registry: SuspendRegistry::new(),
            dispatcher,
        }
    }

    pub fn registry(&self) -> &SuspendRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SuspendRegistry {
        &mut self.registry
    }

    pub fn dispatcher(&self) -> &SuspendDispatcher<C> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut SuspendDispatcher<C> {
        &mut self.dispatcher
    }

    pub fn is_suspended(&self) -> bool {
        self.registry.is_suspended()
    }

    pub fn iterate<G: GuestCore + ?Sized>(&mut self, guest: &mut G) -> Option<DispatchReport> {
        if !self.registry.is_suspended() {
            guest.run_slice(&mut self.registry);
        }
        self.dispatch()
    }

    /// Dispatch without stepping the guest; a no-op when nothing is pending.
    pub fn dispatch(&mut self) -> Option<DispatchReport> {
        self.dispatcher.dispatch(&mut self.registry)
    }

    /// Tears down host resources at the end of the session.
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::MemoryClipboard;
    use pda_suspend::{SuspendKind, SuspendRequest};

    #[derive(Default)]
    struct CountingGuest {
        slices: usize,
        install: Option<SuspendRequest>,
    }

    impl GuestCore for CountingGuest {
        fn run_slice(&mut self, registry: &mut SuspendRegistry) {
            self.slices += 1;
            if let Some(request) = self.install.take() {
                registry.install(request).unwrap();
            }
        }
    }

    #[test]
    fn guest_is_not_stepped_while_suspended() {
        let mut session = BridgeSession::new(SuspendDispatcher::new(MemoryClipboard::new(), None));
        session
            .registry_mut()
            .install(SuspendRequest::ClipboardPaste)
            .unwrap();

        let mut guest = CountingGuest::default();
        let report = session.iterate(&mut guest).unwrap();

        assert_eq!(guest.slices, 0);
        assert_eq!(report.kind, SuspendKind::ClipboardPaste);
        assert!(!session.is_suspended());

        assert!(session.iterate(&mut guest).is_none());
        assert_eq!(guest.slices, 1);
    }

    #[test]
    fn request_installed_during_slice_is_dispatched_same_iteration() {
        let mut session = BridgeSession::new(SuspendDispatcher::new(MemoryClipboard::new(), None));
        let mut guest = CountingGuest {
            install: Some(SuspendRequest::clipboard_copy("abc")),
            ..Default::default()
        };

        let report = session.iterate(&mut guest).unwrap();
        assert!(report.resumed);
        assert_eq!(session.dispatcher().clipboard().contents(), Some("abc"));
        assert!(session.registry().has_resolution());
    }

    #[test]
    fn dispatch_on_idle_session_is_a_no_op() {
        let mut session = BridgeSession::new(SuspendDispatcher::new(MemoryClipboard::new(), None));
        assert!(session.dispatch().is_none());
        session.shutdown();
    }
}
