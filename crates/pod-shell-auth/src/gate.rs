//! Single shared suspension point for interactive proxy credential entry.

use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle of one credential request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Prompt is open; waiters are suspended.
    Pending,
    /// User submitted credentials.
    Supplied,
    /// User dismissed the prompt.
    Dismissed,
}

/// One-shot signal awaited by every login attempt that needs proxy credentials.
///
/// Clones share the same signal. The first transition out of
/// [`GateState::Pending`] wins; later transitions are ignored.
#[derive(Debug, Clone)]
pub struct CredentialGate {
    state: Arc<watch::Sender<GateState>>,
}

impl CredentialGate {
    /// Creates a pending gate.
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Pending);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Returns `true` while the prompt is still open.
    pub fn is_pending(&self) -> bool {
        self.state() == GateState::Pending
    }

    /// Marks credentials as supplied. Returns `true` only for the call that
    /// actually settled the gate.
    pub fn resolve(&self) -> bool {
        self.settle(GateState::Supplied)
    }

    /// Marks the prompt as dismissed. Returns `true` only for the call that
    /// actually settled the gate.
    pub fn dismiss(&self) -> bool {
        self.settle(GateState::Dismissed)
    }

    /// Suspends until the gate settles; returns `true` when credentials were
    /// supplied.
    pub async fn wait(&self) -> bool {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| *state != GateState::Pending).await {
            Ok(state) => *state == GateState::Supplied,
            Err(_) => false,
        }
    }

    fn settle(&self, next: GateState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for CredentialGate {
    fn default() -> Self {
        Self::new()
    }
}
