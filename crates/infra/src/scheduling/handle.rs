use tokio_util::sync::CancellationToken;

/// Cancellation handle for a running scheduler.
///
/// Cancelling stops future passes. A pass already in flight runs to
/// completion.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    token: CancellationToken,
}

impl SyncHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
