use thiserror::Error;

/// Failures reported by a host platform adapter. The scheduler logs these and carries on.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("notifications are not supported on this platform")]
    Unsupported,
    #[error("notification permission not granted")]
    PermissionDenied,
    #[error("failed to show notification: {0}")]
    Show(String),
    #[error("failed to close notification: {0}")]
    Close(String),
}
