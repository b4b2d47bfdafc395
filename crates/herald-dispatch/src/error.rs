//! Error types for command handlers.

/// Error returned by a command handler.
///
/// Handler errors are always caught and logged by the dispatch loop,
/// never propagated to the ingestion point.
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The transport refused the handler's action for lack of permission.
    /// An expected operational condition, logged at reduced severity.
    #[error("permission denied by transport: {0}")]
    PermissionDenied(String),

    /// Any other handler failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;
