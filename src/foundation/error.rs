/// Convenience result type used across alphareel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by the export pipeline.
///
/// Every variant except [`ReelError::Cancelled`] is fatal for the export that raised it. Nothing
/// is retried: a frame source that fails once is assumed to fail again.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided configuration or frame source geometry.
    #[error("validation error: {0}")]
    Validation(String),

    /// The encode engine is unavailable or could not be loaded.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// The frame source did not resolve a render within the configured deadline.
    #[error("render timeout: frame {frame} did not resolve within {timeout_ms} ms")]
    RenderTimeout {
        /// Frame index whose render stalled.
        frame: u64,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// The frame source reported an error (or its output could not be read back).
    #[error("render error: frame {frame}: {reason}")]
    Render {
        /// Frame index that failed.
        frame: u64,
        /// Failure description from the frame source.
        reason: String,
    },

    /// The encode engine rejected a command or a storage operation.
    #[error("encode error: {0}")]
    Encode(String),

    /// The export was cancelled through its [`crate::CancelHandle`].
    #[error("export cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Initialization`] value.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Build a [`ReelError::Render`] value.
    pub fn render(frame: u64, reason: impl Into<String>) -> Self {
        Self::Render {
            frame,
            reason: reason.into(),
        }
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// `true` for the cancellation outcome, which is not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
