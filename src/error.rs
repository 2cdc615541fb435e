use crate::hooks::{EventKind, ObserverId};
use thiserror::Error;

/// Error returned by an observer callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ObserverResult = Result<(), ObserverError>;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Observer {0} is not registered")]
    ObserverNotFound(ObserverId),

    #[error("No {} callback registered for the observer", .0.attr_name())]
    CallbackNotFound(EventKind),

    #[error("{} callback #{index} failed: {source}", .kind.attr_name())]
    CallbackFailed {
        kind: EventKind,
        index: usize,
        #[source]
        source: ObserverError,
    },

    #[error("{} callback #{index} panicked: {message}", .kind.attr_name())]
    CallbackPanicked {
        kind: EventKind,
        index: usize,
        message: String,
    },

    #[error("{} callback(s) failed during dispatch", .0.len())]
    Dispatch(Vec<HookError>),

    #[error("Invalid event kind: {0}")]
    InvalidEventKind(i32),
}

impl HookError {
    /// Event kind whose dispatch produced this error, if any.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            HookError::CallbackNotFound(kind)
            | HookError::CallbackFailed { kind, .. }
            | HookError::CallbackPanicked { kind, .. } => Some(*kind),
            HookError::Dispatch(errors) => errors.first().and_then(HookError::kind),
            HookError::ObserverNotFound(_) | HookError::InvalidEventKind(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HookError::ObserverNotFound(_) | HookError::CallbackNotFound(_)
        )
    }
}
