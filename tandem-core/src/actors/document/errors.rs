use crate::io::IoTaskError;

/// Errors returned by [`DocumentActor`](super::DocumentActor) calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document is not ready")]
    DocumentNotReady,
    #[error(transparent)]
    Io(#[from] IoTaskError),
    #[error("document actor has stopped")]
    ActorStopped,
    #[error("initial content is not a valid automerge document: {0}")]
    InvalidInitialContent(String),
}
