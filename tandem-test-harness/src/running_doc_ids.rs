use tandem_core::{DocumentActorId, DocumentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningDocIds {
    pub doc_id: DocumentId,
    pub actor_id: DocumentActorId,
}
