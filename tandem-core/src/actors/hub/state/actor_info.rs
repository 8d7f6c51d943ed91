use crate::{DocumentActorId, DocumentId, actors::document::DocumentStatus};

/// What the hub knows about one document actor
#[derive(Debug, Clone)]
pub(crate) struct ActorInfo {
    pub(crate) actor_id: DocumentActorId,
    pub(crate) document_id: DocumentId,
    pub(crate) status: DocumentStatus,
}

impl ActorInfo {
    pub(crate) fn new(actor_id: DocumentActorId, document_id: DocumentId) -> Self {
        Self {
            actor_id,
            document_id,
            status: DocumentStatus::Spawned,
        }
    }
}
