use std::{collections::HashMap, time::Duration};

use automerge::Automerge;
use tandem_core::{
    CommandId, CommandResult, ConnectionId, DocumentActorId, DocumentChanged, DocumentId, PeerId,
    StorageId,
    actors::{document::DocumentError, hub::HubEvent},
    network::{ConnectionEvent, ConnectionInfo, PeerDocState},
};

use crate::{HubWrapper, InMemoryStorage, Network, NodeId, RunningDocIds};

/// A borrowed handle to one hub in a [`Network`].
///
/// Methods which need other hubs to respond run the whole network until it
/// is quiescent before returning.
pub struct PeerRef<'a> {
    pub(crate) network: &'a mut Network,
    pub(crate) node_id: &'a NodeId,
}

impl PeerRef<'_> {
    fn wrapper(&self) -> &HubWrapper {
        self.network.wrapper(self.node_id)
    }

    fn wrapper_mut(&mut self) -> &mut HubWrapper {
        self.network.wrapper_mut(self.node_id)
    }

    pub fn peer_id(&self) -> PeerId {
        self.wrapper().hub().peer_id()
    }

    pub fn storage_id(&self) -> StorageId {
        self.wrapper().hub().storage_id()
    }

    pub fn storage(&self) -> &InMemoryStorage {
        self.wrapper().storage()
    }

    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.wrapper().hub().connections()
    }

    pub fn established_peers(&self) -> Vec<(ConnectionId, PeerId)> {
        self.wrapper().hub().established_peers()
    }

    pub fn is_connected_to(&self, peer_id: &PeerId) -> bool {
        self.wrapper().hub().is_connected_to(peer_id)
    }

    pub fn connection_events(&self) -> &[ConnectionEvent] {
        self.wrapper().connection_events()
    }

    pub fn set_announce_policy<F>(&mut self, policy: F)
    where
        F: Fn(&DocumentId, &PeerId) -> bool + 'static,
    {
        self.wrapper_mut().set_announce_policy(Box::new(policy));
    }

    pub fn advance_time(&mut self, by: Duration) {
        self.wrapper_mut().advance_time(by);
    }

    pub fn tick(&mut self) {
        self.wrapper_mut().push_event(HubEvent::tick());
        self.network.run_until_quiescent();
    }

    pub fn create_document(&mut self) -> RunningDocIds {
        self.create_document_with(Automerge::new())
    }

    pub fn create_document_with(&mut self, content: Automerge) -> RunningDocIds {
        let command_id = self.wrapper_mut().create_document(content);
        self.network.run_until_quiescent();
        match self.wrapper().command_result(&command_id) {
            Some(CommandResult::CreateDocument {
                actor_id,
                document_id,
            }) => RunningDocIds {
                doc_id: *document_id,
                actor_id: *actor_id,
            },
            other => panic!("unexpected create document result: {other:?}"),
        }
    }

    /// Start a find without running the network
    pub fn begin_find_document(&mut self, document_id: &DocumentId) -> CommandId {
        self.wrapper_mut()
            .dispatch(HubEvent::find_document(*document_id))
    }

    /// `None` while the find is still running, otherwise the actor if the
    /// document was found
    pub fn check_find_document_result(
        &self,
        command_id: CommandId,
    ) -> Option<Option<DocumentActorId>> {
        match self.wrapper().command_result(&command_id)? {
            CommandResult::FindDocument { actor_id, found } => {
                Some(if *found { Some(*actor_id) } else { None })
            }
            other => panic!("unexpected find document result: {other:?}"),
        }
    }

    pub fn find_document(&mut self, document_id: &DocumentId) -> Option<DocumentActorId> {
        let command_id = self.begin_find_document(document_id);
        self.network.run_until_quiescent();
        self.check_find_document_result(command_id)
            .expect("find document did not complete")
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let command_id = self
            .wrapper_mut()
            .dispatch(HubEvent::disconnect(connection_id));
        self.network.run_until_quiescent();
        assert_eq!(
            self.wrapper().command_result(&command_id),
            Some(&CommandResult::DisconnectConnection)
        );
    }

    pub fn with_document_by_actor<F, T>(
        &mut self,
        actor_id: DocumentActorId,
        f: F,
    ) -> Result<T, DocumentError>
    where
        F: FnOnce(&mut Automerge) -> T,
    {
        let value = self.wrapper_mut().with_document(actor_id, f)?;
        self.network.run_until_quiescent();
        Ok(value)
    }

    /// A copy of the document held by the running actor for `document_id`
    pub fn document(&mut self, document_id: &DocumentId) -> Option<Automerge> {
        let actor_id = self.wrapper().actor_for_document(document_id)?;
        self.with_document_by_actor(actor_id, |doc| doc.clone()).ok()
    }

    pub fn is_document_ready(&self, actor_id: &DocumentActorId) -> bool {
        self.wrapper()
            .actor(actor_id)
            .is_some_and(|r| r.actor().is_document_ready())
    }

    /// The connections the actor is syncing with
    pub fn actor_peers(&self, actor_id: &DocumentActorId) -> Vec<(ConnectionId, PeerId)> {
        self.wrapper()
            .actor(actor_id)
            .map(|r| r.actor().peers())
            .unwrap_or_default()
    }

    pub fn broadcast(&mut self, actor_id: DocumentActorId, msg: Vec<u8>) {
        self.wrapper_mut().broadcast(actor_id, msg);
        self.network.run_until_quiescent();
    }

    pub fn ephemeral_messages(&self, actor_id: &DocumentActorId) -> Vec<Vec<u8>> {
        self.wrapper().ephemeral_messages(actor_id)
    }

    pub fn change_events(&self, actor_id: &DocumentActorId) -> Vec<DocumentChanged> {
        self.wrapper().change_events(actor_id)
    }

    pub fn peer_state_changes(
        &self,
        document_id: &DocumentId,
    ) -> &[HashMap<ConnectionId, PeerDocState>] {
        self.wrapper().peer_state_changes(document_id)
    }

    /// The latest known state of each connection's sync of the document
    pub fn peer_states(&self, document_id: &DocumentId) -> HashMap<ConnectionId, PeerDocState> {
        self.peer_state_changes(document_id)
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn running_actors(&self) -> usize {
        self.wrapper().running_actors()
    }

    pub fn stop(&mut self) {
        self.wrapper_mut().push_event(HubEvent::stop());
        self.network.run_until_quiescent();
    }

    pub fn is_stopped(&self) -> bool {
        self.wrapper().is_stopped() && self.wrapper().hub().is_stopped()
    }
}
