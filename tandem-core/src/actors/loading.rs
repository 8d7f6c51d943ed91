//! Finding (or creating) the storage id before a hub can start.
use std::marker::PhantomData;

use crate::{
    PeerId, StorageId, StorageKey,
    ephemera::EphemeralSession,
    io::{IoTask, StorageOp, StorageResult, StorageTask},
};

use super::{
    driver::{self, Actor, ActorIo},
    hub::{self, HubConfig},
};

pub(crate) struct Loading<R>(PhantomData<R>);

impl<R> Actor for Loading<R> {
    type IoTaskAction = StorageTask;
    type IoResult = StorageResult;
    type StepResults = Vec<IoTask<StorageTask>>;
    type Output = ();
    type Input = ();
    type Complete = (hub::State, R);
    type IoKind = StorageOp;

    fn task_kind(task: &StorageTask) -> StorageOp {
        task.op()
    }

    fn result_kind(result: &StorageResult) -> StorageOp {
        result.op()
    }

    fn finish_step(
        _outputs: Vec<Self::Output>,
        new_io_tasks: Vec<IoTask<StorageTask>>,
    ) -> Self::StepResults {
        new_io_tasks
    }
}

pub(crate) async fn load<R: rand::Rng + Send + 'static>(
    mut rng: R,
    local_peer_id: PeerId,
    config: HubConfig,
    args: driver::SpawnArgs<Loading<R>>,
) -> (hub::State, R) {
    let storage_id = load_or_create_storage_id(&args.io, &mut rng).await;
    let ephemeral_session = EphemeralSession::new(&mut rng);
    tracing::info!(%storage_id, %local_peer_id, "hub loaded");
    (
        hub::State::new(storage_id, local_peer_id, ephemeral_session, config),
        rng,
    )
}

async fn load_or_create_storage_id<R: rand::Rng>(
    io: &ActorIo<Loading<R>>,
    rng: &mut R,
) -> StorageId {
    let key = StorageKey::storage_id_path();

    let stored = match io.perform_io(StorageTask::Load { key: key.clone() }).await {
        StorageResult::Load { value } => value,
        other => unreachable!("load answered with {other:?}"),
    };
    if let Some(bytes) = stored {
        match String::from_utf8(bytes).map(|s| s.parse::<StorageId>()) {
            Ok(Ok(storage_id)) => {
                tracing::debug!(%storage_id, "loaded storage id");
                return storage_id;
            }
            Ok(Err(e)) => tracing::warn!(err = %e, "stored storage id is invalid"),
            Err(e) => tracing::warn!(err = %e, "stored storage id is not valid UTF-8"),
        }
    }

    let storage_id = StorageId::new(rng);
    tracing::debug!(%storage_id, "generated new storage id");
    io.perform_io(StorageTask::Put {
        key,
        value: storage_id.as_str().as_bytes().to_vec(),
    })
    .await;
    storage_id
}
