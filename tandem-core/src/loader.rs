use std::sync::{Arc, Mutex};

use crate::{
    PeerId, UnixTimestamp,
    actors::{
        driver::{Driver, StepResult},
        hub::{Hub, HubConfig},
        loading::{self, Loading},
    },
    io::{IoResult, IoTask, IoTaskError, StorageResult, StorageTask},
};

/// Produces a [`Hub`] once its storage id has been loaded or created.
///
/// The storage id lives under the `["storage-adapter-id"]` key. If it is
/// missing or unreadable a new one is generated and stored.
///
/// ```rust,no_run
/// use rand::{SeedableRng, rngs::StdRng};
/// use tandem_core::{Loader, LoaderState, PeerId, UnixTimestamp, io::{IoResult, StorageResult}};
///
/// let peer_id: PeerId = "alice".parse().unwrap();
/// let mut loader = Loader::new(StdRng::from_os_rng(), peer_id, UnixTimestamp::now());
/// let hub = loop {
///     match loader.step(UnixTimestamp::now()) {
///         LoaderState::NeedIo(tasks) => {
///             for task in tasks {
///                 // perform task.action against storage
///                 # let result: IoResult<StorageResult> = todo!();
///                 loader.provide_io_result(UnixTimestamp::now(), result).unwrap();
///             }
///         }
///         LoaderState::Loaded(hub) => break hub,
///     }
/// };
/// ```
pub struct Loader<R> {
    driver: Driver<Loading<R>>,
}

pub enum LoaderState {
    /// Perform these tasks, report each with
    /// [`Loader::provide_io_result`], then call [`Loader::step`] again
    NeedIo(Vec<IoTask<StorageTask>>),
    Loaded(Box<Hub>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error(transparent)]
    Io(#[from] IoTaskError),
}

impl<R: rand::Rng + Send + 'static> Loader<R> {
    pub fn new(rng: R, local_peer_id: PeerId, now: UnixTimestamp) -> Self {
        Self::with_config(rng, local_peer_id, now, HubConfig::default())
    }

    pub fn with_config(
        rng: R,
        local_peer_id: PeerId,
        now: UnixTimestamp,
        config: HubConfig,
    ) -> Self {
        let driver = Driver::spawn(now, |args| loading::load(rng, local_peer_id, config, args));
        Self { driver }
    }

    pub fn step(&mut self, now: UnixTimestamp) -> LoaderState {
        match self.driver.step(now) {
            StepResult::Suspend(tasks) => LoaderState::NeedIo(tasks),
            StepResult::Complete {
                complete: (hub_state, rng),
                ..
            } => {
                let state = Arc::new(Mutex::new(hub_state));
                LoaderState::Loaded(Box::new(Hub::new(rng, now, state)))
            }
        }
    }

    /// # Errors
    ///
    /// [`LoaderError::Io`] if the result doesn't answer an outstanding task
    pub fn provide_io_result(
        &mut self,
        now: UnixTimestamp,
        result: IoResult<StorageResult>,
    ) -> Result<(), LoaderError> {
        self.driver.handle_io_complete(now, result)?;
        Ok(())
    }
}
