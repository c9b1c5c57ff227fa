use std::{net::SocketAddr, sync::Arc};

use log::{debug, trace};
use thiserror::Error;
use tokio::{
    sync::{AcquireError, Semaphore},
    task::{JoinError, JoinSet},
};

use crate::{
    lookup::AaaaLookup,
    registry::{HostRegistry, RegistryError},
    worker::resolve_host,
};

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("no resolvers to dispatch to")]
    NoResolvers,
    #[error("concurrency must be at least 1")]
    NoCapacity,
    #[error("concurrency {0} exceeds the limit of {max}", max = Semaphore::MAX_PERMITS)]
    CapacityTooLarge(usize),
    #[error("`{0}`")]
    Registry(#[from] RegistryError),
    #[error("resolution task failed: {0}")]
    Task(#[from] JoinError),
    #[error("scheduler closed")]
    Closed(#[from] AcquireError),
}

/// Runs host resolutions in the background, at most `capacity` at a time.
///
/// Resolvers are handed out round-robin in dispatch order: the n-th host
/// dispatched over the lifetime of the scheduler goes to resolver
/// `n % resolvers.len()`.
pub struct Scheduler {
    resolvers: Arc<[SocketAddr]>,
    lookup: Arc<dyn AaaaLookup + Send + Sync>,
    registry: Arc<HostRegistry>,
    slots: Arc<Semaphore>,
    tasks: JoinSet<Result<bool, RegistryError>>,
    dispatched: usize,
}

impl Scheduler {
    pub fn new(
        resolvers: Vec<SocketAddr>,
        capacity: usize,
        lookup: Arc<dyn AaaaLookup + Send + Sync>,
        registry: Arc<HostRegistry>,
    ) -> Result<Scheduler, SchedulerError> {
        if resolvers.is_empty() {
            return Err(SchedulerError::NoResolvers);
        }
        if capacity == 0 {
            return Err(SchedulerError::NoCapacity);
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(SchedulerError::CapacityTooLarge(capacity));
        }
        Ok(Scheduler {
            resolvers: resolvers.into(),
            lookup,
            registry,
            slots: Arc::new(Semaphore::new(capacity)),
            tasks: JoinSet::new(),
            dispatched: 0,
        })
    }

    /// Start resolving `host` in the background.
    ///
    /// The host must have been claimed in the registry by the caller. Waits
    /// for a free slot when `capacity` resolutions are already running.
    pub async fn dispatch(&mut self, host: &str) -> Result<(), SchedulerError> {
        let permit = Arc::clone(&self.slots).acquire_owned().await?;

        let server = self.resolvers[self.dispatched % self.resolvers.len()];
        trace!(
            "Dispatching {} as #{} to {}",
            host,
            self.dispatched,
            server
        );
        self.dispatched += 1;

        let lookup = Arc::clone(&self.lookup);
        let registry = Arc::clone(&self.registry);
        let host = host.to_owned();
        self.tasks.spawn_blocking(move || {
            let _permit = permit;
            resolve_host(lookup.as_ref(), &registry, &host, server)
        });

        // Reap what has finished so far, surfacing fatal errors early
        while let Some(res) = self.tasks.try_join_next() {
            res??;
        }
        Ok(())
    }

    /// Number of hosts dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Wait for every dispatched resolution to finish.
    pub async fn join(mut self) -> Result<usize, SchedulerError> {
        debug!("Waiting for {} resolutions to finish", self.tasks.len());
        while let Some(res) = self.tasks.join_next().await {
            res??;
        }
        Ok(self.dispatched)
    }
}
