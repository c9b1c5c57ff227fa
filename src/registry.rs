use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

/// Resolution state of a host. Hosts that were never claimed are not in the
/// registry at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HostState {
    InFlight,
    Resolved { has_ipv6: bool },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("host {0} was resolved without being claimed first")]
    NotInFlight(String),
}

#[derive(Debug, Default)]
struct Inner {
    hosts: HashMap<String, HostState>,
    errors: usize,
}

/// Shared record of every name server host seen during a run.
///
/// Hands out each host exactly once through [`HostRegistry::claim_if_new()`]
/// and collects the outcome from whoever claimed it. The resolution error
/// counter lives under the same lock.
#[derive(Debug, Default)]
pub struct HostRegistry {
    inner: Mutex<Inner>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first caller asking about `host`, which then owns
    /// its resolution. Everybody else gets false.
    pub fn claim_if_new(&self, host: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.hosts.contains_key(host) {
            return false;
        }
        inner.hosts.insert(host.to_owned(), HostState::InFlight);
        true
    }

    /// Store the outcome for a host claimed earlier.
    pub fn mark_resolved(&self, host: &str, has_ipv6: bool) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        match inner.hosts.get_mut(host) {
            Some(state) if *state == HostState::InFlight => {
                *state = HostState::Resolved { has_ipv6 };
                Ok(())
            }
            _ => Err(RegistryError::NotInFlight(host.to_owned())),
        }
    }

    pub fn record_error(&self) {
        self.inner.lock().errors += 1;
    }

    pub fn errors(&self) -> usize {
        self.inner.lock().errors
    }

    pub fn state(&self, host: &str) -> Option<HostState> {
        self.inner.lock().hosts.get(host).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().hosts.is_empty()
    }

    /// Copy of all host states, taken under a single lock.
    pub fn snapshot(&self) -> HashMap<String, HostState> {
        self.inner.lock().hosts.clone()
    }
}
