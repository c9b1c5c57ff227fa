use std::net::SocketAddr;

use log::{debug, trace, warn};

use crate::{
    lookup::AaaaLookup,
    registry::{HostRegistry, RegistryError},
};

/// Resolve a claimed host once and record the outcome in the registry.
///
/// Lookup failures are counted as resolution errors and the host is recorded
/// as having no IPv6 address. The only error returned is a registry error,
/// meaning the host was not in flight.
pub fn resolve_host(
    lookup: &(dyn AaaaLookup + Send + Sync),
    registry: &HostRegistry,
    host: &str,
    server: SocketAddr,
) -> Result<bool, RegistryError> {
    debug!("Resolving {} using {}", host, server);

    let has_ipv6 = match lookup.query_aaaa(host, server) {
        Ok(addrs) => {
            for addr in &addrs {
                trace!("{} AAAA {}", host, addr);
            }
            !addrs.is_empty()
        }
        Err(e) => {
            warn!("{:<30}: Error resolving (server {}): {}", host, server, e);
            registry.record_error();
            false
        }
    };

    registry.mark_resolved(host, has_ipv6)?;
    Ok(has_ipv6)
}
