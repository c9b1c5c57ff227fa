#[cfg(unix)]
use std::ffi::CString;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, ToSocketAddrs},
    time::Duration,
};

use domain::resolv::stub::conf::ResolvConf;
use itertools::Itertools;
use log::debug;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::scheduler::DEFAULT_CONCURRENCY;

pub const DNS_PORT: u16 = 53;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const RESOLV_CONF: &str = "/etc/resolv.conf";
/// Largest number of concurrent queries a run accepts.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("not a valid resolver: {0}")]
    InvalidResolver(String),
    #[error("no resolvers found")]
    NoResolvers,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("concurrency must be at most {}", MAX_CONCURRENCY)]
    ConcurrencyTooLarge,
    #[error("query timeout must not be zero")]
    ZeroTimeout,
    #[error("cannot read {}: {0}", RESOLV_CONF)]
    ResolvConf(String),
}

/// Everything a run needs besides the zone itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunConfig {
    /// Resolvers to spread the AAAA queries over, in round-robin order
    pub resolvers: Vec<SocketAddr>,
    /// Maximum number of queries in flight at once
    pub concurrency: usize,
    /// How long to wait for each answer
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            resolvers: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolvers.is_empty() {
            return Err(ConfigError::NoResolvers);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyTooLarge);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Parse a resolver address, filling in port 53 where none (or 0) is given.
///
/// Accepted forms: `192.0.2.1`, `192.0.2.1:53`, `192.0.2.1:`, `2001:db8::1`,
/// `[2001:db8::1]:53`, `[2001:db8::1]:`, scoped addresses such as
/// `[fe80::1%eth0]:53` and host names with a port (`resolver.example:53`).
/// Host names are resolved once, here.
pub fn parse_resolver(s: &str) -> Result<SocketAddr, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidResolver(s.to_owned());

    if let Ok(ip) = s.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(with_default_port(addr));
    }

    let (host, port) = split_host_port(s).ok_or_else(invalid)?;
    let port = match port {
        "" => DNS_PORT,
        p => p.parse::<u16>().map_err(|_| invalid())?,
    };

    if let Some(scoped) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        let (ip, zone) = match scoped.split_once('%') {
            Some((ip, zone)) => (ip, Some(zone)),
            None => (scoped, None),
        };
        let ip = ip.parse::<Ipv6Addr>().map_err(|_| invalid())?;
        let scope = match zone {
            None => 0,
            Some(zone) => scope_id(zone).ok_or_else(invalid)?,
        };
        return Ok(with_default_port(SocketAddrV6::new(ip, port, 0, scope).into()));
    }
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(with_default_port(SocketAddr::new(ip.into(), port)));
    }

    let addr = (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(invalid)?;
    debug!("Resolver {} resolved to {}", s, addr);
    Ok(with_default_port(addr))
}

fn with_default_port(mut addr: SocketAddr) -> SocketAddr {
    if addr.port() == 0 {
        addr.set_port(DNS_PORT);
    }
    addr
}

// `[v6]:port` keeps its brackets; other hosts must not contain a colon.
fn split_host_port(s: &str) -> Option<(&str, &str)> {
    if s.starts_with('[') {
        let end = s.find("]:")?;
        return Some((&s[..=end], &s[end + 2..]));
    }
    let (host, port) = s.rsplit_once(':')?;
    if host.is_empty() || host.contains(':') {
        return None;
    }
    Some((host, port))
}

// Numeric zones are taken as is. Interface names are mapped to their index;
// an unknown interface gets scope 0, the same as no zone at all.
fn scope_id(zone: &str) -> Option<u32> {
    if zone.is_empty() {
        return None;
    }
    if let Ok(id) = zone.parse::<u32>() {
        return Some(id);
    }
    let index = interface_index(zone)?;
    if index == 0 {
        debug!("Unknown interface {}, ignoring scope", zone);
    }
    Some(index)
}

#[cfg(unix)]
fn interface_index(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
    Some(unsafe { libc::if_nametoindex(c_name.as_ptr()) })
}

#[cfg(not(unix))]
fn interface_index(_name: &str) -> Option<u32> {
    Some(0)
}

/// The name servers configured in `/etc/resolv.conf`, in file order.
pub fn system_resolvers() -> Result<Vec<SocketAddr>, ConfigError> {
    let mut conf = ResolvConf::new();
    conf.parse_file(RESOLV_CONF)
        .map_err(|e| ConfigError::ResolvConf(e.to_string()))?;
    let servers = conf.servers.iter().map(|s| s.addr).unique().collect_vec();
    debug!("System resolvers: {:?}", servers);
    if servers.is_empty() {
        return Err(ConfigError::NoResolvers);
    }
    Ok(servers)
}
