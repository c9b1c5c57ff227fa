//! AAAA lookups against a single resolver.
//! Each lookup backend implements the [`AaaaLookup`] trait.
//!
//! The following backends are currently available:
//! - [`UdpLookup`]: Sends a single recursive query over UDP and waits for the answer

mod udp;

pub use udp::UdpLookup;

use std::{
    net::{Ipv6Addr, SocketAddr},
    time::Duration,
};

use domain::base::iana::Rcode;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// An `AaaaLookup` asks one resolver for the IPv6 addresses of one host.
///
/// A successful lookup that found no AAAA records returns an empty list.
/// Anything that keeps the resolver from giving a proper answer, including a
/// response code other than NOERROR, is a [`LookupError`].
#[cfg_attr(test, automock)]
pub trait AaaaLookup {
    fn query_aaaa(&self, host: &str, server: SocketAddr) -> Result<Vec<Ipv6Addr>, LookupError>;
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("`{0}` is not a valid domain name")]
    InvalidName(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("server answered {0}")]
    Rcode(Rcode),
}
