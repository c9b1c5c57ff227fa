use std::{
    io::ErrorKind,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

use domain::{
    base::{iana::Rtype, Message, MessageBuilder, Name},
    rdata::Aaaa,
};
use log::trace;

use super::{AaaaLookup, LookupError};

// Largest possible UDP payload
const RECV_BUF_SIZE: usize = 65_535;

/// An [`AaaaLookup`] that sends one recursion-desired query per lookup over UDP.
///
/// Every lookup uses a fresh socket and a random query id. Datagrams that are
/// not an answer to the query (wrong id, wrong question, garbage) are dropped
/// and the lookup keeps waiting until the timeout runs out. A response with
/// the right id and an empty question section is taken as the reply.
/// There are no retries and no fallback to TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct UdpLookup {
    timeout: Duration,
}

impl UdpLookup {
    pub fn new(timeout: Duration) -> Self {
        UdpLookup { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl AaaaLookup for UdpLookup {
    fn query_aaaa(&self, host: &str, server: SocketAddr) -> Result<Vec<Ipv6Addr>, LookupError> {
        let query = build_query(host)?;
        let deadline = Instant::now() + self.timeout;

        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(server)?;
        socket.send(query.as_slice())?;

        let mut buf = vec![0u8; RECV_BUF_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LookupError::Timeout(self.timeout));
            }
            socket.set_read_timeout(Some(remaining))?;
            let len = match socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(LookupError::Timeout(self.timeout))
                }
                Err(e) => return Err(e.into()),
            };
            let response = match Message::from_octets(buf[..len].to_vec()) {
                Ok(m) => m,
                Err(_) => {
                    trace!("Dropping short datagram from {}", server);
                    continue;
                }
            };
            if !is_reply_to(&response, &query) {
                trace!(
                    "Dropping unrelated response {} from {}",
                    response.header().id(),
                    server
                );
                continue;
            }
            return aaaa_answers(&response);
        }
    }
}

fn build_query(host: &str) -> Result<Message<Vec<u8>>, LookupError> {
    let name = host
        .parse::<Name<Vec<u8>>>()
        .map_err(|_| LookupError::InvalidName(host.to_owned()))?;

    let mut msg = MessageBuilder::new_vec();
    msg.header_mut().set_random_id();
    msg.header_mut().set_rd(true);
    let mut msg = msg.question();
    msg.push((name, Rtype::AAAA))
        .map_err(|_| LookupError::InvalidName(host.to_owned()))?;
    Ok(msg.into_message())
}

// Error responses may come without a question section; id and QR decide then.
fn is_reply_to(response: &Message<Vec<u8>>, query: &Message<Vec<u8>>) -> bool {
    if response.is_answer(query) {
        return true;
    }
    let header = response.header();
    header.qr()
        && header.id() == query.header().id()
        && response.header_counts().qdcount() == 0
}

// Collect the AAAA addresses from the answer section of a NOERROR response.
fn aaaa_answers(response: &Message<Vec<u8>>) -> Result<Vec<Ipv6Addr>, LookupError> {
    if !response.no_error() {
        return Err(LookupError::Rcode(response.header().rcode()));
    }
    response
        .answer()
        .map_err(|e| LookupError::Malformed(e.to_string()))?
        .limit_to::<Aaaa>()
        .map(|rec| {
            rec.map(|rec| rec.data().addr())
                .map_err(|e| LookupError::Malformed(e.to_string()))
        })
        .collect()
}
