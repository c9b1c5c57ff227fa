//! Streaming access to the records of a zone master file.
//!
//! [`ZoneRecords`] wraps the in-place scanner of the `domain` crate and turns
//! its entries into [`ResourceRecord`]s, one at a time. The file is read into
//! memory when it is opened and its handle is released right away; records
//! are only scanned when the iterator is advanced.

use std::{fmt::Display, fs::File, io::Read, net::Ipv6Addr, path::Path, str::FromStr};

use bytes::Bytes;
use domain::{
    base::{iana::Rtype, Name, ToName},
    rdata::ZoneRecordData,
    zonefile::inplace::{self, Entry, ScannedRecord, Zonefile},
};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("zone file {path} could not be opened: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("zone file could not be read: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid zone origin `{0}`")]
    Origin(String),
    #[error("zone file syntax error at {0}")]
    Syntax(#[from] inplace::Error),
    #[error("$INCLUDE of {0} is not supported")]
    Include(String),
}

/// A single record taken from the zone file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRecord {
    /// Absolute, lower-cased owner name
    pub owner: String,
    pub content: RecordContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordContent {
    /// Name server host, absolute and lower-cased
    Ns(String),
    Aaaa(Ipv6Addr),
    /// Any other record type. Only counted, never interpreted.
    Other(Rtype),
}

impl ResourceRecord {
    pub fn rtype(&self) -> Rtype {
        match self.content {
            RecordContent::Ns(_) => Rtype::NS,
            RecordContent::Aaaa(_) => Rtype::AAAA,
            RecordContent::Other(rtype) => rtype,
        }
    }
}

impl Display for ResourceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.content {
            RecordContent::Ns(host) => write!(f, "{} NS {}", self.owner, host),
            RecordContent::Aaaa(addr) => write!(f, "{} AAAA {}", self.owner, addr),
            RecordContent::Other(rtype) => write!(f, "{} {}", self.owner, rtype),
        }
    }
}

impl From<&ScannedRecord> for ResourceRecord {
    fn from(record: &ScannedRecord) -> Self {
        let content = match record.data() {
            ZoneRecordData::Ns(ns) => RecordContent::Ns(fqdn(ns.nsdname())),
            ZoneRecordData::Aaaa(aaaa) => RecordContent::Aaaa(aaaa.addr()),
            _ => RecordContent::Other(record.rtype()),
        };
        ResourceRecord {
            owner: fqdn(record.owner()),
            content,
        }
    }
}

/// Render a domain name as an absolute, lower-cased string with a final dot.
pub fn fqdn<N: ToName + ?Sized>(name: &N) -> String {
    let name: Name<Bytes> = name.to_bytes();
    let mut s = name.to_string().to_ascii_lowercase();
    if !s.ends_with('.') {
        s.push('.');
    }
    s
}

/// Lazy, single-pass sequence of the records in a zone file.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
pub struct ZoneRecords {
    zonefile: Zonefile,
    finished: bool,
}

impl ZoneRecords {
    /// Open the zone file at `path`. `origin` is used for relative names
    /// until the file sets its own `$ORIGIN`; pass `""` for none.
    ///
    /// The whole file is loaded into memory here, so memory use grows with
    /// the size of the zone. Records are still scanned one at a time.
    pub fn open(path: impl AsRef<Path>, origin: &str) -> Result<ZoneRecords, ZoneError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| ZoneError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!("Reading zone file {}", path.display());
        Self::from_reader(&mut file, origin)
    }

    pub fn from_reader(reader: &mut impl Read, origin: &str) -> Result<ZoneRecords, ZoneError> {
        let mut zonefile = Zonefile::load(reader).map_err(ZoneError::Read)?;
        if let Some(origin) = parse_origin(origin)? {
            zonefile.set_origin(origin);
        }
        Ok(ZoneRecords {
            zonefile,
            finished: false,
        })
    }
}

fn parse_origin(origin: &str) -> Result<Option<Name<Bytes>>, ZoneError> {
    let origin = origin.trim();
    if origin.is_empty() {
        return Ok(None);
    }
    Name::<Bytes>::from_str(origin)
        .map(Some)
        .map_err(|_| ZoneError::Origin(origin.to_owned()))
}

impl Iterator for ZoneRecords {
    type Item = Result<ResourceRecord, ZoneError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = match self.zonefile.next_entry() {
            Ok(Some(Entry::Record(record))) => Ok(ResourceRecord::from(&record)),
            Ok(Some(Entry::Include { path, .. })) => Err(ZoneError::Include(path.to_string())),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => Err(e.into()),
        };
        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}
