use std::collections::HashMap;

use log::trace;

use crate::zonefile::{RecordContent, ResourceRecord};

pub type DomainName = String;
pub type HostName = String;

/// The domain → name server hosts relation found in a zone.
///
/// Domains are kept in the order they were first seen, as are the hosts of
/// each domain. A host appears at most once per domain but may serve any
/// number of domains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delegation {
    domains: Vec<(DomainName, Vec<HostName>)>,
    index: HashMap<DomainName, usize>,
}

impl Delegation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `host` to the hosts of `domain`. Returns false if it was already listed.
    pub fn add(&mut self, domain: &str, host: &str) -> bool {
        let idx = match self.index.get(domain) {
            Some(idx) => *idx,
            None => {
                self.domains.push((domain.to_owned(), Vec::new()));
                self.index.insert(domain.to_owned(), self.domains.len() - 1);
                self.domains.len() - 1
            }
        };
        let hosts = &mut self.domains[idx].1;
        if hosts.iter().any(|h| h == host) {
            return false;
        }
        hosts.push(host.to_owned());
        true
    }

    pub fn hosts(&self, domain: &str) -> Option<&[HostName]> {
        self.index
            .get(domain)
            .map(|idx| self.domains[*idx].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[HostName])> {
        self.domains
            .iter()
            .map(|(domain, hosts)| (domain.as_str(), hosts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Record counters collected while scanning the zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneCounts {
    pub records: usize,
    pub ns_records: usize,
}

/// Builds a [`Delegation`] from the records of a zone, one record at a time.
#[derive(Debug, Default)]
pub struct DelegationExtractor {
    delegation: Delegation,
    counts: ZoneCounts,
}

impl DelegationExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a record. For NS records, returns the name server host so
    /// the caller can arrange for it to be resolved.
    pub fn observe<'r>(&mut self, record: &'r ResourceRecord) -> Option<&'r str> {
        self.counts.records += 1;
        match &record.content {
            RecordContent::Ns(host) => {
                self.counts.ns_records += 1;
                trace!("{} NS {}", record.owner, host);
                self.delegation.add(&record.owner, host);
                Some(host.as_str())
            }
            _ => None,
        }
    }

    pub fn counts(&self) -> ZoneCounts {
        self.counts
    }

    pub fn into_parts(self) -> (Delegation, ZoneCounts) {
        (self.delegation, self.counts)
    }
}
