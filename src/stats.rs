use std::fmt::Display;

use crate::{
    delegation::{Delegation, ZoneCounts},
    registry::{HostRegistry, HostState},
};

/// How many of a domain's name servers have an IPv6 address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DomainIpv6 {
    All,
    Some,
    None,
}

impl DomainIpv6 {
    /// Classify a domain with `total` hosts of which `with_ipv6` have IPv6.
    pub fn classify(with_ipv6: usize, total: usize) -> Self {
        if with_ipv6 == total {
            DomainIpv6::All
        } else if with_ipv6 > 0 {
            DomainIpv6::Some
        } else {
            DomainIpv6::None
        }
    }
}

/// The statistics of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RunStats {
    pub records: usize,
    pub ns_records: usize,
    pub resolve_errors: usize,
    pub domains: usize,
    pub hosts: usize,
    pub hosts_with_ipv6: usize,
    pub hosts_without_ipv6: usize,
    pub domains_all_ipv6: usize,
    pub domains_some_ipv6: usize,
    pub domains_no_ipv6: usize,
}

impl RunStats {
    /// Compute the statistics once all resolutions have finished.
    ///
    /// Hosts whose lookup failed count as hosts without IPv6.
    pub fn aggregate(delegation: &Delegation, counts: ZoneCounts, registry: &HostRegistry) -> Self {
        let hosts = registry.snapshot();
        let has_ipv6 =
            |host: &str| matches!(hosts.get(host), Some(HostState::Resolved { has_ipv6: true }));

        let hosts_with_ipv6 = hosts
            .values()
            .filter(|s| matches!(s, HostState::Resolved { has_ipv6: true }))
            .count();

        let mut stats = RunStats {
            records: counts.records,
            ns_records: counts.ns_records,
            resolve_errors: registry.errors(),
            domains: delegation.len(),
            hosts: hosts.len(),
            hosts_with_ipv6,
            hosts_without_ipv6: hosts.len() - hosts_with_ipv6,
            ..Default::default()
        };

        for (_, domain_hosts) in delegation.iter() {
            let k = domain_hosts.iter().filter(|h| has_ipv6(h.as_str())).count();
            match DomainIpv6::classify(k, domain_hosts.len()) {
                DomainIpv6::All => stats.domains_all_ipv6 += 1,
                DomainIpv6::Some => stats.domains_some_ipv6 += 1,
                DomainIpv6::None => stats.domains_no_ipv6 += 1,
            }
        }
        stats
    }
}

impl Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RR processed           {:>7}", self.records)?;
        writeln!(f, "NS processed           {:>7}", self.ns_records)?;
        writeln!(f, "Resolve errors         {:>7}", self.resolve_errors)?;
        writeln!(f, "Domains found          {:>7}", self.domains)?;
        writeln!(f, "Hosts found            {:>7}", self.hosts)?;
        writeln!(f)?;
        writeln!(f, "Hosts with    IPv6     {:>7}", self.hosts_with_ipv6)?;
        writeln!(f, "Hosts without IPv6     {:>7}", self.hosts_without_ipv6)?;
        writeln!(f)?;
        writeln!(f, "Domains with all  IPv6 {:>7}", self.domains_all_ipv6)?;
        writeln!(f, "Domains with some IPv6 {:>7}", self.domains_some_ipv6)?;
        write!(f, "Domains without   IPv6 {:>7}", self.domains_no_ipv6)
    }
}
