use std::{path::Path, sync::Arc};

use log::{debug, info};
use thiserror::Error;

use crate::{
    config::{ConfigError, RunConfig},
    delegation::DelegationExtractor,
    lookup::{AaaaLookup, UdpLookup},
    registry::HostRegistry,
    scheduler::{Scheduler, SchedulerError},
    stats::RunStats,
    zonefile::{ResourceRecord, ZoneError, ZoneRecords},
};

/// Anything that aborts a run. No statistics are produced in that case.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("`{0}`")]
    Config(#[from] ConfigError),
    #[error("`{0}`")]
    Zone(#[from] ZoneError),
    #[error("`{0}`")]
    Scheduler(#[from] SchedulerError),
}

/// Compute the IPv6 statistics for the zone file at `path`, querying the
/// configured resolvers over UDP.
pub async fn run_zonefile(
    path: impl AsRef<Path>,
    origin: &str,
    config: &RunConfig,
) -> Result<RunStats, RunError> {
    config.validate()?;
    let records = ZoneRecords::open(path, origin)?;
    let lookup = Arc::new(UdpLookup::new(config.timeout));
    run(records, config, lookup).await
}

/// Compute the IPv6 statistics for a stream of zone records.
///
/// Every distinct name server host is looked up exactly once, with at most
/// `config.concurrency` lookups running at a time. Returns once the stream
/// is exhausted and all lookups have finished.
pub async fn run<I>(
    records: I,
    config: &RunConfig,
    lookup: Arc<dyn AaaaLookup + Send + Sync>,
) -> Result<RunStats, RunError>
where
    I: IntoIterator<Item = Result<ResourceRecord, ZoneError>>,
{
    config.validate()?;
    info!("Using resolvers: {:?}", config.resolvers);

    let registry = Arc::new(HostRegistry::new());
    let mut scheduler = Scheduler::new(
        config.resolvers.clone(),
        config.concurrency,
        lookup,
        Arc::clone(&registry),
    )?;
    let mut extractor = DelegationExtractor::new();

    for record in records {
        let record = record?;
        if let Some(host) = extractor.observe(&record) {
            if registry.claim_if_new(host) {
                debug!("Start resolving host {}", host);
                scheduler.dispatch(host).await?;
            }
        }
    }

    let counts = extractor.counts();
    info!(
        "Zone read: {} records, {} NS records, {} hosts to resolve",
        counts.records,
        counts.ns_records,
        scheduler.dispatched()
    );
    scheduler.join().await?;
    info!("All hosts resolved");

    let (delegation, counts) = extractor.into_parts();
    Ok(RunStats::aggregate(&delegation, counts, &registry))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        net::{Ipv6Addr, SocketAddr},
        time::Duration,
    };

    use parking_lot::Mutex;

    use super::*;
    use crate::lookup::LookupError;

    #[derive(Debug, Clone, Copy)]
    enum Answer {
        Ipv6,
        NoIpv6,
        Timeout,
    }

    // Answers from a fixed table and counts the queries per host.
    #[derive(Default)]
    struct ScriptedLookup {
        answers: HashMap<String, Answer>,
        queries: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedLookup {
        fn new(answers: &[(&str, Answer)]) -> Self {
            ScriptedLookup {
                answers: answers
                    .iter()
                    .map(|(host, a)| (host.to_string(), *a))
                    .collect(),
                ..Default::default()
            }
        }

        fn queries(&self, host: &str) -> usize {
            self.queries.lock().get(host).copied().unwrap_or(0)
        }
    }

    impl AaaaLookup for ScriptedLookup {
        fn query_aaaa(
            &self,
            host: &str,
            _server: SocketAddr,
        ) -> Result<Vec<Ipv6Addr>, LookupError> {
            *self.queries.lock().entry(host.to_owned()).or_default() += 1;
            match self.answers.get(host).copied().unwrap_or(Answer::NoIpv6) {
                Answer::Ipv6 => Ok(vec!["2001:db8::53".parse().unwrap()]),
                Answer::NoIpv6 => Ok(vec![]),
                Answer::Timeout => Err(LookupError::Timeout(Duration::from_secs(5))),
            }
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            resolvers: vec![
                "192.0.2.1:53".parse().unwrap(),
                "192.0.2.2:53".parse().unwrap(),
            ],
            concurrency: 3,
            ..Default::default()
        }
    }

    fn zone(text: &str) -> ZoneRecords {
        ZoneRecords::from_reader(&mut text.as_bytes(), "").unwrap()
    }

    const EXAMPLE_COM: &str = "\
example.com.     3600 IN NS   ns1.example.com.
example.com.     3600 IN NS   ns2.example.com.
ns1.example.com. 3600 IN AAAA 2001:db8::1
";

    #[tokio::test]
    async fn should_report_domain_with_some_ipv6() {
        let lookup = Arc::new(ScriptedLookup::new(&[
            ("ns1.example.com.", Answer::Ipv6),
            ("ns2.example.com.", Answer::NoIpv6),
        ]));

        let stats = run(zone(EXAMPLE_COM), &config(), lookup).await.unwrap();

        assert_eq!(stats.records, 3);
        assert_eq!(stats.ns_records, 2);
        assert_eq!(stats.hosts, 2);
        assert_eq!(stats.hosts_with_ipv6, 1);
        assert_eq!(stats.domains, 1);
        assert_eq!(stats.domains_some_ipv6, 1);
        assert_eq!(stats.resolve_errors, 0);
    }

    #[tokio::test]
    async fn should_report_domain_with_all_ipv6() {
        let lookup = Arc::new(ScriptedLookup::new(&[
            ("ns1.example.com.", Answer::Ipv6),
            ("ns2.example.com.", Answer::Ipv6),
        ]));

        let stats = run(zone(EXAMPLE_COM), &config(), lookup).await.unwrap();

        assert_eq!(stats.domains_all_ipv6, 1);
        assert_eq!(stats.domains_some_ipv6, 0);
        assert_eq!(stats.domains_no_ipv6, 0);
    }

    #[tokio::test]
    async fn should_count_shared_host_timeout_once() {
        let text = "\
a.example. 3600 IN NS ns.shared.example.
b.example. 3600 IN NS ns.shared.example.
c.example. 3600 IN NS ns.shared.example.
c.example. 3600 IN NS ns.c.example.
";
        let lookup = Arc::new(ScriptedLookup::new(&[
            ("ns.shared.example.", Answer::Timeout),
            ("ns.c.example.", Answer::Ipv6),
        ]));

        let stats = run(zone(text), &config(), lookup.clone()).await.unwrap();

        assert_eq!(lookup.queries("ns.shared.example."), 1);
        assert_eq!(stats.resolve_errors, 1);
        assert_eq!(stats.hosts, 2);
        assert_eq!(stats.hosts_without_ipv6, 1);
        assert_eq!(stats.domains_no_ipv6, 2);
        assert_eq!(stats.domains_some_ipv6, 1);
    }

    #[tokio::test]
    async fn should_query_every_host_once_in_large_zone() {
        let mut text = String::new();
        for d in 0..60 {
            for h in 0..3 {
                text += &format!("d{}.example. 3600 IN NS ns{}.hosting.example.\n", d, (d + h) % 25);
            }
        }
        let answers = (0..25)
            .map(|h| {
                let a = if h % 2 == 0 { Answer::Ipv6 } else { Answer::NoIpv6 };
                (format!("ns{}.hosting.example.", h), a)
            })
            .collect::<Vec<_>>();
        let answers = answers
            .iter()
            .map(|(h, a)| (h.as_str(), *a))
            .collect::<Vec<_>>();
        let lookup = Arc::new(ScriptedLookup::new(&answers));

        let stats = run(zone(&text), &config(), lookup.clone()).await.unwrap();

        for h in 0..25 {
            assert_eq!(lookup.queries(&format!("ns{}.hosting.example.", h)), 1);
        }
        assert_eq!(stats.ns_records, 180);
        assert_eq!(stats.hosts, 25);
        assert_eq!(stats.hosts_with_ipv6, 13);
        assert_eq!(stats.domains, 60);
        assert_eq!(
            stats.domains_all_ipv6 + stats.domains_some_ipv6 + stats.domains_no_ipv6,
            60
        );
    }

    #[tokio::test]
    async fn should_abort_on_zone_syntax_error() {
        let text = "\
example.com. 3600 IN NS ns1.example.com.
example.com. 3600 IN AAAA nonsense
";
        let lookup = Arc::new(ScriptedLookup::default());
        let res = run(zone(text), &config(), lookup).await;
        assert!(matches!(res, Err(RunError::Zone(ZoneError::Syntax(_)))));
    }

    #[tokio::test]
    async fn should_abort_on_include_before_any_lookup() {
        let text = "\
$INCLUDE delegations.zone
example.com. 3600 IN NS ns1.example.com.
";
        let lookup = Arc::new(ScriptedLookup::default());
        let res = run(zone(text), &config(), lookup.clone()).await;
        assert!(matches!(res, Err(RunError::Zone(ZoneError::Include(_)))));
        assert!(lookup.queries.lock().is_empty());
    }

    #[tokio::test]
    async fn should_refuse_config_without_resolvers() {
        let lookup = Arc::new(ScriptedLookup::default());
        let res = run(zone(EXAMPLE_COM), &RunConfig::default(), lookup.clone()).await;
        assert!(matches!(res, Err(RunError::Config(ConfigError::NoResolvers))));
        assert_eq!(lookup.queries("ns1.example.com."), 0);
    }

    #[tokio::test]
    async fn should_fail_for_missing_zone_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_zonefile(dir.path().join("nope.zone"), "", &config()).await;
        assert!(matches!(res, Err(RunError::Zone(ZoneError::Open { .. }))));
    }
}
