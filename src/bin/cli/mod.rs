use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use zone6::{
    config::{parse_resolver, DEFAULT_TIMEOUT},
    scheduler::DEFAULT_CONCURRENCY,
};

macro_rules! env_prefix {
    () => {
        "ZONE6_"
    };
}

/// IPv6 statistics for the name servers delegated in a zone file.
///
/// Depending on the size of your zone, computation can take some time.
/// Queries are spread over all given resolvers and limited in number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Zone file to read NS records from
    #[arg(value_name = "ZONEFILE", env = concat!(env_prefix!(), "ZONEFILE"))]
    pub zonefile: PathBuf,

    /// Origin for relative names until the zone file sets its own $ORIGIN
    #[arg(
        long,
        default_value = "",
        value_name = "DOMAIN",
        env = concat!(env_prefix!(), "ORIGIN")
    )]
    pub origin: String,

    /// IPv4 or IPv6 address of a resolver, with optional port, or a host name with port.
    /// Can be given several times or as a comma-separated list.
    /// Defaults to the name servers in /etc/resolv.conf
    #[arg(
        short = 'r',
        long = "resolver",
        value_name = "ADDRESS",
        value_parser = parse_resolver,
        use_value_delimiter = true,
        value_delimiter = ',',
        env = concat!(env_prefix!(), "RESOLVERS")
    )]
    pub resolvers: Vec<SocketAddr>,

    /// Number of concurrent AAAA queries
    #[arg(
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        env = concat!(env_prefix!(), "CONCURRENT")
    )]
    pub concurrent: usize,

    /// Seconds to wait for each answer
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        env = concat!(env_prefix!(), "TIMEOUT")
    )]
    pub timeout: u64,

    /// Set the loglevel of the application
    #[arg(
        value_enum,
        short = 'l',
        long,
        default_value_t = Loglevel::Info,
        value_name = "LEVEL",
        env = concat!(env_prefix!(), "LOGLEVEL")
    )]
    pub loglevel: Loglevel,
}

/// Used to set the applications loglevel
// This is essentially a re-creation of log:Level. However, that enum doesn't derive ValueEnum, so we have to do it manually here
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<Loglevel> for LevelFilter {
    fn from(ll: Loglevel) -> Self {
        match ll {
            Loglevel::Error => LevelFilter::Error,
            Loglevel::Warn => LevelFilter::Warn,
            Loglevel::Info => LevelFilter::Info,
            Loglevel::Debug => LevelFilter::Debug,
            Loglevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_defaults() {
        let cli = Cli::try_parse_from(["zone6", "example.zone"]).unwrap();
        assert_eq!(cli.zonefile, PathBuf::from("example.zone"));
        assert_eq!(cli.origin, "");
        assert!(cli.resolvers.is_empty());
        assert_eq!(cli.concurrent, 10);
        assert_eq!(cli.timeout, 5);
        assert_eq!(cli.loglevel, Loglevel::Info);
    }

    #[test]
    fn should_collect_resolvers() {
        let cli = Cli::try_parse_from([
            "zone6",
            "-r",
            "192.0.2.1",
            "--resolver",
            "[2001:db8::1]:5353,192.0.2.2:",
            "example.zone",
        ])
        .unwrap();
        assert_eq!(
            cli.resolvers,
            vec![
                "192.0.2.1:53".parse::<SocketAddr>().unwrap(),
                "[2001:db8::1]:5353".parse().unwrap(),
                "192.0.2.2:53".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn should_reject_bad_resolver_and_zero_timeout() {
        assert!(Cli::try_parse_from(["zone6", "-r", "1::2%eth0", "example.zone"]).is_err());
        assert!(Cli::try_parse_from(["zone6", "--timeout", "0", "example.zone"]).is_err());
    }
}
