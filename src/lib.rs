//! Main crate for the `zone6` application.
//!
//! `zone6` reads a DNS zone file, collects the name servers of every
//! delegated domain and asks a set of resolvers whether each of those hosts
//! has an IPv6 address. The result is a [`stats::RunStats`] report counting
//! hosts with and without IPv6 and domains served entirely, partly or not at
//! all over IPv6.
//!
//! For more information, choose one of the modules below.
//! The following modules might be of interest if you want to add new functionality:
//! - [`lookup`] backends answer the AAAA queries for a single host
//! - [`scheduler`] runs those lookups with a bounded level of concurrency
//! - [`run`] ties the zone reader, the lookups and the statistics together

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod delegation;
pub mod lookup;
pub mod registry;
pub mod run;
pub mod scheduler;
pub mod stats;
pub mod worker;
pub mod zonefile;
