#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

//! Synchronized multi-node benchmark core for InfluxDB 1.x compatible
//! time-series stores.
//!
//! Every simulated node runs as its own task, prepares its work,
//! and then crosses an entry [`rendezvous::Rendezvous`] together with all
//! other nodes. The releasing arrival stamps the start instant; the exit
//! rendezvous stamps the stop instant, so the measured window only
//! covers the concurrent requests themselves.

pub mod bench;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod query;
pub mod rendezvous;
pub mod timing;
pub mod transport;

pub use self::{
    bench::{OperationReport, ReadReport, StressTester, WriteParams, WriteReport},
    config::{Precision, Scheme, TargetConfig},
    error::BenchError,
    payload::{SensorCounts, SensorKind},
    query::{Aggregation, GroupInterval, ReadSpec, TimeBound},
};
