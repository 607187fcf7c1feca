//! # Work Order Runtime
//!
//! `workorder-runtime` is the ambient stack around the rest of the
//! workspace (spec §5, `SPEC_FULL.md` §1): [`RuntimeConfig`] collects the
//! worker pool size, queue depth, back-pressure policy, and per-call
//! timeouts that spec §5 names; [`WorkerPool`] bounds how many runs execute
//! at once; [`WorkOrderService`] wires the recipe catalog, matcher, and
//! step interpreter behind the `run`/`reload_catalog` entry points named in
//! spec §6; and [`init_tracing`] installs the structured-logging subscriber
//! every run's spans and events are emitted through.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

mod config;
mod service;
mod worker_pool;

pub use config::{BackPressurePolicy, ConfigError, RuntimeConfig};
pub use service::{WorkOrderResult, WorkOrderService};
pub use worker_pool::{SubmitError, WorkerPool};

/// Installs a [`tracing_subscriber::fmt`] subscriber configured by the
/// `RUST_LOG` environment variable, defaulting to `info` when unset
/// (spec `SPEC_FULL.md` §1.2).
///
/// Safe to call more than once per process; only the first call has any
/// effect.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
