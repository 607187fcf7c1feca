//! The three external capabilities the core consumes (spec §6): a read-only
//! SQL probe, an LLM client, and a clock. All three are parameters to a run,
//! never process-global singletons (spec §9, "dependency inversion") — this
//! is what keeps the engine testable with in-memory fakes.

use crate::QueryResult;
use async_trait::async_trait;
use std::{error, fmt, time::Duration};

/// A read-only database probe.
///
/// Implementations MUST enforce read-only (`SELECT`-only) at their boundary
/// (spec §6.1); the core hands over a fully-rendered SQL string and expects
/// the probe not to re-interpret any placeholders within it.
#[async_trait]
pub trait SqlProbe: fmt::Debug + Send + Sync {
    /// Runs `sql` and returns its result, or fails if the deadline elapses,
    /// the statement is rejected as non-read-only, or the backend errors.
    async fn probe(&self, sql: &str, deadline: Duration) -> Result<QueryResult, ProbeError>;
}

/// Ways a [`SqlProbe`] call can fail.
#[derive(Debug)]
pub enum ProbeError {
    /// The deadline elapsed before the backend responded.
    Timeout,
    /// The statement was rejected because it was not a single read-only
    /// `SELECT`.
    NotReadOnly(String),
    /// The backend itself returned an error.
    Backend(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Timeout => write!(f, "probe deadline elapsed"),
            ProbeError::NotReadOnly(reason) => write!(f, "statement rejected: {}", reason),
            ProbeError::Backend(reason) => write!(f, "probe backend error: {}", reason),
        }
    }
}

impl error::Error for ProbeError {}

/// An LLM completion client, used by the recipe matcher (spec §4.D).
#[async_trait]
pub trait LlmClient: fmt::Debug + Send + Sync {
    /// Sends `prompt` and returns the model's raw text reply, or fails if
    /// the deadline elapses or the transport errors.
    async fn complete(&self, prompt: &str, deadline: Duration) -> Result<String, LlmError>;
}

/// Ways an [`LlmClient`] call can fail.
#[derive(Debug)]
pub enum LlmError {
    /// The deadline elapsed before the model responded.
    Timeout,
    /// The transport itself errored (connection refused, non-2xx, etc.).
    Transport(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Timeout => write!(f, "LLM call deadline elapsed"),
            LlmError::Transport(reason) => write!(f, "LLM transport error: {}", reason),
        }
    }
}

impl error::Error for LlmError {}

/// A source of the current instant, used only to timestamp trace entries
/// (spec §6).
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> chrono::DateTime<chrono::Utc>;
}

/// A [`Clock`] backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}
