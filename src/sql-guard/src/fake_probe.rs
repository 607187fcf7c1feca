//! An in-memory [`SqlProbe`] for tests, grounded on no particular teacher
//! file (the teacher talks to a real Postgres instance in its tests) but
//! following the same "exact statement, canned result" shape the teacher's
//! `prepare_pg_data` fixtures build by hand per test.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use workorder_core::{ProbeError, QueryResult, SqlProbe};

/// A [`SqlProbe`] backed by a fixed table of `sql -> QueryResult` fixtures.
///
/// Statements not present in the table fail with
/// [`ProbeError::Backend`]. Every call still runs [`crate::validate`], so a
/// fixture for a non-`SELECT` statement is unreachable in practice, same as
/// a real probe.
#[derive(Debug, Default)]
pub struct FakeProbe {
    fixtures: HashMap<String, QueryResult>,
}

impl FakeProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `result` as the response to an exact-match `sql` call.
    #[must_use]
    pub fn with_fixture(mut self, sql: impl Into<String>, result: QueryResult) -> Self {
        self.fixtures.insert(sql.into(), result);
        self
    }
}

#[async_trait]
impl SqlProbe for FakeProbe {
    async fn probe(&self, sql: &str, _deadline: Duration) -> Result<QueryResult, ProbeError> {
        crate::validate(sql).map_err(ProbeError::from)?;

        self.fixtures
            .get(sql)
            .cloned()
            .ok_or_else(|| ProbeError::Backend(format!("no fixture registered for: {}", sql)))
    }
}
