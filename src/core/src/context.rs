//! The per-run [`Context`]: an insertion-ordered mapping of variable name to
//! [`Scalar`] value (spec §3).

use crate::Scalar;
use indexmap::IndexMap;
use std::iter::FromIterator;

/// The per-run variable context.
///
/// Seeded with the recipe matcher's extracted parameters and the upstream
/// system's own metadata, and subsequently extended only by successful
/// `QUERY` step output (spec §4.E). Lookup is by exact name; a missing key
/// resolves to absence, not an error — it is up to callers (the expression
/// evaluator, the template renderer) to decide how to treat that.
///
/// Insertion order is preserved so that a rendered `context_snapshot`
/// (attached to every [`crate::RunOutcome::Completed`]) reads the way a human
/// who wrote the recipe would expect: seed parameters first, then each
/// `QUERY` step's output in execution order.
#[derive(Clone, Debug, Default)]
pub struct Context {
    values: IndexMap<String, Scalar>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    /// Returns `true` if `name` is present in the context (even if its value
    /// is [`Scalar::Null`]).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Inserts or overwrites a variable. Per spec §3, "duplicate writes
    /// overwrite" — a second `set` for the same name replaces the value
    /// in place, without moving its position in iteration order.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.values.insert(name.into(), value.into());
    }

    /// Extends this context with another, with `other`'s entries winning on
    /// key collision. Used to seed a run: matcher-extracted parameters are
    /// layered on top of upstream-supplied parameters (spec §4.E, "matcher
    /// output wins on key collision").
    pub fn merge_overriding(&mut self, other: &Context) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of variables currently bound.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if no variables are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S, V> FromIterator<(S, V)> for Context
where
    S: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.set(k, v);
        }
        ctx
    }
}
