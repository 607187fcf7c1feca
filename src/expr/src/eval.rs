//! Evaluates a parsed [`Predicate`](crate::ast::Predicate) against a
//! [`Context`], following the typing rules in spec §4.A.

use crate::ast::{Atom, CmpOp, Predicate};
use crate::EvalError;
use std::cmp::Ordering;
use workorder_core::{Context, Scalar};

/// An atom resolved against the context, ready for comparison.
enum Resolved {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

fn resolve(atom: &Atom, context: &Context) -> Resolved {
    match atom {
        Atom::Var(name) => match context.get(name) {
            Some(Scalar::String(s)) => Resolved::Str(s.clone()),
            Some(Scalar::Int(i)) => Resolved::Int(*i),
            Some(Scalar::Float(f)) => Resolved::Float(*f),
            Some(Scalar::Bool(b)) => Resolved::Bool(*b),
            Some(Scalar::Null) | None => Resolved::Null,
        },
        Atom::Str(s) => Resolved::Str(s.clone()),
        Atom::Int(i) => Resolved::Int(*i),
        Atom::Float(f) => Resolved::Float(*f),
        Atom::Bool(b) => Resolved::Bool(*b),
        Atom::Null => Resolved::Null,
    }
}

/// `true` if `value` is one of the numeric variants.
fn as_f64(value: &Resolved) -> Option<f64> {
    match value {
        Resolved::Int(i) => Some(*i as f64),
        Resolved::Float(f) => Some(*f),
        _ => None,
    }
}

fn equal(left: &Resolved, right: &Resolved) -> bool {
    match (left, right) {
        (Resolved::Null, Resolved::Null) => true,
        (Resolved::Null, _) | (_, Resolved::Null) => false,
        (Resolved::Str(a), Resolved::Str(b)) => a == b,
        (Resolved::Bool(a), Resolved::Bool(b)) => a == b,
        // Exact integer comparison: routing this through `as_f64` would
        // silently collapse distinct `i64` values above 2^53.
        (Resolved::Int(a), Resolved::Int(b)) => a == b,
        _ => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
    }
}

fn order(left: &Resolved, right: &Resolved) -> Result<Option<Ordering>, EvalError> {
    if matches!(left, Resolved::Null) || matches!(right, Resolved::Null) {
        // "All other comparisons against null are false" — not an error.
        return Ok(None);
    }

    // Exact integer ordering before the shared float path: `f64::EPSILON`
    // is only a meaningful tolerance near 1.0, and casting an `i64` to
    // `f64` loses precision above 2^53.
    if let (Resolved::Int(a), Resolved::Int(b)) = (left, right) {
        return Ok(Some(a.cmp(b)));
    }

    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return Ok(a.partial_cmp(&b));
    }

    if let (Resolved::Str(a), Resolved::Str(b)) = (left, right) {
        return Ok(Some(a.cmp(b)));
    }

    Err(EvalError::CrossTypeOrdering)
}

fn compare(op: CmpOp, left: &Atom, right: &Atom, context: &Context) -> Result<bool, EvalError> {
    let left = resolve(left, context);
    let right = resolve(right, context);

    match op {
        CmpOp::Eq => Ok(equal(&left, &right)),
        CmpOp::Ne => Ok(!equal(&left, &right)),
        CmpOp::Lt => Ok(order(&left, &right)? == Some(Ordering::Less)),
        CmpOp::Le => Ok(matches!(order(&left, &right)?, Some(Ordering::Less) | Some(Ordering::Equal))),
        CmpOp::Gt => Ok(order(&left, &right)? == Some(Ordering::Greater)),
        CmpOp::Ge => Ok(matches!(order(&left, &right)?, Some(Ordering::Greater) | Some(Ordering::Equal))),
    }
}

pub(crate) fn evaluate(predicate: &Predicate, context: &Context) -> Result<bool, EvalError> {
    match predicate {
        Predicate::Compare { left, op, right } => compare(*op, left, right, context),
        Predicate::In { needle, haystack, negated } => {
            if haystack.is_empty() {
                return Ok(false);
            }
            let needle = resolve(needle, context);
            let found = haystack.iter().any(|atom| equal(&needle, &resolve(atom, context)));
            Ok(found != *negated)
        }
        Predicate::And(left, right) => Ok(evaluate(left, context)? && evaluate(right, context)?),
        Predicate::Or(left, right) => Ok(evaluate(left, context)? || evaluate(right, context)?),
        Predicate::Not(inner) => Ok(!evaluate(inner, context)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::lex, parser::parse};

    fn eval_str(input: &str, context: &Context) -> Result<bool, EvalError> {
        evaluate(&parse(&lex(input).unwrap()).unwrap(), context)
    }

    #[test]
    fn test_null_equals_null() {
        let context = Context::new();
        assert!(eval_str("null == null", &context).unwrap());
    }

    #[test]
    fn test_null_not_equal_value() {
        let context = Context::new();
        assert!(!eval_str("null == 1", &context).unwrap());
        assert!(eval_str("null != 1", &context).unwrap());
    }

    #[test]
    fn test_missing_variable_resolves_to_null() {
        let context = Context::new();
        assert!(eval_str("{missing} == null", &context).unwrap());
    }

    #[test]
    fn test_null_ordering_is_false_not_error() {
        let context = Context::new();
        assert!(!eval_str("null < 1", &context).unwrap());
        assert!(!eval_str("1 > null", &context).unwrap());
    }

    #[test]
    fn test_string_lexicographic_ordering() {
        let context = Context::new();
        assert!(eval_str("'a' < 'b'", &context).unwrap());
        assert!(!eval_str("'b' < 'a'", &context).unwrap());
    }

    #[test]
    fn test_int_float_numeric_comparison() {
        let context = Context::new();
        assert!(eval_str("1 < 1.5", &context).unwrap());
    }

    #[test]
    fn test_large_distinct_ints_are_not_conflated_by_float_rounding() {
        // 2^53 and 2^53 + 1 round to the same f64; exact i64 comparison
        // must still tell them apart.
        let context = Context::new();
        assert!(eval_str("9007199254740993 != 9007199254740992", &context).unwrap());
        assert!(eval_str("9007199254740992 < 9007199254740993", &context).unwrap());
        assert!(!eval_str("9007199254740993 == 9007199254740992", &context).unwrap());
    }

    #[test]
    fn test_cross_type_ordering_is_error() {
        let context = Context::new();
        assert!(matches!(eval_str("'a' < 1", &context), Err(EvalError::CrossTypeOrdering)));
    }

    #[test]
    fn test_cross_type_equality_is_false_not_error() {
        let context = Context::new();
        assert!(!eval_str("'1' == 1", &context).unwrap());
    }

    #[test]
    fn test_in_list_membership() {
        let context = Context::new();
        assert!(eval_str("1 in [1, 2, 3]", &context).unwrap());
        assert!(!eval_str("4 in [1, 2, 3]", &context).unwrap());
        assert!(eval_str("4 not in [1, 2, 3]", &context).unwrap());
    }

    #[test]
    fn test_empty_list_membership_is_always_false() {
        let context = Context::new();
        assert!(!eval_str("1 in []", &context).unwrap());
        assert!(!eval_str("1 not in []", &context).unwrap());
    }

    #[test]
    fn test_and_or_not_combinators() {
        let context = Context::new();
        assert!(eval_str("not (1 == 2) and (2 == 2 or 3 == 4)", &context).unwrap());
    }
}
