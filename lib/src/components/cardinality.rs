use super::Finding;
use crate::path::distinct_values;
use crate::validate::Validator;
use crate::violation::{EvaluationContext, ViolationKind};

/// Number of value nodes for the property in play. A single-predicate path is counted
/// straight from the data graph; anything else counts what the path reached.
fn value_count(ctx: &EvaluationContext, validator: &Validator<'_>) -> usize {
    match ctx.property() {
        Some(predicate) => validator
            .data()
            .objects(&ctx.focus, predicate.as_ref())
            .len(),
        None => distinct_values(&ctx.reached).len(),
    }
}

pub(crate) fn min_count(
    min_count: u64,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Option<Finding> {
    let actual = value_count(ctx, validator);
    if (actual as u64) < min_count {
        return Some((
            None,
            ViolationKind::MinCount {
                expected: min_count,
                actual,
            },
        ));
    }
    None
}

pub(crate) fn max_count(
    max_count: u64,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Option<Finding> {
    let actual = value_count(ctx, validator);
    if (actual as u64) > max_count {
        return Some((
            None,
            ViolationKind::MaxCount {
                expected: max_count,
                actual,
            },
        ));
    }
    None
}
