use super::Finding;
use crate::comparison::{compare_terms, DatatypeMismatch};
use crate::validate::Validator;
use crate::violation::{EvaluationContext, ViolationKind};
use oxigraph::model::{NamedNode, Term};
use std::cmp::Ordering;

/// `sh:equals`: the value nodes and the objects of `property` on the focus node must
/// be the same set. Each value missing from either side is reported.
pub(crate) fn equals(
    property: &NamedNode,
    value: Option<&Term>,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Vec<Finding> {
    let ours = ctx.value_nodes(value);
    let theirs = validator.data().objects(&ctx.focus, property.as_ref());
    let missing_there = ours.iter().filter(|v| !theirs.contains(v));
    let missing_here = theirs.iter().filter(|v| !ours.contains(v));
    missing_there
        .chain(missing_here)
        .map(|v| {
            (
                Some(v.clone()),
                ViolationKind::Equals {
                    property: property.clone(),
                },
            )
        })
        .collect()
}

pub(crate) fn disjoint(
    property: &NamedNode,
    value: &Term,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Option<Finding> {
    validator
        .data()
        .objects(&ctx.focus, property.as_ref())
        .contains(value)
        .then(|| {
            (
                Some(value.clone()),
                ViolationKind::Disjoint {
                    property: property.clone(),
                },
            )
        })
}

/// `sh:lessThan` / `sh:lessThanOrEquals` against every object of `property`.
pub(crate) fn less_than(
    property: &NamedNode,
    value: &Term,
    or_equal: bool,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Vec<Finding> {
    let failed = |other: &Term| {
        let property = property.clone();
        let other = other.clone();
        if or_equal {
            ViolationKind::LessThanOrEquals { property, other }
        } else {
            ViolationKind::LessThan { property, other }
        }
    };
    let mut findings = Vec::new();
    for other in validator.data().objects(&ctx.focus, property.as_ref()) {
        match compare_terms(value, &other) {
            Ok(Some(Ordering::Less)) => {}
            Ok(Some(Ordering::Equal)) if or_equal => {}
            Err(DatatypeMismatch {
                left: Some(actual),
                right: Some(expected),
            }) => findings.push((
                Some(value.clone()),
                ViolationKind::Datatype {
                    expected,
                    actual: Some(actual),
                    ill_formed: false,
                },
            )),
            // unordered values and IRIs or blank nodes on either side
            _ => findings.push((Some(value.clone()), failed(&other))),
        }
    }
    findings
}
