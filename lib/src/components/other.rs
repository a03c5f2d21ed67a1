use super::Finding;
use crate::graph::as_subject;
use crate::types::ID;
use crate::validate::Validator;
use crate::violation::{EvaluationContext, ViolationKind};
use oxigraph::model::{NamedNode, Term};

pub(crate) fn in_values(allowed: &[Term], value: &Term) -> Option<Finding> {
    (!allowed.contains(value)).then(|| {
        (
            Some(value.clone()),
            ViolationKind::In {
                allowed: allowed.to_vec(),
            },
        )
    })
}

pub(crate) fn has_value(
    expected: &Term,
    value: Option<&Term>,
    ctx: &EvaluationContext,
) -> Option<Finding> {
    (!ctx.value_nodes(value).contains(expected)).then(|| {
        (
            None,
            ViolationKind::HasValue {
                expected: expected.clone(),
            },
        )
    })
}

/// `sh:closed`: every predicate used on the value node must be the first hop of one
/// of the shape's property paths or be explicitly ignored. Reports one violation per
/// offending predicate, pointing at its first statement.
pub(crate) fn closed(
    ignored: &[NamedNode],
    value: &Term,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Vec<Finding> {
    let Some(subject) = as_subject(value) else {
        return Vec::new();
    };
    let shapes = validator.shapes();
    let mut allowed: Vec<NamedNode> = ignored.to_vec();
    if let Some(node_shape) = shapes.node_shape(ID::from(&ctx.source_shape)) {
        for property in node_shape
            .properties
            .iter()
            .filter_map(|id| shapes.property_shape(*id))
        {
            allowed.extend(property.path.first_properties());
        }
    }

    let mut reported: Vec<NamedNode> = Vec::new();
    let mut findings = Vec::new();
    for triple in validator.data().triples_matching(Some(subject), None, None) {
        if allowed.contains(&triple.predicate) || reported.contains(&triple.predicate) {
            continue;
        }
        reported.push(triple.predicate.clone());
        findings.push((
            Some(triple.object.clone()),
            ViolationKind::Closed {
                property: triple.predicate.clone(),
                statement: triple,
            },
        ));
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Literal;

    #[test]
    fn in_accepts_only_listed_terms() {
        let allowed: Vec<Term> = vec![
            Literal::new_simple_literal("red").into(),
            Literal::new_simple_literal("green").into(),
        ];
        assert!(in_values(&allowed, &Literal::new_simple_literal("red").into()).is_none());
        let (value, kind) = in_values(&allowed, &Literal::new_simple_literal("blue").into()).unwrap();
        assert_eq!(value, Some(Literal::new_simple_literal("blue").into()));
        assert_eq!(kind, ViolationKind::In { allowed });
    }

    #[test]
    fn has_value_on_a_node_shape_checks_the_focus() {
        let alice = Term::from(NamedNode::new_unchecked("http://example.org/alice"));
        let bob = Term::from(NamedNode::new_unchecked("http://example.org/bob"));
        let ctx = EvaluationContext::for_node(&alice, &alice);
        assert!(has_value(&alice, Some(&alice), &ctx).is_none());
        assert!(has_value(&bob, Some(&alice), &ctx).is_some());
    }
}
