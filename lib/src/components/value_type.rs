use super::Finding;
use crate::comparison::is_valid_lexical;
use crate::types::NodeKind;
use crate::validate::Validator;
use crate::violation::ViolationKind;
use oxigraph::model::{NamedNode, Term};

/// `sh:class`: the value's types, closed over `rdfs:subClassOf`, must contain `class`.
pub(crate) fn class(class: &Term, value: &Term, validator: &Validator<'_>) -> Option<Finding> {
    if let Term::Literal(_) = value {
        return Some((
            Some(value.clone()),
            ViolationKind::NodeKind {
                expected: NodeKind::BlankNodeOrIri,
                actual: NodeKind::Literal,
            },
        ));
    }
    if validator.type_closure(value).contains(class) {
        return None;
    }
    Some((
        Some(value.clone()),
        ViolationKind::Class {
            class: class.clone(),
            actual: validator.data().types_of(value),
        },
    ))
}

pub(crate) fn datatype(expected: &NamedNode, value: &Term) -> Option<Finding> {
    let Term::Literal(lit) = value else {
        return Some((
            Some(value.clone()),
            ViolationKind::Datatype {
                expected: expected.clone(),
                actual: None,
                ill_formed: false,
            },
        ));
    };
    if lit.datatype() != expected.as_ref() {
        return Some((
            Some(value.clone()),
            ViolationKind::Datatype {
                expected: expected.clone(),
                actual: Some(lit.datatype().into_owned()),
                ill_formed: false,
            },
        ));
    }
    if !is_valid_lexical(expected.as_ref(), lit.value()) {
        return Some((
            Some(value.clone()),
            ViolationKind::Datatype {
                expected: expected.clone(),
                actual: Some(lit.datatype().into_owned()),
                ill_formed: true,
            },
        ));
    }
    None
}

pub(crate) fn node_kind(kind: NodeKind, value: &Term) -> Option<Finding> {
    if kind.matches(value.as_ref()) {
        return None;
    }
    Some((
        Some(value.clone()),
        ViolationKind::NodeKind {
            expected: kind,
            actual: NodeKind::of(value.as_ref()),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::vocab::xsd;
    use oxigraph::model::{BlankNode, Literal};

    #[test]
    fn datatype_distinguishes_wrong_type_from_bad_lexical_form() {
        let int = xsd::INTEGER.into_owned();
        assert!(datatype(&int, &Literal::new_typed_literal("4", xsd::INTEGER).into()).is_none());

        let (_, kind) = datatype(&int, &Literal::new_simple_literal("4").into()).unwrap();
        assert_eq!(
            kind,
            ViolationKind::Datatype {
                expected: int.clone(),
                actual: Some(xsd::STRING.into_owned()),
                ill_formed: false,
            }
        );

        let bad = Literal::new_typed_literal("four", xsd::INTEGER);
        let (_, kind) = datatype(&int, &bad.into()).unwrap();
        assert!(matches!(kind, ViolationKind::Datatype { ill_formed: true, .. }));

        let (_, kind) = datatype(&int, &BlankNode::default().into()).unwrap();
        assert!(matches!(kind, ViolationKind::Datatype { actual: None, .. }));
    }

    #[test]
    fn node_kind_reports_the_actual_kind() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.org/a"));
        assert!(node_kind(NodeKind::BlankNodeOrIri, &iri).is_none());
        let (value, kind) = node_kind(NodeKind::Literal, &iri).unwrap();
        assert_eq!(value, Some(iri));
        assert_eq!(
            kind,
            ViolationKind::NodeKind {
                expected: NodeKind::Literal,
                actual: NodeKind::Iri
            }
        );
    }
}
