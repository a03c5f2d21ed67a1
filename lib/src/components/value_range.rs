use super::{require_literal, Finding};
use crate::comparison::compare_literals;
use crate::violation::ViolationKind;
use oxigraph::model::{Literal, Term};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    MinExclusive,
    MinInclusive,
    MaxExclusive,
    MaxInclusive,
}

impl Bound {
    /// Whether `value cmp bound` satisfies this bound.
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Bound::MinExclusive => ordering == Ordering::Greater,
            Bound::MinInclusive => ordering != Ordering::Less,
            Bound::MaxExclusive => ordering == Ordering::Less,
            Bound::MaxInclusive => ordering != Ordering::Greater,
        }
    }

    fn violation(self, bound: &Literal) -> ViolationKind {
        let bound = bound.clone();
        match self {
            Bound::MinExclusive => ViolationKind::MinExclusive { bound },
            Bound::MinInclusive => ViolationKind::MinInclusive { bound },
            Bound::MaxExclusive => ViolationKind::MaxExclusive { bound },
            Bound::MaxInclusive => ViolationKind::MaxInclusive { bound },
        }
    }
}

/// Range check through the literal comparator. Incomparable datatypes are reported
/// as a datatype violation; values with no order against the bound (NaN, ill-formed
/// lexical forms) fail the range itself.
pub(crate) fn check(kind: Bound, bound: &Literal, value: &Term) -> Option<Finding> {
    let lit = match require_literal(value) {
        Ok(lit) => lit,
        Err(finding) => return Some(finding),
    };
    match compare_literals(lit, bound) {
        Ok(Some(ordering)) if kind.accepts(ordering) => None,
        Ok(_) => Some((Some(value.clone()), kind.violation(bound))),
        Err(mismatch) => Some((
            Some(value.clone()),
            ViolationKind::Datatype {
                expected: bound.datatype().into_owned(),
                actual: mismatch.left,
                ill_formed: false,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;
    use oxigraph::model::vocab::xsd;
    use oxigraph::model::NamedNode;

    fn int(v: &str) -> Literal {
        Literal::new_typed_literal(v, xsd::INTEGER)
    }

    #[test]
    fn inclusive_and_exclusive_bounds() {
        let five = int("5");
        assert!(check(Bound::MinInclusive, &five, &int("5").into()).is_none());
        assert!(check(Bound::MinExclusive, &five, &int("5").into()).is_some());
        assert!(check(Bound::MaxExclusive, &five, &int("4").into()).is_none());
        let (value, kind) = check(Bound::MaxInclusive, &five, &int("6").into()).unwrap();
        assert_eq!(value, Some(int("6").into()));
        assert_eq!(kind, ViolationKind::MaxInclusive { bound: five });
    }

    #[test]
    fn mismatched_datatypes_become_datatype_violations() {
        let (_, kind) = check(
            Bound::MinInclusive,
            &int("5"),
            &Literal::new_simple_literal("seven").into(),
        )
        .unwrap();
        assert_eq!(
            kind,
            ViolationKind::Datatype {
                expected: xsd::INTEGER.into_owned(),
                actual: Some(xsd::STRING.into_owned()),
                ill_formed: false,
            }
        );
    }

    #[test]
    fn non_literals_fail_the_node_kind_precheck() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.org/x"));
        let (_, kind) = check(Bound::MinInclusive, &int("5"), &iri).unwrap();
        assert_eq!(
            kind,
            ViolationKind::NodeKind {
                expected: NodeKind::Literal,
                actual: NodeKind::Iri
            }
        );
    }
}
