//! Shape-based and logical constraints: `sh:node`, `sh:not`, `sh:and`, `sh:or`,
//! `sh:xone` and `sh:qualifiedValueShape`.
//!
//! All of them validate a value node against other shapes through
//! [`Validator::evaluate_shape`], which skips re-entered (focus, shape) pairs and
//! enforces the recursion limit.
use super::{Finding, Outcome};
use crate::model::components::Constraint;
use crate::types::ID;
use crate::validate::{Trail, Validator};
use crate::violation::{EvaluationContext, Violation, ViolationKind};
use oxigraph::model::{Literal, Term};

/// Result of checking one value node against one nested shape.
enum Conformance {
    Conforms,
    Fails(Vec<Violation>),
    /// The nested evaluation itself broke down; the processing violations are passed on.
    Error(Vec<Violation>),
}

fn check_conformance(value: &Term, shape: ID, validator: &Validator<'_>, trail: Trail<'_>) -> Conformance {
    let nested = validator.evaluate_shape(value, shape, trail);
    if nested.is_empty() {
        return Conformance::Conforms;
    }
    let errors: Vec<Violation> = nested
        .iter()
        .filter(|v| matches!(v.kind, ViolationKind::Processing { .. }))
        .cloned()
        .collect();
    if errors.is_empty() {
        Conformance::Fails(nested)
    } else {
        Conformance::Error(errors)
    }
}

fn shape_term(shape: ID, validator: &Validator<'_>) -> Term {
    validator
        .shapes()
        .get(shape)
        .map(|s| s.identifier().clone())
        .unwrap_or_else(|| Literal::new_simple_literal(shape.to_string()).into())
}

pub(crate) fn node(shape: ID, value: &Term, validator: &Validator<'_>, trail: Trail<'_>) -> Outcome {
    match check_conformance(value, shape, validator, trail) {
        Conformance::Conforms => Outcome::Findings(Vec::new()),
        Conformance::Fails(nested) => Outcome::Findings(vec![(
            Some(value.clone()),
            ViolationKind::Node {
                shape: shape_term(shape, validator),
                nested,
            },
        )]),
        Conformance::Error(errors) => Outcome::Nested(errors),
    }
}

pub(crate) fn not(shape: ID, value: &Term, validator: &Validator<'_>, trail: Trail<'_>) -> Outcome {
    match check_conformance(value, shape, validator, trail) {
        Conformance::Conforms => Outcome::Findings(vec![(
            Some(value.clone()),
            ViolationKind::Not {
                shape: shape_term(shape, validator),
            },
        )]),
        Conformance::Fails(_) => Outcome::Findings(Vec::new()),
        Conformance::Error(errors) => Outcome::Nested(errors),
    }
}

/// Concatenation of the violations of every conjunct.
pub(crate) fn and(shapes: &[ID], value: &Term, validator: &Validator<'_>, trail: Trail<'_>) -> Vec<Violation> {
    shapes
        .iter()
        .flat_map(|shape| match check_conformance(value, *shape, validator, trail) {
            Conformance::Conforms => Vec::new(),
            Conformance::Fails(v) | Conformance::Error(v) => v,
        })
        .collect()
}

pub(crate) fn or(shapes: &[ID], value: &Term, validator: &Validator<'_>, trail: Trail<'_>) -> Outcome {
    let mut failures = Vec::new();
    for shape in shapes {
        match check_conformance(value, *shape, validator, trail) {
            Conformance::Conforms => return Outcome::Nested(Vec::new()),
            Conformance::Fails(v) | Conformance::Error(v) => failures.extend(v),
        }
    }
    Outcome::Nested(failures)
}

/// Exactly one alternative must conform. Otherwise the failing alternatives'
/// violations are returned; if every alternative conformed there are none, so a
/// single `Xone` violation carrying the count is reported instead.
pub(crate) fn xone(shapes: &[ID], value: &Term, validator: &Validator<'_>, trail: Trail<'_>) -> Outcome {
    let mut conforming = 0;
    let mut failures = Vec::new();
    for shape in shapes {
        match check_conformance(value, *shape, validator, trail) {
            Conformance::Conforms => conforming += 1,
            Conformance::Fails(v) | Conformance::Error(v) => failures.extend(v),
        }
    }
    if conforming == 1 {
        Outcome::Nested(Vec::new())
    } else if failures.is_empty() {
        Outcome::Findings(vec![(Some(value.clone()), ViolationKind::Xone { conforming })])
    } else {
        Outcome::Nested(failures)
    }
}

/// `sh:qualifiedValueShape` with its count bounds.
pub(crate) struct Qualified {
    pub shape: ID,
    pub min_count: Option<u64>,
    pub max_count: Option<u64>,
    pub disjoint: bool,
}

impl Qualified {
    /// Qualified value shapes of the sibling property shapes, used when
    /// `sh:qualifiedValueShapesDisjoint` is set.
    fn sibling_shapes(&self, ctx: &EvaluationContext, validator: &Validator<'_>) -> Vec<ID> {
        let shapes = validator.shapes();
        let Some(parent) = shapes.node_shape(ID::from(&ctx.shape)) else {
            return Vec::new();
        };
        let current = ID::from(&ctx.source_shape);
        parent
            .properties
            .iter()
            .filter(|id| **id != current)
            .filter_map(|id| shapes.property_shape(*id))
            .flat_map(|p| p.attributes.constraints.iter())
            .filter_map(|c| match c {
                Constraint::QualifiedValueShape { shape, .. } if *shape != self.shape => Some(*shape),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn check(
        &self,
        value: Option<&Term>,
        ctx: &EvaluationContext,
        validator: &Validator<'_>,
        trail: Trail<'_>,
    ) -> Vec<Finding> {
        let siblings = if self.disjoint {
            self.sibling_shapes(ctx, validator)
        } else {
            Vec::new()
        };
        let conforms = |v: &Term, shape: ID| {
            matches!(check_conformance(v, shape, validator, trail), Conformance::Conforms)
        };
        let actual = ctx
            .value_nodes(value)
            .iter()
            .filter(|v| conforms(v, self.shape) && !siblings.iter().any(|s| conforms(v, *s)))
            .count();

        let shape = shape_term(self.shape, validator);
        let mut findings = Vec::new();
        if let Some(expected) = self.min_count {
            if (actual as u64) < expected {
                findings.push((
                    None,
                    ViolationKind::QualifiedMinCount {
                        shape: shape.clone(),
                        expected,
                        actual,
                    },
                ));
            }
        }
        if let Some(expected) = self.max_count {
            if (actual as u64) > expected {
                findings.push((
                    None,
                    ViolationKind::QualifiedMaxCount {
                        shape,
                        expected,
                        actual,
                    },
                ));
            }
        }
        findings
    }
}
