//! Constraint evaluators.
//!
//! Every [`Constraint`] variant is evaluated by a small function in one of the
//! submodules, grouped the way the SHACL recommendation groups its core constraint
//! components. [`Constraint::apply`] dispatches to them and stamps the resulting
//! findings with the evaluation context, severity and message of the source shape.
use crate::model::components::Constraint;
use crate::shape::ShapesModel;
use crate::types::{ComponentID, NodeKind};
use crate::validate::{Trail, Validator};
use crate::violation::{EvaluationContext, Violation, ViolationKind};
use oxigraph::model::{Literal, Term};

pub(crate) mod cardinality;
pub(crate) mod js;
pub(crate) mod other;
pub(crate) mod property_pair;
pub(crate) mod shape_based;
pub(crate) mod sparql;
pub(crate) mod string_based;
pub(crate) mod value_range;
pub(crate) mod value_type;

pub use js::{ScriptFunction, ScriptLoader, ScriptRegistry};

/// A failed check before it is attached to its context: the offending value node
/// (if any) and what went wrong.
pub(crate) type Finding = (Option<Term>, ViolationKind);

/// What an evaluator produced.
pub(crate) enum Outcome {
    /// Failures of this constraint.
    Findings(Vec<Finding>),
    /// Violations passed through unchanged from nested shapes.
    Nested(Vec<Violation>),
}

impl From<Vec<Finding>> for Outcome {
    fn from(findings: Vec<Finding>) -> Self {
        Outcome::Findings(findings)
    }
}

impl From<Option<Finding>> for Outcome {
    fn from(finding: Option<Finding>) -> Self {
        Outcome::Findings(finding.into_iter().collect())
    }
}

/// Node-kind precheck for constraints that only make sense on literals.
pub(crate) fn require_literal(value: &Term) -> Result<&Literal, Finding> {
    match value {
        Term::Literal(lit) => Ok(lit),
        other => Err((
            Some(other.clone()),
            ViolationKind::NodeKind {
                expected: NodeKind::Literal,
                actual: NodeKind::of(other.as_ref()),
            },
        )),
    }
}

impl Constraint {
    /// Evaluates the constraint for one value node, or once for the whole value set
    /// when `value` is `None`.
    ///
    /// `trail` holds the (focus, shape) pairs of the enclosing nested evaluations.
    pub fn apply(
        &self,
        value: Option<&Term>,
        ctx: &EvaluationContext,
        validator: &Validator<'_>,
        trail: Trail<'_>,
    ) -> Vec<Violation> {
        let outcome: Outcome = match (self, value) {
            (Constraint::MinCount { min_count }, _) => {
                cardinality::min_count(*min_count, ctx, validator).into()
            }
            (Constraint::MaxCount { max_count }, _) => {
                cardinality::max_count(*max_count, ctx, validator).into()
            }
            (Constraint::UniqueLang, _) => string_based::unique_lang(value, ctx).into(),
            (Constraint::HasValue { value: expected }, _) => {
                other::has_value(expected, value, ctx).into()
            }
            (Constraint::Equals { property }, _) => {
                property_pair::equals(property, value, ctx, validator).into()
            }
            (
                Constraint::QualifiedValueShape {
                    shape,
                    min_count,
                    max_count,
                    disjoint,
                },
                _,
            ) => {
                let qualified = shape_based::Qualified {
                    shape: *shape,
                    min_count: *min_count,
                    max_count: *max_count,
                    disjoint: *disjoint,
                };
                qualified.check(value, ctx, validator, trail).into()
            }
            (Constraint::Sparql(spec), _) => sparql::evaluate(spec, ctx, validator),
            // per-value constraints below
            (_, None) => return Vec::new(),
            (Constraint::Class { class }, Some(v)) => {
                value_type::class(class, v, validator).into()
            }
            (Constraint::Datatype { datatype }, Some(v)) => value_type::datatype(datatype, v).into(),
            (Constraint::NodeKind { kind }, Some(v)) => value_type::node_kind(*kind, v).into(),
            (Constraint::MinExclusive { bound }, Some(v)) => {
                value_range::check(value_range::Bound::MinExclusive, bound, v).into()
            }
            (Constraint::MinInclusive { bound }, Some(v)) => {
                value_range::check(value_range::Bound::MinInclusive, bound, v).into()
            }
            (Constraint::MaxExclusive { bound }, Some(v)) => {
                value_range::check(value_range::Bound::MaxExclusive, bound, v).into()
            }
            (Constraint::MaxInclusive { bound }, Some(v)) => {
                value_range::check(value_range::Bound::MaxInclusive, bound, v).into()
            }
            (Constraint::MinLength { length }, Some(v)) => {
                string_based::min_length(*length, v).into()
            }
            (Constraint::MaxLength { length }, Some(v)) => {
                string_based::max_length(*length, v).into()
            }
            (Constraint::Pattern(pattern), Some(v)) => string_based::pattern(pattern, v).into(),
            (Constraint::LanguageIn { languages }, Some(v)) => {
                string_based::language_in(languages, v).into()
            }
            (Constraint::Disjoint { property }, Some(v)) => {
                property_pair::disjoint(property, v, ctx, validator).into()
            }
            (Constraint::LessThan { property }, Some(v)) => {
                property_pair::less_than(property, v, false, ctx, validator).into()
            }
            (Constraint::LessThanOrEquals { property }, Some(v)) => {
                property_pair::less_than(property, v, true, ctx, validator).into()
            }
            (Constraint::Not { shape }, Some(v)) => {
                shape_based::not(*shape, v, validator, trail).into()
            }
            (Constraint::Node { shape }, Some(v)) => {
                shape_based::node(*shape, v, validator, trail).into()
            }
            (Constraint::And { shapes }, Some(v)) => {
                Outcome::Nested(shape_based::and(shapes, v, validator, trail))
            }
            (Constraint::Or { shapes }, Some(v)) => shape_based::or(shapes, v, validator, trail),
            (Constraint::Xone { shapes }, Some(v)) => {
                shape_based::xone(shapes, v, validator, trail)
            }
            (Constraint::In { values }, Some(v)) => other::in_values(values, v).into(),
            (Constraint::Closed { ignored_properties }, Some(v)) => {
                other::closed(ignored_properties, v, ctx, validator).into()
            }
            (Constraint::Js(spec), Some(v)) => return js::evaluate(spec, v, ctx, validator),
        };

        match outcome {
            Outcome::Nested(violations) => violations,
            Outcome::Findings(findings) => {
                let source = validator.shapes().get_by_term(&ctx.source_shape);
                let severity = source.map(|s| s.attributes().severity).unwrap_or_default();
                let message = source.and_then(|s| s.attributes().message.clone());
                findings
                    .into_iter()
                    .map(|(value, kind)| Violation {
                        context: ctx.clone(),
                        value,
                        kind,
                        severity,
                        message: message.clone(),
                    })
                    .collect()
            }
        }
    }
}

/// Rendering of a constraint as a node in the shapes graph diagram.
pub trait GraphvizOutput {
    fn to_graphviz_string(&self, component_id: ComponentID, shapes: &ShapesModel) -> String;
}

pub(crate) fn label_term(term: &Term) -> String {
    let text = match term {
        Term::NamedNode(nn) => {
            let iri = nn.as_str();
            iri.rsplit(['#', '/']).next().unwrap_or(iri).to_string()
        }
        Term::Literal(lit) => lit.value().to_string(),
        other => other.to_string(),
    };
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn label_shape(shape: crate::types::ID, shapes: &ShapesModel) -> String {
    shapes
        .get(shape)
        .map(|s| label_term(s.identifier()))
        .unwrap_or_else(|| format!("missing shape {}", shape))
}

impl GraphvizOutput for Constraint {
    fn to_graphviz_string(&self, component_id: ComponentID, shapes: &ShapesModel) -> String {
        let id = component_id.to_graphviz_id();
        let detail = match self {
            Constraint::Class { class } => label_term(class),
            Constraint::Datatype { datatype } => label_term(&datatype.clone().into()),
            Constraint::NodeKind { kind } => kind.to_string(),
            Constraint::MinCount { min_count } => min_count.to_string(),
            Constraint::MaxCount { max_count } => max_count.to_string(),
            Constraint::MinExclusive { bound }
            | Constraint::MinInclusive { bound }
            | Constraint::MaxExclusive { bound }
            | Constraint::MaxInclusive { bound } => label_term(&bound.clone().into()),
            Constraint::MinLength { length } | Constraint::MaxLength { length } => {
                length.to_string()
            }
            Constraint::Pattern(p) => label_term(&Literal::new_simple_literal(&p.pattern).into()),
            Constraint::LanguageIn { languages } => languages.join(", "),
            Constraint::UniqueLang => "true".to_string(),
            Constraint::Equals { property }
            | Constraint::Disjoint { property }
            | Constraint::LessThan { property }
            | Constraint::LessThanOrEquals { property } => label_term(&property.clone().into()),
            Constraint::In { values } => values.iter().map(label_term).collect::<Vec<_>>().join(", "),
            Constraint::Closed { ignored_properties } => format!(
                "ignoring {}",
                ignored_properties
                    .iter()
                    .map(|p| label_term(&p.clone().into()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Constraint::HasValue { value } => label_term(value),
            Constraint::Sparql(spec) => label_term(&spec.node),
            Constraint::Js(spec) => spec.function.clone(),
            Constraint::Not { .. }
            | Constraint::And { .. }
            | Constraint::Or { .. }
            | Constraint::Xone { .. }
            | Constraint::Node { .. }
            | Constraint::QualifiedValueShape { .. } => String::new(),
        };
        let mut out = if detail.is_empty() {
            format!("{} [label=\"{}\"];", id, self.name())
        } else {
            format!("{} [label=\"{}: {}\"];", id, self.name(), detail)
        };
        for shape in self.referenced_shapes() {
            out.push_str(&format!(
                "\n    {} -> {} [style=dashed, label=\"{}\"];",
                id,
                crate::graphviz::shape_graphviz_id(shape, shapes),
                label_shape(shape, shapes)
            ));
        }
        out
    }
}
