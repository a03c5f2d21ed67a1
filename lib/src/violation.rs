//! Violations: structured, data-only records of failed constraint checks.
//!
//! A [`Violation`] carries the [`EvaluationContext`] it was produced in and a
//! [`ViolationKind`] holding the data specific to the constraint family. Rendering is
//! done by a [`ViolationVisitor`], one `visit_*` method per kind; [`MessageFormatter`]
//! is the plain-text implementation and `diagnostics::DiagnosticFormatter` builds the
//! caret-underlined form on top of it.
use crate::diagnostics::{Highlight, TermRole};
use crate::graph::Bindings;
use crate::named_nodes::SHACL;
use crate::path::{distinct_values, Path, PathValue};
use crate::shape::PropertyShape;
use crate::types::{NodeKind, Severity};
use oxigraph::model::{Literal, NamedNode, Term, Triple};
use std::fmt::Write as _;
use std::sync::Arc;

/// What a constraint evaluation knows about where it is running.
///
/// Created fresh for every shape evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    pub focus: Term,
    /// The node shape being evaluated for the focus node.
    pub shape: Term,
    /// The shape that declares the constraint: the property shape for property
    /// constraints, otherwise the same as `shape`.
    pub source_shape: Term,
    pub path: Option<Path>,
    /// Statements reached through `path` from the focus node.
    pub reached: Arc<[PathValue]>,
}

impl EvaluationContext {
    pub fn for_node(focus: &Term, shape: &Term) -> Self {
        EvaluationContext {
            focus: focus.clone(),
            shape: shape.clone(),
            source_shape: shape.clone(),
            path: None,
            reached: Arc::from(Vec::new()),
        }
    }

    pub fn for_property(
        focus: &Term,
        shape: &Term,
        property: &PropertyShape,
        reached: Vec<PathValue>,
    ) -> Self {
        EvaluationContext {
            focus: focus.clone(),
            shape: shape.clone(),
            source_shape: property.attributes.identifier.clone(),
            path: Some(property.path.clone()),
            reached: Arc::from(reached),
        }
    }

    /// The predicate in play when the path is a single predicate.
    pub fn property(&self) -> Option<&NamedNode> {
        self.path.as_ref().and_then(Path::as_predicate)
    }

    /// The value nodes a value-set constraint ranges over. On a node shape the
    /// value node is the focus node itself.
    pub fn value_nodes(&self, value: Option<&Term>) -> Vec<Term> {
        match (value, &self.path) {
            (Some(v), None) => vec![v.clone()],
            _ => distinct_values(&self.reached),
        }
    }

    fn path_label(&self) -> String {
        match &self.path {
            Some(path) => path.to_string(),
            None => "the focus node".to_string(),
        }
    }
}

/// The data specific to each family of failed constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Class { class: Term, actual: Vec<Term> },
    Datatype { expected: NamedNode, actual: Option<NamedNode>, ill_formed: bool },
    NodeKind { expected: NodeKind, actual: NodeKind },
    MinCount { expected: u64, actual: usize },
    MaxCount { expected: u64, actual: usize },
    MinExclusive { bound: Literal },
    MinInclusive { bound: Literal },
    MaxExclusive { bound: Literal },
    MaxInclusive { bound: Literal },
    MinLength { expected: u64, actual: usize },
    MaxLength { expected: u64, actual: usize },
    Pattern { value: String, pattern: String, flags: Option<String> },
    LanguageIn { allowed: Vec<String>, actual: Option<String> },
    UniqueLang { language: String },
    Equals { property: NamedNode },
    Disjoint { property: NamedNode },
    LessThan { property: NamedNode, other: Term },
    LessThanOrEquals { property: NamedNode, other: Term },
    Not { shape: Term },
    Node { shape: Term, nested: Vec<Violation> },
    Xone { conforming: usize },
    QualifiedMinCount { shape: Term, expected: u64, actual: usize },
    QualifiedMaxCount { shape: Term, expected: u64, actual: usize },
    In { allowed: Vec<Term> },
    Closed { property: NamedNode, statement: Triple },
    HasValue { expected: Term },
    Sparql { constraint: Term, bindings: Bindings, message: Option<String> },
    Js { function: String, message: Option<String> },
    /// A failure inside the engine or a host capability while evaluating one constraint.
    Processing { message: String, cause: Option<String> },
}

impl ViolationKind {
    /// The `sh:*ConstraintComponent` this kind reports, if any.
    pub fn component_iri(&self) -> Option<NamedNode> {
        let sh = SHACL::new();
        let iri = match self {
            ViolationKind::Class { .. } => sh.class_constraint_component,
            ViolationKind::Datatype { .. } => sh.datatype_constraint_component,
            ViolationKind::NodeKind { .. } => sh.node_kind_constraint_component,
            ViolationKind::MinCount { .. } => sh.min_count_constraint_component,
            ViolationKind::MaxCount { .. } => sh.max_count_constraint_component,
            ViolationKind::MinExclusive { .. } => sh.min_exclusive_constraint_component,
            ViolationKind::MinInclusive { .. } => sh.min_inclusive_constraint_component,
            ViolationKind::MaxExclusive { .. } => sh.max_exclusive_constraint_component,
            ViolationKind::MaxInclusive { .. } => sh.max_inclusive_constraint_component,
            ViolationKind::MinLength { .. } => sh.min_length_constraint_component,
            ViolationKind::MaxLength { .. } => sh.max_length_constraint_component,
            ViolationKind::Pattern { .. } => sh.pattern_constraint_component,
            ViolationKind::LanguageIn { .. } => sh.language_in_constraint_component,
            ViolationKind::UniqueLang { .. } => sh.unique_lang_constraint_component,
            ViolationKind::Equals { .. } => sh.equals_constraint_component,
            ViolationKind::Disjoint { .. } => sh.disjoint_constraint_component,
            ViolationKind::LessThan { .. } => sh.less_than_constraint_component,
            ViolationKind::LessThanOrEquals { .. } => sh.less_than_or_equals_constraint_component,
            ViolationKind::Not { .. } => sh.not_constraint_component,
            ViolationKind::Node { .. } => sh.node_constraint_component,
            ViolationKind::Xone { .. } => sh.xone_constraint_component,
            ViolationKind::QualifiedMinCount { .. } => sh.qualified_min_count_constraint_component,
            ViolationKind::QualifiedMaxCount { .. } => sh.qualified_max_count_constraint_component,
            ViolationKind::In { .. } => sh.in_constraint_component,
            ViolationKind::Closed { .. } => sh.closed_constraint_component,
            ViolationKind::HasValue { .. } => sh.has_value_constraint_component,
            ViolationKind::Sparql { .. } => sh.sparql_constraint_component,
            ViolationKind::Js { .. } => sh.js_constraint_component,
            ViolationKind::Processing { .. } => return None,
        };
        Some(iri.into_owned())
    }
}

/// One failed constraint check.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub context: EvaluationContext,
    /// The offending value node; `None` for checks over the whole value set.
    pub value: Option<Term>,
    pub kind: ViolationKind,
    pub severity: Severity,
    /// `sh:message` of the source shape, if any. Takes precedence over the generated text.
    pub message: Option<String>,
}

impl Violation {
    pub fn new(context: EvaluationContext, value: Option<Term>, kind: ViolationKind) -> Self {
        Violation {
            context,
            value,
            kind,
            severity: Severity::default(),
            message: None,
        }
    }

    pub fn processing(
        context: EvaluationContext,
        message: impl Into<String>,
        cause: Option<String>,
    ) -> Self {
        Violation::new(
            context,
            None,
            ViolationKind::Processing {
                message: message.into(),
                cause,
            },
        )
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Double dispatch into a visitor method for this violation's kind.
    pub fn accept<V: ViolationVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            ViolationKind::Class { class, actual } => visitor.visit_class(self, class, actual),
            ViolationKind::Datatype {
                expected,
                actual,
                ill_formed,
            } => visitor.visit_datatype(self, expected, actual.as_ref(), *ill_formed),
            ViolationKind::NodeKind { expected, actual } => {
                visitor.visit_node_kind(self, *expected, *actual)
            }
            ViolationKind::MinCount { expected, actual } => {
                visitor.visit_min_count(self, *expected, *actual)
            }
            ViolationKind::MaxCount { expected, actual } => {
                visitor.visit_max_count(self, *expected, *actual)
            }
            ViolationKind::MinExclusive { bound } => visitor.visit_min_exclusive(self, bound),
            ViolationKind::MinInclusive { bound } => visitor.visit_min_inclusive(self, bound),
            ViolationKind::MaxExclusive { bound } => visitor.visit_max_exclusive(self, bound),
            ViolationKind::MaxInclusive { bound } => visitor.visit_max_inclusive(self, bound),
            ViolationKind::MinLength { expected, actual } => {
                visitor.visit_min_length(self, *expected, *actual)
            }
            ViolationKind::MaxLength { expected, actual } => {
                visitor.visit_max_length(self, *expected, *actual)
            }
            ViolationKind::Pattern {
                value,
                pattern,
                flags,
            } => visitor.visit_pattern(self, value, pattern, flags.as_deref()),
            ViolationKind::LanguageIn { allowed, actual } => {
                visitor.visit_language_in(self, allowed, actual.as_deref())
            }
            ViolationKind::UniqueLang { language } => visitor.visit_unique_lang(self, language),
            ViolationKind::Equals { property } => visitor.visit_equals(self, property),
            ViolationKind::Disjoint { property } => visitor.visit_disjoint(self, property),
            ViolationKind::LessThan { property, other } => {
                visitor.visit_less_than(self, property, other)
            }
            ViolationKind::LessThanOrEquals { property, other } => {
                visitor.visit_less_than_or_equals(self, property, other)
            }
            ViolationKind::Not { shape } => visitor.visit_not(self, shape),
            ViolationKind::Node { shape, nested } => visitor.visit_node(self, shape, nested),
            ViolationKind::Xone { conforming } => visitor.visit_xone(self, *conforming),
            ViolationKind::QualifiedMinCount {
                shape,
                expected,
                actual,
            } => visitor.visit_qualified_min_count(self, shape, *expected, *actual),
            ViolationKind::QualifiedMaxCount {
                shape,
                expected,
                actual,
            } => visitor.visit_qualified_max_count(self, shape, *expected, *actual),
            ViolationKind::In { allowed } => visitor.visit_in(self, allowed),
            ViolationKind::Closed {
                property,
                statement,
            } => visitor.visit_closed(self, property, statement),
            ViolationKind::HasValue { expected } => visitor.visit_has_value(self, expected),
            ViolationKind::Sparql {
                constraint,
                bindings,
                message,
            } => visitor.visit_sparql(self, constraint, bindings, message.as_deref()),
            ViolationKind::Js { function, message } => {
                visitor.visit_js(self, function, message.as_deref())
            }
            ViolationKind::Processing { message, cause } => {
                visitor.visit_processing(self, message, cause.as_deref())
            }
        }
    }

    /// The human readable message: the shape's `sh:message` if set, else generated text.
    pub fn message(&self) -> String {
        match &self.message {
            Some(template) => substitute_placeholders(template, &self.placeholder_bindings()),
            None => self.accept(&mut MessageFormatter),
        }
    }

    fn placeholder_bindings(&self) -> Bindings {
        let mut bindings = vec![("this".to_string(), self.context.focus.clone())];
        if let Some(value) = &self.value {
            bindings.push(("value".to_string(), value.clone()));
        }
        if let ViolationKind::Sparql { bindings: row, .. } = &self.kind {
            bindings.extend(row.iter().cloned());
        }
        bindings
    }

    /// Textual suggestions for repairing the data.
    pub fn fixes(&self) -> Vec<String> {
        let path = self.context.path_label();
        match &self.kind {
            ViolationKind::Class { class, .. } => vec![format!(
                "declare {} as an instance of {} (or of one of its subclasses)",
                value_label(self.value.as_ref()),
                class
            )],
            ViolationKind::Datatype {
                expected,
                ill_formed: true,
                ..
            } => vec![format!("use a valid lexical form for {}", expected)],
            ViolationKind::Datatype { expected, .. } => {
                vec![format!("write the value as a {} literal", expected)]
            }
            ViolationKind::NodeKind { expected, .. } => vec![format!("use {} here", expected)],
            ViolationKind::MinCount { expected, actual } => vec![format!(
                "add {} more value(s) for {}",
                (*expected as usize).saturating_sub(*actual),
                path
            )],
            ViolationKind::MaxCount { expected, actual } => vec![format!(
                "remove {} value(s) of {}",
                actual.saturating_sub(*expected as usize),
                path
            )],
            ViolationKind::MinExclusive { bound } => {
                vec![format!("use a value greater than {}", bound)]
            }
            ViolationKind::MinInclusive { bound } => {
                vec![format!("use a value greater than or equal to {}", bound)]
            }
            ViolationKind::MaxExclusive { bound } => {
                vec![format!("use a value less than {}", bound)]
            }
            ViolationKind::MaxInclusive { bound } => {
                vec![format!("use a value less than or equal to {}", bound)]
            }
            ViolationKind::MinLength { expected, .. } => {
                vec![format!("use a value at least {} characters long", expected)]
            }
            ViolationKind::MaxLength { expected, .. } => {
                vec![format!("use a value at most {} characters long", expected)]
            }
            ViolationKind::Pattern { pattern, .. } => {
                vec![format!("change the value to match /{}/", pattern)]
            }
            ViolationKind::LanguageIn { allowed, .. } => {
                vec![format!("tag the literal with one of: {}", allowed.join(", "))]
            }
            ViolationKind::UniqueLang { language } => {
                vec![format!("keep a single value tagged @{}", language)]
            }
            ViolationKind::Equals { property } => {
                vec![format!("give {} and {} the same values", path, property)]
            }
            ViolationKind::Disjoint { property } => vec![format!(
                "remove {} from either {} or {}",
                value_label(self.value.as_ref()),
                path,
                property
            )],
            ViolationKind::LessThan { property, .. } => {
                vec![format!("make every value of {} smaller than {}", path, property)]
            }
            ViolationKind::LessThanOrEquals { property, .. } => vec![format!(
                "make every value of {} smaller than or equal to {}",
                path, property
            )],
            ViolationKind::Node { nested, .. } => {
                nested.iter().flat_map(Violation::fixes).collect()
            }
            ViolationKind::Xone { .. } => {
                vec!["make the value conform to exactly one of the alternatives".to_string()]
            }
            ViolationKind::QualifiedMinCount { shape, expected, .. } => vec![format!(
                "provide at least {} value(s) conforming to {}",
                expected, shape
            )],
            ViolationKind::QualifiedMaxCount { shape, expected, .. } => vec![format!(
                "provide at most {} value(s) conforming to {}",
                expected, shape
            )],
            ViolationKind::In { allowed } => vec![format!(
                "use one of: {}",
                allowed
                    .iter()
                    .map(Term::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )],
            ViolationKind::Closed { property, .. } => vec![format!(
                "remove {} or declare it with sh:property on {}",
                property, self.context.shape
            )],
            ViolationKind::HasValue { expected } => {
                vec![format!("add {} as a value of {}", expected, path)]
            }
            ViolationKind::Not { .. }
            | ViolationKind::Sparql { .. }
            | ViolationKind::Js { .. }
            | ViolationKind::Processing { .. } => Vec::new(),
        }
    }

    /// Where in the source this violation should point.
    pub fn highlight(&self) -> Highlight {
        if let ViolationKind::Closed { statement, .. } = &self.kind {
            return Highlight::Statement {
                triple: statement.clone(),
                role: TermRole::Predicate,
            };
        }
        let Some(value) = &self.value else {
            return Highlight::Term(self.context.focus.clone());
        };
        let edge = self
            .context
            .reached
            .iter()
            .filter(|pv| &pv.value == value)
            .find_map(|pv| pv.statement.clone());
        match edge {
            Some(triple) => {
                let role = if &triple.object == value {
                    TermRole::Object
                } else {
                    TermRole::Subject
                };
                Highlight::Statement { triple, role }
            }
            None => Highlight::Term(value.clone()),
        }
    }
}

/// Renders violations, one method per kind.
pub trait ViolationVisitor {
    type Output;

    fn visit_class(&mut self, v: &Violation, class: &Term, actual: &[Term]) -> Self::Output;
    fn visit_datatype(
        &mut self,
        v: &Violation,
        expected: &NamedNode,
        actual: Option<&NamedNode>,
        ill_formed: bool,
    ) -> Self::Output;
    fn visit_node_kind(&mut self, v: &Violation, expected: NodeKind, actual: NodeKind)
        -> Self::Output;
    fn visit_min_count(&mut self, v: &Violation, expected: u64, actual: usize) -> Self::Output;
    fn visit_max_count(&mut self, v: &Violation, expected: u64, actual: usize) -> Self::Output;
    fn visit_min_exclusive(&mut self, v: &Violation, bound: &Literal) -> Self::Output;
    fn visit_min_inclusive(&mut self, v: &Violation, bound: &Literal) -> Self::Output;
    fn visit_max_exclusive(&mut self, v: &Violation, bound: &Literal) -> Self::Output;
    fn visit_max_inclusive(&mut self, v: &Violation, bound: &Literal) -> Self::Output;
    fn visit_min_length(&mut self, v: &Violation, expected: u64, actual: usize) -> Self::Output;
    fn visit_max_length(&mut self, v: &Violation, expected: u64, actual: usize) -> Self::Output;
    fn visit_pattern(
        &mut self,
        v: &Violation,
        value: &str,
        pattern: &str,
        flags: Option<&str>,
    ) -> Self::Output;
    fn visit_language_in(
        &mut self,
        v: &Violation,
        allowed: &[String],
        actual: Option<&str>,
    ) -> Self::Output;
    fn visit_unique_lang(&mut self, v: &Violation, language: &str) -> Self::Output;
    fn visit_equals(&mut self, v: &Violation, property: &NamedNode) -> Self::Output;
    fn visit_disjoint(&mut self, v: &Violation, property: &NamedNode) -> Self::Output;
    fn visit_less_than(&mut self, v: &Violation, property: &NamedNode, other: &Term)
        -> Self::Output;
    fn visit_less_than_or_equals(
        &mut self,
        v: &Violation,
        property: &NamedNode,
        other: &Term,
    ) -> Self::Output;
    fn visit_not(&mut self, v: &Violation, shape: &Term) -> Self::Output;
    fn visit_node(&mut self, v: &Violation, shape: &Term, nested: &[Violation]) -> Self::Output;
    fn visit_xone(&mut self, v: &Violation, conforming: usize) -> Self::Output;
    fn visit_qualified_min_count(
        &mut self,
        v: &Violation,
        shape: &Term,
        expected: u64,
        actual: usize,
    ) -> Self::Output;
    fn visit_qualified_max_count(
        &mut self,
        v: &Violation,
        shape: &Term,
        expected: u64,
        actual: usize,
    ) -> Self::Output;
    fn visit_in(&mut self, v: &Violation, allowed: &[Term]) -> Self::Output;
    fn visit_closed(&mut self, v: &Violation, property: &NamedNode, statement: &Triple)
        -> Self::Output;
    fn visit_has_value(&mut self, v: &Violation, expected: &Term) -> Self::Output;
    fn visit_sparql(
        &mut self,
        v: &Violation,
        constraint: &Term,
        bindings: &Bindings,
        message: Option<&str>,
    ) -> Self::Output;
    fn visit_js(&mut self, v: &Violation, function: &str, message: Option<&str>) -> Self::Output;
    fn visit_processing(&mut self, v: &Violation, message: &str, cause: Option<&str>)
        -> Self::Output;
}

/// Generates one-line English messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageFormatter;

fn value_label(value: Option<&Term>) -> String {
    match value {
        Some(Term::Literal(lit)) => format!("\"{}\"", lit.value()),
        Some(term) => term.to_string(),
        None => "<none>".to_string(),
    }
}

fn join_terms(terms: &[Term]) -> String {
    terms
        .iter()
        .map(Term::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replaces `{$name}` and `{?name}` with the bound term in one left-to-right pass;
/// substituted text is never scanned again. Unbound placeholders are kept as written.
pub fn substitute_placeholders(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let replacement = placeholder_at(candidate).and_then(|(name, len)| {
            bindings
                .iter()
                .find(|(bound, _)| bound == name)
                .map(|(_, term)| (placeholder_text(term), len))
        });
        match replacement {
            Some((text, len)) => {
                out.push_str(&text);
                rest = &candidate[len..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// The variable name of a placeholder at the start of `text`, and the placeholder's byte length.
fn placeholder_at(text: &str) -> Option<(&str, usize)> {
    let body = text
        .strip_prefix("{$")
        .or_else(|| text.strip_prefix("{?"))?;
    let end = body.find('}')?;
    let name = &body[..end];
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some((name, end + 3))
}

fn placeholder_text(term: &Term) -> String {
    match term {
        Term::Literal(lit) => lit.value().to_string(),
        other => other.to_string(),
    }
}

impl ViolationVisitor for MessageFormatter {
    type Output = String;

    fn visit_class(&mut self, v: &Violation, class: &Term, actual: &[Term]) -> String {
        if actual.is_empty() {
            format!(
                "Value {} has no type, expected an instance of {}",
                value_label(v.value.as_ref()),
                class
            )
        } else {
            format!(
                "Value {} is not an instance of {} (types: {})",
                value_label(v.value.as_ref()),
                class,
                join_terms(actual)
            )
        }
    }

    fn visit_datatype(
        &mut self,
        v: &Violation,
        expected: &NamedNode,
        actual: Option<&NamedNode>,
        ill_formed: bool,
    ) -> String {
        let value = value_label(v.value.as_ref());
        match (ill_formed, actual) {
            (true, _) => format!("Value {} is not a valid {}", value, expected),
            (false, Some(actual)) => format!(
                "Value {} has datatype {}, expected {}",
                value, actual, expected
            ),
            (false, None) => format!("Value {} is not a literal of type {}", value, expected),
        }
    }

    fn visit_node_kind(&mut self, v: &Violation, expected: NodeKind, actual: NodeKind) -> String {
        format!(
            "Value {} is {}, expected {}",
            value_label(v.value.as_ref()),
            actual,
            expected
        )
    }

    fn visit_min_count(&mut self, v: &Violation, expected: u64, actual: usize) -> String {
        format!(
            "Expected at least {} value(s) for {}, found {}",
            expected,
            v.context.path_label(),
            actual
        )
    }

    fn visit_max_count(&mut self, v: &Violation, expected: u64, actual: usize) -> String {
        format!(
            "Expected at most {} value(s) for {}, found {}",
            expected,
            v.context.path_label(),
            actual
        )
    }

    fn visit_min_exclusive(&mut self, v: &Violation, bound: &Literal) -> String {
        format!(
            "Value {} is not greater than {}",
            value_label(v.value.as_ref()),
            bound.value()
        )
    }

    fn visit_min_inclusive(&mut self, v: &Violation, bound: &Literal) -> String {
        format!(
            "Value {} is less than {}",
            value_label(v.value.as_ref()),
            bound.value()
        )
    }

    fn visit_max_exclusive(&mut self, v: &Violation, bound: &Literal) -> String {
        format!(
            "Value {} is not less than {}",
            value_label(v.value.as_ref()),
            bound.value()
        )
    }

    fn visit_max_inclusive(&mut self, v: &Violation, bound: &Literal) -> String {
        format!(
            "Value {} is greater than {}",
            value_label(v.value.as_ref()),
            bound.value()
        )
    }

    fn visit_min_length(&mut self, v: &Violation, expected: u64, actual: usize) -> String {
        format!(
            "Value {} has length {}, minimum is {}",
            value_label(v.value.as_ref()),
            actual,
            expected
        )
    }

    fn visit_max_length(&mut self, v: &Violation, expected: u64, actual: usize) -> String {
        format!(
            "Value {} has length {}, maximum is {}",
            value_label(v.value.as_ref()),
            actual,
            expected
        )
    }

    fn visit_pattern(
        &mut self,
        _v: &Violation,
        value: &str,
        pattern: &str,
        flags: Option<&str>,
    ) -> String {
        let mut msg = format!("Value \"{}\" does not match pattern \"{}\"", value, pattern);
        if let Some(flags) = flags {
            let _ = write!(msg, " with flags \"{}\"", flags);
        }
        msg
    }

    fn visit_language_in(
        &mut self,
        v: &Violation,
        allowed: &[String],
        actual: Option<&str>,
    ) -> String {
        match actual {
            Some(tag) => format!(
                "Language tag \"{}\" of {} is not one of [{}]",
                tag,
                value_label(v.value.as_ref()),
                allowed.join(", ")
            ),
            None => format!(
                "Value {} has no language tag, expected one of [{}]",
                value_label(v.value.as_ref()),
                allowed.join(", ")
            ),
        }
    }

    fn visit_unique_lang(&mut self, v: &Violation, language: &str) -> String {
        format!(
            "Language \"{}\" is used more than once on {}",
            language,
            v.context.path_label()
        )
    }

    fn visit_equals(&mut self, v: &Violation, property: &NamedNode) -> String {
        format!(
            "Value {} is not shared by {} and {}",
            value_label(v.value.as_ref()),
            v.context.path_label(),
            property
        )
    }

    fn visit_disjoint(&mut self, v: &Violation, property: &NamedNode) -> String {
        format!(
            "Value {} of {} is also a value of {}",
            value_label(v.value.as_ref()),
            v.context.path_label(),
            property
        )
    }

    fn visit_less_than(&mut self, v: &Violation, property: &NamedNode, other: &Term) -> String {
        format!(
            "Value {} is not less than {} (value of {})",
            value_label(v.value.as_ref()),
            value_label(Some(other)),
            property
        )
    }

    fn visit_less_than_or_equals(
        &mut self,
        v: &Violation,
        property: &NamedNode,
        other: &Term,
    ) -> String {
        format!(
            "Value {} is not less than or equal to {} (value of {})",
            value_label(v.value.as_ref()),
            value_label(Some(other)),
            property
        )
    }

    fn visit_not(&mut self, v: &Violation, shape: &Term) -> String {
        format!(
            "Value {} conforms to {}, which is negated",
            value_label(v.value.as_ref()),
            shape
        )
    }

    fn visit_node(&mut self, v: &Violation, shape: &Term, nested: &[Violation]) -> String {
        let mut msg = format!(
            "Value {} does not conform to {}",
            value_label(v.value.as_ref()),
            shape
        );
        for inner in nested {
            let _ = write!(msg, "; {}", inner.message());
        }
        msg
    }

    fn visit_xone(&mut self, v: &Violation, conforming: usize) -> String {
        format!(
            "Value {} conforms to {} alternatives, expected exactly one",
            value_label(v.value.as_ref()),
            conforming
        )
    }

    fn visit_qualified_min_count(
        &mut self,
        _v: &Violation,
        shape: &Term,
        expected: u64,
        actual: usize,
    ) -> String {
        format!(
            "Expected at least {} value(s) conforming to {}, found {}",
            expected, shape, actual
        )
    }

    fn visit_qualified_max_count(
        &mut self,
        _v: &Violation,
        shape: &Term,
        expected: u64,
        actual: usize,
    ) -> String {
        format!(
            "Expected at most {} value(s) conforming to {}, found {}",
            expected, shape, actual
        )
    }

    fn visit_in(&mut self, v: &Violation, allowed: &[Term]) -> String {
        format!(
            "Value {} is not one of [{}]",
            value_label(v.value.as_ref()),
            join_terms(allowed)
        )
    }

    fn visit_closed(&mut self, v: &Violation, property: &NamedNode, _statement: &Triple) -> String {
        format!(
            "Property {} is not allowed on closed shape {}",
            property, v.context.shape
        )
    }

    fn visit_has_value(&mut self, v: &Violation, expected: &Term) -> String {
        format!(
            "Missing required value {} for {}",
            expected,
            v.context.path_label()
        )
    }

    fn visit_sparql(
        &mut self,
        _v: &Violation,
        constraint: &Term,
        bindings: &Bindings,
        message: Option<&str>,
    ) -> String {
        match message {
            Some(template) => substitute_placeholders(template, bindings),
            None => format!("SPARQL constraint {} reported a result", constraint),
        }
    }

    fn visit_js(&mut self, v: &Violation, function: &str, message: Option<&str>) -> String {
        match message {
            Some(text) => text.to_string(),
            None => format!(
                "Value {} was rejected by script function {}",
                value_label(v.value.as_ref()),
                function
            ),
        }
    }

    fn visit_processing(&mut self, _v: &Violation, message: &str, cause: Option<&str>) -> String {
        match cause {
            Some(cause) => format!("{}: {}", message, cause),
            None => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::for_node(&nn("alice").into(), &nn("PersonShape").into())
    }

    #[test]
    fn pattern_message_quotes_value_and_pattern() {
        let v = Violation::new(
            ctx(),
            Some(Literal::new_simple_literal("abc123").into()),
            ViolationKind::Pattern {
                value: "abc123".into(),
                pattern: "^[0-9]+$".into(),
                flags: None,
            },
        );
        assert_eq!(
            v.message(),
            "Value \"abc123\" does not match pattern \"^[0-9]+$\""
        );
        assert_eq!(v.fixes(), vec!["change the value to match /^[0-9]+$/".to_string()]);
    }

    #[test]
    fn custom_messages_substitute_placeholders() {
        let mut v = Violation::new(
            ctx(),
            Some(Literal::from(3).into()),
            ViolationKind::MinInclusive {
                bound: Literal::from(5),
            },
        );
        v.message = Some("{$this} has {?value}, too small".to_string());
        assert_eq!(v.message(), "<http://example.org/alice> has 3, too small");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let bindings: Bindings = vec![
            (
                "label".to_string(),
                Literal::new_simple_literal("{?other} and {$label}").into(),
            ),
            ("other".to_string(), Literal::new_simple_literal("x").into()),
        ];
        assert_eq!(
            substitute_placeholders("{?label} / {?other} / {?missing} / {x}", &bindings),
            "{?other} and {$label} / x / {?missing} / {x}"
        );
    }

    #[test]
    fn highlight_falls_back_to_the_focus_node() {
        let v = Violation::new(
            ctx(),
            None,
            ViolationKind::MinCount {
                expected: 1,
                actual: 0,
            },
        );
        assert_eq!(v.highlight(), Highlight::Term(nn("alice").into()));
        assert!(v.fixes()[0].starts_with("add 1 more value(s)"));
    }

    #[test]
    fn processing_violations_have_no_component() {
        let v = Violation::processing(ctx(), "script failed", Some("boom".into()));
        assert!(v.kind.component_iri().is_none());
        assert_eq!(v.message(), "script failed: boom");
    }
}
