use oxigraph::model::{Literal, NamedNode, Term};
use regex::Regex;

use crate::named_nodes::SHACL;
use crate::types::{NodeKind, ID};

/// A compiled `sh:pattern`, keeping the source text and flags for messages.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub regex: Regex,
    pub pattern: String,
    pub flags: Option<String>,
}

/// A `sh:sparql` constraint. `select` still contains `$PATH` placeholders.
#[derive(Debug, Clone)]
pub struct SparqlSpec {
    pub node: Term,
    pub select: String,
    pub prefixes: String,
    pub message: Option<String>,
    pub deactivated: bool,
}

/// A `sh:js` constraint: one function inside a script library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsSpec {
    pub library: String,
    pub function: String,
    pub message: Option<String>,
}

/// Data-only description of a SHACL constraint attached to a shape.
#[derive(Debug, Clone)]
pub enum Constraint {
    Class {
        class: Term,
    },
    Datatype {
        datatype: NamedNode,
    },
    NodeKind {
        kind: NodeKind,
    },
    MinCount {
        min_count: u64,
    },
    MaxCount {
        max_count: u64,
    },
    MinExclusive {
        bound: Literal,
    },
    MinInclusive {
        bound: Literal,
    },
    MaxExclusive {
        bound: Literal,
    },
    MaxInclusive {
        bound: Literal,
    },
    MinLength {
        length: u64,
    },
    MaxLength {
        length: u64,
    },
    Pattern(PatternSpec),
    LanguageIn {
        languages: Vec<String>,
    },
    UniqueLang,
    Equals {
        property: NamedNode,
    },
    Disjoint {
        property: NamedNode,
    },
    LessThan {
        property: NamedNode,
    },
    LessThanOrEquals {
        property: NamedNode,
    },
    Not {
        shape: ID,
    },
    And {
        shapes: Vec<ID>,
    },
    Or {
        shapes: Vec<ID>,
    },
    Xone {
        shapes: Vec<ID>,
    },
    Node {
        shape: ID,
    },
    QualifiedValueShape {
        shape: ID,
        min_count: Option<u64>,
        max_count: Option<u64>,
        disjoint: bool,
    },
    In {
        values: Vec<Term>,
    },
    Closed {
        ignored_properties: Vec<NamedNode>,
    },
    HasValue {
        value: Term,
    },
    Sparql(SparqlSpec),
    Js(JsSpec),
}

impl Constraint {
    /// False for constraints that only make sense over the value set of a property.
    pub fn can_be_used_on_node_shapes(&self) -> bool {
        !matches!(
            self,
            Constraint::MinCount { .. }
                | Constraint::MaxCount { .. }
                | Constraint::UniqueLang
                | Constraint::LessThan { .. }
                | Constraint::LessThanOrEquals { .. }
                | Constraint::QualifiedValueShape { .. }
        )
    }

    /// Constraints evaluated once per property over all value nodes (even none),
    /// rather than once per value node.
    pub fn is_value_set_constraint(&self) -> bool {
        matches!(
            self,
            Constraint::MinCount { .. }
                | Constraint::MaxCount { .. }
                | Constraint::UniqueLang
                | Constraint::HasValue { .. }
                | Constraint::Equals { .. }
                | Constraint::QualifiedValueShape { .. }
                | Constraint::Sparql(_)
        )
    }

    /// Shapes referenced by this constraint, for reference-graph analysis.
    pub fn referenced_shapes(&self) -> Vec<ID> {
        match self {
            Constraint::Not { shape }
            | Constraint::Node { shape }
            | Constraint::QualifiedValueShape { shape, .. } => vec![*shape],
            Constraint::And { shapes } | Constraint::Or { shapes } | Constraint::Xone { shapes } => {
                shapes.clone()
            }
            _ => Vec::new(),
        }
    }

    /// A short name used in logs and Graphviz labels.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Class { .. } => "Class",
            Constraint::Datatype { .. } => "Datatype",
            Constraint::NodeKind { .. } => "NodeKind",
            Constraint::MinCount { .. } => "MinCount",
            Constraint::MaxCount { .. } => "MaxCount",
            Constraint::MinExclusive { .. } => "MinExclusive",
            Constraint::MinInclusive { .. } => "MinInclusive",
            Constraint::MaxExclusive { .. } => "MaxExclusive",
            Constraint::MaxInclusive { .. } => "MaxInclusive",
            Constraint::MinLength { .. } => "MinLength",
            Constraint::MaxLength { .. } => "MaxLength",
            Constraint::Pattern(_) => "Pattern",
            Constraint::LanguageIn { .. } => "LanguageIn",
            Constraint::UniqueLang => "UniqueLang",
            Constraint::Equals { .. } => "Equals",
            Constraint::Disjoint { .. } => "Disjoint",
            Constraint::LessThan { .. } => "LessThan",
            Constraint::LessThanOrEquals { .. } => "LessThanOrEquals",
            Constraint::Not { .. } => "Not",
            Constraint::And { .. } => "And",
            Constraint::Or { .. } => "Or",
            Constraint::Xone { .. } => "Xone",
            Constraint::Node { .. } => "Node",
            Constraint::QualifiedValueShape { .. } => "QualifiedValueShape",
            Constraint::In { .. } => "In",
            Constraint::Closed { .. } => "Closed",
            Constraint::HasValue { .. } => "HasValue",
            Constraint::Sparql(_) => "SPARQL",
            Constraint::Js(_) => "JS",
        }
    }

    /// The `sh:*ConstraintComponent` IRI reported as `sh:sourceConstraintComponent`.
    pub fn component_iri(&self) -> NamedNode {
        let sh = SHACL::new();
        let iri = match self {
            Constraint::Class { .. } => sh.class_constraint_component,
            Constraint::Datatype { .. } => sh.datatype_constraint_component,
            Constraint::NodeKind { .. } => sh.node_kind_constraint_component,
            Constraint::MinCount { .. } => sh.min_count_constraint_component,
            Constraint::MaxCount { .. } => sh.max_count_constraint_component,
            Constraint::MinExclusive { .. } => sh.min_exclusive_constraint_component,
            Constraint::MinInclusive { .. } => sh.min_inclusive_constraint_component,
            Constraint::MaxExclusive { .. } => sh.max_exclusive_constraint_component,
            Constraint::MaxInclusive { .. } => sh.max_inclusive_constraint_component,
            Constraint::MinLength { .. } => sh.min_length_constraint_component,
            Constraint::MaxLength { .. } => sh.max_length_constraint_component,
            Constraint::Pattern(_) => sh.pattern_constraint_component,
            Constraint::LanguageIn { .. } => sh.language_in_constraint_component,
            Constraint::UniqueLang => sh.unique_lang_constraint_component,
            Constraint::Equals { .. } => sh.equals_constraint_component,
            Constraint::Disjoint { .. } => sh.disjoint_constraint_component,
            Constraint::LessThan { .. } => sh.less_than_constraint_component,
            Constraint::LessThanOrEquals { .. } => sh.less_than_or_equals_constraint_component,
            Constraint::Not { .. } => sh.not_constraint_component,
            Constraint::And { .. } => sh.and_constraint_component,
            Constraint::Or { .. } => sh.or_constraint_component,
            Constraint::Xone { .. } => sh.xone_constraint_component,
            Constraint::Node { .. } => sh.node_constraint_component,
            Constraint::QualifiedValueShape { .. } => sh.qualified_min_count_constraint_component,
            Constraint::In { .. } => sh.in_constraint_component,
            Constraint::Closed { .. } => sh.closed_constraint_component,
            Constraint::HasValue { .. } => sh.has_value_constraint_component,
            Constraint::Sparql(_) => sh.sparql_constraint_component,
            Constraint::Js(_) => sh.js_constraint_component,
        };
        iri.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_constraints_are_property_only() {
        assert!(!Constraint::MinCount { min_count: 1 }.can_be_used_on_node_shapes());
        assert!(!Constraint::UniqueLang.can_be_used_on_node_shapes());
        assert!(Constraint::Closed {
            ignored_properties: vec![]
        }
        .can_be_used_on_node_shapes());
        assert!(Constraint::MinCount { min_count: 1 }.is_value_set_constraint());
        assert!(!Constraint::In { values: vec![] }.is_value_set_constraint());
    }

    #[test]
    fn logical_constraints_expose_their_references() {
        let c = Constraint::Or {
            shapes: vec![ID(1), ID(2)],
        };
        assert_eq!(c.referenced_shapes(), vec![ID(1), ID(2)]);
        assert_eq!(c.name(), "Or");
        assert!(c.component_iri().as_str().ends_with("OrConstraintComponent"));
    }
}
