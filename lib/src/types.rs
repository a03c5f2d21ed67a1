use crate::named_nodes::SHACL;
use oxigraph::model::{NamedNode, Term, TermRef};
use std::fmt;
use std::hash::Hash;
use xxhash_rust::xxh3::xxh3_64;

/// A stable identifier for a shape, derived from the hash of its term.
///
/// Shapes reference each other (`sh:node`, `sh:and`, ...) through these IDs and are
/// resolved by lookup in the `ShapesModel`, so recursive shape graphs never need to be
/// materialized as recursive Rust values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ID(pub u64);

impl From<u64> for ID {
    fn from(item: u64) -> Self {
        ID(item)
    }
}

impl From<&Term> for ID {
    fn from(term: &Term) -> Self {
        ID(xxh3_64(term.to_string().as_bytes()))
    }
}

impl fmt::Display for ID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ID {
    /// Converts the ID to a string suitable for use as a node identifier in Graphviz.
    pub fn to_graphviz_id(&self) -> String {
        format!("n{}", self.0)
    }
}

/// Identifies one constraint inside a shape, for Graphviz output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ComponentID {
    pub shape: ID,
    pub index: usize,
}

impl ComponentID {
    pub fn to_graphviz_id(&self) -> String {
        format!("c{}_{}", self.shape.0, self.index)
    }
}

/// Represents the severity level of a validation result, corresponding to `sh:severity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    /// Corresponds to `sh:Info`.
    Info,
    /// Corresponds to `sh:Warning`.
    Warning,
    /// Corresponds to `sh:Violation`.
    #[default]
    Violation,
}

impl Severity {
    /// Creates a `Severity` from a `Term` if it matches a SHACL severity IRI.
    pub fn from_term(term: &Term) -> Option<Self> {
        let shacl = SHACL::new();
        let Term::NamedNode(nn) = term else {
            return None;
        };
        if *nn == shacl.info {
            Some(Severity::Info)
        } else if *nn == shacl.warning {
            Some(Severity::Warning)
        } else if *nn == shacl.violation {
            Some(Severity::Violation)
        } else {
            None
        }
    }

    pub fn to_named_node(self) -> NamedNode {
        let shacl = SHACL::new();
        match self {
            Severity::Info => shacl.info.into_owned(),
            Severity::Warning => shacl.warning.into_owned(),
            Severity::Violation => shacl.violation.into_owned(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Violation => write!(f, "violation"),
        }
    }
}

/// The six node kinds of `sh:nodeKind`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_term(term: &Term) -> Option<Self> {
        let shacl = SHACL::new();
        let Term::NamedNode(nn) = term else {
            return None;
        };
        let kind = if *nn == shacl.iri {
            NodeKind::Iri
        } else if *nn == shacl.blank_node {
            NodeKind::BlankNode
        } else if *nn == shacl.literal {
            NodeKind::Literal
        } else if *nn == shacl.blank_node_or_iri {
            NodeKind::BlankNodeOrIri
        } else if *nn == shacl.blank_node_or_literal {
            NodeKind::BlankNodeOrLiteral
        } else if *nn == shacl.iri_or_literal {
            NodeKind::IriOrLiteral
        } else {
            return None;
        };
        Some(kind)
    }

    /// The exact (non-union) kind of a term.
    pub fn of(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(_) => NodeKind::Iri,
            TermRef::BlankNode(_) => NodeKind::BlankNode,
            _ => NodeKind::Literal,
        }
    }

    pub fn matches(self, term: TermRef<'_>) -> bool {
        let actual = NodeKind::of(term);
        match self {
            NodeKind::BlankNodeOrIri => actual != NodeKind::Literal,
            NodeKind::BlankNodeOrLiteral => actual != NodeKind::Iri,
            NodeKind::IriOrLiteral => actual != NodeKind::BlankNode,
            exact => exact == actual,
        }
    }

    pub fn to_named_node(self) -> NamedNode {
        let shacl = SHACL::new();
        let nn = match self {
            NodeKind::Iri => shacl.iri,
            NodeKind::BlankNode => shacl.blank_node,
            NodeKind::Literal => shacl.literal,
            NodeKind::BlankNodeOrIri => shacl.blank_node_or_iri,
            NodeKind::BlankNodeOrLiteral => shacl.blank_node_or_literal,
            NodeKind::IriOrLiteral => shacl.iri_or_literal,
        };
        nn.into_owned()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Iri => "an IRI",
            NodeKind::BlankNode => "a blank node",
            NodeKind::Literal => "a literal",
            NodeKind::BlankNodeOrIri => "a blank node or IRI",
            NodeKind::BlankNodeOrLiteral => "a blank node or literal",
            NodeKind::IriOrLiteral => "an IRI or literal",
        };
        f.write_str(label)
    }
}

/// Represents a SHACL target, which specifies the nodes to be validated against a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Targets all instances of a given class (`sh:targetClass`).
    Class(Term),
    /// Targets a specific node (`sh:targetNode`).
    Node(Term),
    /// Targets all subjects of triples with a given predicate (`sh:targetSubjectsOf`).
    SubjectsOf(NamedNode),
    /// Targets all objects of triples with a given predicate (`sh:targetObjectsOf`).
    ObjectsOf(NamedNode),
    /// `sh:target [ a sh:SPARQLTarget ; sh:select ... ]`; the query projects `?this`.
    Sparql { select: String, prefixes: String },
}

impl Target {
    /// The full query text of a SPARQL target, prefixes included.
    pub fn sparql_query(&self) -> Option<String> {
        match self {
            Target::Sparql { select, prefixes } => Some(format!("{}\n{}", prefixes, select)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{BlankNode, Literal};

    #[test]
    fn node_kind_unions() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.org/a"));
        let bnode = Term::from(BlankNode::default());
        let lit = Term::from(Literal::new_simple_literal("x"));

        assert!(NodeKind::BlankNodeOrIri.matches(iri.as_ref()));
        assert!(NodeKind::BlankNodeOrIri.matches(bnode.as_ref()));
        assert!(!NodeKind::BlankNodeOrIri.matches(lit.as_ref()));
        assert!(NodeKind::IriOrLiteral.matches(lit.as_ref()));
        assert!(!NodeKind::Iri.matches(bnode.as_ref()));
        assert_eq!(NodeKind::of(lit.as_ref()), NodeKind::Literal);
    }

    #[test]
    fn severity_round_trips_through_terms() {
        for severity in [Severity::Info, Severity::Warning, Severity::Violation] {
            let term = Term::from(severity.to_named_node());
            assert_eq!(Severity::from_term(&term), Some(severity));
        }
        assert_eq!(Severity::default(), Severity::Violation);
    }

    #[test]
    fn ids_are_stable_per_term() {
        let a = Term::from(NamedNode::new_unchecked("http://example.org/Shape"));
        let b = Term::from(NamedNode::new_unchecked("http://example.org/Shape"));
        assert_eq!(ID::from(&a), ID::from(&b));
        assert!(ID::from(&a).to_graphviz_id().starts_with('n'));
    }
}
