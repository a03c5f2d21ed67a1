//! SHACL property paths and their evaluation over a [`GraphAccess`].
use crate::graph::{as_subject, GraphAccess};
use oxigraph::model::{NamedNode, Term, Triple};
use std::collections::HashSet;
use std::fmt;

/// Represents a SHACL Property Path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    /// A single predicate IRI.
    Predicate(NamedNode),
    /// A sequence of paths (RDF list).
    Sequence(Vec<Path>),
    /// A set of alternative paths (`sh:alternativePath`).
    Alternative(Vec<Path>),
    /// An inverse path (`sh:inversePath`).
    Inverse(Box<Path>),
    /// A path that can be traversed zero or more times (`sh:zeroOrMorePath`).
    ZeroOrMore(Box<Path>),
    /// A path that can be traversed one or more times (`sh:oneOrMorePath`).
    OneOrMore(Box<Path>),
    /// A path that can be traversed zero or one time (`sh:zeroOrOnePath`).
    ZeroOrOne(Box<Path>),
}

/// A value reached by a path, together with the last edge that was traversed.
///
/// `statement` is `None` for the zero-step identity of `*` and `?` paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathValue {
    pub statement: Option<Triple>,
    pub value: Term,
}

impl PathValue {
    fn identity(value: &Term) -> Self {
        PathValue {
            statement: None,
            value: value.clone(),
        }
    }
}

impl Path {
    /// The predicate of a one-hop path.
    pub fn as_predicate(&self) -> Option<&NamedNode> {
        match self {
            Path::Predicate(p) => Some(p),
            _ => None,
        }
    }

    /// Evaluates the path from `start`. Results are ordered and free of duplicates.
    pub fn evaluate(&self, start: &Term, graph: &dyn GraphAccess) -> Vec<PathValue> {
        let mut seen = HashSet::new();
        self.walk(start, true, graph)
            .into_iter()
            .filter(|pv| seen.insert(pv.clone()))
            .collect()
    }

    /// Distinct value nodes reached from `start`, in evaluation order.
    pub fn values(&self, start: &Term, graph: &dyn GraphAccess) -> Vec<Term> {
        distinct_values(&self.evaluate(start, graph))
    }

    fn walk(&self, start: &Term, forward: bool, graph: &dyn GraphAccess) -> Vec<PathValue> {
        match self {
            Path::Predicate(p) => {
                if forward {
                    let Some(subject) = as_subject(start) else {
                        return Vec::new();
                    };
                    graph
                        .triples_matching(Some(subject), Some(p.as_ref()), None)
                        .into_iter()
                        .map(|t| PathValue {
                            value: t.object.clone(),
                            statement: Some(t),
                        })
                        .collect()
                } else {
                    graph
                        .triples_matching(None, Some(p.as_ref()), Some(start.as_ref()))
                        .into_iter()
                        .map(|t| PathValue {
                            value: t.subject.clone().into(),
                            statement: Some(t),
                        })
                        .collect()
                }
            }
            Path::Inverse(inner) => inner.walk(start, !forward, graph),
            Path::Sequence(steps) => {
                let ordered: Vec<&Path> = if forward {
                    steps.iter().collect()
                } else {
                    steps.iter().rev().collect()
                };
                let mut frontier = vec![PathValue::identity(start)];
                for step in ordered {
                    let mut next = Vec::new();
                    for reached in &frontier {
                        next.extend(step.walk(&reached.value, forward, graph));
                    }
                    if next.is_empty() {
                        return next;
                    }
                    frontier = next;
                }
                frontier
            }
            Path::Alternative(options) => options
                .iter()
                .flat_map(|option| option.walk(start, forward, graph))
                .collect(),
            Path::ZeroOrMore(inner) => {
                let mut out = vec![PathValue::identity(start)];
                out.extend(closure(inner, start, forward, graph));
                out
            }
            Path::OneOrMore(inner) => closure(inner, start, forward, graph),
            Path::ZeroOrOne(inner) => {
                let mut out = vec![PathValue::identity(start)];
                out.extend(inner.walk(start, forward, graph));
                out
            }
        }
    }

    /// Predicates used on the first hop out of the focus node.
    ///
    /// Inverse steps leave the node through incoming edges and contribute nothing;
    /// sequences also look past a leading step that may match zero times.
    pub fn first_properties(&self) -> Vec<NamedNode> {
        let mut out = Vec::new();
        self.collect_first(&mut out);
        out
    }

    fn collect_first(&self, out: &mut Vec<NamedNode>) {
        match self {
            Path::Predicate(p) => {
                if !out.contains(p) {
                    out.push(p.clone());
                }
            }
            Path::Inverse(_) => {}
            Path::Sequence(steps) => {
                for step in steps {
                    step.collect_first(out);
                    if !step.may_be_empty() {
                        break;
                    }
                }
            }
            Path::Alternative(options) => {
                for option in options {
                    option.collect_first(out);
                }
            }
            Path::ZeroOrMore(inner) | Path::OneOrMore(inner) | Path::ZeroOrOne(inner) => {
                inner.collect_first(out)
            }
        }
    }

    fn may_be_empty(&self) -> bool {
        match self {
            Path::Predicate(_) => false,
            Path::Inverse(inner) | Path::OneOrMore(inner) => inner.may_be_empty(),
            Path::ZeroOrMore(_) | Path::ZeroOrOne(_) => true,
            Path::Sequence(steps) => steps.iter().all(Path::may_be_empty),
            Path::Alternative(options) => options.iter().any(Path::may_be_empty),
        }
    }

    /// Converts the SHACL path to its SPARQL 1.1 property path string representation.
    pub fn to_sparql_path(&self) -> String {
        match self {
            Path::Predicate(p) => format!("<{}>", p.as_str()),
            Path::Inverse(inner) => format!("^{}", inner.to_sparql_path()),
            Path::Sequence(paths) => format!(
                "({})",
                paths
                    .iter()
                    .map(Path::to_sparql_path)
                    .collect::<Vec<_>>()
                    .join(" / ")
            ),
            Path::Alternative(paths) => format!(
                "({})",
                paths
                    .iter()
                    .map(Path::to_sparql_path)
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
            Path::ZeroOrMore(inner) => format!("{}*", inner.to_sparql_path()),
            Path::OneOrMore(inner) => format!("{}+", inner.to_sparql_path()),
            Path::ZeroOrOne(inner) => format!("{}?", inner.to_sparql_path()),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql_path())
    }
}

/// Transitive closure of `inner` from `start`, one or more steps.
fn closure(inner: &Path, start: &Term, forward: bool, graph: &dyn GraphAccess) -> Vec<PathValue> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    let mut frontier = vec![start.clone()];
    while let Some(node) = frontier.pop() {
        for reached in inner.walk(&node, forward, graph) {
            if visited.insert(reached.value.clone()) {
                frontier.push(reached.value.clone());
                out.push(reached);
            }
        }
    }
    out
}

pub(crate) fn distinct_values(reached: &[PathValue]) -> Vec<Term> {
    let mut seen = HashSet::new();
    reached
        .iter()
        .filter(|pv| seen.insert(pv.value.clone()))
        .map(|pv| pv.value.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Graph;

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn t(s: &str) -> Term {
        nn(s).into()
    }

    fn chain() -> Graph {
        // a -knows-> b -knows-> c -knows-> a ; b -name-> "B"
        let mut g = Graph::new();
        g.insert(&Triple::new(nn("a"), nn("knows"), nn("b")));
        g.insert(&Triple::new(nn("b"), nn("knows"), nn("c")));
        g.insert(&Triple::new(nn("c"), nn("knows"), nn("a")));
        g.insert(&Triple::new(
            nn("b"),
            nn("name"),
            oxigraph::model::Literal::new_simple_literal("B"),
        ));
        g
    }

    #[test]
    fn predicate_and_inverse() {
        let g = chain();
        let knows = Path::Predicate(nn("knows"));
        assert_eq!(knows.values(&t("a"), &g), vec![t("b")]);
        let inverse = Path::Inverse(Box::new(knows));
        let back = inverse.evaluate(&t("a"), &g);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].value, t("c"));
        assert_eq!(back[0].statement.as_ref().map(|s| s.object.clone()), Some(t("a")));
    }

    #[test]
    fn sequence_stops_on_dead_branch() {
        let g = chain();
        let seq = Path::Sequence(vec![Path::Predicate(nn("knows")), Path::Predicate(nn("name"))]);
        assert_eq!(seq.values(&t("a"), &g).len(), 1);
        let dead = Path::Sequence(vec![Path::Predicate(nn("name")), Path::Predicate(nn("knows"))]);
        assert!(dead.evaluate(&t("a"), &g).is_empty());
    }

    #[test]
    fn inverse_of_sequence_reverses_steps() {
        let g = chain();
        let seq = Path::Sequence(vec![Path::Predicate(nn("knows")), Path::Predicate(nn("knows"))]);
        let inv = Path::Inverse(Box::new(seq));
        assert_eq!(inv.values(&t("c"), &g), vec![t("a")]);
    }

    #[test]
    #[ntest::timeout(1000)]
    fn closures_terminate_on_cycles() {
        let g = chain();
        let star = Path::ZeroOrMore(Box::new(Path::Predicate(nn("knows"))));
        let plus = Path::OneOrMore(Box::new(Path::Predicate(nn("knows"))));
        let opt = Path::ZeroOrOne(Box::new(Path::Predicate(nn("knows"))));
        assert_eq!(star.values(&t("a"), &g).len(), 3);
        // `a` comes back around the cycle
        assert_eq!(plus.values(&t("a"), &g).len(), 3);
        assert_eq!(opt.values(&t("a"), &g), vec![t("a"), t("b")]);
    }

    #[test]
    fn alternative_is_a_union() {
        let g = chain();
        let alt = Path::Alternative(vec![Path::Predicate(nn("knows")), Path::Predicate(nn("name"))]);
        assert_eq!(alt.values(&t("b"), &g).len(), 2);
    }

    #[test]
    fn first_properties_only_look_at_the_first_hop() {
        let seq = Path::Sequence(vec![
            Path::ZeroOrOne(Box::new(Path::Predicate(nn("p")))),
            Path::Predicate(nn("q")),
            Path::Predicate(nn("r")),
        ]);
        assert_eq!(seq.first_properties(), vec![nn("p"), nn("q")]);
        let inv = Path::Inverse(Box::new(Path::Predicate(nn("p"))));
        assert!(inv.first_properties().is_empty());
        let alt = Path::Alternative(vec![Path::Predicate(nn("a")), inv]);
        assert_eq!(alt.first_properties(), vec![nn("a")]);
    }

    #[test]
    fn sparql_rendering() {
        let path = Path::Sequence(vec![
            Path::Predicate(nn("a")),
            Path::Inverse(Box::new(Path::Predicate(nn("b")))),
        ]);
        assert_eq!(
            path.to_sparql_path(),
            "(<http://example.org/a> / ^<http://example.org/b>)"
        );
    }
}
