//! Validation reports in the W3C `sh:ValidationReport` vocabulary.
use crate::named_nodes::{SHACL, SHACL_NAMESPACE};
use crate::path::Path;
use crate::types::Severity;
use crate::violation::{Violation, ViolationKind};
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{BlankNode, Graph, Literal, NamedNodeRef, NamedOrBlankNode, Term, Triple};
use std::fmt::Write as _;
use std::io;

/// Every violation found by one validation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new(violations: Vec<Violation>) -> Self {
        ValidationReport { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// True when no result has severity `sh:Violation`.
    pub fn conforms(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.severity == Severity::Violation)
    }

    pub fn to_graph(&self) -> Graph {
        let sh = SHACL::new();
        let mut graph = Graph::new();
        let report: NamedOrBlankNode = BlankNode::default().into();
        graph.insert(&Triple::new(
            report.clone(),
            rdf::TYPE,
            sh.validation_report.into_owned(),
        ));
        graph.insert(&Triple::new(
            report.clone(),
            sh.conforms,
            Literal::from(self.conforms()),
        ));
        for violation in &self.violations {
            let result = result_to_rdf(violation, &mut graph);
            graph.insert(&Triple::new(report.clone(), sh.result, result));
        }
        graph
    }

    /// Serializes the report graph. Turtle output declares the `sh:` prefix.
    pub fn to_rdf(&self, format: RdfFormat) -> io::Result<String> {
        let mut serializer = RdfSerializer::from_format(format);
        if format == RdfFormat::Turtle {
            serializer = serializer
                .with_prefix("sh", SHACL_NAMESPACE)
                .map_err(io::Error::other)?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for triple in self.to_graph().iter() {
            writer.serialize_triple(triple)?;
        }
        String::from_utf8(writer.finish()?).map_err(io::Error::other)
    }

    pub fn to_turtle(&self) -> io::Result<String> {
        self.to_rdf(RdfFormat::Turtle)
    }

    /// A human-readable listing grouped by focus node.
    pub fn summary(&self) -> String {
        if self.violations.is_empty() {
            return "Validation report: no results.".to_string();
        }
        let mut focus_nodes: Vec<&Term> = Vec::new();
        for v in &self.violations {
            if !focus_nodes.contains(&&v.context.focus) {
                focus_nodes.push(&v.context.focus);
            }
        }
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Validation report: {} result(s), conforms: {}",
            self.violations.len(),
            self.conforms()
        );
        for focus in focus_nodes {
            let _ = writeln!(out, "\nFocus node: {}", focus);
            for v in self.violations.iter().filter(|v| &v.context.focus == focus) {
                let _ = writeln!(out, "  - [{}] {}", v.severity, v.message());
                let _ = writeln!(out, "    from shape: {}", v.context.source_shape);
                if let Some(path) = &v.context.path {
                    let _ = writeln!(out, "    path: {}", path);
                }
            }
        }
        out
    }

    pub fn dump(&self) {
        println!("{}", self.summary());
    }
}

fn result_to_rdf(violation: &Violation, graph: &mut Graph) -> NamedOrBlankNode {
    let sh = SHACL::new();
    let result: NamedOrBlankNode = BlankNode::default().into();
    let ctx = violation.context();
    graph.insert(&Triple::new(
        result.clone(),
        rdf::TYPE,
        sh.validation_result.into_owned(),
    ));
    graph.insert(&Triple::new(result.clone(), sh.focus_node, ctx.focus.clone()));
    if let Some(path) = &ctx.path {
        let path = path_to_rdf(path, graph);
        graph.insert(&Triple::new(result.clone(), sh.result_path, path));
    }
    if let Some(value) = &violation.value {
        graph.insert(&Triple::new(result.clone(), sh.value, value.clone()));
    }
    graph.insert(&Triple::new(
        result.clone(),
        sh.result_message,
        Literal::new_simple_literal(violation.message()),
    ));
    graph.insert(&Triple::new(
        result.clone(),
        sh.source_shape,
        ctx.source_shape.clone(),
    ));
    graph.insert(&Triple::new(
        result.clone(),
        sh.result_severity,
        violation.severity.to_named_node(),
    ));
    if let Some(component) = violation.kind.component_iri() {
        graph.insert(&Triple::new(
            result.clone(),
            sh.source_constraint_component,
            component,
        ));
    }
    match &violation.kind {
        ViolationKind::Sparql { constraint, .. } => {
            graph.insert(&Triple::new(
                result.clone(),
                sh.source_constraint,
                constraint.clone(),
            ));
        }
        ViolationKind::Node { nested, .. } => {
            for inner in nested {
                let detail = result_to_rdf(inner, graph);
                graph.insert(&Triple::new(result.clone(), sh.detail, detail));
            }
        }
        _ => {}
    }
    result
}

/// Writes a path back in SHACL syntax and returns its root term.
pub fn path_to_rdf(path: &Path, graph: &mut Graph) -> Term {
    let sh = SHACL::new();
    let wrap = |predicate: NamedNodeRef<'static>, inner: &Path, graph: &mut Graph| -> Term {
        let node = BlankNode::default();
        let inner = path_to_rdf(inner, graph);
        graph.insert(&Triple::new(node.clone(), predicate, inner));
        node.into()
    };
    match path {
        Path::Predicate(p) => p.clone().into(),
        Path::Sequence(steps) => {
            let items: Vec<Term> = steps.iter().map(|p| path_to_rdf(p, graph)).collect();
            build_rdf_list(items, graph)
        }
        Path::Alternative(options) => {
            let node = BlankNode::default();
            let items: Vec<Term> = options.iter().map(|p| path_to_rdf(p, graph)).collect();
            let head = build_rdf_list(items, graph);
            graph.insert(&Triple::new(node.clone(), sh.alternative_path, head));
            node.into()
        }
        Path::Inverse(inner) => wrap(sh.inverse_path, inner, graph),
        Path::ZeroOrMore(inner) => wrap(sh.zero_or_more_path, inner, graph),
        Path::OneOrMore(inner) => wrap(sh.one_or_more_path, inner, graph),
        Path::ZeroOrOne(inner) => wrap(sh.zero_or_one_path, inner, graph),
    }
}

fn build_rdf_list(items: Vec<Term>, graph: &mut Graph) -> Term {
    let mut rest: Term = rdf::NIL.into_owned().into();
    for item in items.into_iter().rev() {
        let cell = BlankNode::default();
        graph.insert(&Triple::new(cell.clone(), rdf::FIRST, item));
        graph.insert(&Triple::new(cell.clone(), rdf::REST, rest));
        rest = cell.into();
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphAccess;
    use crate::violation::EvaluationContext;
    use oxigraph::model::NamedNode;

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn min_count_violation(severity: Severity) -> Violation {
        let mut ctx = EvaluationContext::for_node(&nn("alice").into(), &nn("PersonShape").into());
        ctx.path = Some(Path::Predicate(nn("name")));
        let mut v = Violation::new(
            ctx,
            None,
            ViolationKind::MinCount {
                expected: 1,
                actual: 0,
            },
        );
        v.severity = severity;
        v
    }

    #[test]
    fn warnings_do_not_break_conformance() {
        assert!(ValidationReport::default().conforms());
        assert!(ValidationReport::new(vec![min_count_violation(Severity::Warning)]).conforms());
        assert!(!ValidationReport::new(vec![min_count_violation(Severity::Violation)]).conforms());
    }

    #[test]
    fn report_graph_uses_the_shacl_vocabulary() {
        let sh = SHACL::new();
        let report = ValidationReport::new(vec![min_count_violation(Severity::Violation)]);
        let graph = report.to_graph();
        let results = graph.subjects(rdf::TYPE, &sh.validation_result.into_owned().into());
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(graph.object(result, sh.focus_node), Some(nn("alice").into()));
        assert_eq!(graph.object(result, sh.result_path), Some(nn("name").into()));
        assert_eq!(
            graph.object(result, sh.source_constraint_component),
            Some(sh.min_count_constraint_component.into_owned().into())
        );
        assert!(report.to_turtle().unwrap().contains("sh:ValidationResult"));
    }

    #[test]
    fn sequence_paths_become_rdf_lists() {
        let mut graph = Graph::new();
        let path = Path::Sequence(vec![
            Path::Predicate(nn("a")),
            Path::Inverse(Box::new(Path::Predicate(nn("b")))),
        ]);
        let head = path_to_rdf(&path, &mut graph);
        let items = graph.list_items(&head).unwrap();
        assert_eq!(items[0], Term::from(nn("a")));
        assert_eq!(
            graph.object(&items[1], SHACL::new().inverse_path),
            Some(nn("b").into())
        );
    }
}
