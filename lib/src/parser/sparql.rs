//! Prefix declarations and load-time checks for SPARQL-based constraints and targets.
use super::{invalid, ParsingContext};
use crate::error::{LoadError, Result};
use crate::model::components::SparqlSpec;
use crate::types::Target;
use oxigraph::model::vocab::xsd;
use oxigraph::model::{NamedNodeRef, Term};
use spargebra::Query as AlgebraQuery;
use std::collections::BTreeMap;

/// Stand-in for `$PATH` when checking syntax; the real path is spliced in per shape.
const PATH_PLACEHOLDER: &str = "<urn:shacl-engine:path>";

/// Collects the `PREFIX` lines declared through `sh:prefixes` / `sh:declare` for a
/// SPARQL-bearing node.
pub(crate) fn prefixes_for(ctx: &ParsingContext<'_>, shape: &Term, node: &Term) -> Result<String> {
    let sh = ctx.shacl();
    let graph = ctx.graph();
    let mut collected: BTreeMap<String, String> = BTreeMap::new();

    for prefixes_subject in graph.objects(node, sh.prefixes) {
        for declaration in graph.objects(&prefixes_subject, sh.declare) {
            if matches!(declaration, Term::Literal(_)) {
                return Err(invalid(
                    shape,
                    sh.declare,
                    &declaration,
                    "sh:declare value must be an IRI or blank node",
                ));
            }
            let prefix = graph.object(&declaration, sh.prefix);
            let namespace = graph.object(&declaration, sh.namespace);
            let (Some(Term::Literal(prefix)), Some(Term::Literal(namespace))) = (prefix, namespace)
            else {
                return Err(invalid(
                    shape,
                    sh.declare,
                    &declaration,
                    "ill-formed prefix declaration, missing sh:prefix or sh:namespace",
                ));
            };
            let prefix = prefix.value().to_string();
            let namespace = namespace.value().to_string();
            match collected.get(&prefix) {
                Some(existing) if *existing != namespace => {
                    return Err(invalid(
                        shape,
                        sh.prefixes,
                        &prefixes_subject,
                        format!(
                            "duplicate prefix '{}' with different namespaces: '{}' and '{}'",
                            prefix, existing, namespace
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    collected.insert(prefix, namespace);
                }
            }
        }
    }

    Ok(collected
        .iter()
        .map(|(prefix, iri)| format!("PREFIX {}: <{}>", prefix, iri))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Fails when the query (with prefixes) does not parse.
fn check_syntax(
    shape: &Term,
    predicate: NamedNodeRef<'_>,
    node: &Term,
    prefixes: &str,
    select: &str,
) -> Result<()> {
    let text = format!("{}\n{}", prefixes, select.replace("$PATH", PATH_PLACEHOLDER));
    AlgebraQuery::parse(&text, None)
        .map(|_| ())
        .map_err(|e| invalid(shape, predicate, node, format!("invalid SPARQL: {}", e)))
}

fn select_text(ctx: &ParsingContext<'_>, shape: &Term, node: &Term) -> Result<String> {
    let sh = ctx.shacl();
    match ctx.single(node, sh.select)? {
        Some(Term::Literal(lit)) => Ok(lit.value().to_string()),
        Some(other) => Err(invalid(shape, sh.select, &other, "sh:select must be a literal")),
        None => Err(LoadError::Missing {
            shape: shape.clone(),
            predicate: sh.select.to_string(),
        }),
    }
}

/// Reads one `sh:sparql` value node.
pub(crate) fn parse_constraint(
    ctx: &ParsingContext<'_>,
    shape: &Term,
    node: &Term,
) -> Result<SparqlSpec> {
    let sh = ctx.shacl();
    if matches!(node, Term::Literal(_)) {
        return Err(invalid(shape, sh.sparql, node, "expected a SPARQL constraint node"));
    }
    let select = select_text(ctx, shape, node)?;
    let prefixes = prefixes_for(ctx, shape, node)?;
    check_syntax(shape, sh.sparql, node, &prefixes, &select)?;
    let deactivated = match ctx.single(node, sh.deactivated)? {
        None => false,
        Some(Term::Literal(lit)) if lit.datatype() == xsd::BOOLEAN => lit.value() == "true",
        Some(other) => {
            return Err(invalid(shape, sh.deactivated, &other, "expected a boolean"));
        }
    };
    Ok(SparqlSpec {
        node: node.clone(),
        select,
        prefixes,
        message: ctx.message(node)?,
        deactivated,
    })
}

/// Reads the value of `sh:target`. Only SPARQL-based targets are understood;
/// `None` means the target is of some other kind.
pub(crate) fn parse_target(
    ctx: &ParsingContext<'_>,
    shape: &Term,
    node: &Term,
) -> Result<Option<Target>> {
    let sh = ctx.shacl();
    if !ctx.graph().has_statement_with(node, sh.select) {
        return Ok(None);
    }
    let select = select_text(ctx, shape, node)?;
    let prefixes = prefixes_for(ctx, shape, node)?;
    check_syntax(shape, sh.target, node, &prefixes, &select)?;
    Ok(Some(Target::Sparql { select, prefixes }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_nodes::SHACL;
    use oxigraph::model::{BlankNode, Graph, Literal, NamedNode, Triple};

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn declare(graph: &mut Graph, owner: &NamedNode, prefix: &str, namespace: &str) {
        let sh = SHACL::new();
        let decl = BlankNode::default();
        graph.insert(&Triple::new(owner.clone(), sh.declare, decl.clone()));
        graph.insert(&Triple::new(
            decl.clone(),
            sh.prefix,
            Literal::new_simple_literal(prefix),
        ));
        graph.insert(&Triple::new(
            decl,
            sh.namespace,
            Literal::new_typed_literal(namespace, xsd::ANY_URI),
        ));
    }

    fn constraint_graph(select: &str) -> Graph {
        let sh = SHACL::new();
        let mut graph = Graph::new();
        graph.insert(&Triple::new(nn("c"), sh.select, Literal::new_simple_literal(select)));
        graph.insert(&Triple::new(nn("c"), sh.prefixes, nn("ont")));
        declare(&mut graph, &nn("ont"), "ex", "http://example.org/");
        graph
    }

    #[test]
    fn prefixes_are_collected_and_queries_checked() {
        let graph = constraint_graph("SELECT $this WHERE { $this ex:p $PATH }");
        let ctx = ParsingContext::new(&graph);
        let spec = parse_constraint(&ctx, &nn("S").into(), &nn("c").into()).unwrap();
        assert_eq!(spec.prefixes, "PREFIX ex: <http://example.org/>");
        assert!(!spec.deactivated);
    }

    #[test]
    fn syntax_errors_fail_loading() {
        let graph = constraint_graph("SELECT $this WHERE { $this ex:p ");
        let ctx = ParsingContext::new(&graph);
        assert!(parse_constraint(&ctx, &nn("S").into(), &nn("c").into()).is_err());
    }

    #[test]
    fn conflicting_prefixes_are_rejected() {
        let mut graph = constraint_graph("SELECT $this WHERE { $this ex:p ?o }");
        declare(&mut graph, &nn("ont"), "ex", "http://other.org/");
        let ctx = ParsingContext::new(&graph);
        let err = parse_constraint(&ctx, &nn("S").into(), &nn("c").into()).unwrap_err();
        assert!(err.to_string().contains("duplicate prefix"));
    }
}
