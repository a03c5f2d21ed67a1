//! `sh:path` values into the [`Path`] algebra.
use super::{invalid, ParsingContext};
use crate::error::{LoadError, Result};
use crate::path::Path;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNodeRef, Term};

/// Paths nested deeper than this are rejected; real paths are a handful of levels.
const MAX_PATH_DEPTH: usize = 64;

pub(crate) fn parse_path(ctx: &ParsingContext<'_>, shape: &Term, term: &Term) -> Result<Path> {
    parse_at_depth(ctx, shape, term, 0)
}

fn parse_at_depth(
    ctx: &ParsingContext<'_>,
    shape: &Term,
    term: &Term,
    depth: usize,
) -> Result<Path> {
    let sh = ctx.shacl();
    if depth > MAX_PATH_DEPTH {
        return Err(invalid(shape, sh.path, term, "path is nested too deeply"));
    }
    let graph = ctx.graph();
    match term {
        Term::NamedNode(nn) if *nn == rdf::NIL => {
            Err(invalid(shape, sh.path, term, "empty sequence path"))
        }
        Term::NamedNode(nn) => Ok(Path::Predicate(nn.clone())),
        Term::Literal(_) => Err(invalid(shape, sh.path, term, "a path must be an IRI or blank node")),
        Term::BlankNode(_) => {
            if graph.has_statement_with(term, rdf::FIRST) {
                let steps = parse_members(ctx, shape, term, sh.path, depth)?;
                return match steps.len() {
                    0 | 1 => Err(invalid(
                        shape,
                        sh.path,
                        term,
                        "a sequence path needs at least two members",
                    )),
                    _ => Ok(Path::Sequence(steps)),
                };
            }

            let unary: [(NamedNodeRef<'static>, fn(Box<Path>) -> Path); 4] = [
                (sh.inverse_path, Path::Inverse),
                (sh.zero_or_more_path, Path::ZeroOrMore),
                (sh.one_or_more_path, Path::OneOrMore),
                (sh.zero_or_one_path, Path::ZeroOrOne),
            ];
            for (predicate, build) in unary {
                if let Some(inner) = ctx.single(term, predicate)? {
                    let inner = parse_at_depth(ctx, shape, &inner, depth + 1)?;
                    return Ok(build(Box::new(inner)));
                }
            }

            if let Some(head) = ctx.single(term, sh.alternative_path)? {
                let options = parse_members(ctx, shape, &head, sh.alternative_path, depth)?;
                if options.len() < 2 {
                    return Err(invalid(
                        shape,
                        sh.alternative_path,
                        &head,
                        "an alternative path needs at least two members",
                    ));
                }
                return Ok(Path::Alternative(options));
            }

            Err(invalid(shape, sh.path, term, "not a recognised SHACL path"))
        }
        _ => Err(invalid(shape, sh.path, term, "unsupported path term")),
    }
}

fn parse_members(
    ctx: &ParsingContext<'_>,
    shape: &Term,
    head: &Term,
    predicate: NamedNodeRef<'_>,
    depth: usize,
) -> Result<Vec<Path>> {
    ctx.graph()
        .list_items(head)
        .map_err(|source| LoadError::Graph {
            shape: shape.clone(),
            source,
        })?
        .iter()
        .map(|member| {
            parse_at_depth(ctx, shape, member, depth + 1).map_err(|e| match e {
                LoadError::InvalidValue { reason, .. } => invalid(shape, predicate, member, reason),
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_nodes::SHACL;
    use oxigraph::model::{BlankNode, Graph, Literal, NamedNode, Triple};

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn list(graph: &mut Graph, items: Vec<Term>) -> Term {
        let mut rest: Term = rdf::NIL.into_owned().into();
        for item in items.into_iter().rev() {
            let cell = BlankNode::default();
            graph.insert(&Triple::new(cell.clone(), rdf::FIRST, item));
            graph.insert(&Triple::new(cell.clone(), rdf::REST, rest));
            rest = cell.into();
        }
        rest
    }

    #[test]
    fn nested_paths_are_decoded() {
        let sh = SHACL::new();
        let mut graph = Graph::new();
        let inverse = BlankNode::default();
        graph.insert(&Triple::new(inverse.clone(), sh.inverse_path, nn("parent")));
        let star = BlankNode::default();
        graph.insert(&Triple::new(star.clone(), sh.zero_or_more_path, nn("knows")));
        let alt = BlankNode::default();
        let options = list(&mut graph, vec![nn("a").into(), nn("b").into()]);
        graph.insert(&Triple::new(alt.clone(), sh.alternative_path, options));
        let seq = list(&mut graph, vec![inverse.into(), star.into(), alt.into()]);

        let ctx = ParsingContext::new(&graph);
        let path = parse_path(&ctx, &nn("S").into(), &seq).unwrap();
        assert_eq!(
            path,
            Path::Sequence(vec![
                Path::Inverse(Box::new(Path::Predicate(nn("parent")))),
                Path::ZeroOrMore(Box::new(Path::Predicate(nn("knows")))),
                Path::Alternative(vec![Path::Predicate(nn("a")), Path::Predicate(nn("b"))]),
            ])
        );
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let graph = Graph::new();
        let ctx = ParsingContext::new(&graph);
        let shape: Term = nn("S").into();
        let literal: Term = Literal::new_simple_literal("name").into();
        assert!(matches!(
            parse_path(&ctx, &shape, &literal),
            Err(LoadError::InvalidValue { .. })
        ));
        let empty: Term = BlankNode::default().into();
        assert!(parse_path(&ctx, &shape, &empty).is_err());
    }
}
