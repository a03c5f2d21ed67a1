//! Read-only graph access used by the loader and the validator.
//!
//! Everything the engine needs from a triple store goes through [`GraphAccess`].
//! Only [`GraphAccess::triples_matching`] is required; SPARQL support is optional
//! and defaults to [`GraphError::Unsupported`].
use crate::error::GraphError;
use log::error;
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{
    Graph, NamedNodeRef, NamedOrBlankNodeRef, Term, TermRef, Triple,
};
use oxigraph::sparql::{QueryResults, SparqlEvaluator, Variable};
use oxigraph::store::Store;
use std::collections::{HashSet, VecDeque};

/// One row of a SPARQL SELECT result: variable name (without `?`) and bound term.
pub type Bindings = Vec<(String, Term)>;

/// Views a term as a triple subject, if it can be one.
pub fn as_subject(term: &Term) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        Term::NamedNode(n) => Some(n.as_ref().into()),
        Term::BlankNode(b) => Some(b.as_ref().into()),
        _ => None,
    }
}

pub trait GraphAccess: Send + Sync {
    /// All triples matching the pattern; `None` is a wildcard.
    fn triples_matching(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple>;

    /// Runs a SELECT query with pre-bound variables.
    fn select(
        &self,
        _query: &str,
        _bindings: &[(Variable, Term)],
    ) -> Result<Vec<Bindings>, GraphError> {
        Err(GraphError::Unsupported("SPARQL queries"))
    }

    fn objects(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        let Some(s) = as_subject(subject) else {
            return Vec::new();
        };
        self.triples_matching(Some(s), Some(predicate), None)
            .into_iter()
            .map(|t| t.object)
            .collect()
    }

    /// The object of the first statement `(subject, predicate, ?)`.
    fn object(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Option<Term> {
        self.objects(subject, predicate).into_iter().next()
    }

    fn subjects(&self, predicate: NamedNodeRef<'_>, object: &Term) -> Vec<Term> {
        self.triples_matching(None, Some(predicate), Some(object.as_ref()))
            .into_iter()
            .map(|t| t.subject.into())
            .collect()
    }

    fn has_statement_with(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> bool {
        !self.objects(subject, predicate).is_empty()
    }

    /// Asserted `rdf:type`s of a node.
    fn types_of(&self, node: &Term) -> Vec<Term> {
        self.objects(node, rdf::TYPE)
    }

    /// Every class reachable from `class` through `rdfs:subClassOf`, excluding `class`
    /// itself unless it sits on a cycle.
    fn superclasses(&self, class: &Term) -> Vec<Term> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<Term> = self.objects(class, rdfs::SUB_CLASS_OF).into();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.objects(&next, rdfs::SUB_CLASS_OF));
            out.push(next);
        }
        out
    }

    /// Asserted types plus all of their superclasses.
    fn type_closure(&self, node: &Term) -> HashSet<Term> {
        let mut closure = HashSet::new();
        for ty in self.types_of(node) {
            closure.extend(self.superclasses(&ty));
            closure.insert(ty);
        }
        closure
    }

    /// Decodes an `rdf:first`/`rdf:rest` list into its members.
    fn list_items(&self, head: &Term) -> Result<Vec<Term>, GraphError> {
        let nil = Term::from(rdf::NIL.into_owned());
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut current = head.clone();
        while current != nil {
            if !visited.insert(current.clone()) {
                return Err(GraphError::MalformedList {
                    head: head.clone(),
                    reason: "list is cyclic".to_string(),
                });
            }
            let first = self
                .object(&current, rdf::FIRST)
                .ok_or_else(|| GraphError::MalformedList {
                    head: head.clone(),
                    reason: format!("{} has no rdf:first", current),
                })?;
            items.push(first);
            current = self
                .object(&current, rdf::REST)
                .ok_or_else(|| GraphError::MalformedList {
                    head: head.clone(),
                    reason: format!("{} has no rdf:rest", current),
                })?;
        }
        Ok(items)
    }
}

impl GraphAccess for Graph {
    fn triples_matching(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple> {
        let keep = |t: &oxigraph::model::TripleRef<'_>| {
            predicate.map_or(true, |p| t.predicate == p) && object.map_or(true, |o| t.object == o)
        };
        match (subject, predicate, object) {
            (Some(s), _, _) => self
                .triples_for_subject(s)
                .filter(keep)
                .map(|t| t.into_owned())
                .collect(),
            (None, _, Some(o)) => self
                .triples_for_object(o)
                .filter(keep)
                .map(|t| t.into_owned())
                .collect(),
            (None, Some(p), None) => self
                .triples_for_predicate(p)
                .map(|t| t.into_owned())
                .collect(),
            (None, None, None) => self.iter().map(|t| t.into_owned()).collect(),
        }
    }
}

impl GraphAccess for Store {
    fn triples_matching(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for quad in self.quads_for_pattern(subject, predicate, object, None) {
            match quad {
                Ok(quad) => {
                    let triple = Triple::from(quad);
                    if seen.insert(triple.clone()) {
                        out.push(triple);
                    }
                }
                Err(e) => error!("Error reading from store: {}", e),
            }
        }
        out
    }

    fn select(
        &self,
        query: &str,
        bindings: &[(Variable, Term)],
    ) -> Result<Vec<Bindings>, GraphError> {
        let mut prepared = SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| GraphError::Query(e.to_string()))?;
        prepared.dataset_mut().set_default_graph_as_union();
        let mut bound = prepared.on_store(self);
        for (variable, term) in bindings {
            bound = bound.substitute_variable(variable.clone(), term.clone());
        }
        match bound.execute().map_err(|e| GraphError::Query(e.to_string()))? {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| GraphError::Query(e.to_string()))?;
                    rows.push(
                        solution
                            .iter()
                            .map(|(var, term)| (var.as_str().to_string(), term.clone()))
                            .collect(),
                    );
                }
                Ok(rows)
            }
            _ => Err(GraphError::Query(
                "expected a SELECT query returning solutions".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.insert(&Triple::new(nn("rex"), rdf::TYPE, nn("Dog")));
        g.insert(&Triple::new(nn("Dog"), rdfs::SUB_CLASS_OF, nn("Mammal")));
        g.insert(&Triple::new(nn("Mammal"), rdfs::SUB_CLASS_OF, nn("Animal")));
        g.insert(&Triple::new(nn("Animal"), rdfs::SUB_CLASS_OF, nn("Mammal")));
        g.insert(&Triple::new(nn("rex"), nn("name"), Literal::new_simple_literal("Rex")));
        g
    }

    #[test]
    fn type_closure_walks_cyclic_hierarchies() {
        let g = sample();
        let closure = g.type_closure(&nn("rex").into());
        for class in ["Dog", "Mammal", "Animal"] {
            assert!(closure.contains(&Term::from(nn(class))), "missing {}", class);
        }
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn pattern_queries_filter_every_position() {
        let g = sample();
        let rex = Term::from(nn("rex"));
        assert_eq!(g.objects(&rex, nn("name").as_ref()).len(), 1);
        assert_eq!(
            g.triples_matching(None, Some(rdf::TYPE), Some(nn("Dog").as_ref().into()))
                .len(),
            1
        );
        assert!(g.object(&Term::from(Literal::new_simple_literal("x")), rdf::TYPE).is_none());
        assert!(g.select("SELECT * WHERE { ?s ?p ?o }", &[]).is_err());
    }

    #[test]
    fn lists_decode_and_reject_cycles() {
        let mut g = Graph::new();
        let a = nn("l1");
        let b = nn("l2");
        g.insert(&Triple::new(a.clone(), rdf::FIRST, Literal::from(1)));
        g.insert(&Triple::new(a.clone(), rdf::REST, b.clone()));
        g.insert(&Triple::new(b.clone(), rdf::FIRST, Literal::from(2)));
        g.insert(&Triple::new(b.clone(), rdf::REST, rdf::NIL));
        assert_eq!(g.list_items(&a.clone().into()).map(|v| v.len()).ok(), Some(2));

        g.remove(&Triple::new(b.clone(), rdf::REST, rdf::NIL));
        g.insert(&Triple::new(b, rdf::REST, a.clone()));
        assert!(g.list_items(&a.into()).is_err());
    }

    #[test]
    fn store_runs_select_with_bound_this() {
        let store = Store::new().expect("store");
        for t in sample().iter() {
            store
                .insert(t.in_graph(oxigraph::model::GraphNameRef::DefaultGraph))
                .expect("insert");
        }
        let rows = store
            .select(
                "SELECT ?name WHERE { $this <http://example.org/name> ?name }",
                &[(Variable::new_unchecked("this"), nn("rex").into())],
            )
            .expect("query");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].0, "name");
    }
}
