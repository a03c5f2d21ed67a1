//! The validation driver.
//!
//! A [`Validator`] pairs an immutable [`ShapesModel`] with a read-only data graph.
//! It builds its shape index once; after that every method takes `&self`, so
//! elements can be validated from many threads at once.
use crate::components::{ScriptFunction, ScriptLoader};
use crate::graph::{as_subject, GraphAccess};
use crate::model::components::{Constraint, JsSpec};
use crate::path::distinct_values;
use crate::report::ValidationReport;
use crate::shape::{NodeShape, PropertyShape, Shape, ShapesModel};
use crate::types::{Target, ID};
use crate::violation::{EvaluationContext, Violation};
use log::{debug, info, warn};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNode, Term};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Nested shape evaluations (`sh:node`, `sh:and`, ...) deeper than this are cut off
/// with a processing violation.
pub const MAX_RECURSION_DEPTH: usize = 50;

/// The (focus node, shape) pairs under evaluation, innermost first.
///
/// Each nested shape check pushes a frame. A pair that is already on the trail is
/// not evaluated again and counts as conforming.
#[derive(Clone, Copy, Default)]
pub struct Trail<'t> {
    top: Option<&'t Frame<'t>>,
    depth: usize,
}

struct Frame<'t> {
    focus: &'t Term,
    shape: ID,
    below: Trail<'t>,
}

impl<'t> Trail<'t> {
    /// Number of enclosing shape evaluations.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn contains(&self, focus: &Term, shape: ID) -> bool {
        let mut current = self.top;
        while let Some(frame) = current {
            if frame.shape == shape && frame.focus == focus {
                return true;
            }
            current = frame.below.top;
        }
        false
    }

    /// Runs `f` with `(focus, shape)` pushed on top of this trail.
    pub(crate) fn enter<R>(self, focus: &Term, shape: ID, f: impl FnOnce(Trail<'_>) -> R) -> R {
        let frame = Frame {
            focus,
            shape,
            below: self,
        };
        f(Trail {
            top: Some(&frame),
            depth: self.depth + 1,
        })
    }
}

/// Node shapes keyed by what makes them apply to a node.
#[derive(Debug, Default)]
struct ShapeIndex {
    by_class: HashMap<Term, Vec<ID>>,
    by_subjects_of: HashMap<NamedNode, Vec<ID>>,
    by_objects_of: HashMap<NamedNode, Vec<ID>>,
    /// Explicit `sh:targetNode`s and the focus nodes selected by SPARQL targets.
    by_node: HashMap<Term, Vec<ID>>,
}

fn push_unique<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Vec<ID>>, key: K, id: ID) {
    let ids = map.entry(key).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

impl ShapeIndex {
    fn build(shapes: &ShapesModel, data: &dyn GraphAccess) -> Self {
        let mut index = ShapeIndex::default();
        for shape in shapes.node_shapes() {
            let id = shape.attributes.id();
            for target in &shape.attributes.targets {
                match target {
                    Target::Class(class) => push_unique(&mut index.by_class, class.clone(), id),
                    Target::Node(node) => push_unique(&mut index.by_node, node.clone(), id),
                    Target::SubjectsOf(p) => push_unique(&mut index.by_subjects_of, p.clone(), id),
                    Target::ObjectsOf(p) => push_unique(&mut index.by_objects_of, p.clone(), id),
                    Target::Sparql { .. } => {
                        for node in sparql_target_nodes(target, data) {
                            push_unique(&mut index.by_node, node, id);
                        }
                    }
                }
            }
        }
        index
    }
}

/// Focus nodes selected by a SPARQL target (`?this` of every solution).
fn sparql_target_nodes(target: &Target, data: &dyn GraphAccess) -> Vec<Term> {
    let Some(query) = target.sparql_query() else {
        return Vec::new();
    };
    match data.select(&query, &[]) {
        Ok(rows) => rows
            .into_iter()
            .filter_map(|row| row.into_iter().find(|(name, _)| name == "this").map(|(_, t)| t))
            .collect(),
        Err(e) => {
            warn!("SPARQL target could not be evaluated: {}", e);
            Vec::new()
        }
    }
}

pub struct Validator<'a> {
    shapes: &'a ShapesModel,
    data: &'a dyn GraphAccess,
    index: ShapeIndex,
    superclasses: papaya::HashMap<Term, Arc<Vec<Term>>>,
    scripts: HashMap<JsSpec, Result<Arc<dyn ScriptFunction>, String>>,
    max_depth: usize,
}

impl<'a> Validator<'a> {
    pub fn new(shapes: &'a ShapesModel, data: &'a dyn GraphAccess) -> Self {
        let index = ShapeIndex::build(shapes, data);
        debug!(
            "shape index: {} class targets, {} subjectsOf, {} objectsOf, {} node targets",
            index.by_class.len(),
            index.by_subjects_of.len(),
            index.by_objects_of.len(),
            index.by_node.len()
        );
        Validator {
            shapes,
            data,
            index,
            superclasses: papaya::HashMap::new(),
            scripts: HashMap::new(),
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    /// Resolves every `sh:js` function of the shapes model through `loader`.
    pub fn with_script_loader(mut self, loader: &dyn ScriptLoader) -> Self {
        self.scripts = self
            .shapes
            .shapes()
            .flat_map(|(_, shape)| shape.attributes().constraints.iter())
            .filter_map(|c| match c {
                Constraint::Js(spec) => Some(spec.clone()),
                _ => None,
            })
            .map(|spec| {
                let function = loader.load(&spec.library, &spec.function);
                if let Err(e) = &function {
                    warn!("script function {} unavailable: {}", spec.function, e);
                }
                (spec, function)
            })
            .collect();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn data(&self) -> &dyn GraphAccess {
        self.data
    }

    pub fn shapes(&self) -> &ShapesModel {
        self.shapes
    }

    pub(crate) fn script(&self, spec: &JsSpec) -> Result<Arc<dyn ScriptFunction>, String> {
        match self.scripts.get(spec) {
            Some(resolved) => resolved.clone(),
            None => Err("no script loader configured".to_string()),
        }
    }

    fn superclasses_of(&self, class: &Term) -> Arc<Vec<Term>> {
        let cache = self.superclasses.pin();
        if let Some(found) = cache.get(class) {
            return found.clone();
        }
        let computed = Arc::new(self.data.superclasses(class));
        cache.insert(class.clone(), computed.clone());
        computed
    }

    /// Asserted types of `node` plus all their superclasses.
    pub fn type_closure(&self, node: &Term) -> HashSet<Term> {
        let mut closure = HashSet::new();
        for ty in self.data.types_of(node) {
            closure.extend(self.superclasses_of(&ty).iter().cloned());
            closure.insert(ty);
        }
        closure
    }

    /// Node shapes that apply to `node`, in a stable order without duplicates.
    pub fn applicable_shapes(&self, node: &Term) -> Vec<&'a NodeShape> {
        let mut ids: Vec<ID> = Vec::new();
        let mut add = |found: Option<&Vec<ID>>| {
            for id in found.into_iter().flatten() {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        };

        add(self.index.by_node.get(node));
        let mut classes: Vec<Term> = self.type_closure(node).into_iter().collect();
        classes.sort_by_cached_key(Term::to_string);
        for class in &classes {
            add(self.index.by_class.get(class));
        }
        if let Some(subject) = as_subject(node) {
            for triple in self.data.triples_matching(Some(subject), None, None) {
                add(self.index.by_subjects_of.get(&triple.predicate));
            }
        }
        for triple in self.data.triples_matching(None, None, Some(node.as_ref())) {
            add(self.index.by_objects_of.get(&triple.predicate));
        }

        let shapes = self.shapes;
        ids.into_iter()
            .filter_map(|id| shapes.node_shape(id))
            .filter(|s| !s.attributes.deactivated)
            .collect()
    }

    /// Validates `node` against every shape that applies to it.
    pub fn validate_element(&self, node: &Term) -> Vec<Violation> {
        self.applicable_shapes(node)
            .into_iter()
            .flat_map(|shape| self.validate_shape_for_element(node, shape))
            .collect()
    }

    /// Validates `node` against one node shape, regardless of its targets.
    pub fn validate_shape_for_element(&self, node: &Term, shape: &NodeShape) -> Vec<Violation> {
        Trail::default().enter(node, shape.attributes.id(), |trail| {
            self.evaluate_node_shape(node, shape, trail)
        })
    }

    /// Evaluates any shape for a focus node inside the nested evaluations on `trail`
    /// (`Trail::default()` at the top level).
    pub fn evaluate_shape(&self, focus: &Term, id: ID, trail: Trail<'_>) -> Vec<Violation> {
        let Some(shape) = self.shapes.get(id) else {
            return vec![Violation::processing(
                EvaluationContext::for_node(focus, focus),
                format!("reference to unknown shape {}", id),
                None,
            )];
        };
        if trail.contains(focus, id) {
            debug!("{} is already being checked against {}", focus, shape.identifier());
            return Vec::new();
        }
        if trail.depth() > self.max_depth {
            return vec![Violation::processing(
                EvaluationContext::for_node(focus, shape.identifier()),
                format!(
                    "recursion limit of {} nested shapes exceeded at {}",
                    self.max_depth,
                    shape.identifier()
                ),
                None,
            )];
        }
        trail.enter(focus, id, |trail| match shape {
            Shape::Node(node) => self.evaluate_node_shape(focus, node, trail),
            Shape::Property(property) => {
                self.evaluate_property_shape(focus, property, property.identifier(), trail)
            }
        })
    }

    fn evaluate_node_shape(&self, focus: &Term, shape: &NodeShape, trail: Trail<'_>) -> Vec<Violation> {
        if shape.attributes.deactivated {
            return Vec::new();
        }
        let mut violations = Vec::new();
        for property in shape
            .properties
            .iter()
            .filter_map(|id| self.shapes.property_shape(*id))
        {
            violations.extend(self.evaluate_property_shape(
                focus,
                property,
                shape.identifier(),
                trail,
            ));
        }
        let ctx = EvaluationContext::for_node(focus, shape.identifier());
        for constraint in shape
            .attributes
            .constraints
            .iter()
            .filter(|c| c.can_be_used_on_node_shapes())
        {
            violations.extend(constraint.apply(Some(focus), &ctx, self, trail));
        }
        violations
    }

    fn evaluate_property_shape(
        &self,
        focus: &Term,
        property: &PropertyShape,
        parent: &Term,
        trail: Trail<'_>,
    ) -> Vec<Violation> {
        if property.attributes.deactivated {
            return Vec::new();
        }
        let reached = property.path.evaluate(focus, self.data);
        let values = distinct_values(&reached);
        let ctx = EvaluationContext::for_property(focus, parent, property, reached);
        let mut violations = Vec::new();
        for constraint in &property.attributes.constraints {
            if constraint.is_value_set_constraint() {
                violations.extend(constraint.apply(None, &ctx, self, trail));
            } else {
                for value in &values {
                    violations.extend(constraint.apply(Some(value), &ctx, self, trail));
                }
            }
        }
        violations
    }

    /// Focus nodes selected by the targets of `shape`.
    pub fn focus_nodes(&self, shape: &NodeShape) -> Vec<Term> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for target in &shape.attributes.targets {
            let found: Vec<Term> = match target {
                Target::Node(node) => vec![node.clone()],
                Target::Class(class) => self.instances_of(class),
                Target::SubjectsOf(p) => self
                    .data
                    .triples_matching(None, Some(p.as_ref()), None)
                    .into_iter()
                    .map(|t| t.subject.into())
                    .collect(),
                Target::ObjectsOf(p) => self
                    .data
                    .triples_matching(None, Some(p.as_ref()), None)
                    .into_iter()
                    .map(|t| t.object)
                    .collect(),
                Target::Sparql { .. } => sparql_target_nodes(target, self.data),
            };
            out.extend(found.into_iter().filter(|t| seen.insert(t.clone())));
        }
        out
    }

    /// Nodes typed with `class` or one of its subclasses.
    fn instances_of(&self, class: &Term) -> Vec<Term> {
        self.data
            .triples_matching(None, Some(rdf::TYPE), None)
            .into_iter()
            .filter(|t| &t.object == class || self.superclasses_of(&t.object).contains(class))
            .map(|t| t.subject.into())
            .collect()
    }

    /// Validates every focus node of every active node shape, in parallel.
    pub fn validate_all(&self) -> ValidationReport {
        let work: Vec<(Term, &NodeShape)> = self
            .shapes
            .node_shapes()
            .filter(|s| !s.attributes.deactivated)
            .flat_map(|shape| {
                self.focus_nodes(shape)
                    .into_iter()
                    .map(move |node| (node, shape))
            })
            .collect();
        info!("validating {} (focus node, shape) pairs", work.len());
        let violations: Vec<Violation> = work
            .par_iter()
            .flat_map_iter(|(node, shape)| self.validate_shape_for_element(node, shape))
            .collect();
        info!("validation produced {} result(s)", violations.len());
        ValidationReport::new(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::vocab::rdfs;
    use oxigraph::model::{Graph, Triple};

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    #[test]
    fn type_closure_is_memoised_per_class() {
        let mut g = Graph::new();
        g.insert(&Triple::new(nn("rex"), rdf::TYPE, nn("Dog")));
        g.insert(&Triple::new(nn("Dog"), rdfs::SUB_CLASS_OF, nn("Animal")));
        let shapes = ShapesModel::default();
        let validator = Validator::new(&shapes, &g);
        let closure = validator.type_closure(&nn("rex").into());
        assert!(closure.contains(&Term::from(nn("Animal"))));
        assert!(closure.contains(&Term::from(nn("Dog"))));
        assert_eq!(
            validator.instances_of(&nn("Animal").into()),
            vec![Term::from(nn("rex"))]
        );
    }

    #[test]
    fn trails_remember_enclosing_pairs() {
        let (a, b) = (Term::from(nn("a")), Term::from(nn("b")));
        let shape = ID::from(&Term::from(nn("S")));
        let other = ID::from(&Term::from(nn("T")));
        let root = Trail::default();
        assert_eq!(root.depth(), 0);
        root.enter(&a, shape, |outer| {
            outer.enter(&b, shape, |inner| {
                assert_eq!(inner.depth(), 2);
                assert!(inner.contains(&a, shape));
                assert!(inner.contains(&b, shape));
                assert!(!inner.contains(&a, other));
            });
            assert!(!outer.contains(&b, shape));
        });
    }
}
