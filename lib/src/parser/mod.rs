//! Loads a shapes graph into an immutable [`ShapesModel`].
//!
//! Loading is fail fast: the first malformed use of SHACL vocabulary aborts with a
//! [`LoadError`]. Shape-valued parameters are stored as [`ID`]s and the referenced
//! shapes are queued, so recursive shape graphs load like any other.
mod components;
mod path;
mod sparql;

pub use components::{ConstraintBuilder, ConstraintEntry, ConstraintTable};

use crate::error::{LoadError, Result};
use crate::graph::{as_subject, GraphAccess};
use crate::named_nodes::SHACL;
use crate::shape::{Attributes, NodeShape, PropertyShape, Shape, ShapesModel};
use crate::types::{Severity, Target, ID};
use log::{debug, info, warn};
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{NamedNode, NamedNodeRef, Term};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet, VecDeque};

pub(crate) fn invalid(
    shape: &Term,
    predicate: NamedNodeRef<'_>,
    value: &Term,
    reason: impl Into<String>,
) -> LoadError {
    LoadError::InvalidValue {
        shape: shape.clone(),
        predicate: predicate.to_string(),
        value: value.clone(),
        reason: reason.into(),
    }
}

/// Loader state: the shapes graph, the shapes read so far and the queue of
/// referenced shapes still to read. Constraint builders receive it to read
/// parameters and to reference other shapes.
pub struct ParsingContext<'g> {
    graph: &'g dyn GraphAccess,
    shacl: SHACL,
    shapes: HashMap<ID, Shape>,
    node_shapes: Vec<ID>,
    queue: VecDeque<Term>,
    queued: HashSet<ID>,
}

impl<'g> ParsingContext<'g> {
    pub fn new(graph: &'g dyn GraphAccess) -> Self {
        ParsingContext {
            graph,
            shacl: SHACL::new(),
            shapes: HashMap::new(),
            node_shapes: Vec::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    pub fn graph(&self) -> &'g dyn GraphAccess {
        self.graph
    }

    pub fn shacl(&self) -> SHACL {
        self.shacl
    }

    /// Returns the ID of a shape and queues it for loading if it is new.
    pub fn reference(&mut self, term: &Term) -> ID {
        let id = ID::from(term);
        if self.queued.insert(id) {
            self.queue.push_back(term.clone());
        }
        id
    }

    /// The only value of `predicate` on `subject`; more than one is an error.
    pub fn single(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Result<Option<Term>> {
        let mut values = self.graph.objects(subject, predicate);
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.pop()),
            count => Err(LoadError::Repeated {
                shape: subject.clone(),
                predicate: predicate.to_string(),
                count,
            }),
        }
    }

    pub fn boolean(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Result<Option<bool>> {
        self.single(subject, predicate)?
            .map(|value| components::parse_boolean(subject, predicate, &value))
            .transpose()
    }

    /// Members of the RDF list starting at `head`.
    pub fn list(&self, shape: &Term, head: &Term) -> Result<Vec<Term>> {
        self.graph
            .list_items(head)
            .map_err(|source| LoadError::Graph {
                shape: shape.clone(),
                source,
            })
    }

    /// `sh:message` of a shape or constraint node. With several messages the one
    /// without a language tag wins, then English, then the first.
    pub fn message(&self, subject: &Term) -> Result<Option<String>> {
        let sh = self.shacl;
        let mut literals = Vec::new();
        for value in self.graph.objects(subject, sh.message) {
            match value {
                Term::Literal(lit) => literals.push(lit),
                other => return Err(invalid(subject, sh.message, &other, "expected a literal")),
            }
        }
        let chosen = literals
            .iter()
            .find(|lit| lit.language().is_none())
            .or_else(|| literals.iter().find(|lit| lit.language() == Some("en")))
            .or_else(|| literals.first());
        Ok(chosen.map(|lit| lit.value().to_string()))
    }
}

/// Reads shapes graphs using a [`ConstraintTable`].
#[derive(Clone, Default)]
pub struct ShapeLoader {
    table: ConstraintTable,
}

impl ShapeLoader {
    pub fn new(table: ConstraintTable) -> Self {
        ShapeLoader { table }
    }

    pub fn load(&self, graph: &dyn GraphAccess) -> Result<ShapesModel> {
        let mut ctx = ParsingContext::new(graph);
        for seed in discover_shapes(graph) {
            ctx.reference(&seed);
        }
        while let Some(term) = ctx.queue.pop_front() {
            let shape = self.load_shape(&mut ctx, &term)?;
            let id = ID::from(&term);
            if matches!(shape, Shape::Node(_)) {
                ctx.node_shapes.push(id);
            }
            ctx.shapes.insert(id, shape);
        }
        let model = ShapesModel::new(ctx.shapes, ctx.node_shapes);
        for cycle in shape_cycles(&model) {
            let names: Vec<String> = cycle
                .iter()
                .filter_map(|id| model.get(*id))
                .map(|s| s.identifier().to_string())
                .collect();
            warn!(
                "Recursive shape references: {}; re-entered checks are skipped",
                names.join(" -> ")
            );
        }
        info!(
            "Loaded {} shapes ({} node shapes)",
            model.len(),
            model.node_shapes().count()
        );
        Ok(model)
    }

    fn load_shape(&self, ctx: &mut ParsingContext<'_>, term: &Term) -> Result<Shape> {
        let sh = ctx.shacl();
        let Some(subject) = as_subject(term) else {
            return Err(invalid(term, sh.node, term, "a shape must be an IRI or blank node"));
        };
        let pred_obj_pairs: HashMap<NamedNode, Vec<Term>> = ctx
            .graph()
            .triples_matching(Some(subject), None, None)
            .into_iter()
            .fold(HashMap::new(), |mut acc, triple| {
                acc.entry(triple.predicate).or_default().push(triple.object);
                acc
            });

        let mut attributes = read_attributes(ctx, term, &pred_obj_pairs)?;
        attributes.constraints = self.table.build_all(ctx, term, &pred_obj_pairs)?;

        if let Some(paths) = pred_obj_pairs.get(&sh.path.into_owned()) {
            if paths.len() > 1 {
                return Err(LoadError::Repeated {
                    shape: term.clone(),
                    predicate: sh.path.to_string(),
                    count: paths.len(),
                });
            }
            let path = path::parse_path(ctx, term, &paths[0])?;
            if !attributes.targets.is_empty() {
                warn!("Targets on property shape {} are ignored", term);
                attributes.targets.clear();
            }
            if pred_obj_pairs.contains_key(&sh.property.into_owned()) {
                warn!("sh:property on property shape {} is ignored", term);
            }
            debug!("Loaded property shape {} with path {}", term, path);
            return Ok(Shape::Property(PropertyShape { attributes, path }));
        }

        if let Some(constraint) = attributes
            .constraints
            .iter()
            .find(|c| !c.can_be_used_on_node_shapes())
        {
            return Err(LoadError::InvalidValue {
                shape: term.clone(),
                predicate: constraint.component_iri().to_string(),
                value: term.clone(),
                reason: format!("{} is only allowed on property shapes", constraint.name()),
            });
        }

        let mut properties = Vec::new();
        for value in pred_obj_pairs
            .get(&sh.property.into_owned())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            if matches!(value, Term::Literal(_)) {
                return Err(invalid(term, sh.property, value, "expected a property shape"));
            }
            if !ctx.graph().has_statement_with(value, sh.path) {
                return Err(LoadError::Missing {
                    shape: value.clone(),
                    predicate: sh.path.to_string(),
                });
            }
            properties.push(ctx.reference(value));
        }

        let types = pred_obj_pairs
            .get(&rdf::TYPE.into_owned())
            .map(Vec::as_slice)
            .unwrap_or_default();
        if types.contains(&rdfs::CLASS.into_owned().into()) {
            attributes.targets.push(Target::Class(term.clone()));
        }
        debug!(
            "Loaded node shape {} with {} properties and {} constraints",
            term,
            properties.len(),
            attributes.constraints.len()
        );
        Ok(Shape::Node(NodeShape {
            attributes,
            properties,
        }))
    }
}

/// Shape roots: typed shapes and anything carrying a target.
fn discover_shapes(graph: &dyn GraphAccess) -> Vec<Term> {
    let sh = SHACL::new();
    let mut roots = Vec::new();
    for shape_type in [sh.node_shape, sh.property_shape] {
        roots.extend(graph.subjects(rdf::TYPE, &shape_type.into_owned().into()));
    }
    for target in [
        sh.target_class,
        sh.target_node,
        sh.target_subjects_of,
        sh.target_objects_of,
        sh.target,
    ] {
        roots.extend(
            graph
                .triples_matching(None, Some(target), None)
                .into_iter()
                .map(|t| Term::from(t.subject)),
        );
    }
    roots
}

fn read_attributes(
    ctx: &ParsingContext<'_>,
    term: &Term,
    pred_obj_pairs: &HashMap<NamedNode, Vec<Term>>,
) -> Result<Attributes> {
    let sh = ctx.shacl();
    let values = |p: NamedNodeRef<'_>| {
        pred_obj_pairs
            .get(&p.into_owned())
            .map(Vec::as_slice)
            .unwrap_or_default()
    };
    let mut attributes = Attributes::new(term.clone());

    for class in values(sh.target_class) {
        if matches!(class, Term::Literal(_)) {
            return Err(invalid(term, sh.target_class, class, "expected a class"));
        }
        attributes.targets.push(Target::Class(class.clone()));
    }
    for node in values(sh.target_node) {
        attributes.targets.push(Target::Node(node.clone()));
    }
    for (predicate, make) in [
        (sh.target_subjects_of, Target::SubjectsOf as fn(NamedNode) -> Target),
        (sh.target_objects_of, Target::ObjectsOf),
    ] {
        for value in values(predicate) {
            match value {
                Term::NamedNode(nn) => attributes.targets.push(make(nn.clone())),
                other => return Err(invalid(term, predicate, other, "expected a property IRI")),
            }
        }
    }
    for target in values(sh.target) {
        match sparql::parse_target(ctx, term, target)? {
            Some(t) => attributes.targets.push(t),
            None => warn!("Unsupported target {} on shape {} is ignored", target, term),
        }
    }

    attributes.name = values(sh.name).first().cloned();
    attributes.description = values(sh.description).first().cloned();
    attributes.order = ctx.single(term, sh.order)?;
    attributes.group = ctx.single(term, sh.group)?;
    attributes.default_value = ctx.single(term, sh.default_value)?;
    attributes.deactivated = ctx.boolean(term, sh.deactivated)?.unwrap_or(false);
    attributes.message = ctx.message(term)?;
    if let Some(severity) = ctx.single(term, sh.severity)? {
        attributes.severity = Severity::from_term(&severity)
            .ok_or_else(|| invalid(term, sh.severity, &severity, "not a SHACL severity"))?;
    }
    Ok(attributes)
}

/// Groups of shapes that reference each other through `sh:node`, `sh:property`,
/// the logical constraints or `sh:qualifiedValueShape`.
pub fn shape_cycles(model: &ShapesModel) -> Vec<Vec<ID>> {
    let mut graph: DiGraphMap<ID, ()> = DiGraphMap::new();
    for (id, shape) in model.shapes() {
        graph.add_node(*id);
        for constraint in &shape.attributes().constraints {
            for target in constraint.referenced_shapes() {
                graph.add_edge(*id, target, ());
            }
        }
        if let Shape::Node(node) = shape {
            for property in &node.properties {
                graph.add_edge(*id, *property, ());
            }
        }
    }
    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1 || graph.contains_edge(component[0], component[0]))
        .map(|mut component| {
            component.sort();
            component
        })
        .collect()
}
