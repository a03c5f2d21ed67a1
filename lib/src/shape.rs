use crate::model::components::Constraint;
use crate::path::Path;
use crate::types::{Severity, Target, ID};
use oxigraph::model::Term;
use std::collections::HashMap;

/// Declarations shared by node and property shapes.
#[derive(Debug, Clone)]
pub struct Attributes {
    /// The shape's own term (IRI or blank node).
    pub identifier: Term,
    pub targets: Vec<Target>,
    pub name: Option<Term>,
    pub description: Option<Term>,
    pub order: Option<Term>,
    pub group: Option<Term>,
    pub default_value: Option<Term>,
    pub deactivated: bool,
    pub message: Option<String>,
    pub severity: Severity,
    pub constraints: Vec<Constraint>,
}

impl Attributes {
    pub fn new(identifier: Term) -> Self {
        Attributes {
            identifier,
            targets: Vec::new(),
            name: None,
            description: None,
            order: None,
            group: None,
            default_value: None,
            deactivated: false,
            message: None,
            severity: Severity::default(),
            constraints: Vec::new(),
        }
    }

    /// The IRI of the shape, if it is not a blank node.
    pub fn uri(&self) -> Option<&str> {
        match &self.identifier {
            Term::NamedNode(nn) => Some(nn.as_str()),
            _ => None,
        }
    }

    pub fn id(&self) -> ID {
        ID::from(&self.identifier)
    }
}

#[derive(Debug, Clone)]
pub struct NodeShape {
    pub attributes: Attributes,
    /// `sh:property` shapes, in declaration order.
    pub properties: Vec<ID>,
}

impl NodeShape {
    pub fn identifier(&self) -> &Term {
        &self.attributes.identifier
    }
}

#[derive(Debug, Clone)]
pub struct PropertyShape {
    pub attributes: Attributes,
    pub path: Path,
}

impl PropertyShape {
    pub fn identifier(&self) -> &Term {
        &self.attributes.identifier
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Node(NodeShape),
    Property(PropertyShape),
}

impl Shape {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Shape::Node(s) => &s.attributes,
            Shape::Property(s) => &s.attributes,
        }
    }

    pub fn identifier(&self) -> &Term {
        &self.attributes().identifier
    }

    pub fn as_node(&self) -> Option<&NodeShape> {
        match self {
            Shape::Node(s) => Some(s),
            Shape::Property(_) => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyShape> {
        match self {
            Shape::Property(s) => Some(s),
            Shape::Node(_) => None,
        }
    }
}

/// The immutable result of loading a shapes graph.
#[derive(Debug, Default)]
pub struct ShapesModel {
    shapes: HashMap<ID, Shape>,
    node_shapes: Vec<ID>,
}

impl ShapesModel {
    pub(crate) fn new(shapes: HashMap<ID, Shape>, mut node_shapes: Vec<ID>) -> Self {
        node_shapes.dedup();
        ShapesModel {
            shapes,
            node_shapes,
        }
    }

    pub fn get(&self, id: ID) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_by_term(&self, term: &Term) -> Option<&Shape> {
        self.get(ID::from(term))
    }

    pub fn node_shape(&self, id: ID) -> Option<&NodeShape> {
        self.get(id).and_then(Shape::as_node)
    }

    pub fn property_shape(&self, id: ID) -> Option<&PropertyShape> {
        self.get(id).and_then(Shape::as_property)
    }

    /// Node shapes in load order.
    pub fn node_shapes(&self) -> impl Iterator<Item = &NodeShape> {
        self.node_shapes.iter().filter_map(|id| self.node_shape(*id))
    }

    pub fn shapes(&self) -> impl Iterator<Item = (&ID, &Shape)> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
