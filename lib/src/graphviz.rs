//! DOT rendering of a loaded shapes graph.
use crate::components::{label_term, GraphvizOutput};
use crate::shape::{Shape, ShapesModel};
use crate::types::{ComponentID, ID};

/// `n<id>` for node shapes, `p<id>` for property shapes.
pub(crate) fn shape_graphviz_id(id: ID, shapes: &ShapesModel) -> String {
    match shapes.get(id) {
        Some(Shape::Property(_)) => format!("p{}", id.0),
        _ => id.to_graphviz_id(),
    }
}

/// Node shapes, property shapes and their constraints as a Graphviz digraph.
pub fn to_graphviz(shapes: &ShapesModel) -> String {
    let mut ordered: Vec<(&ID, &Shape)> = shapes.shapes().collect();
    ordered.sort_by_key(|(id, _)| **id);

    let mut dot_string = String::new();
    dot_string.push_str("digraph {\n");
    for (id, shape) in &ordered {
        let shape_id = shape_graphviz_id(**id, shapes);
        match shape {
            Shape::Node(node) => {
                dot_string.push_str(&format!(
                    "  {} [label=\"NodeShape\\n{}\"];\n",
                    shape_id,
                    label_term(node.identifier())
                ));
                for property in &node.properties {
                    dot_string.push_str(&format!(
                        "    {} -> {};\n",
                        shape_id,
                        shape_graphviz_id(*property, shapes)
                    ));
                }
            }
            Shape::Property(property) => {
                dot_string.push_str(&format!(
                    "  {} [label=\"PropertyShape\\nPath: {}\"];\n",
                    shape_id,
                    property.path.to_string().replace('"', "\\\"")
                ));
            }
        }
        for (index, constraint) in shape.attributes().constraints.iter().enumerate() {
            let component = ComponentID { shape: **id, index };
            dot_string.push_str(&format!(
                "    {} -> {};\n",
                shape_id,
                component.to_graphviz_id()
            ));
            constraint
                .to_graphviz_string(component, shapes)
                .lines()
                .for_each(|line| dot_string.push_str(&format!("    {}\n", line.trim_start())));
        }
    }
    dot_string.push_str("}\n");
    dot_string
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ShapeLoader;
    use oxigraph::io::{RdfFormat, RdfParser};
    use oxigraph::model::{Graph, Triple};

    #[test]
    fn shapes_constraints_and_references_are_drawn() {
        let ttl = r#"
            @prefix sh: <http://www.w3.org/ns/shacl#> .
            @prefix ex: <http://example.org/> .
            ex:PersonShape a sh:NodeShape ;
                sh:targetClass ex:Person ;
                sh:property [ sh:path ex:knows ; sh:node ex:PersonShape ; sh:maxCount 5 ] .
        "#;
        let mut graph = Graph::new();
        for quad in RdfParser::from_format(RdfFormat::Turtle).for_reader(ttl.as_bytes()) {
            graph.insert(&Triple::from(quad.unwrap()));
        }
        let model = ShapeLoader::default().load(&graph).unwrap();
        let dot = to_graphviz(&model);

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("[label=\"NodeShape\\nPersonShape\"]"));
        assert!(dot.contains("PropertyShape\\nPath: <http://example.org/knows>"));
        assert!(dot.contains("MaxCount: 5"));
        assert!(dot.contains("style=dashed"));
        assert!(dot.lines().any(|l| l.trim_start().starts_with('p')));
    }
}
