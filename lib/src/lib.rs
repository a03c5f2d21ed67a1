//! A SHACL shape and constraint validation engine over Oxigraph graphs, with
//! W3C validation reports and compiler-style diagnostics.
#![deny(clippy::all)]

// Publicly visible items
pub mod comparison;
pub mod components;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod graphviz;
pub mod model;
pub mod named_nodes;
pub mod parser;
pub mod path;
pub mod report;
pub mod shape;
pub mod types;
pub mod validate;
pub mod violation;

pub use components::{ScriptFunction, ScriptLoader, ScriptRegistry};
pub use diagnostics::{DiagnosticFormatter, SourceMap};
pub use error::{GraphError, LoadError};
pub use graph::GraphAccess;
pub use parser::{ConstraintTable, ShapeLoader};
pub use report::ValidationReport;
pub use shape::ShapesModel;
pub use validate::{Trail, Validator, MAX_RECURSION_DEPTH};
pub use violation::{Violation, ViolationKind};

use log::info;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::store::Store;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path as FsPath, PathBuf};

/// Where a shapes or data graph comes from.
#[derive(Debug)]
pub enum Source {
    /// A local file; the RDF format is guessed from the extension (Turtle otherwise).
    File(PathBuf),
    /// In-memory RDF text.
    Text { content: String, format: RdfFormat },
}

/// The RDF format for a file extension, defaulting to Turtle.
pub fn format_for_path(path: &FsPath) -> RdfFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::Turtle)
}

/// Parses a source into a fresh store. File sources use their `file://` URL as base IRI.
pub fn read_store(source: &Source) -> Result<Store, Box<dyn Error>> {
    let store = Store::new()?;
    match source {
        Source::File(path) => {
            let absolute = std::fs::canonicalize(path)?;
            let base = url::Url::from_file_path(&absolute)
                .map_err(|_| format!("cannot derive a base IRI from {}", absolute.display()))?;
            let parser = RdfParser::from_format(format_for_path(path)).with_base_iri(base.as_str())?;
            store.load_from_reader(parser, BufReader::new(File::open(&absolute)?))?;
            info!("Loaded {} ({} triples)", absolute.display(), store.len()?);
        }
        Source::Text { content, format } => {
            store.load_from_reader(*format, content.as_bytes())?;
        }
    }
    Ok(store)
}

/// A simple facade over loading and validation.
///
/// It owns the data graph and the loaded shapes; for finer control build a
/// [`ShapesModel`] with [`ShapeLoader`] and run a [`Validator`] directly.
pub struct ShaclEngine {
    data: Store,
    shapes: ShapesModel,
    scripts: Option<Box<dyn ScriptLoader>>,
    max_depth: usize,
}

impl ShaclEngine {
    /// Creates an engine from local files.
    pub fn from_files(shape_graph_path: &str, data_graph_path: &str) -> Result<Self, Box<dyn Error>> {
        Self::from_sources(
            Source::File(PathBuf::from(shape_graph_path)),
            Source::File(PathBuf::from(data_graph_path)),
        )
    }

    /// Creates an engine from a shapes source and a data source.
    pub fn from_sources(shapes_source: Source, data_source: Source) -> Result<Self, Box<dyn Error>> {
        Self::with_loader(&ShapeLoader::default(), shapes_source, data_source)
    }

    /// Like [`ShaclEngine::from_sources`] with a custom loader (and constraint table).
    pub fn with_loader(
        loader: &ShapeLoader,
        shapes_source: Source,
        data_source: Source,
    ) -> Result<Self, Box<dyn Error>> {
        let shapes_store = read_store(&shapes_source)?;
        let shapes = loader.load(&shapes_store)?;
        let data = read_store(&data_source)?;
        Ok(ShaclEngine {
            data,
            shapes,
            scripts: None,
            max_depth: MAX_RECURSION_DEPTH,
        })
    }

    /// Resolves `sh:js` functions through `loader` when validating.
    pub fn with_script_loader(mut self, loader: impl ScriptLoader + 'static) -> Self {
        self.scripts = Some(Box::new(loader));
        self
    }

    /// Overrides the nesting limit for shape references (default [`MAX_RECURSION_DEPTH`]).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The loaded shapes.
    pub fn shapes(&self) -> &ShapesModel {
        &self.shapes
    }

    /// The data graph.
    pub fn data(&self) -> &Store {
        &self.data
    }

    /// A validator borrowing this engine's shapes and data.
    pub fn validator(&self) -> Validator<'_> {
        let validator = Validator::new(&self.shapes, &self.data).with_max_depth(self.max_depth);
        match &self.scripts {
            Some(loader) => validator.with_script_loader(loader.as_ref()),
            None => validator,
        }
    }

    /// Validates every target of every shape.
    pub fn validate(&self) -> ValidationReport {
        self.validator().validate_all()
    }

    /// Generates a Graphviz DOT string representation of the shapes.
    pub fn to_graphviz(&self) -> String {
        graphviz::to_graphviz(&self.shapes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_nodes::SHACL;
    use crate::types::Severity;
    use oxigraph::model::vocab::rdf;
    use oxigraph::model::Term;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> Result<PathBuf, Box<dyn Error>> {
        let mut dir = std::env::temp_dir();
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        dir.push(format!("{}_{}", prefix, timestamp));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn custom_sparql_message_and_severity() -> Result<(), Box<dyn Error>> {
        let temp_dir = unique_temp_dir("shacl_message_test")?;

        let shapes_ttl = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.com/ns#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:ScoreShape
    a sh:NodeShape ;
    sh:targetClass ex:Player ;
    sh:severity sh:Warning ;
    sh:sparql [
        sh:prefixes ex:Prefixes ;
        sh:message "Score must be at least 5 (got {?score})." ;
        sh:select """
            SELECT $this ?score
            WHERE { $this ex:score ?score . FILTER(?score < 5) }
        """ ;
    ] .

ex:Prefixes sh:declare [
    sh:prefix "ex" ;
    sh:namespace "http://example.com/ns#"^^xsd:anyURI ;
] .
"#;
        let data_ttl = r#"@prefix ex: <http://example.com/ns#> .
ex:alice a ex:Player ; ex:score 3 .
ex:bob a ex:Player ; ex:score 7 .
"#;
        let shapes_path = temp_dir.join("shapes.ttl");
        let data_path = temp_dir.join("data.ttl");
        fs::write(&shapes_path, shapes_ttl)?;
        fs::write(&data_path, data_ttl)?;

        let engine = ShaclEngine::from_files(
            shapes_path.to_str().ok_or("non-utf8 path")?,
            data_path.to_str().ok_or("non-utf8 path")?,
        )?;
        let report = engine.validate();

        assert_eq!(report.violations().len(), 1);
        let violation = &report.violations()[0];
        assert_eq!(violation.severity, Severity::Warning);
        assert_eq!(violation.message(), "Score must be at least 5 (got 3).");
        assert!(report.conforms(), "warnings alone do not break conformance");

        let sh = SHACL::new();
        let graph = report.to_graph();
        let results = graph.subjects(rdf::TYPE, &Term::from(sh.validation_result.into_owned()));
        assert_eq!(results.len(), 1);
        assert_eq!(
            graph.object(&results[0], sh.result_severity),
            Some(Term::from(sh.warning.into_owned()))
        );

        fs::remove_dir_all(&temp_dir)?;
        Ok(())
    }

    #[test]
    fn formats_follow_file_extensions() {
        assert_eq!(format_for_path(FsPath::new("a/b.nt")), RdfFormat::NTriples);
        assert_eq!(format_for_path(FsPath::new("shapes.ttl")), RdfFormat::Turtle);
        assert_eq!(format_for_path(FsPath::new("noext")), RdfFormat::Turtle);
    }
}
