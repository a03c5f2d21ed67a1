use oxigraph::model::Term;
use thiserror::Error;

/// Failures raised while reading from a data or shapes graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph does not support {0}")]
    Unsupported(&'static str),
    #[error("SPARQL query failed: {0}")]
    Query(String),
    #[error("malformed RDF list at {head}: {reason}")]
    MalformedList { head: Term, reason: String },
}

/// Errors that abort shape loading. Loading is all-or-nothing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid value {value} for {predicate} on shape {shape}: {reason}")]
    InvalidValue {
        shape: Term,
        predicate: String,
        value: Term,
        reason: String,
    },
    #[error("shape {shape} declares {predicate} {count} times, expected at most once")]
    Repeated {
        shape: Term,
        predicate: String,
        count: usize,
    },
    #[error("shape {shape} is missing required {predicate}")]
    Missing { shape: Term, predicate: String },
    #[error("shape {shape}: {source}")]
    Graph {
        shape: Term,
        #[source]
        source: GraphError,
    },
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
