use super::{Finding, Outcome};
use crate::model::components::SparqlSpec;
use crate::validate::Validator;
use crate::violation::{EvaluationContext, Violation, ViolationKind};
use log::debug;
use oxigraph::model::vocab::xsd;
use oxigraph::model::Term;
use oxigraph::sparql::Variable;

/// Whether `?var` or `$var` occurs in the query as a whole variable name.
pub(crate) fn query_mentions_var(query: &str, var: &str) -> bool {
    fn contains(query: &str, prefix: char, var: &str) -> bool {
        let bytes = query.as_bytes();
        let var_bytes = var.as_bytes();
        let mut start = 0;
        while let Some(pos) = query[start..].find(prefix) {
            let idx = start + pos + 1;
            if bytes.len() >= idx + var_bytes.len() && &bytes[idx..idx + var_bytes.len()] == var_bytes
            {
                let after = idx + var_bytes.len();
                if after >= bytes.len() {
                    return true;
                }
                let next = bytes[after] as char;
                if !next.is_ascii_alphanumeric() && next != '_' {
                    return true;
                }
            }
            start = idx;
        }
        false
    }

    contains(query, '?', var) || contains(query, '$', var)
}

/// The full query text for one evaluation: prefixes, then the SELECT with `$PATH`
/// replaced by the property path in play.
pub(crate) fn build_query(spec: &SparqlSpec, ctx: &EvaluationContext) -> String {
    let select = match &ctx.path {
        Some(path) => spec.select.replace("$PATH", &path.to_sparql_path()),
        None => spec.select.clone(),
    };
    if spec.prefixes.is_empty() {
        select
    } else {
        format!("{}\n{}", spec.prefixes, select)
    }
}

fn is_true(term: Option<&Term>) -> bool {
    matches!(term, Some(Term::Literal(lit)) if lit.datatype() == xsd::BOOLEAN && lit.value() == "true")
}

/// Runs a `sh:sparql` constraint with `$this` bound to the focus node and
/// `$currentShape` to the declaring shape. Every solution is one violation.
pub(crate) fn evaluate(
    spec: &SparqlSpec,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Outcome {
    if spec.deactivated {
        return Outcome::Findings(Vec::new());
    }
    let query = build_query(spec, ctx);
    let mut bindings = Vec::new();
    if query_mentions_var(&query, "this") {
        bindings.push((Variable::new_unchecked("this"), ctx.focus.clone()));
    }
    if query_mentions_var(&query, "currentShape") {
        bindings.push((
            Variable::new_unchecked("currentShape"),
            ctx.source_shape.clone(),
        ));
    }

    let rows = match validator.data().select(&query, &bindings) {
        Ok(rows) => rows,
        Err(e) => {
            return Outcome::Nested(vec![Violation::processing(
                ctx.clone(),
                format!("SPARQL constraint {} could not be evaluated", spec.node),
                Some(e.to_string()),
            )])
        }
    };
    debug!("SPARQL constraint {} returned {} row(s) for {}", spec.node, rows.len(), ctx.focus);

    let mut findings: Vec<Finding> = Vec::new();
    for row in rows {
        let get = |name: &str| row.iter().find(|(n, _)| n == name).map(|(_, t)| t);
        if is_true(get("failure")) {
            return Outcome::Nested(vec![Violation::processing(
                ctx.clone(),
                format!("SPARQL constraint {} reported a failure", spec.node),
                None,
            )]);
        }
        let value = match (get("value"), &ctx.path) {
            (Some(v), _) => Some(v.clone()),
            (None, None) => Some(ctx.focus.clone()),
            (None, Some(_)) => None,
        };
        let message = match get("message") {
            Some(Term::Literal(lit)) => Some(lit.value().to_string()),
            _ => spec.message.clone(),
        };
        findings.push((
            value,
            ViolationKind::Sparql {
                constraint: spec.node.clone(),
                bindings: row.clone(),
                message,
            },
        ));
    }
    Outcome::Findings(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_mentions_respect_word_boundaries() {
        let q = "SELECT $this ?value WHERE { $this ?p ?value . FILTER(?thisOther) }";
        assert!(query_mentions_var(q, "this"));
        assert!(query_mentions_var(q, "value"));
        assert!(!query_mentions_var(q, "currentShape"));
        assert!(!query_mentions_var("SELECT ?thisOne WHERE {}", "this"));
    }
}
