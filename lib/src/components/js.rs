//! `sh:js` constraints.
//!
//! No script runtime is embedded. A host hands the validator a [`ScriptLoader`]
//! that turns `(library, function name)` into a [`ScriptFunction`]; functions are
//! resolved once when the validator is built.
use crate::model::components::JsSpec;
use crate::validate::Validator;
use crate::violation::{EvaluationContext, Violation, ViolationKind};
use oxigraph::model::Term;
use std::collections::HashMap;
use std::sync::Arc;

/// A host-provided predicate over `(focus node, value node)`.
///
/// `Err` means evaluation broke down in the host; it is reported as a processing
/// violation, never propagated.
pub trait ScriptFunction: Send + Sync {
    fn evaluate(&self, focus: &Term, value: &Term) -> Result<bool, String>;
}

impl<F> ScriptFunction for F
where
    F: Fn(&Term, &Term) -> Result<bool, String> + Send + Sync,
{
    fn evaluate(&self, focus: &Term, value: &Term) -> Result<bool, String> {
        self(focus, value)
    }
}

/// Resolves script functions by library and name.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, library: &str, function: &str) -> Result<Arc<dyn ScriptFunction>, String>;
}

/// A [`ScriptLoader`] backed by functions registered up front.
#[derive(Default)]
pub struct ScriptRegistry {
    functions: HashMap<(String, String), Arc<dyn ScriptFunction>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        library: impl Into<String>,
        function: impl Into<String>,
        f: impl ScriptFunction + 'static,
    ) -> &mut Self {
        self.functions
            .insert((library.into(), function.into()), Arc::new(f));
        self
    }
}

impl ScriptLoader for ScriptRegistry {
    fn load(&self, library: &str, function: &str) -> Result<Arc<dyn ScriptFunction>, String> {
        self.functions
            .get(&(library.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| format!("no function {} in library {}", function, library))
    }
}

pub(crate) fn evaluate(
    spec: &JsSpec,
    value: &Term,
    ctx: &EvaluationContext,
    validator: &Validator<'_>,
) -> Vec<Violation> {
    let outcome = validator
        .script(spec)
        .and_then(|f| f.evaluate(&ctx.focus, value));
    match outcome {
        Ok(true) => Vec::new(),
        Ok(false) => {
            let source = validator.shapes().get_by_term(&ctx.source_shape);
            vec![Violation {
                context: ctx.clone(),
                value: Some(value.clone()),
                kind: ViolationKind::Js {
                    function: spec.function.clone(),
                    message: spec.message.clone(),
                },
                severity: source.map(|s| s.attributes().severity).unwrap_or_default(),
                message: source.and_then(|s| s.attributes().message.clone()),
            }]
        }
        Err(cause) => {
            let mut violation = Violation::processing(
                ctx.clone(),
                format!("script function {} failed", spec.function),
                Some(cause),
            );
            violation.value = Some(value.clone());
            vec![violation]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Literal;

    #[test]
    fn registry_resolves_registered_closures() {
        let mut registry = ScriptRegistry::new();
        registry.register("lib.js", "isShort", |_: &Term, value: &Term| match value {
            Term::Literal(lit) => Ok(lit.value().len() < 4),
            _ => Err("not a literal".to_string()),
        });
        let f = registry.load("lib.js", "isShort").unwrap();
        let focus = Term::from(Literal::new_simple_literal("f"));
        assert_eq!(f.evaluate(&focus, &Literal::new_simple_literal("abc").into()), Ok(true));
        assert_eq!(f.evaluate(&focus, &Literal::new_simple_literal("abcd").into()), Ok(false));
        assert!(registry.load("lib.js", "missing").is_err());
    }
}
