use super::{require_literal, Finding};
use crate::model::components::PatternSpec;
use crate::types::NodeKind;
use crate::violation::{EvaluationContext, ViolationKind};
use oxigraph::model::Term;

/// The string form string-based constraints look at. Blank nodes have none.
fn string_form(value: &Term) -> Result<&str, Finding> {
    match value {
        Term::Literal(lit) => Ok(lit.value()),
        Term::NamedNode(nn) => Ok(nn.as_str()),
        other => Err((
            Some(other.clone()),
            ViolationKind::NodeKind {
                expected: NodeKind::IriOrLiteral,
                actual: NodeKind::of(other.as_ref()),
            },
        )),
    }
}

pub(crate) fn min_length(expected: u64, value: &Term) -> Option<Finding> {
    let text = match string_form(value) {
        Ok(text) => text,
        Err(finding) => return Some(finding),
    };
    let actual = text.chars().count();
    ((actual as u64) < expected).then(|| {
        (
            Some(value.clone()),
            ViolationKind::MinLength { expected, actual },
        )
    })
}

pub(crate) fn max_length(expected: u64, value: &Term) -> Option<Finding> {
    let text = match string_form(value) {
        Ok(text) => text,
        Err(finding) => return Some(finding),
    };
    let actual = text.chars().count();
    ((actual as u64) > expected).then(|| {
        (
            Some(value.clone()),
            ViolationKind::MaxLength { expected, actual },
        )
    })
}

/// `sh:pattern` only applies to literals; IRIs and blank nodes fail the kind precheck.
pub(crate) fn pattern(spec: &PatternSpec, value: &Term) -> Option<Finding> {
    let text = match require_literal(value) {
        Ok(lit) => lit.value(),
        Err(finding) => return Some(finding),
    };
    if spec.regex.is_match(text) {
        return None;
    }
    Some((
        Some(value.clone()),
        ViolationKind::Pattern {
            value: text.to_string(),
            pattern: spec.pattern.clone(),
            flags: spec.flags.clone(),
        },
    ))
}

/// RFC 4647 basic filtering: `*` matches any tag, otherwise the range must equal the
/// tag or be a prefix of it ending at a `-`.
fn language_matches(range: &str, tag: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let (range, tag) = (range.to_ascii_lowercase(), tag.to_ascii_lowercase());
    tag == range || tag.starts_with(&format!("{}-", range))
}

pub(crate) fn language_in(allowed: &[String], value: &Term) -> Option<Finding> {
    let lit = match require_literal(value) {
        Ok(lit) => lit,
        Err(finding) => return Some(finding),
    };
    let tag = lit.language();
    if let Some(tag) = tag {
        if allowed.iter().any(|range| language_matches(range, tag)) {
            return None;
        }
    }
    Some((
        Some(value.clone()),
        ViolationKind::LanguageIn {
            allowed: allowed.to_vec(),
            actual: tag.map(str::to_string),
        },
    ))
}

/// One finding per language tag used by more than one value node.
pub(crate) fn unique_lang(value: Option<&Term>, ctx: &EvaluationContext) -> Vec<Finding> {
    let mut seen: Vec<(String, usize)> = Vec::new();
    for node in ctx.value_nodes(value) {
        let Term::Literal(lit) = node else { continue };
        let Some(tag) = lit.language() else { continue };
        let tag = tag.to_ascii_lowercase();
        match seen.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, count)) => *count += 1,
            None => seen.push((tag, 1)),
        }
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(language, _)| (None, ViolationKind::UniqueLang { language }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{Path, PathValue};
    use oxigraph::model::{BlankNode, Literal, NamedNode};
    use regex::Regex;
    use std::sync::Arc;

    fn spec(pattern: &str) -> PatternSpec {
        PatternSpec {
            regex: Regex::new(pattern).unwrap(),
            pattern: pattern.to_string(),
            flags: None,
        }
    }

    #[test]
    fn pattern_reports_value_and_pattern() {
        let digits = spec("^[0-9]+$");
        assert!(pattern(&digits, &Literal::new_simple_literal("123").into()).is_none());
        let (_, kind) = pattern(&digits, &Literal::new_simple_literal("abc123").into()).unwrap();
        assert_eq!(
            kind,
            ViolationKind::Pattern {
                value: "abc123".into(),
                pattern: "^[0-9]+$".into(),
                flags: None
            }
        );
        assert!(pattern(&digits, &BlankNode::default().into()).is_some());
    }

    #[test]
    fn pattern_rejects_iris_before_matching() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.org/1"));
        let (value, kind) = pattern(&spec("example"), &iri).unwrap();
        assert_eq!(value, Some(iri));
        assert_eq!(
            kind,
            ViolationKind::NodeKind {
                expected: NodeKind::Literal,
                actual: NodeKind::Iri
            }
        );
    }

    #[test]
    fn lengths_count_characters() {
        let word = Term::from(Literal::new_simple_literal("héllo"));
        assert!(min_length(5, &word).is_none());
        assert!(max_length(5, &word).is_none());
        let (_, kind) = max_length(3, &word).unwrap();
        assert_eq!(
            kind,
            ViolationKind::MaxLength {
                expected: 3,
                actual: 5
            }
        );
    }

    #[test]
    fn language_ranges() {
        let allowed = vec!["en".to_string(), "fr".to_string()];
        let en_us = Literal::new_language_tagged_literal_unchecked("hi", "en-us");
        assert!(language_in(&allowed, &en_us.into()).is_none());
        let de = Literal::new_language_tagged_literal_unchecked("hallo", "de");
        assert!(language_in(&allowed, &de.clone().into()).is_some());
        assert!(language_in(&["*".to_string()], &de.into()).is_none());
        let (_, kind) = language_in(&allowed, &Literal::new_simple_literal("x").into()).unwrap();
        assert!(matches!(kind, ViolationKind::LanguageIn { actual: None, .. }));
    }

    #[test]
    fn unique_lang_flags_each_repeated_tag_once() {
        let focus = Term::from(NamedNode::new_unchecked("http://example.org/a"));
        let reached: Vec<PathValue> = [("a", "en"), ("b", "EN"), ("c", "en"), ("d", "fr")]
            .into_iter()
            .map(|(v, l)| PathValue {
                statement: None,
                value: Literal::new_language_tagged_literal_unchecked(v, l).into(),
            })
            .collect();
        let ctx = EvaluationContext {
            focus: focus.clone(),
            shape: focus.clone(),
            source_shape: focus,
            path: Some(Path::Predicate(NamedNode::new_unchecked(
                "http://example.org/label",
            ))),
            reached: Arc::from(reached),
        };
        let findings = unique_lang(None, &ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].1,
            ViolationKind::UniqueLang {
                language: "en".into()
            }
        );
    }
}
