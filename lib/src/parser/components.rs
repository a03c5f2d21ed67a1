//! The table mapping constraint parameters to constraint constructors.
use super::{invalid, sparql, ParsingContext};
use crate::error::{LoadError, Result};
use crate::model::components::{Constraint, JsSpec, PatternSpec};
use crate::named_nodes::SHACL;
use crate::types::{NodeKind, ID};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use regex::RegexBuilder;
use std::collections::HashMap;

/// Builds the constraints for one parameter from all of its values on a shape.
pub type ConstraintBuilder = fn(&mut ParsingContext<'_>, &Term, &[Term]) -> Result<Vec<Constraint>>;

/// One row of a [`ConstraintTable`].
#[derive(Clone)]
pub struct ConstraintEntry {
    pub predicate: NamedNode,
    pub build: ConstraintBuilder,
}

/// Maps the predicate that introduces a constraint to its constructor.
///
/// Parameters that only qualify another one (`sh:flags`, `sh:qualifiedMinCount`,
/// `sh:ignoredProperties`, ...) have no entry of their own; the builder of the
/// main parameter reads them.
#[derive(Clone)]
pub struct ConstraintTable {
    entries: Vec<ConstraintEntry>,
}

impl ConstraintTable {
    pub fn empty() -> Self {
        ConstraintTable {
            entries: Vec::new(),
        }
    }

    /// The SHACL Core constraint components plus `sh:sparql` and `sh:js`.
    pub fn shacl() -> Self {
        let sh = SHACL::new();
        let rows: [(NamedNodeRef<'static>, ConstraintBuilder); 29] = [
            (sh.class, class),
            (sh.datatype, datatype),
            (sh.node_kind, node_kind),
            (sh.min_count, min_count),
            (sh.max_count, max_count),
            (sh.min_exclusive, min_exclusive),
            (sh.min_inclusive, min_inclusive),
            (sh.max_exclusive, max_exclusive),
            (sh.max_inclusive, max_inclusive),
            (sh.min_length, min_length),
            (sh.max_length, max_length),
            (sh.pattern, pattern),
            (sh.language_in, language_in),
            (sh.unique_lang, unique_lang),
            (sh.equals, equals),
            (sh.disjoint, disjoint),
            (sh.less_than, less_than),
            (sh.less_than_or_equals, less_than_or_equals),
            (sh.not, not),
            (sh.and, and),
            (sh.or, or),
            (sh.xone, xone),
            (sh.node, node),
            (sh.qualified_value_shape, qualified_value_shape),
            (sh.in_values, in_values),
            (sh.closed, closed),
            (sh.has_value, has_value),
            (sh.sparql, sparql_constraint),
            (sh.js, js),
        ];
        let mut table = Self::empty();
        for (predicate, build) in rows {
            table = table.with(predicate.into_owned(), build);
        }
        table
    }

    /// Adds an entry, replacing any existing entry for the same predicate.
    pub fn with(mut self, predicate: NamedNode, build: ConstraintBuilder) -> Self {
        self.entries.retain(|e| e.predicate != predicate);
        self.entries.push(ConstraintEntry { predicate, build });
        self
    }

    pub fn without(mut self, predicate: NamedNodeRef<'_>) -> Self {
        self.entries.retain(|e| e.predicate != predicate);
        self
    }

    pub fn entries(&self) -> &[ConstraintEntry] {
        &self.entries
    }

    /// Runs every entry whose predicate appears among the shape's statements.
    pub(crate) fn build_all(
        &self,
        ctx: &mut ParsingContext<'_>,
        shape: &Term,
        pred_obj_pairs: &HashMap<NamedNode, Vec<Term>>,
    ) -> Result<Vec<Constraint>> {
        let mut constraints = Vec::new();
        for entry in &self.entries {
            if let Some(values) = pred_obj_pairs.get(&entry.predicate) {
                constraints.extend((entry.build)(ctx, shape, values)?);
            }
        }
        Ok(constraints)
    }
}

impl Default for ConstraintTable {
    fn default() -> Self {
        Self::shacl()
    }
}

fn each<F>(values: &[Term], f: F) -> Result<Vec<Constraint>>
where
    F: FnMut(&Term) -> Result<Constraint>,
{
    values.iter().map(f).collect()
}

fn iri(shape: &Term, predicate: NamedNodeRef<'_>, value: &Term) -> Result<NamedNode> {
    match value {
        Term::NamedNode(nn) => Ok(nn.clone()),
        other => Err(invalid(shape, predicate, other, "expected an IRI")),
    }
}

fn literal(shape: &Term, predicate: NamedNodeRef<'_>, value: &Term) -> Result<Literal> {
    match value {
        Term::Literal(lit) => Ok(lit.clone()),
        other => Err(invalid(shape, predicate, other, "expected a literal")),
    }
}

fn count(shape: &Term, predicate: NamedNodeRef<'_>, value: &Term) -> Result<u64> {
    let reason = "expected a non-negative integer";
    let lit = literal(shape, predicate, value)?;
    if lit.language().is_some() {
        return Err(invalid(shape, predicate, value, reason));
    }
    lit.value()
        .trim()
        .trim_start_matches('+')
        .parse::<u64>()
        .map_err(|_| invalid(shape, predicate, value, reason))
}

fn single_count(shape: &Term, predicate: NamedNodeRef<'_>, values: &[Term]) -> Result<u64> {
    if values.len() > 1 {
        return Err(LoadError::Repeated {
            shape: shape.clone(),
            predicate: predicate.to_string(),
            count: values.len(),
        });
    }
    count(shape, predicate, &values[0])
}

/// A shape-valued parameter: queues the referenced shape for loading.
fn shape_ref(
    ctx: &mut ParsingContext<'_>,
    shape: &Term,
    predicate: NamedNodeRef<'_>,
    value: &Term,
) -> Result<ID> {
    if matches!(value, Term::Literal(_)) {
        return Err(invalid(shape, predicate, value, "expected a shape"));
    }
    Ok(ctx.reference(value))
}

fn shape_list(
    ctx: &mut ParsingContext<'_>,
    shape: &Term,
    predicate: NamedNodeRef<'_>,
    head: &Term,
) -> Result<Vec<ID>> {
    let members = ctx.list(shape, head)?;
    members
        .iter()
        .map(|member| shape_ref(ctx, shape, predicate, member))
        .collect()
}

fn class(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().class;
    each(values, |v| match v {
        Term::Literal(_) => Err(invalid(shape, p, v, "expected a class IRI")),
        class => Ok(Constraint::Class {
            class: class.clone(),
        }),
    })
}

fn datatype(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().datatype;
    each(values, |v| {
        Ok(Constraint::Datatype {
            datatype: iri(shape, p, v)?,
        })
    })
}

fn node_kind(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().node_kind;
    each(values, |v| {
        NodeKind::from_term(v)
            .map(|kind| Constraint::NodeKind { kind })
            .ok_or_else(|| invalid(shape, p, v, "not a SHACL node kind"))
    })
}

fn min_count(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let min_count = single_count(shape, ctx.shacl().min_count, values)?;
    Ok(vec![Constraint::MinCount { min_count }])
}

fn max_count(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let max_count = single_count(shape, ctx.shacl().max_count, values)?;
    Ok(vec![Constraint::MaxCount { max_count }])
}

fn min_length(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().min_length;
    each(values, |v| {
        Ok(Constraint::MinLength {
            length: count(shape, p, v)?,
        })
    })
}

fn max_length(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().max_length;
    each(values, |v| {
        Ok(Constraint::MaxLength {
            length: count(shape, p, v)?,
        })
    })
}

macro_rules! range_builder {
    ($fn_name:ident, $field:ident, $variant:ident) => {
        fn $fn_name(
            ctx: &mut ParsingContext<'_>,
            shape: &Term,
            values: &[Term],
        ) -> Result<Vec<Constraint>> {
            let p = ctx.shacl().$field;
            each(values, |v| {
                Ok(Constraint::$variant {
                    bound: literal(shape, p, v)?,
                })
            })
        }
    };
}

range_builder!(min_exclusive, min_exclusive, MinExclusive);
range_builder!(min_inclusive, min_inclusive, MinInclusive);
range_builder!(max_exclusive, max_exclusive, MaxExclusive);
range_builder!(max_inclusive, max_inclusive, MaxInclusive);

/// Compiles `sh:pattern` with the XPath-style `sh:flags`: `s` dot matches newline,
/// `m` multi-line anchors, `i` case-insensitive, `q` the pattern is a literal string.
pub(crate) fn compile_pattern(
    shape: &Term,
    pattern_term: &Term,
    flags_term: Option<&Term>,
) -> Result<PatternSpec> {
    let sh = SHACL::new();
    let pattern = literal(shape, sh.pattern, pattern_term)?.value().to_string();
    let flags = match flags_term {
        Some(term) => Some(literal(shape, sh.flags, term)?.value().to_string()),
        None => None,
    };

    let mut source = pattern.clone();
    let mut builder_flags = (false, false, false);
    for flag in flags.as_deref().unwrap_or_default().chars() {
        match flag {
            's' => builder_flags.0 = true,
            'm' => builder_flags.1 = true,
            'i' => builder_flags.2 = true,
            'q' => source = regex::escape(&pattern),
            other => {
                return Err(invalid(
                    shape,
                    sh.flags,
                    flags_term.unwrap_or(pattern_term),
                    format!("unsupported regex flag '{}'", other),
                ))
            }
        }
    }
    let (dot_all, multi_line, case_insensitive) = builder_flags;
    let regex = RegexBuilder::new(&source)
        .dot_matches_new_line(dot_all)
        .multi_line(multi_line)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| invalid(shape, sh.pattern, pattern_term, e.to_string()))?;
    Ok(PatternSpec {
        regex,
        pattern,
        flags,
    })
}

fn pattern(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let flags = ctx.single(shape, ctx.shacl().flags)?;
    each(values, |v| {
        compile_pattern(shape, v, flags.as_ref()).map(Constraint::Pattern)
    })
}

fn language_in(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().language_in;
    let mut constraints = Vec::new();
    for head in values {
        let languages = ctx
            .list(shape, head)?
            .iter()
            .map(|tag| literal(shape, p, tag).map(|lit| lit.value().to_string()))
            .collect::<Result<Vec<_>>>()?;
        constraints.push(Constraint::LanguageIn { languages });
    }
    Ok(constraints)
}

fn unique_lang(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().unique_lang;
    let mut enabled = false;
    for v in values {
        enabled |= parse_boolean(shape, p, v)?;
    }
    Ok(if enabled {
        vec![Constraint::UniqueLang]
    } else {
        Vec::new()
    })
}

macro_rules! property_pair_builder {
    ($fn_name:ident, $field:ident, $variant:ident) => {
        fn $fn_name(
            ctx: &mut ParsingContext<'_>,
            shape: &Term,
            values: &[Term],
        ) -> Result<Vec<Constraint>> {
            let p = ctx.shacl().$field;
            each(values, |v| {
                Ok(Constraint::$variant {
                    property: iri(shape, p, v)?,
                })
            })
        }
    };
}

property_pair_builder!(equals, equals, Equals);
property_pair_builder!(disjoint, disjoint, Disjoint);
property_pair_builder!(less_than, less_than, LessThan);
property_pair_builder!(less_than_or_equals, less_than_or_equals, LessThanOrEquals);

fn not(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().not;
    values
        .iter()
        .map(|v| -> Result<Constraint> {
            Ok(Constraint::Not {
                shape: shape_ref(ctx, shape, p, v)?,
            })
        })
        .collect()
}

fn node(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let p = ctx.shacl().node;
    values
        .iter()
        .map(|v| -> Result<Constraint> {
            Ok(Constraint::Node {
                shape: shape_ref(ctx, shape, p, v)?,
            })
        })
        .collect()
}

macro_rules! logical_builder {
    ($fn_name:ident, $field:ident, $variant:ident) => {
        fn $fn_name(
            ctx: &mut ParsingContext<'_>,
            shape: &Term,
            values: &[Term],
        ) -> Result<Vec<Constraint>> {
            let p = ctx.shacl().$field;
            values
                .iter()
                .map(|head| -> Result<Constraint> {
                    Ok(Constraint::$variant {
                        shapes: shape_list(ctx, shape, p, head)?,
                    })
                })
                .collect()
        }
    };
}

logical_builder!(and, and, And);
logical_builder!(or, or, Or);
logical_builder!(xone, xone, Xone);

fn qualified_value_shape(
    ctx: &mut ParsingContext<'_>,
    shape: &Term,
    values: &[Term],
) -> Result<Vec<Constraint>> {
    let sh = ctx.shacl();
    let min_count = match ctx.single(shape, sh.qualified_min_count)? {
        Some(v) => Some(count(shape, sh.qualified_min_count, &v)?),
        None => None,
    };
    let max_count = match ctx.single(shape, sh.qualified_max_count)? {
        Some(v) => Some(count(shape, sh.qualified_max_count, &v)?),
        None => None,
    };
    if min_count.is_none() && max_count.is_none() {
        return Err(LoadError::Missing {
            shape: shape.clone(),
            predicate: format!("{} or {}", sh.qualified_min_count, sh.qualified_max_count),
        });
    }
    let disjoint = ctx
        .boolean(shape, sh.qualified_value_shapes_disjoint)?
        .unwrap_or(false);
    values
        .iter()
        .map(|v| -> Result<Constraint> {
            Ok(Constraint::QualifiedValueShape {
                shape: shape_ref(ctx, shape, sh.qualified_value_shape, v)?,
                min_count,
                max_count,
                disjoint,
            })
        })
        .collect()
}

fn in_values(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    if values.len() > 1 {
        return Err(LoadError::Repeated {
            shape: shape.clone(),
            predicate: ctx.shacl().in_values.to_string(),
            count: values.len(),
        });
    }
    Ok(vec![Constraint::In {
        values: ctx.list(shape, &values[0])?,
    }])
}

fn closed(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let sh = ctx.shacl();
    let mut is_closed = false;
    for v in values {
        is_closed |= parse_boolean(shape, sh.closed, v)?;
    }
    if !is_closed {
        return Ok(Vec::new());
    }
    let mut ignored_properties = Vec::new();
    for head in ctx.graph().objects(shape, sh.ignored_properties) {
        for member in ctx.list(shape, &head)? {
            ignored_properties.push(iri(shape, sh.ignored_properties, &member)?);
        }
    }
    Ok(vec![Constraint::Closed { ignored_properties }])
}

fn has_value(_ctx: &mut ParsingContext<'_>, _shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    each(values, |v| Ok(Constraint::HasValue { value: v.clone() }))
}

fn sparql_constraint(
    ctx: &mut ParsingContext<'_>,
    shape: &Term,
    values: &[Term],
) -> Result<Vec<Constraint>> {
    each(values, |v| {
        sparql::parse_constraint(ctx, shape, v).map(Constraint::Sparql)
    })
}

fn js(ctx: &mut ParsingContext<'_>, shape: &Term, values: &[Term]) -> Result<Vec<Constraint>> {
    let sh = ctx.shacl();
    let mut constraints = Vec::new();
    for v in values {
        let function = match ctx.single(v, sh.js_function_name)? {
            Some(Term::Literal(lit)) => lit.value().to_string(),
            Some(other) => return Err(invalid(shape, sh.js_function_name, &other, "expected a literal")),
            None => {
                return Err(LoadError::Missing {
                    shape: shape.clone(),
                    predicate: sh.js_function_name.to_string(),
                })
            }
        };
        let library = ctx.single(v, sh.js_library)?.ok_or_else(|| LoadError::Missing {
            shape: shape.clone(),
            predicate: sh.js_library.to_string(),
        })?;
        // a library is identified by its URL when it declares one
        let library = match ctx.single(&library, sh.js_library_url)? {
            Some(Term::Literal(lit)) => lit.value().to_string(),
            Some(Term::NamedNode(nn)) => nn.as_str().to_string(),
            _ => match &library {
                Term::NamedNode(nn) => nn.as_str().to_string(),
                other => {
                    return Err(invalid(
                        shape,
                        sh.js_library,
                        other,
                        "library has no sh:jsLibraryURL",
                    ))
                }
            },
        };
        constraints.push(Constraint::Js(JsSpec {
            library,
            function,
            message: ctx.message(v)?,
        }));
    }
    Ok(constraints)
}

/// Reads a boolean literal, failing on anything else.
pub(crate) fn parse_boolean(shape: &Term, predicate: NamedNodeRef<'_>, value: &Term) -> Result<bool> {
    match value {
        Term::Literal(lit) if lit.datatype() == xsd::BOOLEAN => match lit.value() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(invalid(shape, predicate, value, "expected a boolean")),
        },
        _ => Err(invalid(shape, predicate, value, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::NamedNode;

    fn shape() -> Term {
        NamedNode::new_unchecked("http://example.org/S").into()
    }

    #[test]
    fn pattern_flags_follow_xpath() {
        let p: Term = Literal::new_simple_literal("^a.b$").into();
        let plain = compile_pattern(&shape(), &p, None).unwrap();
        assert!(plain.regex.is_match("axb"));
        assert!(!plain.regex.is_match("AXB"));

        let i: Term = Literal::new_simple_literal("i").into();
        assert!(compile_pattern(&shape(), &p, Some(&i)).unwrap().regex.is_match("AXB"));

        let q: Term = Literal::new_simple_literal("q").into();
        let quoted = compile_pattern(&shape(), &p, Some(&q)).unwrap();
        assert!(quoted.regex.is_match("x^a.b$y"));
        assert!(!quoted.regex.is_match("axb"));

        let s: Term = Literal::new_simple_literal("s").into();
        assert!(compile_pattern(&shape(), &p, Some(&s)).unwrap().regex.is_match("a\nb"));
    }

    #[test]
    fn unknown_flags_and_bad_regexes_fail() {
        let p: Term = Literal::new_simple_literal("abc").into();
        let x: Term = Literal::new_simple_literal("z").into();
        assert!(compile_pattern(&shape(), &p, Some(&x)).is_err());
        let bad: Term = Literal::new_simple_literal("(unclosed").into();
        assert!(compile_pattern(&shape(), &bad, None).is_err());
    }

    #[test]
    fn counts_must_be_non_negative_integers() {
        let sh = SHACL::new();
        let ok: Term = Literal::new_typed_literal("3", xsd::INTEGER).into();
        assert_eq!(count(&shape(), sh.min_count, &ok).unwrap(), 3);
        let negative: Term = Literal::new_typed_literal("-1", xsd::INTEGER).into();
        assert!(count(&shape(), sh.min_count, &negative).is_err());
        let iri: Term = NamedNode::new_unchecked("http://example.org/x").into();
        assert!(count(&shape(), sh.min_count, &iri).is_err());
    }

    #[test]
    fn tables_can_be_customised() {
        let sh = SHACL::new();
        let table = ConstraintTable::shacl();
        assert!(table.entries().iter().any(|e| e.predicate == sh.js));
        let table = table.without(sh.js);
        assert!(!table.entries().iter().any(|e| e.predicate == sh.js));
        assert_eq!(table.entries().len(), ConstraintTable::shacl().entries().len() - 1);
    }
}
