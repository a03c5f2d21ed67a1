//! Compiler-style rendering of violations against the original source text.
//!
//! Positions are an optional side channel: a [`SourceMap`] records, for each parsed
//! statement, where its subject, predicate and object tokens appeared. The graph
//! itself keeps no layout, so the offending line is rebuilt from the positioned
//! tokens of every statement that appears on it:
//!
//! ```text
//! violation: Value "12" has datatype xsd:string, expected xsd:integer
//!   --> people.ttl:11:20
//!    |
//! 11 |     ex:age         "12"^^xsd:string ;
//!    |                    ^^^^^^^^^^^^^^^^ Value "12" has datatype ...
//!    = fix: write the value as a xsd:integer literal
//! ```
use crate::violation::Violation;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Term, Triple};
use std::collections::HashMap;
use std::fmt::Write as _;

/// A position within a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermRole {
    Subject,
    Predicate,
    Object,
}

/// Where a token appeared in the source. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenPosition {
    pub line: usize,
    pub column: usize,
    pub token: String,
}

impl TokenPosition {
    pub fn new(line: usize, column: usize, token: impl Into<String>) -> Self {
        TokenPosition {
            line,
            column,
            token: token.into(),
        }
    }

    fn width(&self) -> usize {
        self.token.chars().count().max(1)
    }

    fn end_column(&self) -> usize {
        self.column + self.width() - 1
    }
}

/// The part of the source a violation points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Highlight {
    /// One term of a specific statement.
    Statement { triple: Triple, role: TermRole },
    /// The earliest occurrence of a term anywhere in the source.
    Term(Term),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StatementPositions {
    subject: Option<TokenPosition>,
    predicate: Option<TokenPosition>,
    object: Option<TokenPosition>,
}

impl StatementPositions {
    fn get(&self, role: TermRole) -> Option<&TokenPosition> {
        match role {
            TermRole::Subject => self.subject.as_ref(),
            TermRole::Predicate => self.predicate.as_ref(),
            TermRole::Object => self.object.as_ref(),
        }
    }

    fn all(&self) -> impl Iterator<Item = (TermRole, &TokenPosition)> {
        [
            (TermRole::Subject, self.subject.as_ref()),
            (TermRole::Predicate, self.predicate.as_ref()),
            (TermRole::Object, self.object.as_ref()),
        ]
        .into_iter()
        .filter_map(|(role, pos)| pos.map(|p| (role, p)))
    }

    fn first(&self) -> Option<&TokenPosition> {
        self.all()
            .map(|(_, p)| p)
            .min_by_key(|p| (p.line, p.column))
    }
}

/// Per-statement token positions recorded by a parser.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    origin: Option<String>,
    statements: HashMap<Triple, StatementPositions>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the source (usually a file name) in diagnostic headers.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Records token positions for an N-Triples document, one statement per line.
    /// Lines that do not parse are skipped.
    pub fn from_ntriples(text: &str) -> Self {
        let mut map = SourceMap::new();
        for (index, line) in text.lines().enumerate() {
            let Some(Ok(quad)) = RdfParser::from_format(RdfFormat::NTriples)
                .for_reader(line.as_bytes())
                .next()
            else {
                continue;
            };
            let Some(tokens) = ntriples_tokens(line) else {
                continue;
            };
            let triple = Triple::from(quad);
            for (role, (column, token)) in [TermRole::Subject, TermRole::Predicate, TermRole::Object]
                .into_iter()
                .zip(tokens)
            {
                map.insert(
                    triple.clone(),
                    role,
                    TokenPosition::new(index + 1, column, token),
                );
            }
        }
        map
    }

    pub fn insert(&mut self, triple: Triple, role: TermRole, position: TokenPosition) {
        let entry = self.statements.entry(triple).or_default();
        match role {
            TermRole::Subject => entry.subject = Some(position),
            TermRole::Predicate => entry.predicate = Some(position),
            TermRole::Object => entry.object = Some(position),
        }
    }

    pub fn position(&self, triple: &Triple, role: TermRole) -> Option<&TokenPosition> {
        self.statements.get(triple).and_then(|s| s.get(role))
    }

    /// The earliest recorded occurrence of `term` in any role.
    pub fn first_position_of(&self, term: &Term) -> Option<&TokenPosition> {
        self.statements
            .iter()
            .flat_map(|(triple, positions)| {
                positions
                    .all()
                    .filter(move |(role, _)| role_term(triple, *role) == *term)
                    .map(|(_, p)| p)
            })
            .min_by_key(|p| (p.line, p.column))
    }

    pub fn resolve(&self, highlight: &Highlight) -> Option<&TokenPosition> {
        match highlight {
            Highlight::Statement { triple, role } => self
                .position(triple, *role)
                .or_else(|| self.first_position_of(&role_term(triple, *role))),
            Highlight::Term(term) => self.first_position_of(term),
        }
    }

    /// Rebuilds the text of `line` from the tokens positioned on it.
    ///
    /// Statements are laid out in order of their first positioned token. An
    /// `rdf:type` predicate without a token is written back as `a` two columns before
    /// its object, and blank-node objects get their closing `]` after their contents.
    pub fn reconstruct_line(&self, line: usize) -> Option<String> {
        let mut on_line: Vec<(&Triple, &StatementPositions)> = self
            .statements
            .iter()
            .filter(|(_, p)| p.all().any(|(_, pos)| pos.line == line))
            .collect();
        if on_line.is_empty() {
            return None;
        }
        on_line.sort_by_key(|(triple, p)| {
            (
                p.first().map(|f| (f.line, f.column)),
                triple.to_string(),
            )
        });

        let mut buffer: Vec<char> = Vec::new();
        for (triple, positions) in &on_line {
            for (_, pos) in positions.all().filter(|(_, pos)| pos.line == line) {
                place(&mut buffer, pos.column, &pos.token);
            }
            if positions.predicate.is_none() && triple.predicate == rdf::TYPE {
                if let Some(object) = positions.object.as_ref().filter(|o| o.line == line) {
                    if object.column > 2 {
                        place(&mut buffer, object.column - 2, "a");
                    }
                }
            }
        }

        // innermost blank nodes first, so outer brackets close after inner ones
        let mut anonymous: Vec<(&Term, &TokenPosition)> = on_line
            .iter()
            .filter_map(|(triple, p)| match (&triple.object, p.object.as_ref()) {
                (Term::BlankNode(_), Some(pos)) if pos.line == line && pos.token == "[" => {
                    Some((&triple.object, pos))
                }
                _ => None,
            })
            .collect();
        anonymous.sort_by_key(|(_, pos)| std::cmp::Reverse(pos.column));
        anonymous.dedup_by(|a, b| a.0 == b.0);

        let mut closing: HashMap<&Term, usize> = HashMap::new();
        for (bnode, open) in anonymous {
            let mut end = 0;
            for (triple, positions) in &on_line {
                if Term::from(triple.subject.clone()) != *bnode {
                    continue;
                }
                for (_, pos) in positions.all().filter(|(_, pos)| pos.line == line) {
                    if pos != open {
                        end = end.max(pos.end_column());
                    }
                }
                if let Some(inner) = closing.get(&triple.object) {
                    end = end.max(*inner);
                }
            }
            if end > 0 {
                place(&mut buffer, end + 2, "]");
                closing.insert(bnode, end + 2);
            }
        }

        let text: String = buffer.into_iter().collect();
        Some(text.trim_end().to_string())
    }
}

/// Splits an N-Triples statement line into its three tokens with 1-based columns.
/// Subject and predicate never contain whitespace; the object runs up to the final `.`.
fn ntriples_tokens(line: &str) -> Option<[(usize, String); 3]> {
    let chars: Vec<char> = line.chars().collect();
    let mut cursor = 0;
    let next_word = |cursor: &mut usize| {
        while *cursor < chars.len() && chars[*cursor].is_whitespace() {
            *cursor += 1;
        }
        let start = *cursor;
        while *cursor < chars.len() && !chars[*cursor].is_whitespace() {
            *cursor += 1;
        }
        (start < *cursor).then(|| (start + 1, chars[start..*cursor].iter().collect::<String>()))
    };
    let subject = next_word(&mut cursor)?;
    let predicate = next_word(&mut cursor)?;
    while cursor < chars.len() && chars[cursor].is_whitespace() {
        cursor += 1;
    }
    let rest: String = chars[cursor..].iter().collect();
    let object = rest.trim_end().strip_suffix('.')?.trim_end();
    if object.is_empty() {
        return None;
    }
    Some([subject, predicate, (cursor + 1, object.to_string())])
}

fn role_term(triple: &Triple, role: TermRole) -> Term {
    match role {
        TermRole::Subject => triple.subject.clone().into(),
        TermRole::Predicate => triple.predicate.clone().into(),
        TermRole::Object => triple.object.clone(),
    }
}

fn place(buffer: &mut Vec<char>, column: usize, token: &str) {
    let start = column.saturating_sub(1);
    let token: Vec<char> = token.lines().next().unwrap_or("").chars().collect();
    if buffer.len() < start + token.len() {
        buffer.resize(start + token.len(), ' ');
    }
    buffer[start..start + token.len()].copy_from_slice(&token);
}

/// Renders violations with the offending source line and a caret underline.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticFormatter<'a> {
    sources: Option<&'a SourceMap>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        DiagnosticFormatter {
            sources: Some(sources),
        }
    }

    /// A formatter with no position data; every violation renders as its bare message.
    pub fn without_sources() -> Self {
        DiagnosticFormatter { sources: None }
    }

    pub fn format(&self, violation: &Violation) -> String {
        let message = violation.message();
        let Some(sources) = self.sources else {
            return message;
        };
        let Some(position) = sources.resolve(&violation.highlight()) else {
            return message;
        };
        let Some(text) = sources.reconstruct_line(position.line) else {
            return message;
        };

        let gutter = position.line.to_string().len();
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", violation.severity, message);
        let _ = writeln!(
            out,
            "{:>width$}--> {}:{}:{}",
            "",
            sources.origin().unwrap_or("<input>"),
            position.line,
            position.column,
            width = gutter + 1
        );
        let _ = writeln!(out, "{:>width$} |", "", width = gutter);
        let _ = writeln!(out, "{} | {}", position.line, text);
        let _ = writeln!(
            out,
            "{:>width$} | {}{} {}",
            "",
            " ".repeat(position.column.saturating_sub(1)),
            "^".repeat(position.width()),
            message,
            width = gutter
        );
        for fix in violation.fixes() {
            let _ = writeln!(out, "{:>width$} = fix: {}", "", fix, width = gutter);
        }
        out
    }

    pub fn format_all(&self, violations: &[Violation]) -> String {
        violations
            .iter()
            .map(|v| self.format(v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{EvaluationContext, ViolationKind};
    use oxigraph::model::{BlankNode, Literal, NamedNode};

    fn nn(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", s))
    }

    fn datatype_violation(statement: &Triple) -> Violation {
        let mut ctx = EvaluationContext::for_node(&nn("alice").into(), &nn("PersonShape").into());
        ctx.reached = vec![crate::path::PathValue {
            statement: Some(statement.clone()),
            value: statement.object.clone(),
        }]
        .into();
        ctx.path = Some(crate::path::Path::Predicate(nn("age")));
        let mut v = Violation::new(
            ctx,
            Some(statement.object.clone()),
            ViolationKind::Datatype {
                expected: oxigraph::model::vocab::xsd::INTEGER.into_owned(),
                actual: Some(oxigraph::model::vocab::xsd::STRING.into_owned()),
                ill_formed: false,
            },
        );
        v.message = Some("bad type".to_string());
        v
    }

    #[test]
    fn caret_spans_the_token_at_its_column() {
        let statement = Triple::new(nn("alice"), nn("age"), Literal::new_simple_literal("twelve"));
        let mut map = SourceMap::new().with_origin("people.ttl");
        map.insert(statement.clone(), TermRole::Subject, TokenPosition::new(11, 1, "ex:alice"));
        map.insert(statement.clone(), TermRole::Predicate, TokenPosition::new(11, 10, "ex:age"));
        // 14 characters wide
        map.insert(
            statement.clone(),
            TermRole::Object,
            TokenPosition::new(11, 20, "\"twelve\"^^xsd:"),
        );

        let out = DiagnosticFormatter::new(&map).format(&datatype_violation(&statement));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("violation: bad type"));
        assert!(lines[1].contains("people.ttl:11:20"));
        let source = lines.iter().find(|l| l.starts_with("11 | ")).expect("source line");
        assert_eq!(*source, "11 | ex:alice ex:age    \"twelve\"^^xsd:");
        let underline = lines
            .iter()
            .find(|l| l.starts_with("   | ") && l.contains('^'))
            .expect("underline")
            .trim_start_matches("   | ");
        assert_eq!(underline, format!("{}{} bad type", " ".repeat(19), "^".repeat(14)));
        assert!(lines.iter().any(|l| l.contains("= fix:")));
    }

    #[test]
    fn missing_positions_degrade_to_the_message() {
        let statement = Triple::new(nn("alice"), nn("age"), Literal::new_simple_literal("x"));
        let v = datatype_violation(&statement);
        assert_eq!(DiagnosticFormatter::new(&SourceMap::new()).format(&v), "bad type");
        assert_eq!(DiagnosticFormatter::without_sources().format(&v), "bad type");
    }

    #[test]
    fn rdf_type_shorthand_and_brackets_are_restored() {
        let bnode = BlankNode::new_unchecked("addr");
        let typed = Triple::new(nn("alice"), rdf::TYPE, nn("Person"));
        let address = Triple::new(nn("alice"), nn("address"), bnode.clone());
        let city = Triple::new(bnode, nn("city"), Literal::new_simple_literal("Paris"));

        let mut map = SourceMap::new();
        map.insert(typed.clone(), TermRole::Subject, TokenPosition::new(3, 1, "ex:alice"));
        map.insert(typed, TermRole::Object, TokenPosition::new(3, 12, "ex:Person"));
        map.insert(address.clone(), TermRole::Subject, TokenPosition::new(3, 1, "ex:alice"));
        map.insert(address.clone(), TermRole::Predicate, TokenPosition::new(3, 24, "ex:address"));
        map.insert(address, TermRole::Object, TokenPosition::new(3, 35, "["));
        map.insert(city.clone(), TermRole::Subject, TokenPosition::new(3, 35, "["));
        map.insert(city.clone(), TermRole::Predicate, TokenPosition::new(3, 37, "ex:city"));
        map.insert(city, TermRole::Object, TokenPosition::new(3, 45, "\"Paris\""));

        assert_eq!(
            map.reconstruct_line(3).as_deref(),
            Some("ex:alice a ex:Person   ex:address [ ex:city \"Paris\" ]")
        );
        assert!(map.reconstruct_line(4).is_none());
    }

    #[test]
    fn ntriples_positions_are_recorded_per_line() {
        let text = "<http://example.org/alice> <http://example.org/age> \"twelve\" .\n\
                    not a statement\n\
                    <http://example.org/bob>   <http://example.org/age> \"7\"@en .\n";
        let map = SourceMap::from_ntriples(text);
        let alice = Triple::new(nn("alice"), nn("age"), Literal::new_simple_literal("twelve"));
        assert_eq!(
            map.position(&alice, TermRole::Object),
            Some(&TokenPosition::new(1, 53, "\"twelve\""))
        );
        let bob = Triple::new(
            nn("bob"),
            nn("age"),
            Literal::new_language_tagged_literal_unchecked("7", "en"),
        );
        assert_eq!(
            map.position(&bob, TermRole::Predicate),
            Some(&TokenPosition::new(3, 28, "<http://example.org/age>"))
        );
        assert_eq!(
            map.position(&bob, TermRole::Object),
            Some(&TokenPosition::new(3, 53, "\"7\"@en"))
        );
    }
}
