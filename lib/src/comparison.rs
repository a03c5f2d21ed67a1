//! Literal ordering and lexical validity for XSD datatypes.
use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use oxsdatatypes::*;
use std::cmp::Ordering;
use std::str::FromStr;

/// The two operands belong to datatypes that cannot be ordered against each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypeMismatch {
    pub left: Option<NamedNode>,
    pub right: Option<NamedNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Decimal,
    Floating,
    DateTime,
    Date,
    Time,
    Duration,
    Text,
    Boolean,
    Other,
}

const INTEGER_TYPES: [NamedNodeRef<'static>; 13] = [
    xsd::INTEGER,
    xsd::LONG,
    xsd::INT,
    xsd::SHORT,
    xsd::BYTE,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
];

fn category(datatype: NamedNodeRef<'_>) -> Category {
    if datatype == xsd::DECIMAL || INTEGER_TYPES.contains(&datatype) {
        Category::Decimal
    } else if datatype == xsd::FLOAT || datatype == xsd::DOUBLE {
        Category::Floating
    } else if datatype == xsd::DATE_TIME || datatype == xsd::DATE_TIME_STAMP {
        Category::DateTime
    } else if datatype == xsd::DATE {
        Category::Date
    } else if datatype == xsd::TIME {
        Category::Time
    } else if datatype == xsd::DURATION
        || datatype == xsd::DAY_TIME_DURATION
        || datatype == xsd::YEAR_MONTH_DURATION
    {
        Category::Duration
    } else if datatype == xsd::STRING || datatype == rdf::LANG_STRING {
        Category::Text
    } else if datatype == xsd::BOOLEAN {
        Category::Boolean
    } else {
        Category::Other
    }
}

fn parsed_cmp<T: FromStr + PartialOrd>(left: &str, right: &str) -> Option<Ordering> {
    let left = T::from_str(left).ok()?;
    let right = T::from_str(right).ok()?;
    left.partial_cmp(&right)
}

/// Orders two literals by value.
///
/// `Err` means the datatypes are not comparable at all. `Ok(None)` means both sides
/// are of a comparable kind but no order exists between these particular values
/// (NaN, an ill-formed lexical form, indeterminate time zones).
pub fn compare_literals(left: &Literal, right: &Literal) -> Result<Option<Ordering>, DatatypeMismatch> {
    let (lc, rc) = (category(left.datatype()), category(right.datatype()));
    let (l, r) = (left.value(), right.value());
    let ordering = match (lc, rc) {
        (Category::Decimal, Category::Decimal) => parsed_cmp::<Decimal>(l, r),
        (Category::Decimal | Category::Floating, Category::Decimal | Category::Floating) => {
            parsed_cmp::<Double>(l, r)
        }
        (Category::DateTime, Category::DateTime) => parsed_cmp::<DateTime>(l, r),
        (Category::Date, Category::Date) => parsed_cmp::<Date>(l, r),
        (Category::Time, Category::Time) => parsed_cmp::<Time>(l, r),
        (Category::Duration, Category::Duration) => parsed_cmp::<Duration>(l, r),
        (Category::Text, Category::Text) => Some(l.cmp(r)),
        (Category::Boolean, Category::Boolean) => {
            let l = Boolean::from_str(l).ok().map(bool::from);
            let r = Boolean::from_str(r).ok().map(bool::from);
            l.zip(r).map(|(l, r)| l.cmp(&r))
        }
        (Category::Other, Category::Other) if left.datatype() == right.datatype() => {
            (l == r).then_some(Ordering::Equal)
        }
        _ => {
            return Err(DatatypeMismatch {
                left: Some(left.datatype().into_owned()),
                right: Some(right.datatype().into_owned()),
            })
        }
    };
    Ok(ordering)
}

/// Like [`compare_literals`], but any non-literal operand is a mismatch with no
/// datatype on that side.
pub fn compare_terms(left: &Term, right: &Term) -> Result<Option<Ordering>, DatatypeMismatch> {
    match (left, right) {
        (Term::Literal(l), Term::Literal(r)) => compare_literals(l, r),
        _ => Err(DatatypeMismatch {
            left: literal_datatype(left),
            right: literal_datatype(right),
        }),
    }
}

fn literal_datatype(term: &Term) -> Option<NamedNode> {
    match term {
        Term::Literal(lit) => Some(lit.datatype().into_owned()),
        _ => None,
    }
}

fn integer_in(lexical: &str, min: i128, max: i128) -> bool {
    is_integer_lexical(lexical)
        && i128::from_str(lexical).map_or(false, |v| v >= min && v <= max)
}

fn is_integer_lexical(lexical: &str) -> bool {
    let digits = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn integer_sign(lexical: &str) -> Option<Ordering> {
    if !is_integer_lexical(lexical) {
        return None;
    }
    let negative = lexical.starts_with('-');
    let zero = lexical.trim_start_matches(['+', '-']).bytes().all(|b| b == b'0');
    Some(match (zero, negative) {
        (true, _) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (false, false) => Ordering::Greater,
    })
}

/// Whether `lexical` is in the lexical space of `datatype`. Unknown datatypes accept
/// any lexical form.
pub fn is_valid_lexical(datatype: NamedNodeRef<'_>, lexical: &str) -> bool {
    if datatype == xsd::INTEGER {
        is_integer_lexical(lexical)
    } else if datatype == xsd::LONG {
        integer_in(lexical, i64::MIN.into(), i64::MAX.into())
    } else if datatype == xsd::INT {
        integer_in(lexical, i32::MIN.into(), i32::MAX.into())
    } else if datatype == xsd::SHORT {
        integer_in(lexical, i16::MIN.into(), i16::MAX.into())
    } else if datatype == xsd::BYTE {
        integer_in(lexical, i8::MIN.into(), i8::MAX.into())
    } else if datatype == xsd::UNSIGNED_LONG {
        integer_in(lexical, 0, u64::MAX.into())
    } else if datatype == xsd::UNSIGNED_INT {
        integer_in(lexical, 0, u32::MAX.into())
    } else if datatype == xsd::UNSIGNED_SHORT {
        integer_in(lexical, 0, u16::MAX.into())
    } else if datatype == xsd::UNSIGNED_BYTE {
        integer_in(lexical, 0, u8::MAX.into())
    } else if datatype == xsd::NON_NEGATIVE_INTEGER {
        matches!(integer_sign(lexical), Some(Ordering::Greater | Ordering::Equal))
    } else if datatype == xsd::POSITIVE_INTEGER {
        integer_sign(lexical) == Some(Ordering::Greater)
    } else if datatype == xsd::NON_POSITIVE_INTEGER {
        matches!(integer_sign(lexical), Some(Ordering::Less | Ordering::Equal))
    } else if datatype == xsd::NEGATIVE_INTEGER {
        integer_sign(lexical) == Some(Ordering::Less)
    } else if datatype == xsd::DECIMAL {
        Decimal::from_str(lexical).is_ok()
    } else if datatype == xsd::DOUBLE {
        Double::from_str(lexical).is_ok()
    } else if datatype == xsd::FLOAT {
        Float::from_str(lexical).is_ok()
    } else if datatype == xsd::BOOLEAN {
        Boolean::from_str(lexical).is_ok()
    } else if datatype == xsd::DATE_TIME {
        DateTime::from_str(lexical).is_ok()
    } else if datatype == xsd::DATE {
        Date::from_str(lexical).is_ok()
    } else if datatype == xsd::TIME {
        Time::from_str(lexical).is_ok()
    } else if datatype == xsd::G_YEAR {
        GYear::from_str(lexical).is_ok()
    } else if datatype == xsd::G_MONTH {
        GMonth::from_str(lexical).is_ok()
    } else if datatype == xsd::G_DAY {
        GDay::from_str(lexical).is_ok()
    } else if datatype == xsd::G_YEAR_MONTH {
        GYearMonth::from_str(lexical).is_ok()
    } else if datatype == xsd::G_MONTH_DAY {
        GMonthDay::from_str(lexical).is_ok()
    } else if datatype == xsd::DURATION {
        Duration::from_str(lexical).is_ok()
    } else if datatype == xsd::YEAR_MONTH_DURATION {
        YearMonthDuration::from_str(lexical).is_ok()
    } else if datatype == xsd::DAY_TIME_DURATION {
        DayTimeDuration::from_str(lexical).is_ok()
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(value: &str, dt: NamedNodeRef<'_>) -> Literal {
        Literal::new_typed_literal(value, dt)
    }

    #[test]
    fn numeric_types_compare_across_the_family() {
        let ten = typed("10", xsd::INTEGER);
        let nine_and_a_half = typed("9.5", xsd::DECIMAL);
        let eleven = typed("1.1E1", xsd::DOUBLE);
        assert_eq!(compare_literals(&ten, &nine_and_a_half), Ok(Some(Ordering::Greater)));
        assert_eq!(compare_literals(&ten, &eleven), Ok(Some(Ordering::Less)));
        assert_eq!(
            compare_literals(&typed("NaN", xsd::DOUBLE), &eleven),
            Ok(None)
        );
    }

    #[test]
    fn mismatched_datatypes_are_reported() {
        let number = typed("10", xsd::INTEGER);
        let text = Literal::new_simple_literal("10");
        let err = compare_literals(&number, &text).unwrap_err();
        assert_eq!(err.left, Some(xsd::INTEGER.into_owned()));
        assert_eq!(err.right, Some(xsd::STRING.into_owned()));
        let iri = Term::from(NamedNode::new_unchecked("http://example.org/x"));
        assert!(compare_terms(&iri, &Term::from(number)).is_err());
    }

    #[test]
    fn dates_and_strings_order() {
        assert_eq!(
            compare_literals(
                &typed("2020-01-01", xsd::DATE),
                &typed("2021-01-01", xsd::DATE)
            ),
            Ok(Some(Ordering::Less))
        );
        assert_eq!(
            compare_literals(
                &Literal::new_simple_literal("b"),
                &Literal::new_simple_literal("a")
            ),
            Ok(Some(Ordering::Greater))
        );
    }

    #[test]
    fn durations_order_by_length() {
        assert_eq!(
            compare_literals(
                &typed("PT36H", xsd::DAY_TIME_DURATION),
                &typed("P2D", xsd::DAY_TIME_DURATION)
            ),
            Ok(Some(Ordering::Less))
        );
        assert!(compare_literals(&typed("P1D", xsd::DURATION), &typed("1", xsd::INTEGER)).is_err());
    }

    #[test]
    fn lexical_validity() {
        assert!(is_valid_lexical(xsd::INTEGER, "-42"));
        assert!(!is_valid_lexical(xsd::INTEGER, "4.2"));
        assert!(!is_valid_lexical(xsd::BYTE, "128"));
        assert!(is_valid_lexical(xsd::UNSIGNED_BYTE, "255"));
        assert!(!is_valid_lexical(xsd::POSITIVE_INTEGER, "0"));
        assert!(is_valid_lexical(xsd::NON_POSITIVE_INTEGER, "-0"));
        assert!(!is_valid_lexical(xsd::DATE, "2020-13-01"));
        assert!(!is_valid_lexical(xsd::BOOLEAN, "yes"));
        assert!(is_valid_lexical(
            NamedNodeRef::new_unchecked("http://example.org/custom"),
            "anything"
        ));
    }
}
