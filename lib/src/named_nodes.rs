//! SHACL vocabulary terms.
//!
//! The table is a plain value rather than process-wide state: loaders and the
//! report writer each hold their own `SHACL` instance.
use oxigraph::model::NamedNodeRef;
use paste::paste;

pub const SHACL_NAMESPACE: &str = "http://www.w3.org/ns/shacl#";

macro_rules! shacl_vocabulary {
    (
        terms: [$($local:ident),* $(,)?],
        renamed: [$($field:ident => $iri:literal),* $(,)?] $(,)?
    ) => {
        paste! {
            /// Named nodes of the `sh:` namespace used by the loader, the validator and the report.
            #[derive(Debug, Clone, Copy)]
            pub struct SHACL {
                $(pub [<$local:snake>]: NamedNodeRef<'static>,)*
                $(pub $field: NamedNodeRef<'static>,)*
            }

            impl SHACL {
                pub fn new() -> Self {
                    SHACL {
                        $([<$local:snake>]: NamedNodeRef::new_unchecked(
                            concat!("http://www.w3.org/ns/shacl#", stringify!($local))
                        ),)*
                        $($field: NamedNodeRef::new_unchecked(
                            concat!("http://www.w3.org/ns/shacl#", $iri)
                        ),)*
                    }
                }
            }
        }
    };
}

shacl_vocabulary! {
    terms: [
        // shape types
        NodeShape, PropertyShape,
        // targets
        targetClass, targetNode, targetSubjectsOf, targetObjectsOf, target,
        // paths
        path, inversePath, alternativePath, zeroOrMorePath, oneOrMorePath, zeroOrOnePath,
        // constraint parameters
        property, node, class, datatype, nodeKind, minCount, maxCount,
        minExclusive, minInclusive, maxExclusive, maxInclusive, minLength, maxLength,
        pattern, flags, languageIn, uniqueLang, equals, disjoint, lessThan, lessThanOrEquals,
        not, and, or, xone, closed, ignoredProperties, hasValue,
        qualifiedValueShape, qualifiedMinCount, qualifiedMaxCount, qualifiedValueShapesDisjoint,
        // sparql
        sparql, select, prefixes, declare, prefix, namespace,
        // js
        js, jsLibrary, jsFunctionName,
        // non-validating attributes
        name, description, order, group, defaultValue, deactivated, message, severity,
        // node kinds
        BlankNode, Literal, BlankNodeOrLiteral,
        // severities
        Info, Warning, Violation,
        // report
        ValidationReport, ValidationResult, conforms, result, focusNode, resultPath, value,
        resultMessage, sourceShape, resultSeverity, sourceConstraintComponent, sourceConstraint,
        detail,
        // constraint components
        ClassConstraintComponent, DatatypeConstraintComponent, NodeKindConstraintComponent,
        MinCountConstraintComponent, MaxCountConstraintComponent,
        MinExclusiveConstraintComponent, MinInclusiveConstraintComponent,
        MaxExclusiveConstraintComponent, MaxInclusiveConstraintComponent,
        MinLengthConstraintComponent, MaxLengthConstraintComponent, PatternConstraintComponent,
        LanguageInConstraintComponent, UniqueLangConstraintComponent,
        EqualsConstraintComponent, DisjointConstraintComponent, LessThanConstraintComponent,
        LessThanOrEqualsConstraintComponent, NotConstraintComponent, AndConstraintComponent,
        OrConstraintComponent, XoneConstraintComponent, NodeConstraintComponent,
        QualifiedMinCountConstraintComponent, QualifiedMaxCountConstraintComponent,
        ClosedConstraintComponent, HasValueConstraintComponent, InConstraintComponent,
    ],
    renamed: [
        in_values => "in",
        sparql_target => "SPARQLTarget",
        js_library_url => "jsLibraryURL",
        iri => "IRI",
        blank_node_or_iri => "BlankNodeOrIRI",
        iri_or_literal => "IRIOrLiteral",
        sparql_constraint_component => "SPARQLConstraintComponent",
        js_constraint_component => "JSConstraintComponent",
    ],
}

impl Default for SHACL {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_follow_the_namespace() {
        let sh = SHACL::new();
        assert_eq!(sh.min_count.as_str(), "http://www.w3.org/ns/shacl#minCount");
        assert_eq!(sh.node_shape.as_str(), "http://www.w3.org/ns/shacl#NodeShape");
        assert_eq!(sh.in_values.as_str(), "http://www.w3.org/ns/shacl#in");
        assert_eq!(
            sh.less_than_or_equals.as_str(),
            "http://www.w3.org/ns/shacl#lessThanOrEquals"
        );
        assert!(sh.blank_node_or_iri.as_str().starts_with(SHACL_NAMESPACE));
    }
}
