//! Declarative field validation for the data-entry forms.
//!
//! A form builds a list of [`Rule`]s from its current field values and
//! evaluates them all at once on submit; the result is a list of
//! field-path/message pairs for inline display next to the offending
//! fields.

pub const REQUIRED: &str = "Required";
pub const MUST_BE_AN_INTEGER: &str = "Must be an integer";
pub const MUST_BE_A_POSITIVE_NUMBER: &str = "Must be a positive number";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Value must be non-empty.
    Required,
    /// Value must be non-empty, an integer, and not negative.
    NonNegativeInteger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub field: String,
    pub value: String,
    pub kind: Kind,
}

impl Rule {
    pub fn required(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind: Kind::Required,
        }
    }

    pub fn non_negative_integer(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind: Kind::NonNegativeInteger,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: &'static str,
}

/// Evaluates every rule, returning at most one error per field (the
/// first constraint that fails).
pub fn validate(rules: &[Rule]) -> Vec<FieldError> {
    rules
        .iter()
        .filter_map(|rule| {
            check(rule).map(|message| FieldError {
                field: rule.field.clone(),
                message,
            })
        })
        .collect()
}

fn check(rule: &Rule) -> Option<&'static str> {
    let value = rule.value.trim();
    if value.is_empty() {
        return Some(REQUIRED);
    }
    match rule.kind {
        Kind::Required => None,
        Kind::NonNegativeInteger => match value.parse::<i64>() {
            Err(_) => Some(MUST_BE_AN_INTEGER),
            Ok(parsed) if parsed < 0 => Some(MUST_BE_A_POSITIVE_NUMBER),
            Ok(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_required() {
        let errors = validate(&[
            Rule::required("precinct", ""),
            Rule::required("source", "Data Entry"),
        ]);
        assert_eq!(
            errors,
            vec![FieldError {
                field: "precinct".to_owned(),
                message: REQUIRED,
            }]
        );
    }

    #[test]
    fn test_non_negative_integer_messages() {
        assert_eq!(
            validate(&[Rule::non_negative_integer("totalBallotsCast", "")])[0].message,
            REQUIRED
        );
        assert_eq!(
            validate(&[Rule::non_negative_integer("totalBallotsCast", "12.5")])[0].message,
            MUST_BE_AN_INTEGER
        );
        assert_eq!(
            validate(&[Rule::non_negative_integer("totalBallotsCast", "twelve")])[0].message,
            MUST_BE_AN_INTEGER
        );
        assert_eq!(
            validate(&[Rule::non_negative_integer("totalBallotsCast", "-3")])[0].message,
            MUST_BE_A_POSITIVE_NUMBER
        );
        assert_eq!(validate(&[Rule::non_negative_integer("n", "0")]), vec![]);
        assert_eq!(validate(&[Rule::non_negative_integer("n", "42")]), vec![]);
    }

    #[test]
    fn test_whitespace_only_is_required() {
        assert_eq!(
            validate(&[Rule::non_negative_integer("n", "   ")])[0].message,
            REQUIRED
        );
    }
}
