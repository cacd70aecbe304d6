//! Loose structural comparison between actual values and the expected values in a spec file.

use std::fmt::Debug;

use crate::{
    bson::{spec::ElementType, Bson, Document},
    bson_util,
};

/// The names accepted by `{"$$type": ...}` assertions.
const TYPE_NAMES: &[(&str, ElementType)] = &[
    ("double", ElementType::Double),
    ("string", ElementType::String),
    ("object", ElementType::EmbeddedDocument),
    ("array", ElementType::Array),
    ("binData", ElementType::Binary),
    ("objectId", ElementType::ObjectId),
    ("bool", ElementType::Boolean),
    ("date", ElementType::DateTime),
    ("null", ElementType::Null),
    ("regex", ElementType::RegularExpression),
    ("int", ElementType::Int32),
    ("timestamp", ElementType::Timestamp),
    ("long", ElementType::Int64),
    ("decimal", ElementType::Decimal128),
];

/// A value that can be compared against an expected value of the same type from a spec file.
///
/// Matching is asymmetric: extra content in the actual value is ignored, and expected placeholder
/// values match anything.
pub trait Matchable: Sized {
    /// Whether this value, used as an expectation, accepts any actual value.
    fn is_placeholder(&self) -> bool {
        false
    }

    /// Compares `self` against `expected`, which is known not to be a placeholder.
    fn content_matches(&self, expected: &Self) -> Result<(), String>;

    fn matches(&self, expected: &Self) -> Result<(), String> {
        if expected.is_placeholder() {
            return Ok(());
        }
        self.content_matches(expected)
    }
}

pub trait MatchErrExt {
    fn prefix(self, name: &str) -> Self;
}

impl MatchErrExt for Result<(), String> {
    fn prefix(self, name: &str) -> Self {
        self.map_err(|s| format!("{}: {}", name, s))
    }
}

pub fn eq_matches<T: PartialEq + Debug>(
    name: &str,
    actual: &T,
    expected: &T,
) -> Result<(), String> {
    if actual != expected {
        return Err(format!("expected {} {:?}, got {:?}", name, expected, actual));
    }
    Ok(())
}

/// The types accepted by an expected value of the form `{"$$type": "name"}` or
/// `{"$$type": ["name", ...]}`.
fn expected_types(expected: &Bson) -> Option<Vec<ElementType>> {
    let doc = expected.as_document().filter(|doc| doc.len() == 1)?;
    let names = match doc.get("$$type")? {
        Bson::String(name) => vec![name.as_str()],
        Bson::Array(names) => names.iter().filter_map(Bson::as_str).collect(),
        _ => return None,
    };
    Some(
        names
            .into_iter()
            .filter_map(|name| {
                TYPE_NAMES
                    .iter()
                    .find(|(type_name, _)| *type_name == name)
                    .map(|(_, element_type)| *element_type)
            })
            .collect(),
    )
}

impl Matchable for Bson {
    fn is_placeholder(&self) -> bool {
        match self {
            Bson::String(s) => s.is_empty() || s == "42",
            other => bson_util::get_int(other) == Some(42),
        }
    }

    fn content_matches(&self, expected: &Bson) -> Result<(), String> {
        if let Some(types) = expected_types(expected) {
            if types.contains(&self.element_type()) {
                return Ok(());
            }
            return Err(format!("expected type {:?}, actual value {:?}", types, self));
        }

        match (self, expected) {
            (Bson::Document(actual), Bson::Document(expected)) => actual.matches(expected),
            (Bson::Array(actual), Bson::Array(expected)) => {
                if actual.len() < expected.len() {
                    return Err(format!(
                        "expected {} array elements, got {}",
                        expected.len(),
                        actual.len()
                    ));
                }
                actual
                    .iter()
                    .zip(expected)
                    .enumerate()
                    .try_for_each(|(i, (actual, expected))| {
                        actual.matches(expected).prefix(&i.to_string())
                    })
            }
            _ => match (bson_util::get_int(self), bson_util::get_int(expected)) {
                (Some(actual), Some(expected)) => eq_matches("int", &actual, &expected),
                (None, Some(expected)) => Err(format!("expected int {}, got {:?}", expected, self)),
                _ => eq_matches("bson", self, expected),
            },
        }
    }
}

impl Matchable for Document {
    fn content_matches(&self, expected: &Document) -> Result<(), String> {
        for (key, expected_value) in expected {
            match self.get(key) {
                Some(actual) => actual.matches(expected_value).prefix(key)?,
                None if expected_value == &Bson::Null => {}
                None => {
                    return Err(format!(
                        "{:?}: expected value {:?}, got null",
                        key, expected_value
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Panics with both values if `actual` does not match `expected`.
pub fn assert_matches<M: Matchable + Debug>(actual: &M, expected: &M, description: Option<&str>) {
    if let Err(failure) = actual.matches(expected) {
        panic!(
            "[{}] actual\n{:#?}\n did not MATCH expected\n{:#?}\n MATCH failure: {}",
            description.unwrap_or(""),
            actual,
            expected,
            failure,
        );
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bson::doc;

    #[test]
    fn extra_actual_keys_are_ignored() {
        let actual = doc! { "find": "coll", "filter": { "_id": 1 }, "$db": "db", "lsid": {} };
        let expected = doc! { "find": "coll", "filter": { "_id": 1 } };
        assert!(actual.matches(&expected).is_ok());
        assert!(expected.matches(&actual).is_err());
    }

    #[test]
    fn numbers_compare_across_types() {
        let actual = doc! { "n": 1_i64, "ok": 1.0 };
        assert!(actual.matches(&doc! { "n": 1, "ok": 1 }).is_ok());
        let error = actual.matches(&doc! { "n": 2 }).unwrap_err();
        assert_eq!(error, "n: expected int 2, got 1");
    }

    #[test]
    fn expected_null_matches_absent_key() {
        assert!(doc! {}.matches(&doc! { "writeErrors": Bson::Null }).is_ok());
        assert!(doc! {}.matches(&doc! { "writeErrors": [] }).is_err());
    }

    #[test]
    fn placeholders_match_anything() {
        let actual = doc! { "cursor": { "id": 12345_i64, "ns": "db.coll" } };
        assert!(actual
            .matches(&doc! { "cursor": { "id": 42, "ns": "db.coll" } })
            .is_ok());
        assert!(actual.matches(&doc! { "cursor": { "ns": "" } }).is_ok());
    }

    #[test]
    fn arrays_match_by_prefix() {
        let actual = doc! { "firstBatch": [{ "_id": 1 }, { "_id": 2 }, { "_id": 3 }] };
        assert!(actual
            .matches(&doc! { "firstBatch": [{ "_id": 1 }, { "_id": 2 }] })
            .is_ok());
        let error = actual
            .matches(&doc! { "firstBatch": [{ "_id": 2 }] })
            .unwrap_err();
        assert!(error.starts_with("firstBatch: 0: _id"), "{}", error);
    }

    #[test]
    fn type_assertions() {
        let actual = doc! { "id": 10_i64, "name": "x" };
        assert!(actual
            .matches(&doc! { "id": { "$$type": ["int", "long"] } })
            .is_ok());
        assert!(actual
            .matches(&doc! { "name": { "$$type": "int" } })
            .is_err());
    }

    #[test]
    #[should_panic(expected = "did not MATCH")]
    fn assert_matches_panics_on_mismatch() {
        assert_matches(&doc! { "ok": 0 }, &doc! { "ok": 1 }, Some("reply"));
    }
}
