use crate::{
    bson::{Bson, Document},
    error::{Error, Result},
};

/// Coerce numeric types into an `i64` if it would be lossless to do so. If this Bson is not numeric
/// or the conversion would be lossy (e.g. 1.5 -> 1), this returns `None`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn get_int(val: &Bson) -> Option<i64> {
    match *val {
        Bson::Int32(i) => Some(i64::from(i)),
        Bson::Int64(i) => Some(i),
        Bson::Double(f) if (f - (f as i64 as f64)).abs() <= f64::EPSILON => Some(f as i64),
        _ => None,
    }
}

/// Returns the value under `key`, treating an explicit `null` the same as an absent key.
pub(crate) fn get_present<'a>(doc: &'a Document, key: &str) -> Option<&'a Bson> {
    match doc.get(key) {
        None | Some(Bson::Null) => None,
        Some(value) => Some(value),
    }
}

/// Unwraps a BSON value that must be a document.
pub(crate) fn expect_document(value: &Bson, context: &str) -> Result<Document> {
    match value {
        Bson::Document(d) => Ok(d.clone()),
        other => Err(Error::malformed(format!(
            "{}: expected a document, got {:?}",
            context,
            other.element_type()
        ))),
    }
}

/// Parses a "major.minor[.patch]" server version string into its major and minor components.
pub(crate) fn parse_version(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.split('.').map(str::parse::<u64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor))) => Some((major, minor)),
        (Some(Ok(major)), None) => Some((major, 0)),
        _ => None,
    }
}
