use serde::{
    de::{DeserializeOwned, Error as _, Unexpected},
    Deserialize,
    Deserializer,
};

use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{Error, Result},
};

/// Deserializes a value from a resolved document, reporting the key path of the first mismatch as
/// a `MalformedSpec` error.
pub(crate) fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    let deserializer = crate::bson::Deserializer::new(Bson::Document(doc.clone()));
    serde_path_to_error::deserialize(deserializer).map_err(Error::malformed_at)
}

/// Deserializes an explicit `null` the same way as an absent key.
pub(crate) fn deserialize_null_default<'de, D, T>(
    deserializer: D,
) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn deserialize_nonempty_vec<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let vec = Vec::<T>::deserialize(deserializer)?;
    if vec.is_empty() {
        return Err(D::Error::invalid_length(0, &"at least one element"));
    }
    Ok(vec)
}

/// Deserializes an optional "major.minor[.patch]" server version string.
pub(crate) fn deserialize_server_version<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<(u64, u64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(version) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    bson_util::parse_version(&version).map(Some).ok_or_else(|| {
        D::Error::invalid_value(Unexpected::Str(&version), &"a server version such as \"4.2\"")
    })
}
