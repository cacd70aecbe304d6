//! Contains the `Error` and `Result` types that `command_monitoring_spec` uses.

use std::{fmt, path::PathBuf};

use strsim::jaro_winkler;
use thiserror::Error;

/// The minimum Jaro-Winkler similarity at which an unknown name is reported alongside its closest
/// known counterpart.
const SIMILARITY_THRESHOLD: f64 = 0.84;

/// The result type for all methods that can return an error in the `command_monitoring_spec`
/// crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while loading a spec file or executing one of its operations. The inner
/// [`ErrorKind`] is boxed to keep `Result`s small.
#[derive(Debug, Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,
}

impl Error {
    /// Creates a `MalformedSpec` error with the given message.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ErrorKind::MalformedSpec {
            message: message.into(),
        }
        .into()
    }

    /// Creates a `MalformedSpec` error from a deserialization failure, prefixed with the path of
    /// the offending key.
    pub(crate) fn malformed_at<E: fmt::Display>(error: serde_path_to_error::Error<E>) -> Self {
        if error.path().iter().next().is_none() {
            return Error::malformed(error.into_inner().to_string());
        }
        Error::malformed(format!("{}: {}", error.path(), error.inner()))
    }

    /// Creates a `NoSuchOperation` error for `name`, naming the closest of `supported` if it is
    /// similar enough.
    pub(crate) fn no_such_operation(name: &str, supported: &[&str]) -> Self {
        let mut message = format!("the execution target does not support {:?}", name);
        if let Some(similar) = closest_match(name, supported.iter().copied()) {
            message.push_str(&format!(
                ". An operation with a similar name exists: {}",
                similar
            ));
        }
        ErrorKind::NoSuchOperation {
            name: name.to_string(),
            message,
        }
        .into()
    }

    pub(crate) fn invalid_json(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        ErrorKind::InvalidJson {
            path: path.into(),
            message: message.to_string(),
        }
        .into()
    }

    /// Whether this error was caused by a structurally invalid spec document.
    pub fn is_malformed_spec(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::MalformedSpec { .. })
    }

    /// Whether this error was caused by an operation the execution target does not support.
    pub fn is_no_such_operation(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::NoSuchOperation { .. })
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self {
            kind: Box::new(err.into()),
        }
    }
}

impl std::ops::Deref for Error {
    type Target = ErrorKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The types of errors that can occur.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A required key of a spec document was missing or had the wrong shape.
    #[error("Malformed spec: {message}")]
    #[non_exhaustive]
    MalformedSpec { message: String },

    /// An operation named an action that the execution target does not expose.
    #[error("No such operation: {message}")]
    #[non_exhaustive]
    NoSuchOperation { name: String, message: String },

    /// Wrapper around [`std::io::Error`].
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A spec file could not be parsed as extended JSON.
    #[error("Unable to parse extended JSON from {}: {message}", .path.display())]
    #[non_exhaustive]
    InvalidJson { path: PathBuf, message: String },
}

/// Returns the candidate most similar to `name`, provided it clears the similarity threshold.
pub(crate) fn closest_match<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let (similarity, candidate) =
        candidates
            .into_iter()
            .fold((0.0, None), |acc, candidate| {
                let similarity = jaro_winkler(candidate, name).abs();
                if similarity > acc.0 {
                    return (similarity, Some(candidate));
                }
                acc
            });
    if similarity >= SIMILARITY_THRESHOLD {
        candidate
    } else {
        None
    }
}
