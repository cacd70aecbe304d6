use serde::Deserialize;

use crate::{
    bson::Document,
    error::Result,
    event::CommandEvent,
    matchable::MatchErrExt,
    serde_util,
    spec::{expectation::deserialize_expectations, Expectation, Operation},
};

/// One scenario of a spec file: an operation to run and the events it must produce.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Test {
    #[serde(default, deserialize_with = "serde_util::deserialize_null_default")]
    description: String,

    operation: Operation,

    #[serde(deserialize_with = "deserialize_expectations")]
    expectations: Vec<Expectation>,

    #[serde(
        rename = "ignore_if_server_version_greater_than",
        default,
        deserialize_with = "serde_util::deserialize_server_version"
    )]
    max_version: Option<(u64, u64)>,

    #[serde(
        rename = "ignore_if_server_version_less_than",
        default,
        deserialize_with = "serde_util::deserialize_server_version"
    )]
    min_version: Option<(u64, u64)>,
}

impl Test {
    /// Builds a test from one entry of a spec file's `tests` array.
    ///
    /// `expectations` may either be a document whose keys are event kinds, or an array of
    /// single-key documents.
    pub fn new(test: &Document) -> Result<Self> {
        serde_util::from_document(test)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The expected events, in the order they must be observed.
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    /// The highest server version, as (major, minor), this test runs against.
    pub fn max_server_version(&self) -> Option<(u64, u64)> {
        self.max_version
    }

    /// The lowest server version, as (major, minor), this test runs against.
    pub fn min_server_version(&self) -> Option<(u64, u64)> {
        self.min_version
    }

    /// Whether this test applies to a server of the given (major, minor) version.
    pub fn should_run_on(&self, server_version: (u64, u64)) -> bool {
        if let Some(max) = self.max_version {
            if server_version > max {
                return false;
            }
        }
        if let Some(min) = self.min_version {
            if server_version < min {
                return false;
            }
        }
        true
    }

    /// Compares the events recorded while running this test's operation against its expectations.
    /// Each expectation is matched against the event at the same position; events recorded beyond
    /// the last expectation are ignored.
    pub fn verify_events(&self, events: &[CommandEvent]) -> std::result::Result<(), String> {
        if events.len() < self.expectations.len() {
            return Err(format!(
                "expected at least {} events, got {}",
                self.expectations.len(),
                events.len()
            ));
        }
        for (i, (expectation, event)) in self.expectations.iter().zip(events).enumerate() {
            expectation
                .matches(event)
                .prefix(&format!("event {} ({})", i, expectation.name()))?;
        }
        Ok(())
    }
}
