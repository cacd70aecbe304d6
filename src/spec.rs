//! The typed representation of a command monitoring spec file.

mod expectation;
mod load;
mod operation;
mod test_case;

pub use self::{
    expectation::{EventKind, Expectation, MonitoringCall, TestedField},
    load::{load_spec_dir, LoadOptions, TEST_FILE_ENV_VAR},
    operation::{ExecutionTarget, Operation},
    test_case::Test,
};

use serde::Deserialize;

use crate::{
    bson::Document,
    error::Result,
    serde_util,
    trace::SPEC_TRACING_EVENT_TARGET,
};

/// A parsed spec file: fixture data shared by every test, and the tests themselves in declaration
/// order.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Spec {
    #[serde(default, deserialize_with = "serde_util::deserialize_null_default")]
    data: Vec<Document>,

    collection_name: Option<String>,

    database_name: Option<String>,

    #[serde(deserialize_with = "serde_util::deserialize_nonempty_vec")]
    tests: Vec<Test>,
}

impl Spec {
    /// Builds a spec from a fully resolved document.
    ///
    /// `data` may be absent, in which case no fixture documents are inserted. `tests` must be a
    /// non-empty array.
    pub fn new(spec: &Document) -> Result<Self> {
        let spec: Self = serde_util::from_document(spec)?;
        spec.trace_loaded();
        Ok(spec)
    }

    fn trace_loaded(&self) {
        tracing::debug!(
            target: SPEC_TRACING_EVENT_TARGET,
            collectionName = self.collection_name.as_deref(),
            databaseName = self.database_name.as_deref(),
            dataCount = self.data.len(),
            testCount = self.tests.len(),
            "Spec loaded"
        );
    }

    /// The documents to insert into the collection before each test.
    pub fn data(&self) -> &[Document] {
        &self.data
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    /// The collection name, or `default` if the spec file does not name one.
    pub fn collection_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.collection_name().unwrap_or(default)
    }

    /// The database name, or `default` if the spec file does not name one.
    pub fn database_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.database_name().unwrap_or(default)
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bson::{doc, Bson};

    fn test_entry(description: &str) -> Document {
        doc! {
            "description": description,
            "operation": { "name": "find", "arguments": { "filter": {} } },
            "expectations": {
                "command_started_event": {
                    "command_name": "find",
                    "database_name": "d",
                    "command": { "find": "c" },
                },
            },
        }
    }

    #[test]
    fn single_find_scenario() {
        let spec = Spec::new(&doc! { "tests": [test_entry("t1")] }).unwrap();
        assert_eq!(spec.tests().len(), 1);
        assert!(spec.data().is_empty());
        assert_eq!(spec.collection_name(), None);
        assert_eq!(spec.database_name(), None);

        let test = &spec.tests()[0];
        assert_eq!(test.expectations().len(), 1);
        let expectation = &test.expectations()[0];
        assert_eq!(expectation.monitoring_call(), MonitoringCall::Started);
        assert_eq!(
            expectation.expected_value(),
            Some(&Bson::Document(doc! { "find": "c" }))
        );
    }

    #[test]
    fn globals_and_test_order() {
        let spec = Spec::new(&doc! {
            "data": [{ "_id": 1, "x": 11 }, { "_id": 2, "x": 22 }],
            "collection_name": "test",
            "database_name": "command-monitoring-tests",
            "tests": [test_entry("first"), test_entry("second"), test_entry("third")],
        })
        .unwrap();

        assert_eq!(
            spec.data(),
            &[doc! { "_id": 1, "x": 11 }, doc! { "_id": 2, "x": 22 }]
        );
        assert_eq!(spec.collection_name_or("coll"), "test");
        assert_eq!(spec.database_name(), Some("command-monitoring-tests"));
        let descriptions: Vec<_> = spec.tests().iter().map(Test::description).collect();
        assert_eq!(descriptions, vec!["first", "second", "third"]);
    }

    #[test]
    fn defaults_for_absent_names() {
        let spec = Spec::new(&doc! {
            "data": Bson::Null,
            "collection_name": Bson::Null,
            "tests": [test_entry("t")],
        })
        .unwrap();
        assert!(spec.data().is_empty());
        assert_eq!(spec.collection_name_or("coll"), "coll");
        assert_eq!(spec.database_name_or("db"), "db");
    }

    #[test]
    fn missing_tests_is_malformed() {
        let error = Spec::new(&doc! { "data": [] }).unwrap_err();
        assert!(error.is_malformed_spec());
    }

    #[test]
    fn malformed_shapes() {
        for spec in [
            doc! { "tests": Bson::Null },
            doc! { "tests": {} },
            doc! { "tests": [] },
            doc! { "tests": [1] },
            doc! { "data": { "_id": 1 }, "tests": [test_entry("t")] },
            doc! { "data": [1], "tests": [test_entry("t")] },
            doc! { "database_name": 5, "tests": [test_entry("t")] },
        ] {
            let error = Spec::new(&spec).unwrap_err();
            assert!(error.is_malformed_spec(), "{:?}: {}", spec, error);
        }
    }

    #[test]
    fn malformed_test_stops_loading() {
        let mut broken = test_entry("broken");
        broken.remove("operation");
        let error = Spec::new(&doc! { "tests": [test_entry("ok"), broken] }).unwrap_err();
        assert!(error.is_malformed_spec());
        assert!(error.to_string().contains("tests[1]"), "{}", error);
    }
}
