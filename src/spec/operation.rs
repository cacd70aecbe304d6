use serde::Deserialize;

use crate::{
    bson::{Bson, Document},
    bson_util,
    error::Error,
    serde_util,
    trace::{TracingRepresentation, OPERATION_TRACING_EVENT_TARGET},
};

/// Something an [`Operation`] can be executed against, typically a collection handle of the driver
/// under test.
///
/// Targets declare the operation names they support up front; [`Operation::execute`] never calls
/// [`ExecutionTarget::invoke`] with a name outside that list.
pub trait ExecutionTarget {
    /// The error type of the target. Errors produced by the target are handed back to the caller
    /// of [`Operation::execute`] unmodified.
    type Error: From<Error>;

    /// The documents produced by an operation, possibly fetched lazily.
    type Cursor: IntoIterator<Item = Result<Document, Self::Error>>;

    /// The names of the operations this target can run, e.g. "find" or "deleteMany".
    fn supported_operations(&self) -> &[&str];

    /// Runs the named operation with the given filter.
    fn invoke(&self, name: &str, filter: Option<Document>) -> Result<Self::Cursor, Self::Error>;
}

/// The database call a test makes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Operation {
    name: String,

    #[serde(default, deserialize_with = "serde_util::deserialize_null_default")]
    arguments: Document,
}

impl Operation {
    /// Extracts the name and arguments of an operation. The arguments are kept verbatim and the
    /// name is not checked against any execution target.
    pub fn new(operation: &Document) -> crate::error::Result<Self> {
        serde_util::from_document(operation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &Document {
        &self.arguments
    }

    /// The `filter` argument, if one was given.
    pub fn filter(&self) -> Option<&Bson> {
        bson_util::get_present(&self.arguments, "filter")
    }

    /// Invokes this operation on `target` exactly once, forwarding only the `filter` argument, and
    /// collects every resulting document.
    ///
    /// An unsupported name fails with a `NoSuchOperation` error before the target is touched.
    /// Failures raised by the target are returned as-is.
    pub fn execute<T: ExecutionTarget>(&self, target: &T) -> Result<Vec<Document>, T::Error> {
        let supported = target.supported_operations();
        if !supported.contains(&self.name.as_str()) {
            return Err(Error::no_such_operation(&self.name, supported).into());
        }

        let filter = self
            .filter()
            .map(|filter| {
                bson_util::expect_document(filter, &format!("{} filter", self.name))
            })
            .transpose()?;

        tracing::debug!(
            target: OPERATION_TRACING_EVENT_TARGET,
            operation = self.name.as_str(),
            filter = filter.as_ref().tracing_representation(),
            "Executing operation"
        );

        let result = target
            .invoke(&self.name, filter)?
            .into_iter()
            .collect::<Result<Vec<_>, _>>();

        match result {
            Ok(ref documents) => tracing::debug!(
                target: OPERATION_TRACING_EVENT_TARGET,
                operation = self.name.as_str(),
                count = documents.len(),
                "Operation succeeded"
            ),
            Err(_) => tracing::debug!(
                target: OPERATION_TRACING_EVENT_TARGET,
                operation = self.name.as_str(),
                "Operation failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{bson::doc, error::ErrorKind};

    #[derive(Debug)]
    enum TargetError {
        Spec(Error),
        Driver(String),
    }

    impl From<Error> for TargetError {
        fn from(err: Error) -> Self {
            Self::Spec(err)
        }
    }

    /// Records every invocation and answers "find" with a fixed set of documents.
    #[derive(Default)]
    struct RecordingTarget {
        calls: RefCell<Vec<(String, Option<Document>)>>,
        fail_midway: bool,
    }

    impl ExecutionTarget for RecordingTarget {
        type Error = TargetError;
        type Cursor = Vec<Result<Document, TargetError>>;

        fn supported_operations(&self) -> &[&str] {
            &["find", "deleteMany"]
        }

        fn invoke(
            &self,
            name: &str,
            filter: Option<Document>,
        ) -> Result<Self::Cursor, Self::Error> {
            self.calls.borrow_mut().push((name.to_string(), filter));
            match name {
                "find" if self.fail_midway => Ok(vec![
                    Ok(doc! { "_id": 1 }),
                    Err(TargetError::Driver("cursor killed".to_string())),
                ]),
                "find" => Ok(vec![Ok(doc! { "_id": 1 }), Ok(doc! { "_id": 2 })]),
                _ => Err(TargetError::Driver("not authorized".to_string())),
            }
        }
    }

    fn operation(doc: Document) -> Operation {
        Operation::new(&doc).unwrap()
    }

    #[test]
    fn extracts_name_and_arguments_verbatim() {
        let op = operation(doc! {
            "name": "find",
            "arguments": { "filter": { "x": 1 }, "sort": { "_id": 1 }, "limit": 2 },
        });
        assert_eq!(op.name(), "find");
        assert_eq!(
            op.arguments(),
            &doc! { "filter": { "x": 1 }, "sort": { "_id": 1 }, "limit": 2 }
        );
        assert_eq!(op.filter(), Some(&Bson::Document(doc! { "x": 1 })));
    }

    #[test]
    fn missing_arguments_default_to_empty() {
        let op = operation(doc! { "name": "find" });
        assert!(op.arguments().is_empty());
        assert_eq!(op.filter(), None);
    }

    #[test]
    fn name_is_required() {
        let error = Operation::new(&doc! { "arguments": {} }).unwrap_err();
        assert!(error.is_malformed_spec());
        let error = Operation::new(&doc! { "name": 1 }).unwrap_err();
        assert!(error.is_malformed_spec());
        assert!(error.to_string().contains("name"), "{}", error);

        let error = Operation::new(&doc! { "name": "find", "arguments": [] }).unwrap_err();
        assert!(error.is_malformed_spec());
    }

    #[test]
    fn null_arguments_default_to_empty() {
        let op = operation(doc! { "name": "find", "arguments": Bson::Null });
        assert!(op.arguments().is_empty());
    }

    #[test]
    fn execute_forwards_only_filter() {
        let target = RecordingTarget::default();
        let op = operation(doc! {
            "name": "find",
            "arguments": { "filter": { "x": 1 }, "limit": 1 },
        });

        let documents = op.execute(&target).unwrap();
        assert_eq!(documents, vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
        assert_eq!(
            *target.calls.borrow(),
            vec![("find".to_string(), Some(doc! { "x": 1 }))]
        );
    }

    #[test]
    fn execute_unsupported_name() {
        let target = RecordingTarget::default();
        let op = operation(doc! { "name": "aggregate", "arguments": { "filter": {} } });

        match op.execute(&target) {
            Err(TargetError::Spec(error)) => {
                assert!(matches!(
                    *error.kind,
                    ErrorKind::NoSuchOperation { ref name, .. } if name == "aggregate"
                ));
            }
            other => panic!("expected NoSuchOperation, got {:?}", other),
        }
        assert!(target.calls.borrow().is_empty());
    }

    #[test]
    fn execute_propagates_target_errors() {
        let target = RecordingTarget::default();
        let op = operation(doc! { "name": "deleteMany", "arguments": { "filter": {} } });
        match op.execute(&target) {
            Err(TargetError::Driver(message)) => assert_eq!(message, "not authorized"),
            other => panic!("expected driver error, got {:?}", other),
        }

        let target = RecordingTarget {
            fail_midway: true,
            ..Default::default()
        };
        let op = operation(doc! { "name": "find", "arguments": { "filter": {} } });
        match op.execute(&target) {
            Err(TargetError::Driver(message)) => assert_eq!(message, "cursor killed"),
            other => panic!("expected driver error, got {:?}", other),
        }
    }

    #[test]
    fn execute_rejects_non_document_filter() {
        let target = RecordingTarget::default();
        let op = operation(doc! { "name": "find", "arguments": { "filter": "x" } });
        match op.execute(&target) {
            Err(TargetError::Spec(error)) => assert!(error.is_malformed_spec()),
            other => panic!("expected malformed spec, got {:?}", other),
        }
        assert!(target.calls.borrow().is_empty());
    }
}
