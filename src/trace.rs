use crate::bson::{Bson, Document};

pub(crate) const SPEC_TRACING_EVENT_TARGET: &str = "command_monitoring_spec::spec";
pub(crate) const OPERATION_TRACING_EVENT_TARGET: &str = "command_monitoring_spec::operation";

/// Documents longer than this are truncated when emitted as part of a tracing event.
pub(crate) const DEFAULT_MAX_DOCUMENT_LENGTH_BYTES: usize = 1000;

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        truncate_on_char_boundary(
            Bson::Document(self.clone())
                .into_relaxed_extjson()
                .to_string(),
            DEFAULT_MAX_DOCUMENT_LENGTH_BYTES,
        )
    }
}

impl TracingRepresentation for Option<&Document> {
    type Representation = Option<String>;

    fn tracing_representation(&self) -> Option<String> {
        self.map(|doc| doc.tracing_representation())
    }
}

/// Truncates `s` to at most `max_length_bytes` bytes, adding "..." to mark the cut.
pub(crate) fn truncate_on_char_boundary(mut s: String, max_length_bytes: usize) -> String {
    if s.len() > max_length_bytes {
        let mut end = max_length_bytes;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
        s.push_str("...");
    }
    s
}
