use std::fmt;

use derive_more::Display;
use serde::{
    de::{Error as _, IntoDeserializer, MapAccess, SeqAccess, Unexpected, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
};

use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{closest_match, Error, Result},
    event::CommandEvent,
    matchable::{eq_matches, MatchErrExt, Matchable},
};

/// The kinds of command monitoring events that an expectation can describe.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[display("command_started_event")]
    CommandStartedEvent,
    #[display("command_succeeded_event")]
    CommandSucceededEvent,
    #[display("command_failed_event")]
    CommandFailedEvent,
}

impl EventKind {
    const NAMES: &'static [&'static str] = &[
        "command_started_event",
        "command_succeeded_event",
        "command_failed_event",
    ];

    /// Parses the key used for this kind in spec files.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_key(name).map_err(Error::malformed)
    }

    fn from_key(name: &str) -> std::result::Result<Self, String> {
        let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            name.into_deserializer();
        Self::deserialize(deserializer).map_err(|_| {
            let mut message = format!("unrecognized expectation kind {:?}", name);
            if let Some(similar) = closest_match(name, Self::NAMES.iter().copied()) {
                message.push_str(&format!(". Did you mean {}?", similar));
            }
            message
        })
    }

    /// The observation channel of an event recorder that holds events of this kind.
    pub fn monitoring_call(self) -> MonitoringCall {
        match self {
            Self::CommandStartedEvent => MonitoringCall::Started,
            Self::CommandSucceededEvent => MonitoringCall::Succeeded,
            Self::CommandFailedEvent => MonitoringCall::Failed,
        }
    }

    /// The payload field compared for events of this kind.
    pub fn tested_field(self) -> TestedField {
        match self {
            Self::CommandStartedEvent => TestedField::Command,
            Self::CommandSucceededEvent => TestedField::Reply,
            Self::CommandFailedEvent => TestedField::Message,
        }
    }
}

/// The symbolic name of an event stream exposed by an event recorder.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringCall {
    #[display("started")]
    Started,
    #[display("succeeded")]
    Succeeded,
    #[display("failed")]
    Failed,
}

/// The payload key of an event that an expectation compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum TestedField {
    #[display("command")]
    Command,
    #[display("reply")]
    Reply,
    #[display("message")]
    Message,
}

impl TestedField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Reply => "reply",
            Self::Message => "message",
        }
    }
}

/// One expected command monitoring event.
///
/// The channel to read from and the field to compare are both derived from the event kind, so the
/// two can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct Expectation {
    kind: EventKind,
    body: Document,
}

impl Expectation {
    /// Builds an expectation from its event-kind key and body. Unknown kinds, non-document bodies
    /// and non-string `command_name` / `database_name` values are rejected; missing keys inside the
    /// body are not.
    pub fn new(name: &str, body: &Bson) -> Result<Self> {
        let kind = EventKind::parse(name)?;
        let body = bson_util::expect_document(body, &format!("expectation {:?}", name))?;
        Self::from_body(kind, body).map_err(Error::malformed)
    }

    fn from_body(kind: EventKind, body: Document) -> std::result::Result<Self, String> {
        for key in ["command_name", "database_name"] {
            match bson_util::get_present(&body, key) {
                None | Some(Bson::String(_)) => {}
                Some(other) => {
                    return Err(format!(
                        "{}: expected {:?} to be a string, got {:?}",
                        kind,
                        key,
                        other.element_type()
                    ))
                }
            }
        }
        Ok(Self { kind, body })
    }

    /// The event-kind key this expectation was declared with.
    pub fn name(&self) -> String {
        self.kind.to_string()
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn body(&self) -> &Document {
        &self.body
    }

    pub fn command_name(&self) -> Option<&str> {
        bson_util::get_present(&self.body, "command_name").and_then(Bson::as_str)
    }

    pub fn database_name(&self) -> Option<&str> {
        bson_util::get_present(&self.body, "database_name").and_then(Bson::as_str)
    }

    pub fn monitoring_call(&self) -> MonitoringCall {
        self.kind.monitoring_call()
    }

    pub fn tested_field(&self) -> TestedField {
        self.kind.tested_field()
    }

    /// The value expected under [`Expectation::tested_field`], if the body declares one. An
    /// explicit `null` declares nothing.
    pub fn expected_value(&self) -> Option<&Bson> {
        bson_util::get_present(&self.body, self.tested_field().as_str())
    }

    /// Compares a recorded event against this expectation.
    pub fn matches(&self, event: &CommandEvent) -> std::result::Result<(), String> {
        if event.kind() != self.kind {
            return Err(format!(
                "expected {} event, got {} event",
                self.monitoring_call(),
                event.monitoring_call()
            ));
        }

        if let Some(command_name) = self.command_name() {
            eq_matches("command_name", &event.command_name(), &command_name)?;
        }
        if let (Some(database_name), Some(actual)) = (self.database_name(), event.database_name())
        {
            eq_matches("database_name", &actual, &database_name)?;
        }

        let field = self.tested_field().as_str();
        match self.expected_value() {
            None => Ok(()),
            Some(expected) => event.tested_value().matches(expected).prefix(field),
        }
    }
}

/// Deserializes the `expectations` of a test: either a document whose keys are event kinds, or an
/// array of such documents. Every entry is kept in order, including repeated keys.
pub(crate) fn deserialize_expectations<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<Expectation>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(ExpectationsVisitor { allow_array: true })
}

struct ExpectationsVisitor {
    allow_array: bool,
}

impl<'de> Visitor<'de> for ExpectationsVisitor {
    type Value = Vec<Expectation>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.allow_array {
            formatter.write_str("a document or an array of documents keyed by event kind")
        } else {
            formatter.write_str("a document keyed by event kind")
        }
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut map: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut expectations = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(name) = map.next_key::<String>()? {
            let kind = EventKind::from_key(&name).map_err(A::Error::custom)?;
            let body: Document = map.next_value()?;
            expectations.push(Expectation::from_body(kind, body).map_err(A::Error::custom)?);
        }
        Ok(expectations)
    }

    fn visit_seq<A: SeqAccess<'de>>(
        self,
        mut seq: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        if !self.allow_array {
            return Err(A::Error::invalid_type(Unexpected::Seq, &self));
        }
        let mut expectations = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(ExpectationMap(entries)) = seq.next_element()? {
            expectations.extend(entries);
        }
        Ok(expectations)
    }
}

struct ExpectationMap(Vec<Expectation>);

impl<'de> Deserialize<'de> for ExpectationMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer
            .deserialize_map(ExpectationsVisitor { allow_array: false })
            .map(ExpectationMap)
    }
}
