//! Contains the command monitoring events that expectations are compared against, and the recorder
//! interface a test runner uses to collect them.

use std::sync::{Arc, Mutex};

use derive_more::From;

use crate::{
    bson::{Bson, Document},
    spec::{EventKind, MonitoringCall},
};

/// An event that triggers when a database command is initiated.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandStartedEvent {
    /// The command being run.
    pub command: Document,

    /// The name of the database the command is being run against.
    pub db: String,

    /// The type of command being run, e.g. "find" or "hello".
    pub command_name: String,

    /// The driver-generated identifier for the request.
    pub request_id: i32,
}

/// An event that triggers when a database command completes without an error.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandSucceededEvent {
    /// The server's reply to the command.
    pub reply: Document,

    /// The type of command that was run, e.g. "find" or "hello".
    pub command_name: String,

    /// The driver-generated identifier for the request. Matches the `request_id` of the
    /// `CommandStartedEvent` that triggered earlier.
    pub request_id: i32,
}

/// An event that triggers when a command failed to complete successfully.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandFailedEvent {
    /// The type of command that was run, e.g. "find" or "hello".
    pub command_name: String,

    /// A description of the error that the command failed with.
    pub failure: String,

    /// The driver-generated identifier for the request. Matches the `request_id` of the
    /// `CommandStartedEvent` that triggered earlier.
    pub request_id: i32,
}

/// A command monitoring event of any kind.
#[derive(Clone, Debug, PartialEq, From)]
pub enum CommandEvent {
    Started(CommandStartedEvent),
    Succeeded(CommandSucceededEvent),
    Failed(CommandFailedEvent),
}

impl CommandEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started(_) => EventKind::CommandStartedEvent,
            Self::Succeeded(_) => EventKind::CommandSucceededEvent,
            Self::Failed(_) => EventKind::CommandFailedEvent,
        }
    }

    pub fn monitoring_call(&self) -> MonitoringCall {
        self.kind().monitoring_call()
    }

    pub fn command_name(&self) -> &str {
        match self {
            Self::Started(event) => event.command_name.as_str(),
            Self::Succeeded(event) => event.command_name.as_str(),
            Self::Failed(event) => event.command_name.as_str(),
        }
    }

    /// The database the command ran against. Only started events carry it.
    pub fn database_name(&self) -> Option<&str> {
        match self {
            Self::Started(event) => Some(event.db.as_str()),
            _ => None,
        }
    }

    pub fn request_id(&self) -> i32 {
        match self {
            Self::Started(event) => event.request_id,
            Self::Succeeded(event) => event.request_id,
            Self::Failed(event) => event.request_id,
        }
    }

    /// The payload an expectation of the same kind compares: the command for started events, the
    /// reply for succeeded events and the failure message for failed events.
    pub fn tested_value(&self) -> Bson {
        match self {
            Self::Started(event) => Bson::Document(event.command.clone()),
            Self::Succeeded(event) => Bson::Document(event.reply.clone()),
            Self::Failed(event) => Bson::String(event.failure.clone()),
        }
    }
}

/// A monitoring listener that exposes the events it observed through one channel per
/// [`MonitoringCall`].
pub trait EventRecorder {
    fn started(&self) -> Vec<CommandStartedEvent>;

    fn succeeded(&self) -> Vec<CommandSucceededEvent>;

    fn failed(&self) -> Vec<CommandFailedEvent>;

    /// Returns the events recorded on the given channel, in the order they were observed.
    fn events_for(&self, call: MonitoringCall) -> Vec<CommandEvent> {
        match call {
            MonitoringCall::Started => self.started().into_iter().map(Into::into).collect(),
            MonitoringCall::Succeeded => self.succeeded().into_iter().map(Into::into).collect(),
            MonitoringCall::Failed => self.failed().into_iter().map(Into::into).collect(),
        }
    }
}

/// A buffer of command events. Clones share the same underlying storage, so one clone can be handed
/// to the code emitting events while another is inspected by the runner.
#[derive(Clone, Debug, Default)]
pub struct EventBuffer {
    events: Arc<Mutex<Vec<CommandEvent>>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<CommandEvent>) {
        self.lock().push(event.into());
    }

    /// Returns every buffered event in arrival order.
    pub fn all(&self) -> Vec<CommandEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn filter_map<R>(&self, f: impl Fn(&CommandEvent) -> Option<R>) -> Vec<R> {
        self.lock().iter().filter_map(f).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CommandEvent>> {
        // A poisoned buffer still holds every event pushed before the panic.
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventRecorder for EventBuffer {
    fn started(&self) -> Vec<CommandStartedEvent> {
        self.filter_map(|e| match e {
            CommandEvent::Started(e) => Some(e.clone()),
            _ => None,
        })
    }

    fn succeeded(&self) -> Vec<CommandSucceededEvent> {
        self.filter_map(|e| match e {
            CommandEvent::Succeeded(e) => Some(e.clone()),
            _ => None,
        })
    }

    fn failed(&self) -> Vec<CommandFailedEvent> {
        self.filter_map(|e| match e {
            CommandEvent::Failed(e) => Some(e.clone()),
            _ => None,
        })
    }
}
