//! This crate contains a typed model of the MongoDB command monitoring spec tests, along with the
//! matching rules used to compare the command monitoring events a driver emits against the events
//! a spec file expects.
//!
//! A spec file describes fixture `data`, the collection and database to run against, and a list of
//! tests. Each test names one operation to execute and the sequence of
//! `command_started_event` / `command_succeeded_event` / `command_failed_event` expectations that
//! executing it must produce.
//!
//! Seeding the collection, attaching a listener to a client and running tests one after the other
//! is left to the test runner; this crate provides the pieces it needs:
//!
//! - [`Spec`], [`Test`], [`Operation`] and [`Expectation`], built from a fully resolved
//!   [`bson::Document`] or read from an extended JSON file.
//! - [`ExecutionTarget`], the interface an operation is executed against.
//! - [`event::EventRecorder`] and [`event::EventBuffer`] for collecting events.
//! - [`Test::verify_events`] and the [`matchable`] rules for comparing them.
//!
//! ```rust
//! use command_monitoring_spec::{bson::doc, MonitoringCall, Spec};
//!
//! # fn main() -> command_monitoring_spec::error::Result<()> {
//! let spec = Spec::new(&doc! {
//!     "tests": [{
//!         "description": "A successful find",
//!         "operation": { "name": "find", "arguments": { "filter": {} } },
//!         "expectations": {
//!             "command_started_event": {
//!                 "command_name": "find",
//!                 "database_name": "db",
//!                 "command": { "find": "coll" },
//!             },
//!         },
//!     }],
//! })?;
//!
//! let expectation = &spec.tests()[0].expectations()[0];
//! assert_eq!(expectation.monitoring_call(), MonitoringCall::Started);
//! assert_eq!(expectation.tested_field().as_str(), "command");
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Loading specs and executing operations emit [`tracing`] events under the
//! `command_monitoring_spec::spec` and `command_monitoring_spec::operation` targets.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use ::bson;

mod bson_util;
pub mod error;
pub mod event;
pub mod matchable;
mod serde_util;
mod spec;
mod trace;

pub use crate::spec::{
    load_spec_dir,
    EventKind,
    ExecutionTarget,
    Expectation,
    LoadOptions,
    MonitoringCall,
    Operation,
    Spec,
    Test,
    TestedField,
    TEST_FILE_ENV_VAR,
};
