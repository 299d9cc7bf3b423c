//! ## sluss-engine
//! **Task-tree interpreter and scenario runner**
//!
//! Walks a parsed scenario's serial/parallel task tree against a set of
//! collaborator seams (node RPC, process control, chain oracle,
//! path-finding service, user-deposit contract). Serial blocks fail
//! fast and cancel what follows; parallel blocks run every child to a
//! terminal state and aggregate all failures. The runner wraps the
//! interpreter with structural validation, provisioning probes, and a
//! final report.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod context;
pub mod evaluate;
pub mod handlers;
pub mod interpreter;
pub mod path;
pub mod runner;

pub use context::{RunContext, Timing};
pub use interpreter::{execute, LeafRecord, Outcome, TaskStatus};
pub use path::TaskPath;
pub use runner::{Collaborators, FailedTask, ScenarioReport, ScenarioRunner};
