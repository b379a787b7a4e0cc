//! Core module - configuration, shared state, service boundary and tasks
//!
//! # Module layout
//!
//! - [`Config`] - environment configuration
//! - [`PrintState`] - shared handles to every component
//! - [`PrintService`] - operations exposed to callers
//! - [`BackgroundTasks`] - dispatcher lifecycle

pub mod config;
pub mod service;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use service::{AdminHandle, PrintService};
pub use state::{Backends, JobCounters, JobHistory, PrintState};
pub use tasks::{BackgroundTasks, TaskKind};
