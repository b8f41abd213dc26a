//! Deliberation pipeline
//!
//! - [`Dispatcher`] fans a query out to a worker batch and collects the
//!   valid answers
//! - [`Synthesizer`] merges those answers through the mediator model,
//!   repairing and reconciling its output
//! - [`PerspectiveRouter`] optionally asks the mediator which perspectives
//!   should answer
//! - [`Orchestrator`] composes the stages

pub mod controller;
pub mod dispatcher;
pub mod router;
pub mod synthesis;

pub use controller::Orchestrator;
pub use dispatcher::{DispatchConfig, DispatchReport, Dispatcher};
pub use router::PerspectiveRouter;
pub use synthesis::{Synthesis, SynthesisConfig, Synthesizer};
