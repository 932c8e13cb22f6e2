//! Application-level orchestration.
//!
//! `workflow` is the Idle/Loading/Results state machine; `controller` drives it from
//! UI commands and owns the in-flight request task. Presentation layers talk to this
//! module only through commands in and presenter events out.

mod controller;
pub(crate) mod workflow;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use workflow::WorkflowController;
