pub mod engine;
pub mod states;

pub use engine::WorkflowEngine;
pub use states::{TransitionOutcome, WorkflowAction, WorkflowEvent};
