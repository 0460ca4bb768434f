//! Pipeline Controller: the per-turn state machine that ensures the index
//! exists, retrieves context and asks the agent for a reply.

mod controller;
mod step;


pub use controller::{PipelineController, PipelineOutcome};
pub use step::Step;
