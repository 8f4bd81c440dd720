//! Runs the simulation engine over building models, one process per model.

#[macro_use]
extern crate tracing;

pub mod engine;
pub mod runner;
pub mod tool;

pub use engine::EngineConfig;
pub use runner::{
    OrchestratorError,
    RunStatus,
    SimulationOrchestrator,
    SimulationRequest,
    SimulationRun,
};
pub use tool::{
    ExternalTool,
    ProcessTool,
    ToolCommand,
    ToolOutput,
};
