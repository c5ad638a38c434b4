// Position management and strategy cycle execution
pub mod orchestrator;
pub mod position_manager;
pub mod runner;

pub use orchestrator::{
    decide_entry, ClosedPosition, CycleReport, CycleResult, CycleSettings, ExecutionAction,
    ExecutionDecision, Orchestrator, Session,
};
pub use position_manager::{ExitDecision, ExitReason, PositionManager, PositionState};
pub use runner::{connection_check, run_loop, LoopTiming};
