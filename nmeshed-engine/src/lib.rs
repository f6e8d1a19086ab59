#[cfg(test)]
mod convergence;
mod engine;
mod orchestrator;
mod schema;
mod state;

pub use engine::{EngineConfig, SyncEngine};
pub use orchestrator::ConnectionOrchestrator;
pub use schema::{SchemaCodec, SchemaRegistry};
pub use state::EngineState;
