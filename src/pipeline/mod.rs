// Data processing pipeline: chunk sizing, record processing and stage orchestration

pub mod chunking;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use chunking::ChunkPlan;
