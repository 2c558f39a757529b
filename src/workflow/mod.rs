pub mod run_ctx;
pub mod stream_flow;
pub mod variant_flow;

pub use run_ctx::{PipelineRun, RunState};
pub use stream_flow::{consume_stream, StreamOutcome};
pub use variant_flow::{ExamOutput, VariantFlow, GENERATION_METHOD};
