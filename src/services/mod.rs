//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心调用顺序；顺序由 workflow 层决定

pub mod item_verifier;
pub mod output_writer;
pub mod progress;
pub mod renderer;
pub mod selection;
pub mod template_store;

pub use item_verifier::{ItemVerifier, VerificationReport};
pub use output_writer::{OutputWriter, SavedExam};
pub use progress::{ProgressAggregator, ProgressReporter, ProgressSnapshot};
pub use renderer::DocumentRenderer;
pub use selection::SelectionFilter;
pub use template_store::{TemplateStore, TemplateWarning, DEFAULT_TEMPLATE};
