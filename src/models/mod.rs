pub mod exam;
pub mod loaders;
pub mod progress;
pub mod question;
pub mod variant;

pub use exam::{ExamDifficulty, ExamSettings};
pub use loaders::{load_question, load_questions};
pub use progress::{EventKind, ProgressEvent, Stage};
pub use question::{Choice, Question};
pub use variant::{
    Difficulty, DifficultySpec, GenerationBatch, OriginalReference, OriginalSolution,
    Verification, VariantCandidate, VariantsResult,
};
