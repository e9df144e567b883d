use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis cancelled after {completed} of {total} unit(s)")]
    Cancelled { completed: usize, total: usize },

    #[error("{analysis} analysis failed: {message}")]
    SubAnalysisFailed { analysis: String, message: String },
}
