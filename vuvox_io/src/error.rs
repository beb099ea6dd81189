use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("need {needed} samples for one analysis window, got {got}")]
    NotEnoughSamples { needed: usize, got: usize },

    #[error("invalid analyzer settings: {0}")]
    InvalidSettings(String),

    #[error("spectrum analysis failed: {0}")]
    Fft(String),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
