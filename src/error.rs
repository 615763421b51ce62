//! Error types for the mastering analysis engine

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur during audio analysis
///
/// Loader errors are fatal to a run. Errors raised while computing a single
/// band's metrics are caught by the orchestrator and recorded on that band.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Container is not a RIFF/WAVE file with integer PCM samples
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Sample rate outside {44100, 48000}
    #[error("Unsupported sample rate: {0} Hz (expected 44100 or 48000)")]
    UnsupportedSampleRate(u32),

    /// Bit depth outside {16, 24}
    #[error("Unsupported bit depth: {0} bits (expected 16 or 24)")]
    UnsupportedBitDepth(u16),

    /// Channel count outside {1, 2}
    #[error("Unsupported channel count: {0} (expected mono or stereo)")]
    UnsupportedChannelCount(u16),

    /// Malformed header or truncated sample data
    #[error("Corrupt file: {0}")]
    CorruptFile(String),

    /// File could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Processing error during analysis
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Numerical error (non-finite intermediate values)
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// The run was cancelled between bands
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Short, stable category name for callers that surface one error category
    pub fn category(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFormat(_) => "unsupported_format",
            AnalysisError::UnsupportedSampleRate(_) => "unsupported_sample_rate",
            AnalysisError::UnsupportedBitDepth(_) => "unsupported_bit_depth",
            AnalysisError::UnsupportedChannelCount(_) => "unsupported_channel_count",
            AnalysisError::CorruptFile(_) => "corrupt_file",
            AnalysisError::Io(_) => "io",
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::ProcessingError(_) => "processing",
            AnalysisError::NumericalError(_) => "numerical",
            AnalysisError::Cancelled => "cancelled",
        }
    }
}

impl From<hound::Error> for AnalysisError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => {
                if io.kind() == std::io::ErrorKind::UnexpectedEof {
                    AnalysisError::CorruptFile(format!("truncated data: {}", io))
                } else {
                    AnalysisError::Io(io)
                }
            }
            hound::Error::FormatError(msg) => AnalysisError::CorruptFile(msg.to_string()),
            hound::Error::Unsupported => {
                AnalysisError::UnsupportedFormat("unsupported WAV encoding".to_string())
            }
            hound::Error::TooWide => {
                AnalysisError::CorruptFile("sample wider than declared bit depth".to_string())
            }
            hound::Error::UnfinishedSample => {
                AnalysisError::CorruptFile("data ends in the middle of a sample frame".to_string())
            }
            hound::Error::InvalidSampleFormat => {
                AnalysisError::UnsupportedFormat("sample format is not integer PCM".to_string())
            }
        }
    }
}

impl From<ebur128::Error> for AnalysisError {
    fn from(err: ebur128::Error) -> Self {
        AnalysisError::ProcessingError(format!("EBU R128 reference meter failed: {:?}", err))
    }
}
