use thiserror::Error;

/// Main error type for the Shorts-Composer library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Malformed timing data: {0}")]
    Timing(#[from] TimingError),

    #[error("Subtitle layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Clip library error: {0}")]
    ClipLibrary(#[from] ClipLibraryError),

    #[error("Plan validation failed: {0}")]
    Plan(#[from] PlanValidationError),

    #[error("Media backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Raw ASR timing input that cannot be normalized
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("transcript contains no words")]
    Empty,

    #[error("negative or non-finite time in word '{word}' ({start}s - {end}s)")]
    NegativeDuration { word: String, start: f64, end: f64 },

    #[error("invalid total audio duration: {duration}s")]
    InvalidTotalDuration { duration: f64 },

    #[error("could not parse transcript: {reason}")]
    ParseFailed { reason: String },
}

/// Subtitle layout errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("cue text '{text}' does not fit a {width}x{height} frame even at {font_size}px")]
    CannotFit {
        text: String,
        width: u32,
        height: u32,
        font_size: u32,
    },
}

/// Clip library and clip sequencing errors
#[derive(Error, Debug)]
pub enum ClipLibraryError {
    #[error("clip library has no usable clips to fill {target:.2}s")]
    Insufficient { target: f64 },

    #[error("clip directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("failed to probe clip {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("invalid sequencing parameters: {details}")]
    InvalidParameters { details: String },
}

/// Cross-component invariant violated before backend dispatch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    #[error("timeline duration {timeline:.3}s differs from voiceover duration {voiceover:.3}s by more than {tolerance:.3}s")]
    DurationMismatch {
        timeline: f64,
        voiceover: f64,
        tolerance: f64,
    },

    #[error("final subtitle cue ends at {cue_end:.3}s, after the timeline end {timeline:.3}s")]
    SubtitlesOverrun { cue_end: f64, timeline: f64 },

    #[error("expected exactly one {track} track plan, found {count}")]
    TrackCount { track: String, count: usize },

    #[error("transition {index} of {duration:.3}s exceeds half of an adjoining clip")]
    TransitionTooLong { index: usize, duration: f64 },

    #[error("timeline has {segments} segments but {transitions} transitions")]
    TimelineShape { segments: usize, transitions: usize },
}

/// External media backend failures
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{backend} timed out after {seconds}s")]
    Timeout { backend: String, seconds: u64 },

    #[error("{backend} failed with status {status}: {diagnostics}")]
    Execution {
        backend: String,
        status: String,
        diagnostics: String,
    },

    #[error("backend '{name}' is not available: {reason}")]
    Unavailable { name: String, reason: String },
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Failed to write mixed audio: {reason}")]
    WriteFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error may succeed on a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Timeout { .. }) | Self::Backend(BackendError::Execution { .. })
        )
    }

    /// Errors caused by the caller's input rather than by this crate or the backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Timing(_) | Self::ClipLibrary(_) | Self::Config(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Timing(TimingError::Empty) => {
                "The transcript contains no words. Supply a transcript or a fallback timing.".to_string()
            }
            Self::ClipLibrary(ClipLibraryError::Insufficient { .. }) => {
                "No usable video clips were found. Add clips to the clip directory.".to_string()
            }
            Self::Backend(BackendError::Timeout { seconds, .. }) => {
                format!("Rendering did not finish within {}s. Try again or raise render.timeout_secs.", seconds)
            }
            Self::Backend(BackendError::Unavailable { name, .. }) => {
                format!("Renderer '{}' is not available. Is FFmpeg installed?", name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
