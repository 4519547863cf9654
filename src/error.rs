use thiserror::Error;

/// Coarse failure classification used by callers to pick a recovery path.
///
/// `Permission` failures need user action before a retry can succeed.
/// `Resource` failures require reopening the device from `Closed`.
/// `Protocol` failures are recoverable by retrying from `Open`.
/// `Contract` failures are programming or environment errors and are never
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Permission,
    Resource,
    Protocol,
    Contract,
}

/// Failures raised by the capture state machine and the hardware channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("no camera device found")]
    NoDeviceFound,

    #[error("camera capture permission not granted")]
    PermissionDenied,

    #[error("a capture is already in progress")]
    CaptureAlreadyInProgress,

    #[error("camera device lost")]
    DeviceLost,

    #[error("fatal hardware error: {details}")]
    Fatal { details: String },

    #[error("device open failed: {details}")]
    OpenFailed { details: String },

    #[error("session configuration failed: {details}")]
    SessionConfigurationFailed { details: String },

    #[error("capture failed: {details}")]
    CaptureFailed { details: String },

    #[error("operation '{operation}' is not permitted in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl CameraError {
    /// Classify this failure for retry decisions.
    pub fn kind(&self) -> FailureKind {
        match self {
            CameraError::PermissionDenied => FailureKind::Permission,
            CameraError::NoDeviceFound
            | CameraError::CaptureAlreadyInProgress
            | CameraError::DeviceLost
            | CameraError::Fatal { .. }
            | CameraError::InvalidState { .. } => FailureKind::Resource,
            CameraError::OpenFailed { .. }
            | CameraError::SessionConfigurationFailed { .. }
            | CameraError::CaptureFailed { .. } => FailureKind::Protocol,
        }
    }
}

/// Failures raised by the classification pipeline.
///
/// These are all contract violations: fatal to the current call, never
/// retried automatically, and they leave the capture state machine
/// untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("unsupported image format: {details}")]
    UnsupportedImageFormat { details: String },

    #[error("invalid label table: {details}")]
    InvalidLabelTable { details: String },

    #[error("inference contract violation: expected {expected} scores, got {actual}")]
    InferenceContractViolation { expected: usize, actual: usize },
}

impl ClassifierError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::Contract
    }
}

#[derive(Error, Debug)]
pub enum EdgesightError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl EdgesightError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EdgesightError>;
