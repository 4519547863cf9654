pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod integration;

pub use camera::{
    CaptureController, CaptureControllerBuilder, CaptureRequest, CaptureState, DeviceHandle,
    DeviceId, DeviceSelector, HardwareCaptureChannel, HardwareEvent, MockCaptureChannel,
    SessionHandle, Surface,
};
pub use classifier::{
    select_top_k, ClassificationPipeline, ClassificationResult, FramePreprocessor, Inference,
    InputTensor, LabelTable,
};
pub use config::EdgesightConfig;
pub use error::{
    CameraError, ClassifierError, EdgesightError, FailureKind, Result,
};
pub use events::{CameraEvent, EventStream};
pub use frame::{StillFormat, StillImage};
pub use integration::CaptureClassifyIntegration;
