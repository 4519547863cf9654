mod builder;
mod channel;
mod mock;
mod state_machine;
#[cfg(test)]
mod tests;

pub use builder::CaptureControllerBuilder;
pub use channel::{
    CaptureRequest, DeviceHandle, DeviceId, DeviceSelector, HardwareCaptureChannel, HardwareEvent,
    SessionHandle, Surface,
};
pub use mock::MockCaptureChannel;
pub use state_machine::{CaptureController, CaptureState};
