use super::channel::HardwareCaptureChannel;
use super::state_machine::CaptureController;
use crate::error::{EdgesightError, Result};
use crate::events::EventStream;
use std::sync::Arc;

/// Builder for the capture state machine
pub struct CaptureControllerBuilder {
    channel: Option<Arc<dyn HardwareCaptureChannel>>,
    auto_exposure: bool,
}

impl CaptureControllerBuilder {
    pub fn new() -> Self {
        Self {
            channel: None,
            auto_exposure: true,
        }
    }

    pub fn channel(mut self, channel: Arc<dyn HardwareCaptureChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn auto_exposure(mut self, auto_exposure: bool) -> Self {
        self.auto_exposure = auto_exposure;
        self
    }

    pub fn build(self) -> Result<(CaptureController, EventStream)> {
        let channel = self
            .channel
            .ok_or_else(|| EdgesightError::system("Hardware channel must be specified"))?;

        Ok(CaptureController::with_auto_exposure(
            channel,
            self.auto_exposure,
        ))
    }
}

impl Default for CaptureControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
