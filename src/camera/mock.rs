use super::channel::{
    CaptureRequest, DeviceHandle, DeviceId, HardwareCaptureChannel, HardwareEvent, SessionHandle,
    Surface,
};
use crate::error::CameraError;
use crate::frame::{StillFormat, StillImage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::SystemTime;
use tokio::sync::{mpsc, Notify};
use tracing::trace;
use uuid::Uuid;

struct MockState {
    permission: bool,
    devices: Vec<DeviceId>,
    open_devices: HashSet<DeviceId>,
    live_sessions: HashSet<Uuid>,
    fail_next_open: bool,
    fail_next_configure: bool,
    fail_next_capture: bool,
    hold_captures: bool,
    frame_color: [u8; 3],
    last_auto_exposure: Option<bool>,
}

/// In-memory hardware channel with scriptable behavior.
///
/// Produces solid-color RGB frames at the session's surface resolution, so
/// the full capture-and-classify path runs without camera hardware. Tests
/// script failures and disconnects through the setter methods; a held
/// capture stays pending until released or cancelled.
pub struct MockCaptureChannel {
    state: Mutex<MockState>,
    events_tx: mpsc::UnboundedSender<HardwareEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<HardwareEvent>>>,
    release: Notify,
}

impl MockCaptureChannel {
    /// A channel with one camera (`"0"`), permission granted, no scripted
    /// failures.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(MockState {
                permission: true,
                devices: vec![DeviceId::from("0")],
                open_devices: HashSet::new(),
                live_sessions: HashSet::new(),
                fail_next_open: false,
                fail_next_configure: false,
                fail_next_capture: false,
                hold_captures: false,
                frame_color: [128, 128, 128],
                last_auto_exposure: None,
            }),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            release: Notify::new(),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.state.lock().permission = granted;
    }

    pub fn set_devices(&self, ids: &[&str]) {
        self.state.lock().devices = ids.iter().map(|id| DeviceId::from(*id)).collect();
    }

    pub fn set_frame_color(&self, color: [u8; 3]) {
        self.state.lock().frame_color = color;
    }

    pub fn fail_next_open(&self) {
        self.state.lock().fail_next_open = true;
    }

    pub fn fail_next_configure(&self) {
        self.state.lock().fail_next_configure = true;
    }

    pub fn fail_next_capture(&self) {
        self.state.lock().fail_next_capture = true;
    }

    /// Make subsequent captures block until [`release_captures`] is called
    /// or the capture is cancelled.
    ///
    /// [`release_captures`]: MockCaptureChannel::release_captures
    pub fn hold_captures(&self) {
        self.state.lock().hold_captures = true;
    }

    pub fn release_captures(&self) {
        self.state.lock().hold_captures = false;
        self.release.notify_waiters();
    }

    /// Deliver an unsolicited disconnect for the given device.
    pub fn trigger_disconnect(&self, id: &str) {
        let _ = self.events_tx.send(HardwareEvent::Disconnected {
            device: DeviceId::from(id),
        });
    }

    /// Deliver an unsolicited fatal hardware error for the given device.
    pub fn trigger_fatal_error(&self, id: &str, details: &str) {
        let _ = self.events_tx.send(HardwareEvent::Error {
            device: DeviceId::from(id),
            details: details.to_string(),
        });
    }

    /// Number of devices currently held open.
    pub fn open_device_count(&self) -> usize {
        self.state.lock().open_devices.len()
    }

    /// Number of sessions currently configured.
    pub fn live_session_count(&self) -> usize {
        self.state.lock().live_sessions.len()
    }

    /// Auto-exposure setting of the most recent capture request.
    pub fn last_auto_exposure(&self) -> Option<bool> {
        self.state.lock().last_auto_exposure
    }
}

impl Default for MockCaptureChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareCaptureChannel for MockCaptureChannel {
    fn has_capture_permission(&self) -> bool {
        self.state.lock().permission
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceId>, CameraError> {
        Ok(self.state.lock().devices.clone())
    }

    async fn open(&self, id: &DeviceId) -> Result<DeviceHandle, CameraError> {
        let mut state = self.state.lock();
        if state.fail_next_open {
            state.fail_next_open = false;
            return Err(CameraError::OpenFailed {
                details: "injected open failure".to_string(),
            });
        }
        if !state.open_devices.insert(id.clone()) {
            return Err(CameraError::OpenFailed {
                details: format!("device {} is already open", id),
            });
        }
        trace!("Mock device {} opened", id);
        Ok(DeviceHandle::new(id.clone()))
    }

    async fn configure_session(
        &self,
        device: &DeviceHandle,
        surface: &Surface,
    ) -> Result<SessionHandle, CameraError> {
        let mut state = self.state.lock();
        if state.fail_next_configure {
            state.fail_next_configure = false;
            return Err(CameraError::SessionConfigurationFailed {
                details: "injected configuration failure".to_string(),
            });
        }
        if !state.open_devices.contains(device.id()) {
            return Err(CameraError::SessionConfigurationFailed {
                details: format!("device {} is not open", device.id()),
            });
        }
        let session = SessionHandle::new(device.id().clone(), *surface);
        state.live_sessions.insert(session.id());
        trace!("Mock session {} configured", session.id());
        Ok(session)
    }

    async fn capture(
        &self,
        session: &SessionHandle,
        request: &CaptureRequest,
    ) -> Result<StillImage, CameraError> {
        loop {
            let released = self.release.notified();
            tokio::pin!(released);
            // Register for the wakeup before checking the flag, otherwise a
            // release between the check and the await is missed.
            released.as_mut().enable();
            if !self.state.lock().hold_captures {
                break;
            }
            released.await;
        }

        let (width, height, color) = {
            let mut state = self.state.lock();
            state.last_auto_exposure = Some(request.auto_exposure);
            if state.fail_next_capture {
                state.fail_next_capture = false;
                return Err(CameraError::CaptureFailed {
                    details: "injected capture failure".to_string(),
                });
            }
            if !state.live_sessions.contains(&session.id()) {
                return Err(CameraError::CaptureFailed {
                    details: format!("session {} is closed", session.id()),
                });
            }
            let surface = session.surface();
            (surface.width, surface.height, state.frame_color)
        };

        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        trace!(
            "Mock capture {} produced {}x{} frame",
            request.id,
            width,
            height
        );
        Ok(StillImage::new(
            SystemTime::now(),
            data,
            width,
            height,
            StillFormat::Rgb24,
        ))
    }

    async fn close_session(&self, session: &SessionHandle) {
        self.state.lock().live_sessions.remove(&session.id());
        trace!("Mock session {} closed", session.id());
    }

    async fn close_device(&self, device: &DeviceHandle) {
        self.state.lock().open_devices.remove(device.id());
        trace!("Mock device {} closed", device.id());
    }

    fn hardware_events(&self) -> mpsc::UnboundedReceiver<HardwareEvent> {
        match self.events_rx.lock().take() {
            Some(receiver) => receiver,
            None => {
                // Already taken: hand back a receiver that never yields.
                let (_tx, rx) = mpsc::unbounded_channel();
                rx
            }
        }
    }
}
