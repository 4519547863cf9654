use super::channel::{
    CaptureRequest, DeviceHandle, DeviceSelector, HardwareCaptureChannel, HardwareEvent,
    SessionHandle, Surface,
};
use crate::error::CameraError;
use crate::events::{CameraEvent, EventStream};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// States of the still-capture lifecycle.
///
/// `Error` is transient: it is the machine's state while a failure is being
/// torn down, and every failure path comes to rest in `Open` or `Closed`
/// before the corresponding event is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Closed,
    Opening,
    Open,
    Configuring,
    Ready,
    Capturing,
    Error,
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Closed => "closed",
            CaptureState::Opening => "opening",
            CaptureState::Open => "open",
            CaptureState::Configuring => "configuring",
            CaptureState::Ready => "ready",
            CaptureState::Capturing => "capturing",
            CaptureState::Error => "error",
        }
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

struct Inner {
    state: CaptureState,
    device: Option<Arc<DeviceHandle>>,
    session: Option<Arc<SessionHandle>>,
    capture_cancel: Option<CancellationToken>,
}

struct Shared {
    channel: Arc<dyn HardwareCaptureChannel>,
    inner: Mutex<Inner>,
    events: mpsc::UnboundedSender<CameraEvent>,
}

impl Shared {
    fn emit(&self, event: CameraEvent) {
        // The consumer may have abandoned the stream; that cancels nothing.
        let _ = self.events.send(event);
    }

    /// Unsolicited disconnect or fatal hardware error: release both handles
    /// and force `Closed`. A pending capture fails with `DeviceLost`.
    async fn force_close(&self, event: HardwareEvent) {
        let mut inner = self.inner.lock().await;
        if inner.state == CaptureState::Closed {
            return;
        }

        if let Some(token) = inner.capture_cancel.take() {
            token.cancel();
            self.emit(CameraEvent::CaptureFailed {
                reason: CameraError::DeviceLost,
            });
        }

        if let Some(session) = inner.session.take() {
            self.channel.close_session(&session).await;
        }
        if let Some(device) = inner.device.take() {
            self.channel.close_device(&device).await;
        }
        inner.state = CaptureState::Closed;

        match event {
            HardwareEvent::Disconnected { device } => {
                warn!("Camera {} disconnected", device);
                self.emit(CameraEvent::Disconnected);
            }
            HardwareEvent::Error { device, details } => {
                warn!("Camera {} reported a fatal error: {}", device, details);
                self.emit(CameraEvent::Error {
                    reason: CameraError::Fatal { details },
                });
            }
        }
        self.emit(CameraEvent::Closed);
    }
}

/// The capture state machine.
///
/// Owns the device and session handles exclusively and turns the
/// callback-driven hardware channel into a safe, observable, cancellable
/// sequence of [`CameraEvent`]s. Operations that touch hardware return as
/// soon as the transition is admitted; their outcome arrives on the event
/// stream.
///
/// The machine imposes no timeout of its own: a channel that never resolves
/// leaves it in `Configuring` or `Capturing` until a caller races a
/// `shutdown` against the event stream.
pub struct CaptureController {
    shared: Arc<Shared>,
    auto_exposure: bool,
}

impl CaptureController {
    /// Create a controller over the given hardware channel, starting in
    /// `Closed`, and return it with its event stream.
    pub fn new(channel: Arc<dyn HardwareCaptureChannel>) -> (Self, EventStream) {
        Self::with_auto_exposure(channel, true)
    }

    pub fn with_auto_exposure(
        channel: Arc<dyn HardwareCaptureChannel>,
        auto_exposure: bool,
    ) -> (Self, EventStream) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            channel: Arc::clone(&channel),
            inner: Mutex::new(Inner {
                state: CaptureState::Closed,
                device: None,
                session: None,
                capture_cancel: None,
            }),
            events: events_tx,
        });

        // Watch for disconnects and fatal errors for the machine's lifetime.
        let monitor = Arc::clone(&shared);
        let mut hardware_events = channel.hardware_events();
        tokio::spawn(async move {
            while let Some(event) = hardware_events.recv().await {
                monitor.force_close(event).await;
            }
        });

        (
            Self {
                shared,
                auto_exposure,
            },
            EventStream::new(events_rx),
        )
    }

    /// Current state of the machine.
    pub async fn state(&self) -> CaptureState {
        self.shared.inner.lock().await.state
    }

    /// Open a camera device. Permitted only from `Closed`.
    ///
    /// Fails immediately with `PermissionDenied` when the capture permission
    /// is missing, `NoDeviceFound` when the selector matches nothing, and
    /// `InvalidState` when a previous device has not fully torn down.
    /// On success the machine is `Opening`; the `Opened` event marks the
    /// moment the handle becomes usable.
    pub async fn open(&self, selector: DeviceSelector) -> Result<(), CameraError> {
        {
            let inner = self.shared.inner.lock().await;
            if inner.state != CaptureState::Closed {
                return Err(CameraError::InvalidState {
                    operation: "open",
                    state: inner.state.name(),
                });
            }
        }

        if !self.shared.channel.has_capture_permission() {
            return Err(CameraError::PermissionDenied);
        }

        let devices = self.shared.channel.enumerate_devices().await?;
        let device_id = match selector {
            DeviceSelector::First => devices.into_iter().next().ok_or(CameraError::NoDeviceFound)?,
            DeviceSelector::Id(id) => devices
                .into_iter()
                .find(|candidate| *candidate == id)
                .ok_or(CameraError::NoDeviceFound)?,
        };

        {
            // Re-check after the enumeration await: a concurrent open may
            // have won the slot.
            let mut inner = self.shared.inner.lock().await;
            if inner.state != CaptureState::Closed {
                return Err(CameraError::InvalidState {
                    operation: "open",
                    state: inner.state.name(),
                });
            }
            inner.state = CaptureState::Opening;
        }

        info!("Opening camera device {}", device_id);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            match shared.channel.open(&device_id).await {
                Ok(handle) => {
                    let mut inner = shared.inner.lock().await;
                    if inner.state != CaptureState::Opening {
                        // Shutdown raced the open; hand the device straight back.
                        drop(inner);
                        shared.channel.close_device(&handle).await;
                        return;
                    }
                    inner.device = Some(Arc::new(handle));
                    inner.state = CaptureState::Open;
                    debug!("Camera device {} is open", device_id);
                    shared.emit(CameraEvent::Opened {
                        device: device_id.to_string(),
                    });
                }
                Err(reason) => {
                    let mut inner = shared.inner.lock().await;
                    if inner.state == CaptureState::Opening {
                        inner.state = CaptureState::Closed;
                    }
                    drop(inner);
                    warn!("Opening camera device {} failed: {}", device_id, reason);
                    shared.emit(CameraEvent::Error { reason });
                }
            }
        });

        Ok(())
    }

    /// Configure a capture session against the target surface. Permitted
    /// only from `Open`.
    ///
    /// A stale session is closed before the new one configures; no new
    /// session starts configuring until the old one has reported closed.
    /// Success is signalled by `SessionReady`; a configuration failure is
    /// reported through `Error` and rests the machine back in `Open`.
    pub async fn configure_session(&self, surface: Surface) -> Result<(), CameraError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state != CaptureState::Open {
            return Err(CameraError::InvalidState {
                operation: "configure_session",
                state: inner.state.name(),
            });
        }
        if let Some(stale) = inner.session.take() {
            self.shared.channel.close_session(&stale).await;
        }
        let device = inner.device.clone().ok_or(CameraError::DeviceLost)?;
        inner.state = CaptureState::Configuring;
        drop(inner);

        debug!(
            "Configuring capture session ({}x{}, {:?})",
            surface.width, surface.height, surface.format
        );
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            match shared.channel.configure_session(&device, &surface).await {
                Ok(session) => {
                    let mut inner = shared.inner.lock().await;
                    if inner.state != CaptureState::Configuring {
                        drop(inner);
                        shared.channel.close_session(&session).await;
                        return;
                    }
                    inner.session = Some(Arc::new(session));
                    inner.state = CaptureState::Ready;
                    shared.emit(CameraEvent::SessionReady);
                }
                Err(reason) => {
                    let mut inner = shared.inner.lock().await;
                    if inner.state == CaptureState::Configuring {
                        // Nothing was configured; the device stays usable.
                        inner.state = CaptureState::Open;
                    }
                    drop(inner);
                    warn!("Session configuration failed: {}", reason);
                    shared.emit(CameraEvent::Error { reason });
                }
            }
        });

        Ok(())
    }

    /// Submit one still capture. Permitted only from `Ready`; a second call
    /// while one is in flight fails with `CaptureAlreadyInProgress`.
    ///
    /// On completion `CaptureCompleted` carries the image, the one-shot
    /// session is closed, and the device rests in `Open`. On failure the
    /// session is torn down and `CaptureFailed` is emitted from `Open`.
    /// Returns the request id of the submitted capture.
    pub async fn capture(&self) -> Result<uuid::Uuid, CameraError> {
        let mut inner = self.shared.inner.lock().await;
        match inner.state {
            CaptureState::Capturing => return Err(CameraError::CaptureAlreadyInProgress),
            CaptureState::Ready => {}
            other => {
                return Err(CameraError::InvalidState {
                    operation: "capture",
                    state: other.name(),
                })
            }
        }
        let session = inner.session.clone().ok_or(CameraError::DeviceLost)?;
        let request = CaptureRequest::new(self.auto_exposure);
        let request_id = request.id;
        let token = CancellationToken::new();
        inner.capture_cancel = Some(token.clone());
        inner.state = CaptureState::Capturing;
        drop(inner);

        info!("Submitting still capture {}", request_id);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    // Shutdown or disconnect owns the teardown and has
                    // already reported DeviceLost for this request.
                    debug!("Capture {} cancelled", request.id);
                }
                outcome = shared.channel.capture(&session, &request) => {
                    let mut inner = shared.inner.lock().await;
                    if token.is_cancelled() || inner.state != CaptureState::Capturing {
                        return;
                    }
                    inner.capture_cancel = None;
                    match outcome {
                        Ok(image) => {
                            inner.state = CaptureState::Ready;
                            shared.emit(CameraEvent::CaptureCompleted { image });
                            // One-shot still capture, not a repeating stream:
                            // the session closes, the device stays open.
                            if let Some(session) = inner.session.take() {
                                shared.channel.close_session(&session).await;
                            }
                            inner.state = CaptureState::Open;
                            info!("Capture {} completed", request.id);
                        }
                        Err(reason) => {
                            inner.state = CaptureState::Error;
                            if let Some(session) = inner.session.take() {
                                shared.channel.close_session(&session).await;
                            }
                            inner.state = CaptureState::Open;
                            warn!("Capture {} failed: {}", request.id, reason);
                            shared.emit(CameraEvent::CaptureFailed { reason });
                        }
                    }
                }
            }
        });

        Ok(request_id)
    }

    /// Close any open session, then the device. Valid from any state,
    /// always ends in `Closed`, idempotent.
    ///
    /// A capture still in flight is cancelled and fails with `DeviceLost`
    /// rather than completing.
    pub async fn shutdown(&self) {
        let mut inner = self.shared.inner.lock().await;
        if inner.state == CaptureState::Closed {
            debug!("Shutdown requested but the machine is already closed");
            return;
        }
        info!("Shutting down capture from state {}", inner.state);

        if let Some(token) = inner.capture_cancel.take() {
            token.cancel();
            self.shared.emit(CameraEvent::CaptureFailed {
                reason: CameraError::DeviceLost,
            });
        }
        if let Some(session) = inner.session.take() {
            self.shared.channel.close_session(&session).await;
        }
        if let Some(device) = inner.device.take() {
            self.shared.channel.close_device(&device).await;
        }
        inner.state = CaptureState::Closed;
        self.shared.emit(CameraEvent::Closed);
    }
}
