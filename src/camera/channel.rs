use crate::error::CameraError;
use crate::frame::{StillFormat, StillImage};
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of a physical camera as reported by device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which device `open` should pick from the enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Open the first enumerated camera
    First,
    /// Open the camera with the given id
    Id(DeviceId),
}

/// Target image sink a capture session renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub format: StillFormat,
}

impl Surface {
    pub fn new(width: u32, height: u32, format: StillFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }
}

/// One-shot still capture descriptor submitted to a session.
///
/// Produces zero or one terminal outcome; the request id ties log lines of
/// a single capture together.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub id: Uuid,
    pub auto_exposure: bool,
}

impl CaptureRequest {
    pub fn new(auto_exposure: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            auto_exposure,
        }
    }
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Exclusive ownership token for an opened camera device.
///
/// Created only by a successful channel `open`; invalidated when the device
/// closes, disconnects, or errors. The state machine is the sole owner.
#[derive(Debug)]
pub struct DeviceHandle {
    id: DeviceId,
}

impl DeviceHandle {
    /// Construct a handle for a freshly opened device. Channel
    /// implementations call this; nothing else should.
    pub fn new(id: DeviceId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }
}

/// Exclusive ownership token for a configured capture session.
///
/// Owned by exactly one device at a time; destroyed when the device closes,
/// errors, or a new session is requested.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    device: DeviceId,
    surface: Surface,
}

impl SessionHandle {
    /// Construct a handle for a freshly configured session. Channel
    /// implementations call this; nothing else should.
    pub fn new(device: DeviceId, surface: Surface) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            surface,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

/// Unsolicited hardware notifications, delivered outside any pending
/// operation. Either one forces the state machine to `Closed`.
#[derive(Debug, Clone)]
pub enum HardwareEvent {
    /// The device was disconnected (unplugged, claimed by another process)
    Disconnected { device: DeviceId },
    /// The device reported a fatal error
    Error { device: DeviceId, details: String },
}

/// Thin contract over the real camera API: open device, configure session,
/// capture, close.
///
/// Each method maps 1:1 onto a callback pair of the underlying hardware
/// stack; resolving the returned future is the flattened `onSuccess` /
/// `onFailure` of that pair. Unsolicited disconnects and fatal errors
/// arrive through [`HardwareCaptureChannel::hardware_events`].
#[async_trait]
pub trait HardwareCaptureChannel: Send + Sync {
    /// Whether the process holds the capture permission.
    fn has_capture_permission(&self) -> bool;

    /// List the physical cameras currently present.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceId>, CameraError>;

    /// Open a device for exclusive use.
    async fn open(&self, id: &DeviceId) -> Result<DeviceHandle, CameraError>;

    /// Configure a capture session against the target surface.
    async fn configure_session(
        &self,
        device: &DeviceHandle,
        surface: &Surface,
    ) -> Result<SessionHandle, CameraError>;

    /// Run one still capture on the session.
    async fn capture(
        &self,
        session: &SessionHandle,
        request: &CaptureRequest,
    ) -> Result<StillImage, CameraError>;

    /// Release a session. Infallible from the caller's point of view.
    async fn close_session(&self, session: &SessionHandle);

    /// Release a device. Infallible from the caller's point of view.
    async fn close_device(&self, device: &DeviceHandle);

    /// Take the unsolicited event stream. Called exactly once, by the state
    /// machine that owns this channel; later calls return a receiver that
    /// never yields.
    fn hardware_events(&self) -> mpsc::UnboundedReceiver<HardwareEvent>;
}
