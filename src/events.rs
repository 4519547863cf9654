use crate::error::CameraError;
use crate::frame::StillImage;
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle events emitted by the capture state machine.
///
/// Every asynchronous hardware outcome surfaces as exactly one of these
/// variants; callers observe state progress by consuming the stream instead
/// of registering nested callbacks.
#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// The device opened and the handle is now usable
    Opened { device: String },
    /// A capture session was configured and is ready for a still capture
    SessionReady,
    /// A still capture completed and produced an image
    CaptureCompleted { image: StillImage },
    /// A still capture failed; the machine is back at a retryable state
    CaptureFailed { reason: CameraError },
    /// The hardware reported a disconnect; all handles were released
    Disconnected,
    /// The machine reached `Closed`, by shutdown or by fatal error
    Closed,
    /// A non-capture failure (open or session configuration)
    Error { reason: CameraError },
}

impl CameraEvent {
    /// Get the event type as a string for filtering and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            CameraEvent::Opened { .. } => "opened",
            CameraEvent::SessionReady => "session_ready",
            CameraEvent::CaptureCompleted { .. } => "capture_completed",
            CameraEvent::CaptureFailed { .. } => "capture_failed",
            CameraEvent::Disconnected => "disconnected",
            CameraEvent::Closed => "closed",
            CameraEvent::Error { .. } => "error",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CameraEvent::Opened { device } => format!("Device {} opened", device),
            CameraEvent::SessionReady => "Capture session ready".to_string(),
            CameraEvent::CaptureCompleted { image } => {
                format!(
                    "Capture completed ({}x{}, {} bytes)",
                    image.width,
                    image.height,
                    image.data.len()
                )
            }
            CameraEvent::CaptureFailed { reason } => format!("Capture failed: {}", reason),
            CameraEvent::Disconnected => "Device disconnected".to_string(),
            CameraEvent::Closed => "Device closed".to_string(),
            CameraEvent::Error { reason } => format!("Camera error: {}", reason),
        }
    }
}

/// Lazily-consumed sequence of [`CameraEvent`]s.
///
/// Single consumer: the stream belongs to whoever drives the capture
/// sequence. Dropping it abandons the sequence without affecting the
/// state machine.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<CameraEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<CameraEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, or `None` once the state machine is gone.
    pub async fn recv(&mut self) -> Option<CameraEvent> {
        let event = self.receiver.recv().await;
        if let Some(ref event) = event {
            debug!("Event: {}", event.description());
        }
        event
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<CameraEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_event_types() {
        let event = CameraEvent::Opened {
            device: "0".to_string(),
        };
        assert_eq!(event.event_type(), "opened");
        assert_eq!(CameraEvent::SessionReady.event_type(), "session_ready");
        assert_eq!(CameraEvent::Disconnected.event_type(), "disconnected");
        assert_eq!(CameraEvent::Closed.event_type(), "closed");
    }

    #[test]
    fn test_event_descriptions() {
        let image = StillImage::new(
            SystemTime::now(),
            vec![0u8; 12],
            2,
            2,
            crate::frame::StillFormat::Rgb24,
        );
        let event = CameraEvent::CaptureCompleted { image };
        assert!(event.description().contains("2x2"));

        let event = CameraEvent::CaptureFailed {
            reason: CameraError::DeviceLost,
        };
        assert!(event.description().contains("device lost"));
    }

    #[tokio::test]
    async fn test_event_stream_delivery() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = EventStream::new(rx);

        tx.send(CameraEvent::SessionReady).unwrap();
        let event = stream.recv().await.unwrap();
        assert_eq!(event.event_type(), "session_ready");

        assert!(stream.try_recv().is_none());

        drop(tx);
        assert!(stream.recv().await.is_none());
    }
}
