use super::*;
use crate::error::CameraError;
use crate::events::{CameraEvent, EventStream};
use crate::frame::StillFormat;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn test_surface() -> Surface {
    Surface::new(8, 6, StillFormat::Rgb24)
}

async fn next_event(events: &mut EventStream) -> CameraEvent {
    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for a camera event")
        .expect("event stream ended unexpectedly")
}

/// Open the mock camera and wait until the device handle is usable.
async fn opened_controller() -> (Arc<MockCaptureChannel>, CaptureController, EventStream) {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, mut events) =
        CaptureController::new(channel.clone() as Arc<dyn HardwareCaptureChannel>);

    controller.open(DeviceSelector::First).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::Opened { device } => assert_eq!(device, "0"),
        other => panic!("Expected Opened, got {:?}", other),
    }

    (channel, controller, events)
}

/// Open the mock camera and configure a session, waiting for `Ready`.
async fn ready_controller() -> (Arc<MockCaptureChannel>, CaptureController, EventStream) {
    let (channel, controller, mut events) = opened_controller().await;

    controller.configure_session(test_surface()).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::SessionReady => {}
        other => panic!("Expected SessionReady, got {:?}", other),
    }

    (channel, controller, events)
}

#[tokio::test]
async fn test_open_happy_path() {
    let (channel, controller, _events) = opened_controller().await;

    assert_eq!(controller.state().await, CaptureState::Open);
    assert_eq!(channel.open_device_count(), 1);
}

#[tokio::test]
async fn test_open_rejected_when_not_closed() {
    let (_channel, controller, _events) = opened_controller().await;

    match controller.open(DeviceSelector::First).await {
        Err(CameraError::InvalidState { operation, state }) => {
            assert_eq!(operation, "open");
            assert_eq!(state, "open");
        }
        other => panic!("Expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_open_with_no_devices() {
    let channel = Arc::new(MockCaptureChannel::new());
    channel.set_devices(&[]);
    let (controller, _events) =
        CaptureController::new(channel as Arc<dyn HardwareCaptureChannel>);

    match controller.open(DeviceSelector::First).await {
        Err(CameraError::NoDeviceFound) => {}
        other => panic!("Expected NoDeviceFound, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);
}

#[tokio::test]
async fn test_open_with_unknown_device_id() {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, _events) =
        CaptureController::new(channel as Arc<dyn HardwareCaptureChannel>);

    let selector = DeviceSelector::Id(DeviceId::from("9"));
    match controller.open(selector).await {
        Err(CameraError::NoDeviceFound) => {}
        other => panic!("Expected NoDeviceFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_open_without_permission() {
    let channel = Arc::new(MockCaptureChannel::new());
    channel.set_permission(false);
    let (controller, _events) =
        CaptureController::new(channel as Arc<dyn HardwareCaptureChannel>);

    match controller.open(DeviceSelector::First).await {
        Err(CameraError::PermissionDenied) => {}
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);
}

#[tokio::test]
async fn test_open_failure_returns_to_closed() {
    let channel = Arc::new(MockCaptureChannel::new());
    channel.fail_next_open();
    let (controller, mut events) =
        CaptureController::new(channel.clone() as Arc<dyn HardwareCaptureChannel>);

    controller.open(DeviceSelector::First).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::Error {
            reason: CameraError::OpenFailed { .. },
        } => {}
        other => panic!("Expected Error(OpenFailed), got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);

    // The machine is back at its retry point and can open again.
    controller.open(DeviceSelector::First).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::Opened { .. } => {}
        other => panic!("Expected Opened, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_capture_cycle() {
    let (channel, controller, mut events) = ready_controller().await;

    controller.capture().await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::CaptureCompleted { image } => {
            assert_eq!(image.width, 8);
            assert_eq!(image.height, 6);
            assert_eq!(image.format, StillFormat::Rgb24);
            assert!(image.validate_size());
        }
        other => panic!("Expected CaptureCompleted, got {:?}", other),
    }

    // One-shot still capture: the session closed, the device stays open.
    assert_eq!(controller.state().await, CaptureState::Open);
    assert_eq!(channel.live_session_count(), 0);
    assert_eq!(channel.open_device_count(), 1);
    assert_eq!(channel.last_auto_exposure(), Some(true));
}

#[tokio::test]
async fn test_second_capture_fails_and_first_resolves() {
    let (channel, controller, mut events) = ready_controller().await;

    channel.hold_captures();
    controller.capture().await.unwrap();

    match controller.capture().await {
        Err(CameraError::CaptureAlreadyInProgress) => {}
        other => panic!("Expected CaptureAlreadyInProgress, got {:?}", other),
    }

    channel.release_captures();
    match next_event(&mut events).await {
        CameraEvent::CaptureCompleted { .. } => {}
        other => panic!("Expected CaptureCompleted, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Open);
}

#[tokio::test]
async fn test_capture_requires_ready_state() {
    let (_channel, controller, _events) = opened_controller().await;

    match controller.capture().await {
        Err(CameraError::InvalidState { operation, state }) => {
            assert_eq!(operation, "capture");
            assert_eq!(state, "open");
        }
        other => panic!("Expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configure_requires_open_state() {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, _events) =
        CaptureController::new(channel as Arc<dyn HardwareCaptureChannel>);

    match controller.configure_session(test_surface()).await {
        Err(CameraError::InvalidState { operation, state }) => {
            assert_eq!(operation, "configure_session");
            assert_eq!(state, "closed");
        }
        other => panic!("Expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configure_failure_rests_in_open() {
    let (channel, controller, mut events) = opened_controller().await;

    channel.fail_next_configure();
    controller.configure_session(test_surface()).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::Error {
            reason: CameraError::SessionConfigurationFailed { .. },
        } => {}
        other => panic!("Expected Error(SessionConfigurationFailed), got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Open);

    // Retry from `Open` succeeds.
    controller.configure_session(test_surface()).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::SessionReady => {}
        other => panic!("Expected SessionReady, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Ready);
}

#[tokio::test]
async fn test_capture_failure_tears_down_session() {
    let (channel, controller, mut events) = ready_controller().await;

    channel.fail_next_capture();
    controller.capture().await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::CaptureFailed {
            reason: CameraError::CaptureFailed { .. },
        } => {}
        other => panic!("Expected CaptureFailed, got {:?}", other),
    }

    assert_eq!(controller.state().await, CaptureState::Open);
    assert_eq!(channel.live_session_count(), 0);

    // Retry from `Open`: reconfigure and capture normally.
    controller.configure_session(test_surface()).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::SessionReady => {}
        other => panic!("Expected SessionReady, got {:?}", other),
    }
    controller.capture().await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::CaptureCompleted { .. } => {}
        other => panic!("Expected CaptureCompleted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (channel, controller, mut events) = ready_controller().await;

    controller.shutdown().await;
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);
    assert_eq!(channel.live_session_count(), 0);
    assert_eq!(channel.open_device_count(), 0);

    // A second shutdown is a no-op and emits nothing.
    controller.shutdown().await;
    assert_eq!(controller.state().await, CaptureState::Closed);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_shutdown_from_closed_state() {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, mut events) =
        CaptureController::new(channel as Arc<dyn HardwareCaptureChannel>);

    controller.shutdown().await;
    assert_eq!(controller.state().await, CaptureState::Closed);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_shutdown_while_opening() {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, mut events) =
        CaptureController::new(channel.clone() as Arc<dyn HardwareCaptureChannel>);

    controller.open(DeviceSelector::First).await.unwrap();
    controller.shutdown().await;
    assert_eq!(controller.state().await, CaptureState::Closed);
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }

    // The racing open hands its device straight back once it completes.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.open_device_count(), 0);
}

#[tokio::test]
async fn test_shutdown_mid_capture_forces_device_lost() {
    let (channel, controller, mut events) = ready_controller().await;

    channel.hold_captures();
    controller.capture().await.unwrap();
    controller.shutdown().await;

    match next_event(&mut events).await {
        CameraEvent::CaptureFailed {
            reason: CameraError::DeviceLost,
        } => {}
        other => panic!("Expected CaptureFailed(DeviceLost), got {:?}", other),
    }
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);
}

#[tokio::test]
async fn test_disconnect_while_capturing() {
    let (channel, controller, mut events) = ready_controller().await;

    channel.hold_captures();
    controller.capture().await.unwrap();
    channel.trigger_disconnect("0");

    match next_event(&mut events).await {
        CameraEvent::CaptureFailed {
            reason: CameraError::DeviceLost,
        } => {}
        other => panic!("Expected CaptureFailed(DeviceLost), got {:?}", other),
    }
    match next_event(&mut events).await {
        CameraEvent::Disconnected => {}
        other => panic!("Expected Disconnected, got {:?}", other),
    }
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }

    // No handle remains valid afterward.
    assert_eq!(controller.state().await, CaptureState::Closed);
    assert_eq!(channel.live_session_count(), 0);
    assert_eq!(channel.open_device_count(), 0);
}

#[tokio::test]
async fn test_reopen_after_disconnect() {
    let (channel, controller, mut events) = opened_controller().await;

    channel.trigger_disconnect("0");
    match next_event(&mut events).await {
        CameraEvent::Disconnected => {}
        other => panic!("Expected Disconnected, got {:?}", other),
    }
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }

    controller.open(DeviceSelector::First).await.unwrap();
    match next_event(&mut events).await {
        CameraEvent::Opened { .. } => {}
        other => panic!("Expected Opened, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Open);
}

#[tokio::test]
async fn test_fatal_hardware_error_forces_closed() {
    let (channel, controller, mut events) = opened_controller().await;

    channel.trigger_fatal_error("0", "sensor overheated");
    match next_event(&mut events).await {
        CameraEvent::Error {
            reason: CameraError::Fatal { details },
        } => assert_eq!(details, "sensor overheated"),
        other => panic!("Expected Error(Fatal), got {:?}", other),
    }
    match next_event(&mut events).await {
        CameraEvent::Closed => {}
        other => panic!("Expected Closed, got {:?}", other),
    }
    assert_eq!(controller.state().await, CaptureState::Closed);
    assert_eq!(channel.open_device_count(), 0);
}

#[tokio::test]
async fn test_builder_requires_channel() {
    let result = CaptureControllerBuilder::new().build();
    assert!(result.is_err());

    if let Err(crate::error::EdgesightError::System { message }) = result {
        assert!(message.contains("Hardware channel must be specified"));
    } else {
        panic!("Expected system error for missing channel");
    }
}

#[tokio::test]
async fn test_builder_with_auto_exposure_disabled() {
    let channel = Arc::new(MockCaptureChannel::new());
    let (controller, mut events) = CaptureControllerBuilder::new()
        .channel(channel.clone())
        .auto_exposure(false)
        .build()
        .unwrap();

    controller.open(DeviceSelector::First).await.unwrap();
    next_event(&mut events).await;
    controller.configure_session(test_surface()).await.unwrap();
    next_event(&mut events).await;
    controller.capture().await.unwrap();
    next_event(&mut events).await;

    assert_eq!(channel.last_auto_exposure(), Some(false));
}
