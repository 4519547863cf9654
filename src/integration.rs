use crate::classifier::{ClassificationPipeline, ClassificationResult};
use crate::events::{CameraEvent, EventStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Connects the capture state machine's event stream to the classification
/// pipeline.
///
/// Runs on the background execution context: every `CaptureCompleted` image
/// is classified and the results are sent to the caller-supplied sink.
/// Classification failures fail only that image; they never affect capture
/// state or stop the task. The task ends when the event stream does.
pub struct CaptureClassifyIntegration {
    classified_count: Arc<AtomicU64>,
    failed_count: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl CaptureClassifyIntegration {
    /// Spawn the integration task over the given event stream and sink.
    pub fn spawn(
        pipeline: Arc<ClassificationPipeline>,
        mut events: EventStream,
        sink: mpsc::UnboundedSender<Vec<ClassificationResult>>,
    ) -> Self {
        let classified_count = Arc::new(AtomicU64::new(0));
        let failed_count = Arc::new(AtomicU64::new(0));

        let classified = Arc::clone(&classified_count);
        let failed = Arc::clone(&failed_count);
        let task = tokio::spawn(async move {
            info!("Capture-classify integration started");

            while let Some(event) = events.recv().await {
                match event {
                    CameraEvent::CaptureCompleted { image } => {
                        match pipeline.classify(&image) {
                            Ok(results) => {
                                classified.fetch_add(1, Ordering::Relaxed);
                                if sink.send(results).is_err() {
                                    debug!("Result sink closed; stopping integration");
                                    break;
                                }
                            }
                            Err(e) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                error!("Classification failed: {}", e);
                            }
                        }
                    }
                    other => {
                        debug!("Integration observed event: {}", other.description());
                    }
                }
            }

            info!("Capture-classify integration stopped");
        });

        Self {
            classified_count,
            failed_count,
            task,
        }
    }

    /// Number of images classified successfully.
    pub fn classified_count(&self) -> u64 {
        self.classified_count.load(Ordering::Relaxed)
    }

    /// Number of images whose classification failed.
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Whether the integration task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the integration task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}
