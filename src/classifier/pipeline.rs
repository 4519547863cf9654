use super::labels::LabelTable;
use super::preprocess::{FramePreprocessor, InputTensor};
use super::select::select_top_k;
use super::ClassificationResult;
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::frame::StillImage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// The neural-network inference collaborator.
///
/// Synchronous and side-effect-free from the pipeline's perspective: the
/// prepared tensor goes in, one score per class comes out. Any caching is
/// the implementation's own business.
pub trait Inference: Send + Sync {
    /// Run the network on a prepared input tensor and return the raw
    /// confidence vector.
    fn infer(&self, input: &InputTensor) -> Vec<f32>;

    /// Whether concurrent `infer` calls are safe. When `false` (the
    /// default) the pipeline serializes calls on the implementation's
    /// behalf.
    fn is_reentrant(&self) -> bool {
        false
    }
}

/// Preprocess → infer → top-K selection over one still image.
///
/// Holds no mutable state across calls; each `classify` is independent.
pub struct ClassificationPipeline {
    preprocessor: FramePreprocessor,
    inference: Arc<dyn Inference>,
    labels: LabelTable,
    top_k: usize,
    threshold: f32,
    serialize: Option<Mutex<()>>,
}

impl ClassificationPipeline {
    /// Build a pipeline for the given configuration, inference collaborator
    /// and label table.
    ///
    /// Fails with `InvalidLabelTable` when the table length does not match
    /// the configured class count.
    pub fn new(
        config: &ClassifierConfig,
        inference: Arc<dyn Inference>,
        labels: LabelTable,
    ) -> Result<Self, ClassifierError> {
        if labels.len() != config.num_classes {
            return Err(ClassifierError::InvalidLabelTable {
                details: format!(
                    "label table has {} entries, expected {}",
                    labels.len(),
                    config.num_classes
                ),
            });
        }

        let serialize = if inference.is_reentrant() {
            None
        } else {
            Some(Mutex::new(()))
        };

        Ok(Self {
            preprocessor: FramePreprocessor::from_config(config),
            inference,
            labels,
            top_k: config.top_k,
            threshold: config.confidence_threshold,
            serialize,
        })
    }

    /// Classify one still image.
    ///
    /// An inference output whose length differs from the label table is an
    /// external-contract violation and fails the call; it is not guessed
    /// around.
    pub fn classify(
        &self,
        image: &StillImage,
    ) -> Result<Vec<ClassificationResult>, ClassifierError> {
        let tensor = self.preprocessor.prepare(image)?;

        let scores = {
            let _guard = self.serialize.as_ref().map(|lock| lock.lock());
            self.inference.infer(&tensor)
        };

        if scores.len() != self.labels.len() {
            return Err(ClassifierError::InferenceContractViolation {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }

        let results = select_top_k(&scores, &self.labels, self.top_k, self.threshold)?;
        debug!(
            "Classification produced {} result(s) above threshold {}",
            results.len(),
            self.threshold
        );
        Ok(results)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}
