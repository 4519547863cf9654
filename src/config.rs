use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EdgesightConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Device id to open; when unset the first enumerated camera is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Still capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Capture with auto-exposure enabled
    #[serde(default = "default_auto_exposure")]
    pub auto_exposure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// Side length of the square network input, in pixels
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Per-channel mean subtracted during normalization
    #[serde(default = "default_channel_mean")]
    pub channel_mean: f32,

    /// Per-channel divisor applied during normalization
    #[serde(default = "default_channel_std")]
    pub channel_std: f32,

    /// Number of classes the network scores, equal to the label table length
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Maximum number of results returned per classification
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum confidence a result must exceed to be reported
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl EdgesightConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("edgesight.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default(
                "camera.resolution",
                vec![
                    default_camera_resolution().0,
                    default_camera_resolution().1,
                ],
            )?
            .set_default("camera.auto_exposure", default_auto_exposure())?
            .set_default("classifier.input_size", default_input_size())?
            .set_default("classifier.channel_mean", default_channel_mean() as f64)?
            .set_default("classifier.channel_std", default_channel_std() as f64)?
            .set_default("classifier.num_classes", default_num_classes() as i64)?
            .set_default("classifier.top_k", default_top_k() as i64)?
            .set_default(
                "classifier.confidence_threshold",
                default_confidence_threshold() as f64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with EDGESIGHT_ prefix
            .add_source(Environment::with_prefix("EDGESIGHT").separator("_"))
            .build()?;

        let config: EdgesightConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.classifier.input_size == 0 {
            return Err(ConfigError::Message(
                "Classifier input_size must be greater than 0".to_string(),
            ));
        }

        if self.classifier.channel_std == 0.0 {
            return Err(ConfigError::Message(
                "Classifier channel_std must not be zero".to_string(),
            ));
        }

        if self.classifier.num_classes == 0 {
            return Err(ConfigError::Message(
                "Classifier num_classes must be greater than 0".to_string(),
            ));
        }

        if self.classifier.top_k == 0 {
            return Err(ConfigError::Message(
                "Classifier top_k must be greater than 0".to_string(),
            ));
        }

        if !self.classifier.confidence_threshold.is_finite() {
            return Err(ConfigError::Message(
                "Classifier confidence_threshold must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for EdgesightConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                device: None,
                resolution: default_camera_resolution(),
                auto_exposure: default_auto_exposure(),
            },
            classifier: ClassifierConfig {
                input_size: default_input_size(),
                channel_mean: default_channel_mean(),
                channel_std: default_channel_std(),
                num_classes: default_num_classes(),
                top_k: default_top_k(),
                confidence_threshold: default_confidence_threshold(),
            },
        }
    }
}

// Default value functions
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_auto_exposure() -> bool {
    true
}

fn default_input_size() -> u32 {
    224
}
fn default_channel_mean() -> f32 {
    117.0
}
fn default_channel_std() -> f32 {
    1.0
}
fn default_num_classes() -> usize {
    1008
}
fn default_top_k() -> usize {
    3
}
fn default_confidence_threshold() -> f32 {
    0.1
}
