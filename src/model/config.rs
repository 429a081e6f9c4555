// Network architecture and training configuration
// The architecture record is fixed; only the training schedule is configurable

use serde::{Deserialize, Serialize};

use crate::model::classifier::{ClassifierError, ClassifierResult};
use crate::model::types::FEATURE_COUNT;

/// Activation applied after a dense layer's affine transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }

    /// Derivative in terms of the activated output `y`
    pub fn derivative(&self, y: f32) -> f32 {
        match self {
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

/// Shape of one dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub inputs: usize,
    pub outputs: usize,
    pub activation: Activation,
}

impl LayerSpec {
    pub const fn new(inputs: usize, outputs: usize, activation: Activation) -> Self {
        LayerSpec {
            inputs,
            outputs,
            activation,
        }
    }
}

/// Suitability network: 5 -> 64 -> 32 -> 1
pub const PLAYER_ARCHITECTURE: [LayerSpec; 3] = [
    LayerSpec::new(FEATURE_COUNT, 64, Activation::Relu),
    LayerSpec::new(64, 32, Activation::Relu),
    LayerSpec::new(32, 1, Activation::Sigmoid),
];

pub const SEED: u64 = 42;
pub const LEARNING_RATE: f32 = 0.001;
pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Layer shapes, step size and init seed, consumed by `Network::from_config`.
/// The service always uses `NetworkConfig::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Input layer first
    pub layers: Vec<LayerSpec>,

    /// Adam step size
    pub learning_rate: f32,

    /// Seed for weight init and batch shuffling
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            layers: PLAYER_ARCHITECTURE.to_vec(),
            learning_rate: LEARNING_RATE,
            seed: SEED,
        }
    }
}

/// Training schedule, read from the service config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Full passes over the sample set per training call
    pub epochs: usize,

    /// Samples per gradient update
    pub batch_size: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(ClassifierError::InvalidConfig(
                "epochs and batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
