// Player suitability classifier
// Owns the network: load-or-create at startup, predict, train, save

use ndarray::{aview2, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::model::config::{LayerSpec, NetworkConfig, TrainingConfig};
use crate::model::network::Network;
use crate::model::optimizer::Adam;
use crate::model::types::{FeatureVector, LabeledSample, FEATURE_COUNT};
use crate::state::storage::{self, StorageError};

/// Activations at or above this are "suitable"
pub const DECISION_THRESHOLD: f32 = 0.5;

const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Expected {expected} features, got {actual}")]
    InvalidArity { expected: usize, actual: usize },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Invalid training sample at index {index}: {reason}")]
    InvalidSample { index: usize, reason: String },

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// On-disk model: architecture and parameters
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    network: Network,
}

/// Result of reading a persisted model
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { network: Network, fingerprint: String },
    Absent,
    Corrupt(String),
}

/// Where the in-memory parameters came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// Restored from the model file
    Loaded,
    /// Freshly initialized, no model file existed
    Created,
    /// Freshly initialized after the model file failed to load
    Recovered,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub architecture: Vec<LayerSpec>,
    pub parameter_count: usize,
    pub source: ModelSource,
    /// SHA-256 of the model file last read or written
    pub fingerprint: Option<String>,
    pub decision_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Mean binary cross-entropy per epoch
    pub epoch_losses: Vec<f32>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }
}

/// Reported to the observer while `train_observed` runs
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingProgress {
    Started {
        samples: usize,
        epochs: usize,
        batch_size: usize,
    },
    /// `epoch` is 1-based
    Epoch {
        epoch: usize,
        epochs: usize,
        loss: f32,
    },
    Completed {
        epochs: usize,
        final_loss: f32,
    },
}

pub struct PlayerClassifier {
    network_config: NetworkConfig,
    training: TrainingConfig,
    network: Network,
    source: ModelSource,
    fingerprint: Option<String>,
}

impl PlayerClassifier {
    /// Fresh in-memory classifier, nothing read or written
    pub fn new(training: TrainingConfig) -> ClassifierResult<Self> {
        training.validate()?;
        let network_config = NetworkConfig::default();
        let network = Network::from_config(&network_config);
        Ok(PlayerClassifier {
            network_config,
            training,
            network,
            source: ModelSource::Created,
            fingerprint: None,
        })
    }

    /// Restore the model at `path`, or build a fresh one and try to persist it.
    /// Only an invalid `training` config is an error here.
    pub fn open(training: TrainingConfig, path: &Path) -> ClassifierResult<Self> {
        let mut classifier = Self::new(training)?;

        match Self::load(path, &classifier.network_config.layers) {
            LoadOutcome::Loaded {
                network,
                fingerprint,
            } => {
                log::info!("Loaded existing model from {}", path.display());
                classifier.network = network;
                classifier.source = ModelSource::Loaded;
                classifier.fingerprint = Some(fingerprint);
                return Ok(classifier);
            }
            LoadOutcome::Absent => {
                log::info!("Model file not found at {}, creating a new model", path.display());
            }
            LoadOutcome::Corrupt(reason) => {
                log::warn!(
                    "Failed to load model from {}: {}. Creating a new model",
                    path.display(),
                    reason
                );
                classifier.source = ModelSource::Recovered;
            }
        }

        match classifier.save(path) {
            Ok(()) => log::info!("New model saved to {}", path.display()),
            Err(e) => log::error!("Failed to save the new model to {}: {}", path.display(), e),
        }

        Ok(classifier)
    }

    /// Read a model file. A path that does not lead to a file is `Absent`;
    /// anything other than a well-formed model with exactly `architecture`
    /// is `Corrupt`.
    pub fn load(path: &Path, architecture: &[LayerSpec]) -> LoadOutcome {
        if !path.exists() {
            return LoadOutcome::Absent;
        }

        let bytes = match storage::read_file(path) {
            Ok(bytes) => bytes,
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return LoadOutcome::Absent
            }
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };

        let file: ModelFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => return LoadOutcome::Corrupt(format!("unreadable model file: {}", e)),
        };

        if file.format_version != MODEL_FORMAT_VERSION {
            return LoadOutcome::Corrupt(format!(
                "unsupported format version {}",
                file.format_version
            ));
        }

        if !file.network.conforms_to(architecture) {
            return LoadOutcome::Corrupt("architecture does not match configuration".to_string());
        }

        LoadOutcome::Loaded {
            network: file.network,
            fingerprint: storage::calculate_sha256(&bytes),
        }
    }

    /// Write architecture and parameters to `path`, replacing any existing file
    pub fn save(&mut self, path: &Path) -> ClassifierResult<()> {
        let file = ModelFile {
            format_version: MODEL_FORMAT_VERSION,
            network: self.network.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        let fingerprint = storage::write_file(path, &bytes)?;
        self.fingerprint = Some(fingerprint);
        Ok(())
    }

    /// Output activation for one feature vector, fed as a single-row batch
    pub fn probability(&self, features: &FeatureVector) -> f32 {
        let output = self.network.forward(aview2(&[features.to_array()]));
        output[[0, 0]]
    }

    pub fn predict(&self, features: &FeatureVector) -> bool {
        self.probability(features) >= DECISION_THRESHOLD
    }

    /// Predict from a raw row, which must hold exactly five values
    pub fn predict_raw(&self, values: &[f32]) -> ClassifierResult<bool> {
        let features = FeatureVector::from_slice(values)?;
        Ok(self.predict(&features))
    }

    /// Fit the network in place with mini-batch Adam. Does not persist.
    pub fn train(&mut self, samples: &[LabeledSample]) -> ClassifierResult<TrainingReport> {
        self.train_observed(samples, |_| {})
    }

    /// `train`, reporting each phase to `observer` as it happens
    pub fn train_observed<F>(
        &mut self,
        samples: &[LabeledSample],
        mut observer: F,
    ) -> ClassifierResult<TrainingReport>
    where
        F: FnMut(&TrainingProgress),
    {
        if samples.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        for (index, sample) in samples.iter().enumerate() {
            sample
                .validate()
                .map_err(|reason| ClassifierError::InvalidSample { index, reason })?;
        }

        let epochs = self.training.epochs;
        let batch_size = self.training.batch_size;
        observer(&TrainingProgress::Started {
            samples: samples.len(),
            epochs,
            batch_size,
        });

        let rows: Vec<[f32; FEATURE_COUNT]> =
            samples.iter().map(|s| s.features.to_array()).collect();
        let mut optimizer = Adam::new(self.network_config.learning_rate, &self.network);
        let mut rng = StdRng::seed_from_u64(self.network_config.seed);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut epoch_losses = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let inputs =
                    Array2::from_shape_fn((batch.len(), FEATURE_COUNT), |(r, c)| rows[batch[r]][c]);
                let targets = Array2::from_shape_fn((batch.len(), 1), |(r, _)| {
                    samples[batch[r]].target()
                });

                let (loss, grads) = self.network.backprop(inputs.view(), targets.view());
                total_loss += loss * batch.len() as f32;
                optimizer.step(&mut self.network, &grads);
            }

            let loss = total_loss / samples.len() as f32;
            epoch_losses.push(loss);
            observer(&TrainingProgress::Epoch {
                epoch,
                epochs,
                loss,
            });
        }

        let final_loss = epoch_losses.last().copied().unwrap_or(f32::NAN);
        observer(&TrainingProgress::Completed { epochs, final_loss });
        log::info!(
            "Trained on {} samples for {} epochs, final loss {:.4}",
            samples.len(),
            epochs,
            final_loss
        );

        Ok(TrainingReport {
            samples: samples.len(),
            epochs,
            batch_size,
            epoch_losses,
        })
    }

    /// Train, then persist to `path`. If the save fails the previous
    /// parameters are restored, so memory and disk still agree.
    pub fn train_and_save<F>(
        &mut self,
        samples: &[LabeledSample],
        path: &Path,
        observer: F,
    ) -> ClassifierResult<TrainingReport>
    where
        F: FnMut(&TrainingProgress),
    {
        let previous = self.network.clone();
        let report = self.train_observed(samples, observer)?;

        if let Err(e) = self.save(path) {
            log::error!(
                "Failed to save trained model to {}: {}. Keeping the previous model",
                path.display(),
                e
            );
            self.network = previous;
            return Err(e);
        }

        log::info!("Saved trained model to {}", path.display());
        Ok(report)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            architecture: self.network.architecture(),
            parameter_count: self.network.parameter_count(),
            source: self.source,
            fingerprint: self.fingerprint.clone(),
            decision_threshold: DECISION_THRESHOLD,
        }
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn training(&self) -> &TrainingConfig {
        &self.training
    }
}
