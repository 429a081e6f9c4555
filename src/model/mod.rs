// Suitability model module
// Feature types, dense network, Adam optimizer and the classifier that owns them

pub mod classifier;
pub mod config;
pub mod network;
pub mod optimizer;
pub mod trace;
pub mod types;

pub use classifier::{
    ClassifierError, ClassifierResult, LoadOutcome, ModelSource, ModelSummary, PlayerClassifier,
    TrainingProgress, TrainingReport, DECISION_THRESHOLD,
};
pub use config::{
    Activation, LayerSpec, NetworkConfig, TrainingConfig, LEARNING_RATE, PLAYER_ARCHITECTURE, SEED,
};
pub use network::{DenseLayer, Network};
pub use trace::{read_trace_file, TraceEntry, TraceError, TracePhase, TraceWriter};
pub use types::{FeatureVector, LabeledSample, FEATURE_COUNT};
