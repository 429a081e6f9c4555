// Classifier input types

use serde::{Deserialize, Serialize};

use crate::model::classifier::{ClassifierError, ClassifierResult};

/// Width of the classifier input layer
pub const FEATURE_COUNT: usize = 5;

/// The five performance statistics fed to the classifier, in input order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Batting average
    pub average: f32,
    pub strike_rate: f32,
    pub bowling_average: f32,
    pub economy_rate: f32,
    pub fielding_stats: f32,
}

impl FeatureVector {
    pub fn new(
        average: f32,
        strike_rate: f32,
        bowling_average: f32,
        economy_rate: f32,
        fielding_stats: f32,
    ) -> Self {
        FeatureVector {
            average,
            strike_rate,
            bowling_average,
            economy_rate,
            fielding_stats,
        }
    }

    /// Build from a raw row; the row must hold exactly `FEATURE_COUNT` values
    pub fn from_slice(values: &[f32]) -> ClassifierResult<Self> {
        match values {
            &[average, strike_rate, bowling_average, economy_rate, fielding_stats] => Ok(
                FeatureVector::new(average, strike_rate, bowling_average, economy_rate, fielding_stats),
            ),
            _ => Err(ClassifierError::InvalidArity {
                expected: FEATURE_COUNT,
                actual: values.len(),
            }),
        }
    }

    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.average,
            self.strike_rate,
            self.bowling_average,
            self.economy_rate,
            self.fielding_stats,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl TryFrom<&[f32]> for FeatureVector {
    type Error = ClassifierError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        FeatureVector::from_slice(values)
    }
}

/// A feature vector with its suitability label (1 = suitable, 0 = not)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: u8,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, label: u8) -> Self {
        LabeledSample { features, label }
    }

    /// Label as the network's target activation
    pub fn target(&self) -> f32 {
        f32::from(self.label)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.label > 1 {
            return Err(format!("label must be 0 or 1, got {}", self.label));
        }
        if !self.features.is_finite() {
            return Err("features must be finite numbers".to_string());
        }
        Ok(())
    }
}
