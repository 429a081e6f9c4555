// Data models for player performance records
use serde::{Deserialize, Serialize};

use crate::model::{FeatureVector, LabeledSample};

/// A stored performance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    pub id: i64,
    pub average: f64,
    pub strike_rate: f64,
    pub bowling_average: f64,
    pub economy_rate: f64,
    pub fielding_stats: i32,
    /// 1 for good, 0 for bad
    pub label: i32,
}

/// Column values for a record that has no id yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayerPerformance {
    pub average: f64,
    pub strike_rate: f64,
    pub bowling_average: f64,
    pub economy_rate: f64,
    pub fielding_stats: i32,
    pub label: i32,
}

/// Wire format of a performance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPerformanceDto {
    /// Assigned by the store; ignored on create
    #[serde(default)]
    pub id: Option<i64>,
    pub average: f64,
    pub strike_rate: f64,
    pub bowling_average: f64,
    pub economy_rate: f64,
    pub fielding_stats: i32,
    pub label: i32,
}

impl PlayerPerformanceDto {
    pub fn validate(&self) -> Result<(), String> {
        if self.label != 0 && self.label != 1 {
            return Err(format!("label must be 0 or 1, got {}", self.label));
        }

        let stats = [
            ("average", self.average),
            ("strikeRate", self.strike_rate),
            ("bowlingAverage", self.bowling_average),
            ("economyRate", self.economy_rate),
        ];
        if let Some((name, _)) = stats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} must be a finite number", name));
        }

        Ok(())
    }
}

pub fn to_entity(dto: &PlayerPerformanceDto) -> NewPlayerPerformance {
    NewPlayerPerformance {
        average: dto.average,
        strike_rate: dto.strike_rate,
        bowling_average: dto.bowling_average,
        economy_rate: dto.economy_rate,
        fielding_stats: dto.fielding_stats,
        label: dto.label,
    }
}

pub fn to_dto(entity: &PlayerPerformance) -> PlayerPerformanceDto {
    PlayerPerformanceDto {
        id: Some(entity.id),
        average: entity.average,
        strike_rate: entity.strike_rate,
        bowling_average: entity.bowling_average,
        economy_rate: entity.economy_rate,
        fielding_stats: entity.fielding_stats,
        label: entity.label,
    }
}

impl PlayerPerformance {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(
            self.average as f32,
            self.strike_rate as f32,
            self.bowling_average as f32,
            self.economy_rate as f32,
            self.fielding_stats as f32,
        )
    }

    /// Labels that don't fit a byte map to 255, which training rejects
    pub fn to_sample(&self) -> LabeledSample {
        let label = u8::try_from(self.label).unwrap_or(u8::MAX);
        LabeledSample::new(self.features(), label)
    }
}
