#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data model for the emotion map pipeline.
//!
//! These types are the contract between the pipeline stages: cleaned survey
//! rows ([`PointRecord`]) flow into the hex aggregation step, which produces
//! one [`AggregatedCell`] per hexagon for the rendering step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tracked survey variable.
///
/// The set is fixed: five emotional scores and five environment-perception
/// scores, all answered on a 1–5 scale. Column names match the cleaned
/// survey CSV exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variable {
    Stress,
    Happy,
    Loneliness,
    Anxiety,
    Energy,
    EnvBeauty,
    EnvInteresting,
    EnvSafety,
    EnvCrowded,
    EnvironmentGreeness,
}

impl Variable {
    /// All tracked variables, in stable output-column order.
    pub const ALL: &[Self] = &[
        Self::Stress,
        Self::Happy,
        Self::Loneliness,
        Self::Anxiety,
        Self::Energy,
        Self::EnvBeauty,
        Self::EnvInteresting,
        Self::EnvSafety,
        Self::EnvCrowded,
        Self::EnvironmentGreeness,
    ];

    /// The five emotional variables (one map layer each).
    pub const EMOTIONS: &[Self] = &[
        Self::Stress,
        Self::Happy,
        Self::Loneliness,
        Self::Anxiety,
        Self::Energy,
    ];

    /// CSV column name for this variable.
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Stress => "Stress",
            Self::Happy => "Happy",
            Self::Loneliness => "Loneliness",
            Self::Anxiety => "Anxiety",
            Self::Energy => "Energy",
            Self::EnvBeauty => "EnvBeauty",
            Self::EnvInteresting => "EnvInteresting",
            Self::EnvSafety => "EnvSafety",
            Self::EnvCrowded => "EnvCrowded",
            Self::EnvironmentGreeness => "EnvironmentGreeness",
        }
    }

    /// Human-readable label used in map controls and tooltips.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stress => "Stress",
            Self::Happy => "Happiness",
            Self::Loneliness => "Loneliness",
            Self::Anxiety => "Anxiety",
            Self::Energy => "Energy",
            Self::EnvBeauty => "Environment: Beauty",
            Self::EnvInteresting => "Environment: Interesting",
            Self::EnvSafety => "Environment: Safety",
            Self::EnvCrowded => "Environment: Crowdedness",
            Self::EnvironmentGreeness => "Environment: Greenness",
        }
    }

    /// Fixed survey answer domain. All variables share the 1–5 scale;
    /// color scales are built from this range, never from the data.
    #[must_use]
    pub const fn domain(self) -> (f64, f64) {
        (1.0, 5.0)
    }

    /// Looks a variable up by its CSV column name.
    #[must_use]
    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.column_name() == name)
    }
}

/// A single cleaned, geotagged survey response.
///
/// Latitude/longitude are WGS84 degrees and are guaranteed finite and
/// in-range by the ingest step. Every survey variable is optional; a `None`
/// means the participant skipped that question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Stress")]
    pub stress: Option<f64>,
    #[serde(rename = "Happy")]
    pub happy: Option<f64>,
    #[serde(rename = "Loneliness")]
    pub loneliness: Option<f64>,
    #[serde(rename = "Anxiety")]
    pub anxiety: Option<f64>,
    #[serde(rename = "Energy")]
    pub energy: Option<f64>,
    #[serde(rename = "EnvBeauty")]
    pub env_beauty: Option<f64>,
    #[serde(rename = "EnvInteresting")]
    pub env_interesting: Option<f64>,
    #[serde(rename = "EnvSafety")]
    pub env_safety: Option<f64>,
    #[serde(rename = "EnvCrowded")]
    pub env_crowded: Option<f64>,
    #[serde(rename = "EnvironmentGreeness")]
    pub environment_greeness: Option<f64>,
}

impl PointRecord {
    /// Returns a record at the given coordinates with every variable unset.
    #[must_use]
    pub const fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            stress: None,
            happy: None,
            loneliness: None,
            anxiety: None,
            energy: None,
            env_beauty: None,
            env_interesting: None,
            env_safety: None,
            env_crowded: None,
            environment_greeness: None,
        }
    }

    /// Value of the given variable, if the participant answered it.
    #[must_use]
    pub const fn value(&self, variable: Variable) -> Option<f64> {
        match variable {
            Variable::Stress => self.stress,
            Variable::Happy => self.happy,
            Variable::Loneliness => self.loneliness,
            Variable::Anxiety => self.anxiety,
            Variable::Energy => self.energy,
            Variable::EnvBeauty => self.env_beauty,
            Variable::EnvInteresting => self.env_interesting,
            Variable::EnvSafety => self.env_safety,
            Variable::EnvCrowded => self.env_crowded,
            Variable::EnvironmentGreeness => self.environment_greeness,
        }
    }

    /// Sets the value of the given variable.
    pub const fn set_value(&mut self, variable: Variable, value: Option<f64>) {
        match variable {
            Variable::Stress => self.stress = value,
            Variable::Happy => self.happy = value,
            Variable::Loneliness => self.loneliness = value,
            Variable::Anxiety => self.anxiety = value,
            Variable::Energy => self.energy = value,
            Variable::EnvBeauty => self.env_beauty = value,
            Variable::EnvInteresting => self.env_interesting = value,
            Variable::EnvSafety => self.env_safety = value,
            Variable::EnvCrowded => self.env_crowded = value,
            Variable::EnvironmentGreeness => self.environment_greeness = value,
        }
    }
}

/// Aggregated statistics for one hex cell.
///
/// Produced once per pipeline run and immutable thereafter. A variable is
/// present in `means` only when at least one member point answered it; a
/// cell never reports a missing variable as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCell {
    /// H3 cell index rendered as its canonical hex string (e.g.
    /// "891f1d48863ffff").
    pub hex_id: String,
    /// Per-variable mean over the member points that answered, rounded to
    /// one decimal place.
    pub means: BTreeMap<Variable, f64>,
    /// Number of member points, regardless of which variables they
    /// answered.
    pub sample_count: u64,
}

impl AggregatedCell {
    /// Mean of the given variable, if any member point answered it.
    #[must_use]
    pub fn mean(&self, variable: Variable) -> Option<f64> {
        self.means.get(&variable).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_round_trip() {
        for &variable in Variable::ALL {
            assert_eq!(
                Variable::from_column_name(variable.column_name()),
                Some(variable)
            );
        }
    }

    #[test]
    fn unknown_column_name_is_none() {
        assert_eq!(Variable::from_column_name("ActualStartTime"), None);
    }

    #[test]
    fn value_accessor_matches_field() {
        let mut record = PointRecord::at(52.52, 13.405);
        record.stress = Some(3.0);
        assert_eq!(record.value(Variable::Stress), Some(3.0));
        assert_eq!(record.value(Variable::Happy), None);
    }

    #[test]
    fn set_value_round_trips_all_variables() {
        let mut record = PointRecord::at(52.52, 13.405);
        for &variable in Variable::ALL {
            record.set_value(variable, Some(4.0));
            assert_eq!(record.value(variable), Some(4.0));
        }
    }

    #[test]
    fn missing_mean_is_absent_not_zero() {
        let cell = AggregatedCell {
            hex_id: "891f1d48863ffff".to_string(),
            means: BTreeMap::new(),
            sample_count: 2,
        };
        assert_eq!(cell.mean(Variable::Loneliness), None);
    }
}
