//! Antenna pattern collaborators.
//!
//! The normalizer only needs gains in dB. An [`AntennaModel`] turns an
//! [`AntennaParameters`] record into a [`PatternEvaluator`]; the evaluator
//! answers element-gain queries and, for co-channel scans, registers steered
//! beams and answers composite-gain queries for them.

use serde::{Deserialize, Serialize};

use crate::error::Result;

mod tabulated;
mod uniform;

pub use tabulated::{PatternTable, TabulatedModel, TabulatedPattern};
pub use uniform::{UniformModel, UniformPattern};

/// Antenna description handed through to the antenna model.
///
/// The normalizer never reads these fields; they are persisted next to the
/// correction factors so that a result can be traced back to its antenna.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntennaParameters {
    /// Element pattern model name (e.g. "M2101", "F1336").
    pub element_pattern: String,
    /// Maximum element gain in dBi.
    pub element_max_gain_db: f64,
    /// Horizontal 3 dB beamwidth of the element in degrees.
    pub element_phi_3db_deg: f64,
    /// Vertical 3 dB beamwidth of the element in degrees.
    pub element_theta_3db_deg: f64,
    /// Front-to-back ratio in dB.
    pub element_am_db: f64,
    /// Vertical side-lobe attenuation in dB.
    pub element_sla_v_db: f64,
    /// Number of array rows.
    pub n_rows: usize,
    /// Number of array columns.
    pub n_columns: usize,
    /// Horizontal element spacing in wavelengths.
    pub horizontal_spacing: f64,
    /// Vertical element spacing in wavelengths.
    pub vertical_spacing: f64,
    /// Mechanical downtilt in degrees.
    pub downtilt_deg: f64,
}

impl Default for AntennaParameters {
    /// IMT-2020 reference 8x8 array of M.2101 elements.
    fn default() -> Self {
        Self {
            element_pattern: "M2101".to_string(),
            element_max_gain_db: 5.0,
            element_phi_3db_deg: 65.0,
            element_theta_3db_deg: 65.0,
            element_am_db: 30.0,
            element_sla_v_db: 30.0,
            n_rows: 8,
            n_columns: 8,
            horizontal_spacing: 0.5,
            vertical_spacing: 0.5,
            downtilt_deg: 0.0,
        }
    }
}

impl AntennaParameters {
    /// Load parameters from a JSON file; missing fields take default values.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Beam pointing direction in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringDirection {
    /// Azimuth in degrees.
    pub azimuth_deg: f64,
    /// Elevation (zenith angle) in degrees.
    pub elevation_deg: f64,
}

impl SteeringDirection {
    /// New direction from azimuth and elevation in degrees.
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }
}

/// Ordered list of registered beams; the position is the beam index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeamRegistry {
    beams: Vec<SteeringDirection>,
}

impl BeamRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a beam and return its index.
    pub fn register(&mut self, direction: SteeringDirection) -> usize {
        self.beams.push(direction);
        self.beams.len() - 1
    }

    /// Direction registered under `index`.
    pub fn get(&self, index: usize) -> Option<&SteeringDirection> {
        self.beams.get(index)
    }

    /// Number of registered beams.
    pub fn len(&self) -> usize {
        self.beams.len()
    }

    /// True when no beam has been registered.
    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }
}

/// Gain queries on an antenna, all angles in degrees, all gains in dB.
pub trait PatternEvaluator {
    /// Gain of the unsteered element.
    fn element_gain(&self, azimuth_deg: f64, elevation_deg: f64) -> f64;

    /// Register a beam steered at `(azimuth_deg, elevation_deg)` and return its index.
    fn add_beam(&mut self, azimuth_deg: f64, elevation_deg: f64) -> usize;

    /// Composite gain of the beam registered under `beam`.
    ///
    /// `beam` must come from [`PatternEvaluator::add_beam`] on this evaluator;
    /// unknown indices yield NaN, which the integrator reports as a failure.
    fn beam_gain(&self, azimuth_deg: f64, elevation_deg: f64, beam: usize) -> f64;
}

/// Builds pattern evaluators from antenna parameters.
///
/// Evaluators are cloned once per worker during co-channel scans: shared
/// geometry can live behind an `Arc`, the beam list must be owned.
pub trait AntennaModel: Sync {
    /// Evaluator produced by this model.
    type Evaluator: PatternEvaluator + Clone + Send + Sync;

    /// Evaluator for an antenna oriented at `(azimuth_deg, elevation_deg)`.
    fn build(
        &self,
        params: &AntennaParameters,
        azimuth_deg: f64,
        elevation_deg: f64,
    ) -> Result<Self::Evaluator>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_hands_out_sequential_indices() {
        let mut registry = BeamRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.register(SteeringDirection::new(0.0, 90.0)), 0);
        assert_eq!(registry.register(SteeringDirection::new(10.0, 80.0)), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).map(|d| d.azimuth_deg), Some(10.0));
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn parameters_fill_missing_fields_with_defaults() {
        let params: AntennaParameters =
            serde_json::from_str(r#"{ "n_rows": 4, "downtilt_deg": 6.0 }"#).unwrap();
        assert_eq!(params.n_rows, 4);
        assert_eq!(params.n_columns, 8);
        assert_eq!(params.downtilt_deg, 6.0);
        assert_eq!(params.element_pattern, "M2101");
    }
}
