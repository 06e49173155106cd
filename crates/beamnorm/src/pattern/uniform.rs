use super::{AntennaModel, AntennaParameters, BeamRegistry, PatternEvaluator, SteeringDirection};
use crate::error::{NormalizerError, Result};

/// Antenna radiating the same gain in every direction.
///
/// At 0 dB this is the isotropic reference: its correction factor is 0 dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformModel {
    gain_db: f64,
}

impl UniformModel {
    /// Model with constant `gain_db`.
    pub fn new(gain_db: f64) -> Self {
        Self { gain_db }
    }

    /// Isotropic antenna (0 dB).
    pub fn isotropic() -> Self {
        Self::new(0.0)
    }
}

impl AntennaModel for UniformModel {
    type Evaluator = UniformPattern;

    fn build(
        &self,
        _params: &AntennaParameters,
        _azimuth_deg: f64,
        _elevation_deg: f64,
    ) -> Result<UniformPattern> {
        if self.gain_db.is_nan() || self.gain_db == f64::INFINITY {
            return Err(NormalizerError::invalid(format!(
                "uniform gain ({} dB) must be finite or -inf",
                self.gain_db
            )));
        }
        Ok(UniformPattern {
            gain_db: self.gain_db,
            beams: BeamRegistry::new(),
        })
    }
}

/// Evaluator of a [`UniformModel`]; steering leaves a constant pattern unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformPattern {
    gain_db: f64,
    beams: BeamRegistry,
}

impl UniformPattern {
    /// Beams registered so far.
    pub fn beams(&self) -> &BeamRegistry {
        &self.beams
    }
}

impl PatternEvaluator for UniformPattern {
    fn element_gain(&self, _azimuth_deg: f64, _elevation_deg: f64) -> f64 {
        self.gain_db
    }

    fn add_beam(&mut self, azimuth_deg: f64, elevation_deg: f64) -> usize {
        self.beams
            .register(SteeringDirection::new(azimuth_deg, elevation_deg))
    }

    fn beam_gain(&self, _azimuth_deg: f64, _elevation_deg: f64, beam: usize) -> f64 {
        if beam < self.beams.len() {
            self.gain_db
        } else {
            f64::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_constant_and_beams_are_checked() {
        let mut pattern = UniformModel::new(3.0)
            .build(&AntennaParameters::default(), 0.0, 0.0)
            .unwrap();
        assert_eq!(pattern.element_gain(-120.0, 45.0), 3.0);
        assert!(pattern.beam_gain(0.0, 90.0, 0).is_nan());

        let beam = pattern.add_beam(30.0, 90.0);
        assert_eq!(beam, 0);
        assert_eq!(pattern.beam_gain(170.0, 10.0, beam), 3.0);
        assert_eq!(pattern.beams().len(), 1);
    }

    #[test]
    fn nan_gain_is_rejected() {
        let err = UniformModel::new(f64::NAN)
            .build(&AntennaParameters::default(), 0.0, 0.0)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
