//! Angular sampling of the sphere.
//!
//! Azimuth spans [-180°, 180°) and elevation is the zenith angle over
//! [0°, 180°). Samples start at the lower bound and advance by the
//! resolution; the upper bound is never reached.

use ndarray::Array1;
use std::f64::consts::PI;

use crate::error::{NormalizerError, Result};

/// Lower azimuth bound in degrees.
pub const AZIMUTH_MIN_DEG: f64 = -180.0;
/// Upper azimuth bound in degrees (excluded from the samples).
pub const AZIMUTH_MAX_DEG: f64 = 180.0;
/// Lower elevation (zenith) bound in degrees.
pub const ELEVATION_MIN_DEG: f64 = 0.0;
/// Upper elevation (zenith) bound in degrees (excluded from the samples).
pub const ELEVATION_MAX_DEG: f64 = 180.0;

/// Azimuth integration domain in radians.
pub const AZIMUTH_DOMAIN_RAD: (f64, f64) = (-PI, PI);
/// Elevation integration domain in radians.
pub const ELEVATION_DOMAIN_RAD: (f64, f64) = (0.0, PI);

/// Upper limit on the number of samples along one axis.
pub const MAX_AXIS_SAMPLES: usize = 10_000_000;

/// Fixed azimuth/elevation sampling built from a resolution step.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularGrid {
    resolution_deg: f64,
    azimuth_deg: Array1<f64>,
    elevation_deg: Array1<f64>,
}

impl AngularGrid {
    /// Build the grid for `resolution_deg`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if the resolution is not finite, not strictly
    /// positive, or so fine that an axis would exceed [`MAX_AXIS_SAMPLES`].
    pub fn new(resolution_deg: f64) -> Result<Self> {
        if !resolution_deg.is_finite() || resolution_deg <= 0.0 {
            return Err(NormalizerError::invalid(format!(
                "resolution ({resolution_deg}) must be finite and strictly positive"
            )));
        }
        let azimuth_deg = sample_axis(AZIMUTH_MIN_DEG, AZIMUTH_MAX_DEG, resolution_deg)?;
        let elevation_deg = sample_axis(ELEVATION_MIN_DEG, ELEVATION_MAX_DEG, resolution_deg)?;
        Ok(Self {
            resolution_deg,
            azimuth_deg,
            elevation_deg,
        })
    }

    /// Step between consecutive samples in degrees.
    pub fn resolution_deg(&self) -> f64 {
        self.resolution_deg
    }

    /// Azimuth samples in degrees, ascending from -180.
    pub fn azimuth_deg(&self) -> &Array1<f64> {
        &self.azimuth_deg
    }

    /// Elevation samples in degrees, ascending from 0.
    pub fn elevation_deg(&self) -> &Array1<f64> {
        &self.elevation_deg
    }

    /// `(azimuth count, elevation count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.azimuth_deg.len(), self.elevation_deg.len())
    }
}

/// Number of samples is `floor((max - min) / step)`; sample `k` is `min + k * step`.
fn sample_axis(min: f64, max: f64, step: f64) -> Result<Array1<f64>> {
    let count = ((max - min) / step).floor();
    if count > MAX_AXIS_SAMPLES as f64 {
        return Err(NormalizerError::invalid(format!(
            "resolution ({step}) yields {count} samples on [{min}, {max}), limit is {MAX_AXIS_SAMPLES}"
        )));
    }
    let count = count as usize;
    Ok(Array1::from_iter((0..count).map(|k| min + k as f64 * step)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_degree_grid() {
        let grid = AngularGrid::new(5.0).unwrap();
        assert_eq!(grid.shape(), (72, 36));
        assert_eq!(grid.azimuth_deg()[0], -180.0);
        assert_eq!(grid.azimuth_deg()[71], 175.0);
        assert_eq!(grid.elevation_deg()[0], 0.0);
        assert_eq!(grid.elevation_deg()[35], 175.0);
    }

    #[test]
    fn sample_counts_follow_floor() {
        for res in [0.5, 1.0, 3.0, 7.0, 13.0, 45.0, 100.0, 200.0] {
            let grid = AngularGrid::new(res).unwrap();
            assert_eq!(grid.azimuth_deg().len(), (360.0_f64 / res).floor() as usize);
            assert_eq!(grid.elevation_deg().len(), (180.0_f64 / res).floor() as usize);
        }
    }

    #[test]
    fn samples_stay_below_upper_bound() {
        let grid = AngularGrid::new(7.0).unwrap();
        assert!(grid.azimuth_deg().iter().all(|&a| a < AZIMUTH_MAX_DEG));
        assert!(grid.elevation_deg().iter().all(|&e| e < ELEVATION_MAX_DEG));
    }

    #[test]
    fn bad_resolutions_are_rejected() {
        for res in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-9] {
            let err = AngularGrid::new(res).unwrap_err();
            assert!(err.is_configuration_error(), "{res}: {err}");
        }
    }
}
