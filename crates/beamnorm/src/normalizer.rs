//! Beamforming normalizer.
//!
//! The correction factor of a pattern `G` (dB) is the offset that makes its
//! linear power integrate to `4π` over the sphere:
//!
//! ```text
//! I  = ∫_{-π}^{π} ∫_0^π 10^(G(p, t)/10) sin t dt dp
//! cf = -10 log10(I / 4π)
//! ```
//!
//! The integration error `E` is pushed through the same transform, giving
//! `low = -10 log10((I + E) / 4π)` and `high = -10 log10((I - E) / 4π)`.

use beamnorm_quad::{QuadOptions, QuadResult, dblquad};
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Instant;

use crate::error::{IntegralError, NormalizerError, Result};
use crate::grid::{AZIMUTH_DOMAIN_RAD, AngularGrid, ELEVATION_DOMAIN_RAD};
use crate::pattern::{AntennaModel, AntennaParameters, PatternEvaluator, SteeringDirection};
use crate::save::CorrectionSink;

/// Solid angle of the full sphere.
pub const FOUR_PI: f64 = 4.0 * PI;

/// Default subdivision budget of the adaptive integrator.
pub const DEFAULT_MAX_SUBDIVISIONS: usize = beamnorm_quad::DEFAULT_LIMIT;

/// Orientation handed to the antenna model; beams are steered on top of it.
pub const REFERENCE_AZIMUTH_DEG: f64 = 0.0;
/// See [`REFERENCE_AZIMUTH_DEG`].
pub const REFERENCE_ELEVATION_DEG: f64 = 0.0;

/// Convert a gain in dB to linear power.
///
/// # Formula
/// p = 10^(g/10)
pub fn db_to_power(gain_db: f64) -> f64 {
    10f64.powf(gain_db / 10.0)
}

/// Sampling resolution and integration tolerance of a normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Grid resolution in degrees.
    pub resolution_deg: f64,
    /// Absolute tolerance of the sphere integral (relative tolerance is 0).
    pub abs_tolerance: f64,
    /// Maximum number of subintervals per 1D integration.
    pub max_subdivisions: usize,
}

impl NormalizerConfig {
    /// Configuration with the default subdivision budget.
    pub fn new(resolution_deg: f64, abs_tolerance: f64) -> Self {
        Self {
            resolution_deg,
            abs_tolerance,
            max_subdivisions: DEFAULT_MAX_SUBDIVISIONS,
        }
    }

    /// Check tolerance and budget; the resolution is checked by [`AngularGrid::new`].
    pub fn validate(&self) -> Result<()> {
        if !self.abs_tolerance.is_finite() || self.abs_tolerance <= 0.0 {
            return Err(NormalizerError::invalid(format!(
                "absolute tolerance ({}) must be finite and strictly positive",
                self.abs_tolerance
            )));
        }
        if self.max_subdivisions == 0 {
            return Err(NormalizerError::invalid(
                "max_subdivisions must be at least 1",
            ));
        }
        Ok(())
    }

    fn quad_options(&self) -> QuadOptions {
        QuadOptions::absolute(self.abs_tolerance).with_limit(self.max_subdivisions)
    }
}

/// Correction interval in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorBound {
    /// Correction for `I + E`.
    pub low_db: f64,
    /// Correction for `I - E`.
    pub high_db: f64,
}

impl ErrorBound {
    /// Width of the interval.
    pub fn spread(&self) -> f64 {
        self.high_db - self.low_db
    }

    /// True when `value_db` lies inside the interval.
    pub fn contains(&self, value_db: f64) -> bool {
        self.low_db <= value_db && value_db <= self.high_db
    }
}

/// Correction of one pattern (element or one steered beam).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionFactor {
    /// Correction in dB.
    pub correction_db: f64,
    /// Interval obtained from the integration error.
    pub bounds: ErrorBound,
    /// Sphere integral of the linear power pattern.
    pub integral: f64,
    /// Estimated absolute error of `integral`.
    pub abs_error: f64,
}

impl CorrectionFactor {
    /// Derive the correction and its interval from `I` and `E`.
    ///
    /// Fails when either is not finite or when `I - E <= 0`, where the upper
    /// bound has no logarithm.
    pub fn from_integral(
        integral: f64,
        abs_error: f64,
    ) -> std::result::Result<Self, IntegralError> {
        if !integral.is_finite() || !abs_error.is_finite() {
            return Err(IntegralError::NonFinite {
                integral,
                abs_error,
            });
        }
        let lower = integral - abs_error;
        if lower <= 0.0 {
            return Err(IntegralError::NonPositiveLowerBound {
                integral,
                abs_error,
            });
        }
        let to_db = |v: f64| -10.0 * (v / FOUR_PI).log10();
        Ok(Self {
            correction_db: to_db(integral),
            bounds: ErrorBound {
                low_db: to_db(integral + abs_error),
                high_db: to_db(lower),
            },
            integral,
            abs_error,
        })
    }
}

/// Corrections of a co-channel scan, indexed `[azimuth, elevation]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionGrid {
    /// Steering azimuths in degrees.
    pub azimuth_deg: Array1<f64>,
    /// Steering elevations in degrees.
    pub elevation_deg: Array1<f64>,
    /// Correction in dB.
    pub correction_db: Array2<f64>,
    /// Low bound in dB.
    pub bound_low_db: Array2<f64>,
    /// High bound in dB.
    pub bound_high_db: Array2<f64>,
}

impl CorrectionGrid {
    /// `(azimuth count, elevation count)`.
    pub fn shape(&self) -> (usize, usize) {
        self.correction_db.dim()
    }

    /// Correction and interval of cell `[i, j]`.
    pub fn cell(&self, i: usize, j: usize) -> Option<(f64, ErrorBound)> {
        let cf = *self.correction_db.get([i, j])?;
        Some((
            cf,
            ErrorBound {
                low_db: self.bound_low_db[[i, j]],
                high_db: self.bound_high_db[[i, j]],
            },
        ))
    }

    /// Smallest correction, `None` for an empty grid.
    pub fn min_correction_db(&self) -> Option<f64> {
        self.correction_db.iter().copied().reduce(f64::min)
    }

    /// Largest correction, `None` for an empty grid.
    pub fn max_correction_db(&self) -> Option<f64> {
        self.correction_db.iter().copied().reduce(f64::max)
    }

    /// Widest interval over the grid, `None` for an empty grid.
    pub fn max_spread_db(&self) -> Option<f64> {
        self.bound_high_db
            .iter()
            .zip(self.bound_low_db.iter())
            .map(|(h, l)| h - l)
            .reduce(f64::max)
    }
}

/// Result of a scan: a scalar for the element, a grid for co-channel beams.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionResult {
    /// Unsteered element pattern.
    Element(CorrectionFactor),
    /// One correction per steering direction.
    CoChannel(CorrectionGrid),
}

impl CorrectionResult {
    /// Element correction, if this is an element scan.
    pub fn as_element(&self) -> Option<&CorrectionFactor> {
        match self {
            CorrectionResult::Element(cf) => Some(cf),
            CorrectionResult::CoChannel(_) => None,
        }
    }

    /// Correction grid, if this is a co-channel scan.
    pub fn as_grid(&self) -> Option<&CorrectionGrid> {
        match self {
            CorrectionResult::Element(_) => None,
            CorrectionResult::CoChannel(grid) => Some(grid),
        }
    }
}

/// What to compute.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanRequest {
    /// Unsteered element pattern, one correction.
    Element,
    /// One beam per `(azimuth, elevation)` pair of the Cartesian product.
    CoChannel {
        /// Steering azimuths in degrees (outer loop).
        azimuth_deg: Vec<f64>,
        /// Steering elevations in degrees (inner loop).
        elevation_deg: Vec<f64>,
    },
}

impl ScanRequest {
    /// Co-channel scan over the whole grid.
    pub fn co_channel(grid: &AngularGrid) -> Self {
        ScanRequest::CoChannel {
            azimuth_deg: grid.azimuth_deg().to_vec(),
            elevation_deg: grid.elevation_deg().to_vec(),
        }
    }

    /// Co-channel scan restricted to the given directions.
    pub fn slice(azimuth_deg: Vec<f64>, elevation_deg: Vec<f64>) -> Self {
        ScanRequest::CoChannel {
            azimuth_deg,
            elevation_deg,
        }
    }

    fn validate(&self) -> Result<()> {
        if let ScanRequest::CoChannel {
            azimuth_deg,
            elevation_deg,
        } = self
        {
            let bad = azimuth_deg
                .iter()
                .chain(elevation_deg.iter())
                .find(|v| !v.is_finite());
            if let Some(v) = bad {
                return Err(NormalizerError::invalid(format!(
                    "steering angle {v} is not finite"
                )));
            }
        }
        Ok(())
    }
}

/// Integrates antenna patterns over the sphere and derives their correction factors.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamformingNormalizer {
    config: NormalizerConfig,
    grid: AngularGrid,
}

impl BeamformingNormalizer {
    /// Normalizer with grid resolution `resolution_deg` and absolute tolerance `abs_tolerance`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if either value is not finite or not strictly positive.
    pub fn new(resolution_deg: f64, abs_tolerance: f64) -> Result<Self> {
        Self::with_config(NormalizerConfig::new(resolution_deg, abs_tolerance))
    }

    /// Normalizer from a full configuration.
    pub fn with_config(config: NormalizerConfig) -> Result<Self> {
        config.validate()?;
        let grid = AngularGrid::new(config.resolution_deg)?;
        Ok(Self { config, grid })
    }

    /// Configuration in use.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Sampling grid.
    pub fn grid(&self) -> &AngularGrid {
        &self.grid
    }

    /// Co-channel scan over every grid direction.
    pub fn full_scan(&self) -> ScanRequest {
        ScanRequest::co_channel(&self.grid)
    }

    /// Correction for one pattern.
    ///
    /// With `steering`, a beam is registered on `evaluator` and its composite
    /// gain is integrated; without, the element gain is integrated.
    pub fn calculate_correction_factor<E: PatternEvaluator>(
        &self,
        evaluator: &mut E,
        steering: Option<SteeringDirection>,
    ) -> Result<CorrectionFactor> {
        let options = self.config.quad_options();
        let (azimuth_deg, elevation_deg) =
            steering.map_or((0.0, 0.0), |s| (s.azimuth_deg, s.elevation_deg));

        let outcome = match steering {
            Some(direction) => {
                let beam = evaluator.add_beam(direction.azimuth_deg, direction.elevation_deg);
                let evaluator = &*evaluator;
                integrate_sphere(
                    |t, p| {
                        db_to_power(evaluator.beam_gain(p.to_degrees(), t.to_degrees(), beam))
                            * t.sin()
                    },
                    &options,
                )
            }
            None => integrate_sphere(
                |t, p| {
                    db_to_power(evaluator.element_gain(p.to_degrees(), t.to_degrees())) * t.sin()
                },
                &options,
            ),
        };

        let instability = |message: String| NormalizerError::NumericalInstability {
            azimuth_deg,
            elevation_deg,
            message,
        };
        let res = outcome.map_err(|e| instability(e.to_string()))?;
        debug!(
            "beam ({azimuth_deg}, {elevation_deg}): I={:.9} E={:.3e} ({} evaluations, {} panels)",
            res.value, res.abs_error, res.evaluations, res.subdivisions
        );
        CorrectionFactor::from_integral(res.value, res.abs_error)
            .map_err(|e| instability(e.to_string()))
    }

    /// Run `request` against a fresh evaluator built by `model`.
    ///
    /// Co-channel cells run in parallel, each worker on its own clone of the
    /// evaluator. The first failing cell aborts the scan.
    pub fn compute<M: AntennaModel>(
        &self,
        model: &M,
        params: &AntennaParameters,
        request: &ScanRequest,
    ) -> Result<CorrectionResult> {
        request.validate()?;
        let mut evaluator = model.build(params, REFERENCE_AZIMUTH_DEG, REFERENCE_ELEVATION_DEG)?;

        match request {
            ScanRequest::Element => {
                info!("Computing element correction factor");
                let cf = self.calculate_correction_factor(&mut evaluator, None)?;
                Ok(CorrectionResult::Element(cf))
            }
            ScanRequest::CoChannel {
                azimuth_deg,
                elevation_deg,
            } => self
                .scan_beams(&evaluator, azimuth_deg, elevation_deg)
                .map(CorrectionResult::CoChannel),
        }
    }

    /// [`compute`](Self::compute), then hand the result and `params` to `sink`.
    ///
    /// Nothing is persisted when the computation fails.
    pub fn generate_correction_matrix<M: AntennaModel, S: CorrectionSink>(
        &self,
        model: &M,
        params: &AntennaParameters,
        request: &ScanRequest,
        sink: &mut S,
    ) -> Result<CorrectionResult> {
        let result = self.compute(model, params, request)?;
        sink.save(&result, params)?;
        Ok(result)
    }

    fn scan_beams<E>(
        &self,
        evaluator: &E,
        azimuth_deg: &[f64],
        elevation_deg: &[f64],
    ) -> Result<CorrectionGrid>
    where
        E: PatternEvaluator + Clone + Send + Sync,
    {
        let n_az = azimuth_deg.len();
        let n_el = elevation_deg.len();
        if n_az * n_el == 0 {
            warn!("Co-channel scan has no steering direction ({n_az} x {n_el})");
        }
        info!(
            "Computing co-channel correction factors for {} beams ({} azimuths x {} elevations) on {} threads",
            n_az * n_el,
            n_az,
            n_el,
            rayon::current_num_threads()
        );
        let start = Instant::now();

        let cells: Vec<CorrectionFactor> = (0..n_az * n_el)
            .into_par_iter()
            .map_init(
                || evaluator.clone(),
                |local, idx| {
                    let steering =
                        SteeringDirection::new(azimuth_deg[idx / n_el], elevation_deg[idx % n_el]);
                    self.calculate_correction_factor(local, Some(steering))
                },
            )
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Co-channel scan finished in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        let at = |f: fn(&CorrectionFactor) -> f64| {
            Array2::from_shape_fn((n_az, n_el), |(i, j)| f(&cells[i * n_el + j]))
        };
        Ok(CorrectionGrid {
            azimuth_deg: Array1::from_vec(azimuth_deg.to_vec()),
            elevation_deg: Array1::from_vec(elevation_deg.to_vec()),
            correction_db: at(|c| c.correction_db),
            bound_low_db: at(|c| c.bounds.low_db),
            bound_high_db: at(|c| c.bounds.high_db),
        })
    }
}

/// Integrate `f(t, p)` over zenith `t` in [0, π] (inner) and azimuth `p` in [-π, π] (outer).
fn integrate_sphere<F: FnMut(f64, f64) -> f64>(
    f: F,
    options: &QuadOptions,
) -> std::result::Result<QuadResult, beamnorm_quad::QuadError> {
    let (t_min, t_max) = ELEVATION_DOMAIN_RAD;
    let (p_min, p_max) = AZIMUTH_DOMAIN_RAD;
    dblquad(f, p_min, p_max, |_| t_min, |_| t_max, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::UniformModel;

    /// Narrow peak at boresight in azimuth, identical for every beam.
    #[derive(Debug, Clone)]
    struct PencilBeam;

    impl PatternEvaluator for PencilBeam {
        fn element_gain(&self, azimuth_deg: f64, _elevation_deg: f64) -> f64 {
            10.0 * (1.0 + 50.0 * (-(azimuth_deg / 8.0).powi(2)).exp()).log10()
        }

        fn add_beam(&mut self, _azimuth_deg: f64, _elevation_deg: f64) -> usize {
            0
        }

        fn beam_gain(&self, azimuth_deg: f64, elevation_deg: f64, _beam: usize) -> f64 {
            self.element_gain(azimuth_deg, elevation_deg)
        }
    }

    #[test]
    fn db_to_power_matches_definition() {
        assert_eq!(db_to_power(0.0), 1.0);
        assert!((db_to_power(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_power(-3.0) - 0.501_187_233_627_272_3).abs() < 1e-12);
        assert_eq!(db_to_power(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn correction_from_isotropic_integral_is_zero() {
        let cf = CorrectionFactor::from_integral(FOUR_PI, 0.0).unwrap();
        assert!(cf.correction_db.abs() < 1e-15);
        assert_eq!(cf.bounds.low_db, cf.correction_db);
        assert_eq!(cf.bounds.high_db, cf.correction_db);
    }

    #[test]
    fn bounds_are_inverted_relative_to_the_integral() {
        let cf = CorrectionFactor::from_integral(2.0 * FOUR_PI, 0.5).unwrap();
        assert!(cf.bounds.low_db < cf.correction_db);
        assert!(cf.correction_db < cf.bounds.high_db);
        let expected_low = -10.0 * ((2.0 * FOUR_PI + 0.5) / FOUR_PI).log10();
        let expected_high = -10.0 * ((2.0 * FOUR_PI - 0.5) / FOUR_PI).log10();
        assert!((cf.bounds.low_db - expected_low).abs() < 1e-12);
        assert!((cf.bounds.high_db - expected_high).abs() < 1e-12);
        // not symmetric in dB
        let below = cf.correction_db - cf.bounds.low_db;
        let above = cf.bounds.high_db - cf.correction_db;
        assert!((below - above).abs() > 1e-9);
    }

    #[test]
    fn non_positive_lower_integral_is_an_error() {
        assert_eq!(
            CorrectionFactor::from_integral(1.0, 1.0),
            Err(IntegralError::NonPositiveLowerBound {
                integral: 1.0,
                abs_error: 1.0,
            })
        );
        assert!(matches!(
            CorrectionFactor::from_integral(0.0, 0.0),
            Err(IntegralError::NonPositiveLowerBound { .. })
        ));
        assert!(matches!(
            CorrectionFactor::from_integral(f64::NAN, 0.0),
            Err(IntegralError::NonFinite { .. })
        ));
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        for (res, tol) in [
            (0.0, 0.5),
            (-5.0, 0.5),
            (f64::NAN, 0.5),
            (5.0, 0.0),
            (5.0, -1.0),
            (5.0, f64::INFINITY),
            (5.0, f64::NAN),
        ] {
            let err = BeamformingNormalizer::new(res, tol).unwrap_err();
            assert!(err.is_configuration_error(), "({res}, {tol}): {err}");
        }

        let mut config = NormalizerConfig::new(5.0, 0.5);
        config.max_subdivisions = 0;
        assert!(BeamformingNormalizer::with_config(config).is_err());
    }

    #[test]
    fn element_scan_of_isotropic_pattern() {
        let normalizer = BeamformingNormalizer::new(5.0, 1e-6).unwrap();
        let result = normalizer
            .compute(
                &UniformModel::isotropic(),
                &AntennaParameters::default(),
                &ScanRequest::Element,
            )
            .unwrap();
        let cf = result.as_element().unwrap();
        assert!((cf.integral - FOUR_PI).abs() < 1e-10);
        assert!(cf.correction_db.abs() < 1e-9);
        assert!(cf.bounds.low_db.abs() < 1e-9);
        assert!(cf.bounds.high_db.abs() < 1e-9);
        assert!(result.as_grid().is_none());
    }

    #[test]
    fn each_steered_cell_registers_one_beam() {
        let normalizer = BeamformingNormalizer::new(30.0, 1e-3).unwrap();
        let mut pattern = UniformModel::new(1.0)
            .build(&AntennaParameters::default(), 0.0, 0.0)
            .unwrap();
        for az in [0.0, 30.0, 60.0] {
            normalizer
                .calculate_correction_factor(&mut pattern, Some(SteeringDirection::new(az, 90.0)))
                .unwrap();
        }
        assert_eq!(pattern.beams().len(), 3);
        normalizer
            .calculate_correction_factor(&mut pattern, None)
            .unwrap();
        assert_eq!(pattern.beams().len(), 3);
    }

    #[test]
    fn silent_pattern_is_numerically_unstable() {
        let normalizer = BeamformingNormalizer::new(30.0, 1e-3).unwrap();
        let err = normalizer
            .compute(
                &UniformModel::new(f64::NEG_INFINITY),
                &AntennaParameters::default(),
                &ScanRequest::Element,
            )
            .unwrap_err();
        assert!(err.is_numerical_error());
    }

    #[test]
    fn exhausted_subdivision_budget_is_numerically_unstable() {
        let mut config = NormalizerConfig::new(30.0, 1e-9);
        config.max_subdivisions = 2;
        let normalizer = BeamformingNormalizer::with_config(config).unwrap();
        let mut pencil = PencilBeam;

        let err = normalizer
            .calculate_correction_factor(&mut pencil, None)
            .unwrap_err();
        assert!(err.is_numerical_error());
        assert!(err.to_string().contains("subdivisions (2)"), "{err}");

        let err = normalizer
            .calculate_correction_factor(&mut pencil, Some(SteeringDirection::new(30.0, 60.0)))
            .unwrap_err();
        match err {
            NormalizerError::NumericalInstability {
                azimuth_deg,
                elevation_deg,
                ..
            } => {
                assert_eq!(azimuth_deg, 30.0);
                assert_eq!(elevation_deg, 60.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_steering_is_rejected() {
        let normalizer = BeamformingNormalizer::new(30.0, 1e-3).unwrap();
        let err = normalizer
            .compute(
                &UniformModel::isotropic(),
                &AntennaParameters::default(),
                &ScanRequest::slice(vec![f64::NAN], vec![90.0]),
            )
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn empty_slice_yields_empty_grid() {
        let normalizer = BeamformingNormalizer::new(30.0, 1e-3).unwrap();
        let result = normalizer
            .compute(
                &UniformModel::isotropic(),
                &AntennaParameters::default(),
                &ScanRequest::slice(vec![], vec![90.0]),
            )
            .unwrap();
        let grid = result.as_grid().unwrap();
        assert_eq!(grid.shape(), (0, 1));
        assert!(grid.max_spread_db().is_none());
    }

    #[test]
    fn grid_summary_helpers() {
        let grid = CorrectionGrid {
            azimuth_deg: Array1::from_vec(vec![0.0, 10.0]),
            elevation_deg: Array1::from_vec(vec![90.0]),
            correction_db: Array2::from_shape_vec((2, 1), vec![-1.0, 2.0]).unwrap(),
            bound_low_db: Array2::from_shape_vec((2, 1), vec![-1.5, 1.9]).unwrap(),
            bound_high_db: Array2::from_shape_vec((2, 1), vec![-0.5, 2.1]).unwrap(),
        };
        assert_eq!(grid.min_correction_db(), Some(-1.0));
        assert_eq!(grid.max_correction_db(), Some(2.0));
        assert!((grid.max_spread_db().unwrap() - 1.0).abs() < 1e-12);
        let (cf, bound) = grid.cell(1, 0).unwrap();
        assert_eq!(cf, 2.0);
        assert!(bound.contains(cf));
        assert!(grid.cell(2, 0).is_none());
    }
}
