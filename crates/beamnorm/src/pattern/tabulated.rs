use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use super::{AntennaModel, AntennaParameters, BeamRegistry, PatternEvaluator, SteeringDirection};
use crate::error::{NormalizerError, Result};

/// Measured gain on a regular azimuth x elevation grid.
///
/// Lookups interpolate bilinearly in dB. Azimuth wraps around every 360°,
/// elevation is clamped to the measured range.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTable {
    azimuth_deg: Array1<f64>,
    elevation_deg: Array1<f64>,
    gain_db: Array2<f64>,
}

impl PatternTable {
    /// Build a table; `gain_db[[i, j]]` is the gain at `(azimuth_deg[i], elevation_deg[j])`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if an axis is empty, not strictly increasing or
    /// not finite, if azimuth spans more than 360°, if the gain shape does not
    /// match the axes or if a gain is not finite.
    pub fn new(
        azimuth_deg: Array1<f64>,
        elevation_deg: Array1<f64>,
        gain_db: Array2<f64>,
    ) -> Result<Self> {
        check_axis("azimuth", &azimuth_deg)?;
        check_axis("elevation", &elevation_deg)?;

        let span = azimuth_deg[azimuth_deg.len() - 1] - azimuth_deg[0];
        if span > 360.0 {
            return Err(NormalizerError::invalid(format!(
                "azimuth axis spans {span} deg, more than a full turn"
            )));
        }
        if gain_db.dim() != (azimuth_deg.len(), elevation_deg.len()) {
            return Err(NormalizerError::invalid(format!(
                "gain table is {:?}, expected ({}, {})",
                gain_db.dim(),
                azimuth_deg.len(),
                elevation_deg.len()
            )));
        }
        if let Some(((i, j), g)) = gain_db.indexed_iter().find(|(_, g)| !g.is_finite()) {
            return Err(NormalizerError::invalid(format!(
                "gain {g} at azimuth {} deg, elevation {} deg is not finite",
                azimuth_deg[i], elevation_deg[j]
            )));
        }

        Ok(Self {
            azimuth_deg,
            elevation_deg,
            gain_db,
        })
    }

    /// Read a table from a text file with one `azimuth, elevation, gain` triple per line.
    ///
    /// Values may be separated by commas or whitespace. Empty lines, lines
    /// starting with `#` or `//`, and header lines before the first sample are
    /// skipped. Every (azimuth, elevation) pair of the grid must be present
    /// exactly once, in any order.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let load_err = |message: String| NormalizerError::PatternLoad {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let reader = BufReader::new(file);

        let mut samples: Vec<[f64; 3]> = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| load_err(e.to_string()))?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let parts: Vec<&str> = if line.contains(',') {
                line.split(',').map(|s| s.trim()).collect()
            } else {
                line.split_whitespace().collect()
            };

            let values: Option<Vec<f64>> = parts.iter().map(|s| s.parse::<f64>().ok()).collect();
            match values {
                Some(v) if v.len() == 3 => {
                    if v.iter().any(|x| !x.is_finite()) {
                        return Err(load_err(format!("line {}: non-finite value", line_num + 1)));
                    }
                    // -0 and 0 name the same axis sample
                    samples.push([v[0] + 0.0, v[1] + 0.0, v[2]]);
                }
                // header
                None if samples.is_empty() => continue,
                _ => {
                    return Err(load_err(format!(
                        "line {}: expected 'azimuth, elevation, gain'",
                        line_num + 1
                    )));
                }
            }
        }

        if samples.is_empty() {
            return Err(load_err("no pattern samples found".to_string()));
        }

        let azimuth_deg = unique_sorted(samples.iter().map(|s| s[0]));
        let elevation_deg = unique_sorted(samples.iter().map(|s| s[1]));
        let mut gain_db = Array2::from_elem((azimuth_deg.len(), elevation_deg.len()), f64::NAN);

        for [az, el, gain] in &samples {
            let (Some(i), Some(j)) = (
                position(&azimuth_deg, *az),
                position(&elevation_deg, *el),
            ) else {
                return Err(load_err(format!(
                    "sample at azimuth {az} deg, elevation {el} deg is off the table axes"
                )));
            };
            if !gain_db[[i, j]].is_nan() {
                return Err(load_err(format!(
                    "duplicate sample at azimuth {az} deg, elevation {el} deg"
                )));
            }
            gain_db[[i, j]] = *gain;
        }

        if let Some(((i, j), _)) = gain_db.indexed_iter().find(|(_, g)| g.is_nan()) {
            return Err(load_err(format!(
                "missing sample at azimuth {} deg, elevation {} deg",
                azimuth_deg[i], elevation_deg[j]
            )));
        }

        Self::new(
            Array1::from_vec(azimuth_deg),
            Array1::from_vec(elevation_deg),
            gain_db,
        )
        .map_err(|e| load_err(e.to_string()))
    }

    /// Azimuth axis in degrees.
    pub fn azimuth_deg(&self) -> &Array1<f64> {
        &self.azimuth_deg
    }

    /// Elevation axis in degrees.
    pub fn elevation_deg(&self) -> &Array1<f64> {
        &self.elevation_deg
    }

    /// Gain samples in dB, indexed `[azimuth, elevation]`.
    pub fn gain_db(&self) -> &Array2<f64> {
        &self.gain_db
    }

    /// Interpolated gain in dB.
    pub fn gain(&self, azimuth_deg: f64, elevation_deg: f64) -> f64 {
        let (i0, i1, wa) = self.azimuth_bracket(azimuth_deg);
        let (j0, j1, we) = bracket_clamped(&self.elevation_deg, elevation_deg);
        let g = |i: usize, j: usize| self.gain_db[[i, j]];
        (1.0 - wa) * ((1.0 - we) * g(i0, j0) + we * g(i0, j1))
            + wa * ((1.0 - we) * g(i1, j0) + we * g(i1, j1))
    }

    fn azimuth_bracket(&self, azimuth_deg: f64) -> (usize, usize, f64) {
        let axis = &self.azimuth_deg;
        let n = axis.len();
        if n == 1 {
            return (0, 0, 0.0);
        }
        let first = axis[0];
        let last = axis[n - 1];
        let mut x = first + (azimuth_deg - first).rem_euclid(360.0);
        if x >= first + 360.0 {
            x = first;
        }
        if x <= last {
            bracket_clamped(axis, x)
        } else {
            // gap between the last sample and the first one, one turn later
            let w = (x - last) / (first + 360.0 - last);
            (n - 1, 0, w)
        }
    }
}

fn check_axis(name: &str, axis: &Array1<f64>) -> Result<()> {
    if axis.is_empty() {
        return Err(NormalizerError::invalid(format!("{name} axis is empty")));
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(NormalizerError::invalid(format!(
            "{name} axis contains non-finite values"
        )));
    }
    if axis.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(NormalizerError::invalid(format!(
            "{name} axis must be strictly increasing"
        )));
    }
    Ok(())
}

/// Indices and weight of the samples around `x`, clamped to the axis ends.
fn bracket_clamped(axis: &Array1<f64>, x: f64) -> (usize, usize, f64) {
    let n = axis.len();
    if n == 1 || x <= axis[0] {
        return (0, 0, 0.0);
    }
    if x >= axis[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let hi = axis
        .as_slice()
        .map(|s| s.partition_point(|&v| v <= x))
        .unwrap_or_else(|| axis.iter().take_while(|&&v| v <= x).count());
    let lo = hi - 1;
    let w = (x - axis[lo]) / (axis[hi] - axis[lo]);
    (lo, hi, w)
}

fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

fn position(axis: &[f64], value: f64) -> Option<usize> {
    axis.binary_search_by(|v| v.total_cmp(&value)).ok()
}

/// Antenna model backed by a measured [`PatternTable`].
#[derive(Debug, Clone)]
pub struct TabulatedModel {
    table: Arc<PatternTable>,
}

impl TabulatedModel {
    /// Model around an existing table.
    pub fn new(table: PatternTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Model reading its table from `path`, see [`PatternTable::from_csv`].
    pub fn from_csv(path: &Path) -> Result<Self> {
        Ok(Self::new(PatternTable::from_csv(path)?))
    }

    /// Underlying table.
    pub fn table(&self) -> &PatternTable {
        &self.table
    }
}

impl AntennaModel for TabulatedModel {
    type Evaluator = TabulatedPattern;

    fn build(
        &self,
        _params: &AntennaParameters,
        _azimuth_deg: f64,
        _elevation_deg: f64,
    ) -> Result<TabulatedPattern> {
        Ok(TabulatedPattern {
            table: Arc::clone(&self.table),
            beams: BeamRegistry::new(),
        })
    }
}

/// Evaluator of a [`TabulatedModel`].
///
/// A single measured element has no array factor, so every registered beam
/// sees the element pattern.
#[derive(Debug, Clone)]
pub struct TabulatedPattern {
    table: Arc<PatternTable>,
    beams: BeamRegistry,
}

impl PatternEvaluator for TabulatedPattern {
    fn element_gain(&self, azimuth_deg: f64, elevation_deg: f64) -> f64 {
        self.table.gain(azimuth_deg, elevation_deg)
    }

    fn add_beam(&mut self, azimuth_deg: f64, elevation_deg: f64) -> usize {
        self.beams
            .register(SteeringDirection::new(azimuth_deg, elevation_deg))
    }

    fn beam_gain(&self, azimuth_deg: f64, elevation_deg: f64, beam: usize) -> f64 {
        if beam < self.beams.len() {
            self.table.gain(azimuth_deg, elevation_deg)
        } else {
            f64::NAN
        }
    }
}
