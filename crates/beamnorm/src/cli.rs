//! beamnorm - Correction factors for beamforming antenna patterns
//! Command-line interface definitions
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use crate::grid::AngularGrid;
use crate::normalizer::{DEFAULT_MAX_SUBDIVISIONS, NormalizerConfig, ScanRequest};
use crate::pattern::AntennaParameters;

/// Compute correction factors that normalise an antenna pattern to unit radiated power.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Angular resolution of the steering grid in degrees.
    #[arg(short, long, default_value_t = 5.0, value_parser = parse_strictly_positive_f64)]
    pub resolution: f64,

    /// Absolute tolerance of the sphere integral.
    #[arg(short, long, default_value_t = 0.5, value_parser = parse_strictly_positive_f64)]
    pub tolerance: f64,

    /// Maximum number of subintervals of each adaptive integration.
    #[arg(long, default_value_t = DEFAULT_MAX_SUBDIVISIONS, value_parser = parse_positive_usize)]
    pub max_subdivisions: usize,

    /// Scan one steered beam per direction instead of the unsteered element.
    #[arg(long)]
    pub co_channel: bool,

    /// Steering azimuths in degrees (comma separated). Defaults to the full grid.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub azimuth: Vec<f64>,

    /// Steering elevations in degrees (comma separated). Defaults to the full grid.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub elevation: Vec<f64>,

    /// JSON file with the antenna parameters stored next to the result.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Constant pattern gain in dB (0 is isotropic).
    #[arg(
        long,
        default_value_t = 0.0,
        allow_hyphen_values = true,
        conflicts_with = "pattern_file"
    )]
    pub gain_db: f64,

    /// Measured pattern: one 'azimuth, elevation, gain' triple per line.
    #[arg(long)]
    pub pattern_file: Option<PathBuf>,

    /// Output archive (JSON, gzip-compressed when ending in .gz).
    #[arg(short, long, default_value = "correction.json")]
    pub output: PathBuf,

    /// Number of worker threads (defaults to the number of cores).
    #[arg(long, value_parser = parse_positive_usize)]
    pub threads: Option<usize>,
}

impl Args {
    /// Normalizer settings from the arguments.
    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            resolution_deg: self.resolution,
            abs_tolerance: self.tolerance,
            max_subdivisions: self.max_subdivisions,
        }
    }

    /// Scan requested on the command line.
    ///
    /// An axis given with `--azimuth` / `--elevation` replaces the grid
    /// samples of that axis only.
    pub fn scan_request(&self, grid: &AngularGrid) -> ScanRequest {
        if !self.co_channel {
            return ScanRequest::Element;
        }
        let azimuth_deg = if self.azimuth.is_empty() {
            grid.azimuth_deg().to_vec()
        } else {
            self.azimuth.clone()
        };
        let elevation_deg = if self.elevation.is_empty() {
            grid.elevation_deg().to_vec()
        } else {
            self.elevation.clone()
        };
        ScanRequest::slice(azimuth_deg, elevation_deg)
    }

    /// Antenna parameters from `--params`, or the reference antenna.
    pub fn load_parameters(&self) -> crate::Result<AntennaParameters> {
        match &self.params {
            Some(path) => AntennaParameters::from_json_file(path),
            None => Ok(AntennaParameters::default()),
        }
    }
}

/// Validate CLI arguments that clap cannot check on its own
pub fn validate_args(args: &Args) -> Result<(), String> {
    if !args.co_channel && (!args.azimuth.is_empty() || !args.elevation.is_empty()) {
        return Err(
            "--azimuth and --elevation select steering directions and require --co-channel"
                .to_string(),
        );
    }
    if let Some(v) = args
        .azimuth
        .iter()
        .chain(args.elevation.iter())
        .find(|v| !v.is_finite())
    {
        return Err(format!("steering angle {v} is not finite"));
    }
    if args.gain_db.is_nan() || args.gain_db == f64::INFINITY {
        return Err(format!("--gain-db ({}) must be finite", args.gain_db));
    }
    if let Some(path) = args.pattern_file.as_ref().filter(|p| !p.exists()) {
        return Err(format!("pattern file '{}' does not exist", path.display()));
    }
    if let Some(path) = args.params.as_ref().filter(|p| !p.exists()) {
        return Err(format!("parameter file '{}' does not exist", path.display()));
    }
    Ok(())
}

/// Validate CLI arguments and exit with error message if validation fails
pub fn validate_args_or_exit(args: &Args) {
    if let Err(error) = validate_args(args) {
        eprintln!("❌ Validation Error: {}", error);
        process::exit(1);
    }
}

// Custom value parser to enforce strictly positive f64
fn parse_strictly_positive_f64(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("invalid float: {s}"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err("value must be finite and strictly positive (> 0)".to_string())
    }
}

// Custom value parser to enforce a positive count (>= 1)
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|_| format!("invalid integer: {s}"))?;
    if v > 0 {
        Ok(v)
    } else {
        Err("value must be at least 1".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_parsers() {
        assert_eq!(parse_strictly_positive_f64("2.5"), Ok(2.5));
        assert!(parse_strictly_positive_f64("0").is_err());
        assert!(parse_strictly_positive_f64("inf").is_err());
        assert!(parse_strictly_positive_f64("abc").is_err());
        assert_eq!(parse_positive_usize("4"), Ok(4));
        assert!(parse_positive_usize("0").is_err());
    }
}
