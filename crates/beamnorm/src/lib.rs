//! beamnorm - Correction factors for beamforming antenna patterns
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

#![doc = include_str!("../README.md")]

// Re-export the integrator
pub use beamnorm_quad as quad;

/// Error types for beamnorm operations.
pub mod error;
pub use error::{IntegralError, NormalizerError, Result};

/// Command-line arguments of the beamnorm binary
pub mod cli;
/// Angular sampling of the sphere
pub mod grid;
/// Sphere integration and correction factors
pub mod normalizer;
/// Antenna pattern collaborators
pub mod pattern;
/// Correction archives
pub mod save;

// Re-export commonly used items
pub use grid::AngularGrid;
pub use normalizer::{
    BeamformingNormalizer, CorrectionFactor, CorrectionGrid, CorrectionResult, ErrorBound,
    FOUR_PI, NormalizerConfig, ScanRequest, db_to_power,
};
pub use pattern::{
    AntennaModel, AntennaParameters, BeamRegistry, PatternEvaluator, PatternTable,
    SteeringDirection, TabulatedModel, TabulatedPattern, UniformModel, UniformPattern,
};
pub use save::{
    ArchiveWriter, CorrectionArchive, CorrectionData, CorrectionSink, load_archive, save_archive,
};
