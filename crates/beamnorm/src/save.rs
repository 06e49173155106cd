//! Persistence of correction factors.
//!
//! The archive is a JSON document with one entry per array:
//! `correction_factor`, `error_bound_low`, `error_bound_high`, the steering
//! axes for co-channel scans, the `parameters` of the antenna and a
//! `generated` timestamp. Paths ending in `.gz` are gzip-compressed.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{NormalizerError, Result};
use crate::normalizer::CorrectionResult;
use crate::pattern::AntennaParameters;

/// Receives the result of a scan together with the antenna it belongs to.
pub trait CorrectionSink {
    /// Persist `result`.
    fn save(&mut self, result: &CorrectionResult, params: &AntennaParameters) -> Result<()>;
}

/// A scalar for element scans, a `[azimuth, elevation]` array for co-channel scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectionData {
    /// Element scan value in dB.
    Scalar(f64),
    /// Co-channel scan values in dB.
    Grid(Array2<f64>),
}

/// On-disk representation of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionArchive {
    /// Correction factor in dB.
    pub correction_factor: CorrectionData,
    /// Low bound in dB.
    pub error_bound_low: CorrectionData,
    /// High bound in dB.
    pub error_bound_high: CorrectionData,
    /// Steering azimuths of a co-channel scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth_deg: Option<Vec<f64>>,
    /// Steering elevations of a co-channel scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_deg: Option<Vec<f64>>,
    /// Antenna the corrections were computed for.
    pub parameters: AntennaParameters,
    /// Creation time.
    pub generated: DateTime<Utc>,
}

impl CorrectionArchive {
    /// Archive of `result`, stamped with the current time.
    pub fn new(result: &CorrectionResult, params: &AntennaParameters) -> Self {
        let (correction_factor, error_bound_low, error_bound_high, azimuth_deg, elevation_deg) =
            match result {
                CorrectionResult::Element(cf) => (
                    CorrectionData::Scalar(cf.correction_db),
                    CorrectionData::Scalar(cf.bounds.low_db),
                    CorrectionData::Scalar(cf.bounds.high_db),
                    None,
                    None,
                ),
                CorrectionResult::CoChannel(grid) => (
                    CorrectionData::Grid(grid.correction_db.clone()),
                    CorrectionData::Grid(grid.bound_low_db.clone()),
                    CorrectionData::Grid(grid.bound_high_db.clone()),
                    Some(grid.azimuth_deg.to_vec()),
                    Some(grid.elevation_deg.to_vec()),
                ),
            };
        Self {
            correction_factor,
            error_bound_low,
            error_bound_high,
            azimuth_deg,
            elevation_deg,
            parameters: params.clone(),
            generated: Utc::now(),
        }
    }

    /// True for a co-channel scan.
    pub fn is_grid(&self) -> bool {
        matches!(self.correction_factor, CorrectionData::Grid(_))
    }
}

/// Sink writing a [`CorrectionArchive`] to a file.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    path: PathBuf,
}

impl ArchiveWriter {
    /// Writer targeting `path`; compression follows the extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorrectionSink for ArchiveWriter {
    fn save(&mut self, result: &CorrectionResult, params: &AntennaParameters) -> Result<()> {
        let archive = CorrectionArchive::new(result, params);
        save_archive(&archive, &self.path)?;
        info!("Correction factors saved to: {}", self.path.display());
        Ok(())
    }
}

/// True when `path` ends in `.gz`.
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn archive_error(path: &Path, message: impl ToString) -> NormalizerError {
    NormalizerError::Archive {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Write `archive` to `path`, creating missing parent directories.
pub fn save_archive(archive: &CorrectionArchive, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| archive_error(path, e))?;
    }

    let file = File::create(path).map_err(|e| archive_error(path, e))?;
    let writer = BufWriter::new(file);

    if is_compressed(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, archive).map_err(|e| archive_error(path, e))?;
        encoder
            .finish()
            .and_then(|mut w| w.flush())
            .map_err(|e| archive_error(path, e))?;
    } else {
        let mut writer = writer;
        serde_json::to_writer_pretty(&mut writer, archive).map_err(|e| archive_error(path, e))?;
        writer.flush().map_err(|e| archive_error(path, e))?;
    }
    Ok(())
}

/// Read an archive written by [`save_archive`].
pub fn load_archive(path: &Path) -> Result<CorrectionArchive> {
    let file = File::open(path).map_err(|e| archive_error(path, e))?;
    let reader = BufReader::new(file);
    let archive = if is_compressed(path) {
        serde_json::from_reader(GzDecoder::new(reader))
    } else {
        serde_json::from_reader(reader)
    };
    archive.map_err(|e| archive_error(path, e))
}
