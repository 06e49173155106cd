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

use anyhow::{Context, Result};
use beamnorm::cli::Args;
use beamnorm::{
    AntennaModel, AntennaParameters, ArchiveWriter, BeamformingNormalizer, ScanRequest,
    TabulatedModel, UniformModel,
};
use clap::Parser;
use log::{error, info};

mod report;

#[cfg(test)]
mod report_tests;

/// Computes the power normalisation of an antenna pattern over the sphere.
fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Validate CLI arguments
    beamnorm::cli::validate_args_or_exit(&args);

    if let Err(e) = run(args) {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the worker pool")?;
    }

    let normalizer = BeamformingNormalizer::with_config(args.normalizer_config())
        .context("invalid normalizer settings")?;
    let (n_az, n_el) = normalizer.grid().shape();
    info!(
        "Grid resolution {}° ({} azimuths x {} elevations), tolerance {}",
        args.resolution, n_az, n_el, args.tolerance
    );

    let params = args
        .load_parameters()
        .context("failed to load antenna parameters")?;
    let request = args.scan_request(normalizer.grid());

    match &args.pattern_file {
        Some(path) => {
            let model = TabulatedModel::from_csv(path)
                .with_context(|| format!("failed to load pattern '{}'", path.display()))?;
            info!(
                "Loaded pattern table from {} ({} x {} samples)",
                path.display(),
                model.table().azimuth_deg().len(),
                model.table().elevation_deg().len()
            );
            scan(&normalizer, &model, &params, &request, &args)
        }
        None => {
            info!("Using uniform pattern of {} dB", args.gain_db);
            scan(&normalizer, &UniformModel::new(args.gain_db), &params, &request, &args)
        }
    }
}

fn scan<M: AntennaModel>(
    normalizer: &BeamformingNormalizer,
    model: &M,
    params: &AntennaParameters,
    request: &ScanRequest,
    args: &Args,
) -> Result<()> {
    let mut writer = ArchiveWriter::new(&args.output);
    let result = normalizer
        .generate_correction_matrix(model, params, request, &mut writer)
        .context("correction scan failed")?;
    report::log_report(&result);
    Ok(())
}
