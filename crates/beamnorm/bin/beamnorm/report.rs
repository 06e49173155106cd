//! Human-readable summary of a scan.

use beamnorm::normalizer::{CorrectionFactor, ErrorBound};
use beamnorm::{CorrectionGrid, CorrectionResult};
use log::info;

/// Grids with at most this many cells are printed cell by cell.
pub const MAX_TABLE_CELLS: usize = 32;

/// One line of the slice table.
pub fn format_row(
    azimuth_deg: f64,
    elevation_deg: f64,
    correction_db: f64,
    bound: &ErrorBound,
) -> String {
    format!(
        "{:>9.2} {:>9.2} {:>12.6} [{:>10.6}, {:>10.6}]",
        azimuth_deg, elevation_deg, correction_db, bound.low_db, bound.high_db
    )
}

fn element_lines(cf: &CorrectionFactor) -> Vec<String> {
    vec![
        format!("Element correction factor: {:.6} dB", cf.correction_db),
        format!(
            "  error bounds: [{:.6}, {:.6}] dB (I={:.6}, E={:.3e})",
            cf.bounds.low_db, cf.bounds.high_db, cf.integral, cf.abs_error
        ),
    ]
}

fn grid_lines(grid: &CorrectionGrid) -> Vec<String> {
    let (n_az, n_el) = grid.shape();
    let mut lines = vec![format!(
        "Co-channel correction factors: {n_az} azimuths x {n_el} elevations"
    )];

    if n_az * n_el == 0 {
        lines.push("  (no steering direction)".to_string());
        return lines;
    }

    if n_az * n_el <= MAX_TABLE_CELLS {
        lines.push(format!(
            "{:>9} {:>9} {:>12} {:>25}",
            "az(deg)", "el(deg)", "cf(dB)", "bounds(dB)"
        ));
        for i in 0..n_az {
            for j in 0..n_el {
                if let Some((cf, bound)) = grid.cell(i, j) {
                    lines.push(format_row(
                        grid.azimuth_deg[i],
                        grid.elevation_deg[j],
                        cf,
                        &bound,
                    ));
                }
            }
        }
        return lines;
    }

    if let (Some(min), Some(max), Some(spread)) = (
        grid.min_correction_db(),
        grid.max_correction_db(),
        grid.max_spread_db(),
    ) {
        lines.push(format!("  correction range: [{min:.6}, {max:.6}] dB"));
        lines.push(format!("  widest error interval: {spread:.6} dB"));
    }
    lines
}

/// Lines describing `result`.
pub fn summary_lines(result: &CorrectionResult) -> Vec<String> {
    match result {
        CorrectionResult::Element(cf) => element_lines(cf),
        CorrectionResult::CoChannel(grid) => grid_lines(grid),
    }
}

/// Log the summary of `result`.
pub fn log_report(result: &CorrectionResult) {
    for line in summary_lines(result) {
        info!("{line}");
    }
}
