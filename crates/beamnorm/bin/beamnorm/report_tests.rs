#[cfg(test)]
mod tests {
    use crate::report::{MAX_TABLE_CELLS, format_row, summary_lines};
    use beamnorm::normalizer::{CorrectionFactor, ErrorBound};
    use beamnorm::{CorrectionGrid, CorrectionResult};
    use ndarray::{Array1, Array2};

    fn constant_grid(n_az: usize, n_el: usize, value: f64) -> CorrectionGrid {
        CorrectionGrid {
            azimuth_deg: Array1::from_shape_fn(n_az, |i| i as f64 * 10.0),
            elevation_deg: Array1::from_shape_fn(n_el, |j| j as f64 * 10.0),
            correction_db: Array2::from_elem((n_az, n_el), value),
            bound_low_db: Array2::from_elem((n_az, n_el), value - 0.01),
            bound_high_db: Array2::from_elem((n_az, n_el), value + 0.01),
        }
    }

    #[test]
    fn test_format_row_columns() {
        let row = format_row(
            -30.0,
            90.0,
            -3.0,
            &ErrorBound {
                low_db: -3.1,
                high_db: -2.9,
            },
        );
        assert!(row.contains("-30.00"));
        assert!(row.contains("90.00"));
        assert!(row.contains("-3.000000"));
        assert!(row.contains("[ -3.100000,  -2.900000]"));
    }

    #[test]
    fn test_element_summary() {
        let result = CorrectionResult::Element(CorrectionFactor {
            correction_db: 0.0,
            bounds: ErrorBound {
                low_db: -0.01,
                high_db: 0.01,
            },
            integral: 12.566,
            abs_error: 0.02,
        });
        let lines = summary_lines(&result);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Element correction factor: 0.000000"));
    }

    #[test]
    fn test_small_grid_is_tabulated() {
        let result = CorrectionResult::CoChannel(constant_grid(2, 3, -3.0));
        let lines = summary_lines(&result);
        // title, header, one row per cell
        assert_eq!(lines.len(), 2 + 6);
        assert!(lines[0].contains("2 azimuths x 3 elevations"));
    }

    #[test]
    fn test_large_grid_is_summarised() {
        let result = CorrectionResult::CoChannel(constant_grid(MAX_TABLE_CELLS + 1, 1, 1.5));
        let lines = summary_lines(&result);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("[1.500000, 1.500000]"));
        assert!(lines[2].contains("0.020000"));
    }

    #[test]
    fn test_empty_grid() {
        let result = CorrectionResult::CoChannel(constant_grid(0, 4, 0.0));
        let lines = summary_lines(&result);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("no steering direction"));
    }
}
