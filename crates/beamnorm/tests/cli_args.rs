use beamnorm::cli::{Args, validate_args};
use beamnorm::{AngularGrid, NormalizerConfig, ScanRequest};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let args = Args::parse_from(["beamnorm"]);
    assert_eq!(args.resolution, 5.0);
    assert_eq!(args.tolerance, 0.5);
    assert_eq!(args.max_subdivisions, 50);
    assert!(!args.co_channel);
    assert_eq!(args.output, PathBuf::from("correction.json"));
    assert_eq!(args.normalizer_config(), NormalizerConfig::new(5.0, 0.5));
    assert!(validate_args(&args).is_ok());

    let grid = AngularGrid::new(args.resolution).unwrap();
    assert_eq!(args.scan_request(&grid), ScanRequest::Element);
    assert_eq!(args.load_parameters().unwrap().n_rows, 8);
}

#[test]
fn test_non_positive_values_are_rejected_by_the_parser() {
    assert!(Args::try_parse_from(["beamnorm", "--resolution", "0"]).is_err());
    assert!(Args::try_parse_from(["beamnorm", "--tolerance", "-0.1"]).is_err());
    assert!(Args::try_parse_from(["beamnorm", "--max-subdivisions", "0"]).is_err());
    assert!(Args::try_parse_from(["beamnorm", "--threads", "0"]).is_err());
}

#[test]
fn test_gain_and_pattern_file_conflict() {
    let res = Args::try_parse_from([
        "beamnorm",
        "--gain-db",
        "3",
        "--pattern-file",
        "pattern.csv",
    ]);
    assert!(res.is_err());
}

#[test]
fn test_full_co_channel_scan() {
    let args = Args::parse_from(["beamnorm", "-r", "30", "--co-channel"]);
    let grid = AngularGrid::new(args.resolution).unwrap();
    assert_eq!(args.scan_request(&grid), ScanRequest::co_channel(&grid));
}

#[test]
fn test_slice_overrides_one_axis() {
    let args = Args::parse_from([
        "beamnorm",
        "-r",
        "30",
        "--co-channel",
        "--azimuth",
        "-30,0,30",
    ]);
    assert!(validate_args(&args).is_ok());
    let grid = AngularGrid::new(args.resolution).unwrap();
    match args.scan_request(&grid) {
        ScanRequest::CoChannel {
            azimuth_deg,
            elevation_deg,
        } => {
            assert_eq!(azimuth_deg, vec![-30.0, 0.0, 30.0]);
            assert_eq!(elevation_deg, grid.elevation_deg().to_vec());
        }
        ScanRequest::Element => panic!("expected a co-channel scan"),
    }
}

#[test]
fn test_steering_requires_co_channel() {
    let args = Args::parse_from(["beamnorm", "--elevation", "90"]);
    let err = validate_args(&args).unwrap_err();
    assert!(err.contains("--co-channel"));
}

#[test]
fn test_missing_files_fail_validation() {
    let args = Args::parse_from(["beamnorm", "--pattern-file", "/nonexistent/pattern.csv"]);
    assert!(validate_args(&args).is_err());
    let args = Args::parse_from(["beamnorm", "--params", "/nonexistent/params.json"]);
    assert!(validate_args(&args).is_err());
}

#[test]
fn test_negative_gain_is_accepted() {
    let args = Args::parse_from(["beamnorm", "--gain-db", "-3.5"]);
    assert_eq!(args.gain_db, -3.5);
    assert!(validate_args(&args).is_ok());
}
