//! Tests for the BSRN station-to-archive reader

use super::*;
use crate::ErrorKind;
use crate::app::services::format_readers::bsrn::gunzip;
use crate::app::services::format_readers::{BsrnOptions, parse_bsrn, read_bsrn};

fn both_records() -> BsrnOptions {
    BsrnOptions {
        logical_records: vec!["0100".to_string(), "0300".to_string()],
    }
}

#[test]
fn test_bsrn_basic_measurements() {
    let dataset = read_bsrn(fixture("bsrn-pay0616.dat"), &BsrnOptions::default()).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 4);
    assert_eq!(data.offset().unwrap().local_minus_utc(), 0);
    assert_eq!(data.index()[0], ts(2016, 6, 1, 0, 0));
    assert_eq!(data.index()[3], ts(2016, 6, 1, 0, 3));
    assert_eq!(data.float_values("ghi").unwrap()[1], Some(1.5));
    assert_eq!(data.float_values("lwd").unwrap()[0], Some(300.0));
    assert_eq!(data.float_values("pressure").unwrap()[0], Some(960.0));
    assert!(!data.has_column("lwu"));
}

#[test]
fn test_bsrn_missing_values() {
    let dataset = read_bsrn(fixture("bsrn-pay0616.dat"), &BsrnOptions::default()).unwrap();
    assert_eq!(dataset.data.float_values("dni").unwrap()[2], None);
    assert_eq!(
        dataset.data.float_values("relative_humidity").unwrap()[3],
        None
    );
    assert_eq!(
        dataset.data.float_values("relative_humidity").unwrap()[2],
        Some(74.0)
    );
}

#[test]
fn test_bsrn_station_metadata() {
    let dataset = read_bsrn(fixture("bsrn-pay0616.dat"), &BsrnOptions::default()).unwrap();
    let meta = &dataset.metadata;

    assert_eq!(meta.get_i64("station_identification_number"), Some(21));
    assert_eq!(meta.get_i64("month"), Some(6));
    assert_eq!(meta.get_i64("year"), Some(2016));
    assert_eq!(meta.get_i64("version_of_data"), Some(3));
    assert_eq!(meta.get_i64("surface_type"), Some(13));
    assert!(approx(meta.get_f64("latitude_degN"), 46.813));
    assert!(approx(meta.get_f64("longitude_degE"), 6.942));
    assert_eq!(meta.get_f64("altitude"), Some(491.0));
    assert_eq!(meta.get_str("synop_station"), Some("06610"));
    assert_eq!(
        meta.get_str("address"),
        Some("MeteoSwiss, Les Invuardes, CH-1530 Payerne")
    );
}

#[test]
fn test_bsrn_joins_logical_records() {
    let dataset = read_bsrn(fixture("bsrn-pay0616.dat"), &both_records()).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 4);
    assert_eq!(data.float_values("ghi").unwrap()[3], Some(4.5));
    assert_eq!(data.float_values("lwu").unwrap()[0], Some(350.0));
    assert_eq!(data.float_values("net_radiation").unwrap()[1], Some(-61.0));
}

#[test]
fn test_bsrn_gzip_matches_plain() {
    let plain = read_bsrn(fixture("bsrn-pay0616.dat"), &both_records()).unwrap();
    let gz = read_bsrn(fixture("bsrn-pay0616.dat.gz"), &both_records()).unwrap();
    assert_eq!(plain, gz);

    let bytes = std::fs::read(fixture("bsrn-pay0616.dat.gz")).unwrap();
    assert!(gunzip(&bytes).unwrap().starts_with("*C0001"));
}

#[test]
fn test_bsrn_unsupported_logical_record() {
    let options = BsrnOptions {
        logical_records: vec!["0500".to_string()],
    };
    let err = read_bsrn(fixture("bsrn-pay0616.dat"), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_bsrn_absent_record_yields_no_columns() {
    let content = "*C0001\n 21  6 2016  3\n*C0004\n 03/15/16\n 13 3\n addr\n phone\n net\n 136.8 186.9 491\n";
    let dataset = parse_bsrn(content, &BsrnOptions::default()).unwrap();
    assert!(dataset.data.is_empty());
    assert_eq!(dataset.metadata.get_f64("altitude"), Some(491.0));
}

#[test]
fn test_bsrn_requires_station_description() {
    let content = "*C0001\n 21  6 2016  3\n*C0100\n";
    let err = parse_bsrn(content, &BsrnOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("0004"));
}

#[test]
fn test_bsrn_incomplete_two_line_entry() {
    let content = "*C0001\n 21  6 2016  3\n*C0004\n d\n 13 3\n a\n p\n n\n 136.8 186.9 491\n\
                   *C0100\n  1     0     0.0   0.1   0.0     0.2   0.0   0.0   0.0   0.0\n";
    let err = parse_bsrn(content, &BsrnOptions::default()).unwrap_err();
    assert!(err.to_string().contains("incomplete"));
}
