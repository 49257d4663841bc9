//! Tests for ground-station formats: SRML, SURFRAD, SOLRAD, CRN and MIDC

use super::*;
use crate::ErrorKind;
use crate::app::services::format_readers::midc::map_midc_field;
use crate::app::services::format_readers::srml::map_srml_column;
use crate::app::services::format_readers::{
    MidcOptions, ReadOptions, parse_crn, parse_midc, parse_midc_raw, parse_srml, parse_surfrad,
    read_crn, read_midc, read_midc_raw, read_solrad, read_srml, read_surfrad,
};

// =============================================================================
// SRML
// =============================================================================

#[test]
fn test_srml_fixture() {
    let dataset = read_srml(fixture("EUPO1801.txt"), &ReadOptions::default()).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 48);
    assert_eq!(data.offset().unwrap().local_minus_utc(), -8 * 3600);
    // 0100 ends the first hourly interval, which starts at midnight
    assert_eq!(data.index()[0], ts(2018, 1, 1, 0, 0));
    assert_eq!(data.index()[47], ts(2018, 1, 2, 23, 0));
    assert_eq!(
        data.column_names(),
        vec![
            "ghi_0",
            "ghi_0_flag",
            "dni_0",
            "dni_0_flag",
            "dhi_0",
            "dhi_0_flag",
            "temp_air_0",
            "temp_air_0_flag"
        ]
    );
    assert_eq!(data.float_values("ghi_0").unwrap()[12], Some(240.0));
    assert_eq!(data.float_values("temp_air_0").unwrap()[0], Some(3.0));

    assert_eq!(dataset.metadata.get_str("station"), Some("EU"));
    assert_eq!(dataset.metadata.get_i64("year"), Some(2018));
}

#[test]
fn test_srml_flag_99_marks_missing() {
    let dataset = read_srml(fixture("EUPO1801.txt"), &ReadOptions::default()).unwrap();
    assert_eq!(dataset.data.float_values("ghi_0").unwrap()[11], None);
    assert_eq!(dataset.data.int_values("ghi_0_flag").unwrap()[11], Some(99));
    // The paired DNI value on the same row survives
    assert!(dataset.data.float_values("dni_0").unwrap()[11].is_some());
}

#[test]
fn test_srml_raw_names() {
    let dataset = read_srml(fixture("EUPO1801.txt"), &ReadOptions::raw_names()).unwrap();
    assert!(dataset.data.has_column("1000"));
    assert!(dataset.data.has_column("1000_flag"));
}

#[test]
fn test_srml_five_minute_interval_start() {
    let content = "EU\t2018\t1000\t0\n\
                   1\t5\t1.0\t11\n\
                   1\t10\t2.0\t11\n\
                   1\t100\t3.0\t11\n";
    let dataset = parse_srml(content, &ReadOptions::default()).unwrap();
    assert_eq!(
        dataset.data.index(),
        &[
            ts(2018, 1, 1, 0, 0),
            ts(2018, 1, 1, 0, 5),
            ts(2018, 1, 1, 0, 55)
        ]
    );
}

#[test]
fn test_srml_duplicate_timestamp_rejected() {
    let content = "EU\t2018\t1000\t0\n1\t100\t1.0\t11\n1\t100\t2.0\t11\n";
    let err = parse_srml(content, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_map_srml_column() {
    assert_eq!(map_srml_column("1001"), "ghi_1");
    assert_eq!(map_srml_column("9301"), "temp_air_1");
    assert_eq!(map_srml_column("7001"), "7001");
    assert_eq!(map_srml_column("5555"), "5555");
}

// =============================================================================
// SURFRAD and SOLRAD
// =============================================================================

#[test]
fn test_surfrad_fixture() {
    let dataset = read_surfrad(fixture("surfrad-slv16001.dat"), &ReadOptions::default()).unwrap();
    let meta = &dataset.metadata;
    assert_eq!(meta.get_str("name"), Some("Sioux Falls"));
    assert_eq!(meta.get_f64("latitude"), Some(43.73));
    assert_eq!(meta.get_f64("longitude"), Some(-96.62));
    assert_eq!(meta.get_f64("elevation"), Some(473.0));
    assert_eq!(meta.get_i64("surfrad_version"), Some(1));

    let data = &dataset.data;
    assert_eq!(data.len(), 5);
    assert_eq!(data.offset().unwrap().local_minus_utc(), 0);
    assert_eq!(data.index()[4], ts(2016, 1, 1, 0, 4));
    assert_eq!(data.float_values("ghi").unwrap()[0], Some(-2.0));
    assert_eq!(data.float_values("solar_zenith").unwrap()[0], Some(117.92));
}

#[test]
fn test_surfrad_sentinel_and_flag() {
    let dataset = read_surfrad(fixture("surfrad-slv16001.dat"), &ReadOptions::default()).unwrap();
    let dni = dataset.data.float_values("dni").unwrap();
    assert_eq!(dni[2], None);
    assert_eq!(dni[1], Some(1.0));
    assert_eq!(dataset.data.int_values("dni_flag").unwrap()[2], Some(1));
}

#[test]
fn test_surfrad_truncated_record() {
    let content = "Sioux Falls\n 43.73 -96.62  473 m version 1\n 2016 1 1 1 0 0 0.000\n";
    let err = parse_surfrad(content, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("line 3"));
}

#[test]
fn test_solrad_fixture() {
    let dataset = read_solrad(fixture("abq19056.dat"), &ReadOptions::default()).unwrap();
    assert_eq!(dataset.metadata.get_str("name"), Some("Albuquerque"));
    assert_eq!(dataset.metadata.get_f64("elevation"), Some(1617.0));

    let data = &dataset.data;
    assert_eq!(data.len(), 4);
    assert_eq!(data.index()[0], ts(2019, 2, 25, 0, 0));
    assert_eq!(data.float_values("ghi").unwrap()[3], Some(1.5));
    assert_eq!(data.float_values("dni").unwrap()[1], None);
    assert_eq!(data.int_values("dni_flag").unwrap()[1], Some(1));
    assert!(data.has_column("std_uvb"));
}

// =============================================================================
// CRN
// =============================================================================

#[test]
fn test_crn_fixture() {
    let dataset = read_crn(
        fixture("CRNS0101-05-2019-AZ_Tucson_11_W.txt"),
        &ReadOptions::default(),
    )
    .unwrap();
    let meta = &dataset.metadata;
    assert_eq!(meta.get_i64("WBANNO"), Some(53131));
    assert_eq!(meta.get_f64("latitude"), Some(32.24));
    assert_eq!(meta.get_f64("longitude"), Some(-111.17));

    let data = &dataset.data;
    assert_eq!(data.len(), 4);
    assert_eq!(data.index()[0], ts(2019, 1, 1, 0, 5));
    assert_eq!(
        data.float_values("ghi").unwrap(),
        &[Some(105.0), Some(95.0), Some(85.0), Some(75.0)]
    );
    assert_eq!(data.float_values("temp_air").unwrap()[0], Some(10.4));
    assert_eq!(
        data.text_values("CRX_VN").unwrap()[0],
        Some("2.623".to_string())
    );
}

#[test]
fn test_crn_sentinels() {
    let dataset = read_crn(
        fixture("CRNS0101-05-2019-AZ_Tucson_11_W.txt"),
        &ReadOptions::default(),
    )
    .unwrap();
    let data = &dataset.data;
    assert_eq!(data.float_values("relative_humidity").unwrap()[2], None);
    assert_eq!(data.float_values("relative_humidity").unwrap()[1], Some(36.0));
    assert!(data.float_values("SOIL_MOISTURE_5").unwrap().iter().all(Option::is_none));
    assert!(data.float_values("SOIL_TEMPERATURE_5").unwrap().iter().all(Option::is_none));
}

#[test]
fn test_crn_wrong_field_count() {
    let err = parse_crn("53131 20190101 0005\n", &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("expected 23 fields"));
}

// =============================================================================
// MIDC
// =============================================================================

#[test]
fn test_midc_fixture() {
    let dataset = read_midc(fixture("midc_20181014.txt"), &MidcOptions::default()).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 6);
    assert_eq!(data.offset().unwrap().local_minus_utc(), -7 * 3600);
    assert_eq!(data.index()[5], ts(2018, 10, 14, 0, 5));
    assert_eq!(
        data.column_names(),
        vec![
            "ghi_PSP",
            "dni_NIP",
            "dhi_CM22",
            "solar_zenith",
            "solar_azimuth",
            "airmass"
        ]
    );
    assert_eq!(data.float_values("dni_NIP").unwrap()[3], None);
    assert_eq!(dataset.metadata.get_str("tz"), Some("MST"));
    assert_eq!(dataset.metadata.get_f64("utc_offset"), Some(-7.0));
}

#[test]
fn test_midc_raw_fixture() {
    let dataset = read_midc_raw(fixture("midc_raw_20181018.txt"), &MidcOptions::default()).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 5);
    assert_eq!(data.offset().unwrap().local_minus_utc(), -8 * 3600);
    // Day 291 of 2018
    assert_eq!(data.index()[0], ts(2018, 10, 18, 0, 0));
    assert_eq!(data.index()[4], ts(2018, 10, 18, 0, 4));
    assert!(data.has_column("ghi_Horiz"));
    assert!(data.has_column("Air Temperature [deg C]"));
    assert_eq!(data.float_values("dni_Normal").unwrap()[2], None);
}

#[test]
fn test_midc_user_mapping_wins() {
    let options = MidcOptions::default().with_variable("Global", "poa");
    assert_eq!(map_midc_field("Global PSP [W/m^2]", &options), "poa_PSP");
    assert_eq!(
        map_midc_field("Global PSP [W/m^2]", &MidcOptions::default()),
        "ghi_PSP"
    );
    assert_eq!(
        map_midc_field("Wind Speed [m/s]", &MidcOptions::default()),
        "Wind Speed [m/s]"
    );
}

#[test]
fn test_midc_raw_names() {
    let options = MidcOptions {
        map_variables: false,
        ..MidcOptions::default()
    };
    let dataset = read_midc(fixture("midc_20181014.txt"), &options).unwrap();
    assert!(dataset.data.has_column("Global PSP [W/m^2]"));
}

#[test]
fn test_midc_unknown_timezone() {
    let err = parse_midc(
        "DATE (MM/DD/YYYY),XYZ,Global PSP [W/m^2]\n10/14/2018,0:00,1.0\n",
        &MidcOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("XYZ"));
}

#[test]
fn test_midc_layouts_are_not_interchangeable() {
    let raw = std::fs::read_to_string(fixture("midc_raw_20181018.txt")).unwrap();
    assert!(parse_midc(&raw, &MidcOptions::default()).is_err());
    assert!(parse_midc_raw(&raw, &MidcOptions::default()).is_ok());
}
