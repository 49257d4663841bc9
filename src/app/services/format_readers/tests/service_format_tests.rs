//! Tests for formats served by web APIs: PSM3, PVGIS hourly and horizon,
//! CAMS, SolarAnywhere and ACIS

use super::*;
use crate::ErrorKind;
use crate::app::models::MetaValue;
use crate::app::services::format_readers::acis::{GRID_ELEMENTS, STATION_ELEMENTS};
use crate::app::services::format_readers::{
    CamsOptions, PeriodLabel, PvgisFormat, PvgisOptions, ReadOptions, parse_acis_grid,
    parse_acis_station_data, parse_acis_stations, parse_cams, parse_psm3, parse_pvgis_horizon,
    parse_pvgis_hourly, parse_solaranywhere, parse_solaranywhere_json, read_cams, read_psm3,
    read_pvgis_hourly, read_solaranywhere,
};

// =============================================================================
// PSM3
// =============================================================================

#[test]
fn test_psm3_fixture() {
    let dataset = read_psm3(fixture("test_psm3_2017.csv"), &ReadOptions::default()).unwrap();
    let meta = &dataset.metadata;
    assert_eq!(meta.get_str("Source"), Some("NSRDB"));
    assert_eq!(meta.get_f64("Latitude"), Some(40.05));
    assert_eq!(meta.get_f64("Longitude"), Some(-105.22));
    assert_eq!(meta.get_i64("Time Zone"), Some(-7));
    assert_eq!(meta.get_i64("Elevation"), Some(1581));
    assert_eq!(meta.get_str("Version"), Some("3.0.6"));

    let data = &dataset.data;
    assert_eq!(data.len(), 6);
    assert_eq!(data.offset().unwrap().local_minus_utc(), -7 * 3600);
    assert_eq!(data.index()[0], ts(2017, 1, 1, 0, 30));
    assert_eq!(data.float_values("ghi").unwrap()[5], Some(60.0));
    assert_eq!(data.float_values("dni").unwrap()[3], Some(40.0));
    assert_eq!(data.float_values("ghi_clear").unwrap()[0], Some(5.0));
    assert_eq!(data.int_values("Year").unwrap()[0], Some(2017));
}

#[test]
fn test_psm3_raw_names() {
    let dataset = read_psm3(fixture("test_psm3_2017.csv"), &ReadOptions::raw_names()).unwrap();
    assert!(dataset.data.has_column("GHI"));
    assert!(dataset.data.has_column("Clearsky DNI"));
}

const PSM3_HEAD: &str = "Source,Latitude,Longitude,Time Zone,Elevation\n\
                         NSRDB,40.05,-105.22,-7,1581\n\
                         Year,Month,Day,Hour,Minute,GHI\n";

#[test]
fn test_psm3_typical_year_not_checked_for_order() {
    let content = format!("{}2005,1,1,0,30,0\n1999,2,1,0,30,0\n", PSM3_HEAD);
    let dataset = parse_psm3(&content, &ReadOptions::default()).unwrap();
    assert_eq!(dataset.data.len(), 2);
}

#[test]
fn test_psm3_single_year_must_increase() {
    let content = format!("{}2017,1,1,1,30,0\n2017,1,1,0,30,0\n", PSM3_HEAD);
    let err = parse_psm3(&content, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_psm3_fractional_time_zone() {
    let content = "Source,Latitude,Longitude,Time Zone,Elevation\n\
                   NSRDB,28.61,77.21,5.5,216\n\
                   Year,Month,Day,Hour,Minute,GHI\n\
                   2017,1,1,0,30,0\n";
    let dataset = parse_psm3(content, &ReadOptions::default()).unwrap();
    assert_eq!(dataset.metadata.get_f64("Time Zone"), Some(5.5));
    assert_eq!(dataset.data.offset().unwrap().local_minus_utc(), 5 * 3600 + 1800);
}

#[test]
fn test_psm3_missing_date_column() {
    let content = "Source,Time Zone\nNSRDB,-7\nYear,Month,Day,GHI\n2017,1,1,0\n";
    let err = parse_psm3(content, &ReadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("'Hour'"));
}

// =============================================================================
// PVGIS hourly and horizon
// =============================================================================

#[test]
fn test_pvgis_hourly_csv() {
    let dataset = read_pvgis_hourly(
        fixture("pvgis_hourly_45.000_8.000_2016.csv"),
        &PvgisOptions::default(),
    )
    .unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 3);
    assert_eq!(data.index()[1], ts(2016, 1, 1, 10, 10));
    assert_eq!(data.float_values("poa_global").unwrap()[1], Some(476.22));
    assert_eq!(data.float_values("solar_elevation").unwrap()[2], Some(22.44));
    assert_eq!(data.float_values("P").unwrap()[2], Some(1589.0));
    assert_eq!(data.int_values("Int").unwrap(), &[Some(0), Some(0), Some(1)]);

    let meta = &dataset.metadata;
    assert_eq!(meta.get_f64("latitude"), Some(45.0));
    assert_eq!(meta.get_f64("elevation"), Some(250.0));
    match meta.get("meta") {
        Some(MetaValue::Json(serde_json::Value::Object(descriptions))) => {
            assert_eq!(descriptions["P"], "PV system power (W)");
        }
        other => panic!("unexpected meta: {:?}", other),
    }
}

#[test]
fn test_pvgis_hourly_json_matches_csv() {
    let json = read_pvgis_hourly(
        fixture("pvgis_hourly_45.000_8.000_2016.json"),
        &PvgisOptions::default(),
    )
    .unwrap();
    let csv = read_pvgis_hourly(
        fixture("pvgis_hourly_45.000_8.000_2016.csv"),
        &PvgisOptions::default(),
    )
    .unwrap();

    assert_eq!(json.data.index(), csv.data.index());
    assert_eq!(json.data.column_names(), csv.data.column_names());
    assert_eq!(
        json.data.float_values("temp_air"),
        csv.data.float_values("temp_air")
    );
    assert_eq!(json.data.int_values("Int"), csv.data.int_values("Int"));
    assert_eq!(json.metadata.get_f64("longitude"), Some(8.0));
}

#[test]
fn test_pvgis_hourly_json_keeps_keys_missing_from_first_record() {
    let content = r#"{"inputs": {}, "outputs": {"hourly": [
        {"time": "20160101:0010", "T2m": 3.4, "P": 0.0},
        {"time": "20160101:0110", "T2m": 3.1, "P": 0.0, "G(i)": 12.5}
    ]}}"#;
    let options = PvgisOptions::default().with_format(PvgisFormat::Json);
    let dataset = parse_pvgis_hourly(content, &options).unwrap();
    let data = &dataset.data;

    assert_eq!(data.column_names(), vec!["temp_air", "P", "poa_global"]);
    assert_eq!(data.float_values("poa_global").unwrap(), &[None, Some(12.5)]);
}

#[test]
fn test_pvgis_hourly_rejects_basic_and_epw() {
    let content = std::fs::read_to_string(fixture("tmy_45.000_8.000_2005_2016.txt")).unwrap();
    let options = PvgisOptions::default().with_format(PvgisFormat::Basic);
    let err = parse_pvgis_hourly(&content, &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_pvgis_horizon_shifts_azimuth() {
    let content = std::fs::read_to_string(fixture("pvgis_horizon_45.000_8.000.json")).unwrap();
    let profile = parse_pvgis_horizon(&content).unwrap();

    assert_eq!(profile.azimuth, vec![0.0, 90.0, 180.0, 270.0]);
    assert_eq!(profile.elevation, vec![9.9, 4.6, 1.9, 8.4]);
    assert_eq!(profile.metadata.get_f64("latitude"), Some(45.0));
}

#[test]
fn test_pvgis_horizon_missing_profile() {
    let err = parse_pvgis_horizon(r#"{"outputs": {}}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

// =============================================================================
// CAMS
// =============================================================================

#[test]
fn test_cams_fixture() {
    let dataset = read_cams(fixture("cams_radiation_1h.csv"), &CamsOptions::default()).unwrap();
    let meta = &dataset.metadata;
    assert_eq!(meta.get_f64("latitude"), Some(55.7906));
    assert_eq!(meta.get_f64("longitude"), Some(12.5251));
    assert_eq!(meta.get_f64("altitude"), Some(39.0));
    assert_eq!(meta.get_str("time_reference"), Some("UT"));
    assert_eq!(meta.get_str("radiation_unit"), Some("W/m^2"));

    let data = &dataset.data;
    assert_eq!(data.len(), 4);
    assert_eq!(data.offset().unwrap().local_minus_utc(), 0);
    assert_eq!(data.index()[0], ts(2020, 1, 1, 0, 0));
    assert_eq!(data.float_values("ghi").unwrap()[2], None);
    assert_eq!(data.float_values("ghi").unwrap()[3], Some(32.847));
    assert_eq!(data.float_values("ghi_extra").unwrap()[3], Some(186.735));
    assert!(data.has_column("Reliability"));
}

#[test]
fn test_cams_right_label() {
    let options = CamsOptions {
        label: PeriodLabel::Right,
        ..CamsOptions::default()
    };
    let dataset = read_cams(fixture("cams_radiation_1h.csv"), &options).unwrap();
    assert_eq!(dataset.data.index()[0], ts(2020, 1, 1, 1, 0));
}

#[test]
fn test_cams_converts_irradiation_to_irradiance() {
    let content = cams_document(
        "Universal time (UT)",
        &[
            "2020-06-01T12:00:00.0/2020-06-01T12:15:00.0;300.0;200.0;150.0;1.0",
            "2020-06-01T12:15:00.0/2020-06-01T12:30:00.0;310.0;210.0;160.0;1.0",
        ],
    );

    let converted = parse_cams(&content, &CamsOptions::default()).unwrap();
    assert_eq!(
        converted.data.float_values("ghi").unwrap(),
        &[Some(600.0), Some(640.0)]
    );
    // Reliability is a fraction, not an energy
    assert_eq!(
        converted.data.float_values("Reliability").unwrap(),
        &[Some(1.0), Some(1.0)]
    );

    let options = CamsOptions {
        integrated: true,
        ..CamsOptions::default()
    };
    let integrated = parse_cams(&content, &options).unwrap();
    assert_eq!(
        integrated.data.float_values("ghi").unwrap(),
        &[Some(150.0), Some(160.0)]
    );
    assert_eq!(integrated.metadata.get_str("radiation_unit"), Some("Wh/m^2"));
}

#[test]
fn test_cams_rejects_empty_period() {
    let content = cams_document(
        "Universal time (UT)",
        &[
            "2020-06-01T12:00:00.0/2020-06-01T12:15:00.0;300.0;200.0;150.0;1.0",
            "2020-06-01T12:15:00.0/2020-06-01T12:15:00.0;310.0;210.0;160.0;1.0",
        ],
    );
    let err = parse_cams(&content, &CamsOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("at or before its start"));
}

#[test]
fn test_cams_true_solar_time_is_naive() {
    let content = cams_document(
        "True solar time (TST)",
        &["2020-06-01T12:00:00.0/2020-06-01T13:00:00.0;300.0;200.0;150.0;1.0"],
    );
    let dataset = parse_cams(&content, &CamsOptions::default()).unwrap();
    assert!(dataset.data.offset().is_none());
    assert_eq!(dataset.metadata.get_str("time_reference"), Some("TST"));
}

#[test]
fn test_cams_unknown_time_reference() {
    let content = cams_document("Local time", &[]);
    let err = parse_cams(&content, &CamsOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_cams_without_column_line() {
    let err = parse_cams("# Title: nothing here\n", &CamsOptions::default()).unwrap_err();
    assert!(err.to_string().contains("Observation period"));
}

// =============================================================================
// SolarAnywhere
// =============================================================================

#[test]
fn test_solaranywhere_csv_fixture() {
    let dataset = read_solaranywhere(
        fixture("solaranywhere_tmy_20200101.csv"),
        &ReadOptions::default(),
    )
    .unwrap();
    let meta = &dataset.metadata;
    assert_eq!(meta.get_i64("USAF"), Some(1));
    assert_eq!(meta.get_str("name"), Some("Test Site"));
    assert_eq!(meta.get_f64("TZ"), Some(-8.0));
    assert_eq!(meta.get_f64("latitude"), Some(37.5));
    assert_eq!(meta.get_str("Type"), Some("Typical Year"));
    assert_eq!(meta.get_str("Data Version"), Some("3.4"));

    let data = &dataset.data;
    assert_eq!(data.len(), 4);
    assert_eq!(data.offset().unwrap().local_minus_utc(), 0);
    assert_eq!(data.index()[0], ts(2020, 1, 1, 9, 0));
    assert_eq!(data.int_values("ghi").unwrap()[1], Some(50));
    assert_eq!(data.float_values("temp_air").unwrap()[0], Some(11.0));
    assert_eq!(data.float_values("albedo").unwrap()[0], Some(0.15));
    assert!(data.text_values("ObservationTime(LST)").is_some());
}

#[test]
fn test_solaranywhere_csv_keeps_gmt_time_column() {
    let dataset = read_solaranywhere(
        fixture("solaranywhere_tmy_20200101.csv"),
        &ReadOptions::default(),
    )
    .unwrap();
    let data = &dataset.data;
    let times = data.text_values("ObservationTime(GMT)").unwrap();
    assert_eq!(times.len(), data.len());
    assert!(times.iter().all(Option::is_some));
    assert_eq!(data.column_names()[1], "ObservationTime(GMT)");
}

const SOLARANYWHERE_HEAD: &str = "1,\"Site\",CA,-8,37.5,-122.2,12,\"Type: Historical\"\n\
                                  ObservationTime(GMT),Global Horizontal Irradiance (GHI) W/m2\n";

#[test]
fn test_solaranywhere_historical_must_increase() {
    let content = format!(
        "{}01/01/2020 09:00,0\n01/01/2020 09:00,10\n",
        SOLARANYWHERE_HEAD
    );
    let err = parse_solaranywhere(&content, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_solaranywhere_bad_time_reports_line() {
    let content = format!("{}2020-01-01T09:00,0\n", SOLARANYWHERE_HEAD);
    let err = parse_solaranywhere(&content, &ReadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("line 3"));
}

const SOLARANYWHERE_RESULT: &str = r#"{
  "WeatherRequestId": "WeatherRequest_1",
  "Status": "Done",
  "WeatherDataResults": [{
    "Status": "Success",
    "WeatherSourceInformation": {
      "Latitude": 37.5,
      "Longitude": -122.2,
      "Elevation_Meters": 12,
      "DataVersion": "3.7"
    },
    "WeatherDataPeriods": {
      "TimeResolution_Minutes": 60,
      "WeatherDataPeriods": [
        {"StartTime": "2020-01-01T00:00:00-08:00", "ObservationTime": "2020-01-01T00:30:00-08:00",
         "EndTime": "2020-01-01T01:00:00-08:00",
         "GlobalHorizontalIrradiance_WattsPerMeterSquared": 0,
         "AmbientTemperature_DegreesC": 8.5},
        {"StartTime": "2020-01-01T01:00:00-08:00", "ObservationTime": "2020-01-01T01:30:00-08:00",
         "EndTime": "2020-01-01T02:00:00-08:00",
         "GlobalHorizontalIrradiance_WattsPerMeterSquared": 0,
         "AmbientTemperature_DegreesC": 8.1}
      ]
    }
  }]
}"#;

#[test]
fn test_solaranywhere_json_result() {
    let dataset = parse_solaranywhere_json(SOLARANYWHERE_RESULT, true).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 2);
    assert_eq!(data.index()[0], ts(2020, 1, 1, 8, 30));
    assert_eq!(data.float_values("temp_air").unwrap()[1], Some(8.1));
    assert!(data.has_column("ghi"));
    assert_eq!(
        data.text_values("ObservationTime").unwrap()[1].as_deref(),
        Some("2020-01-01T01:30:00-08:00")
    );

    let meta = &dataset.metadata;
    assert_eq!(meta.get_f64("latitude"), Some(37.5));
    assert_eq!(meta.get_f64("altitude"), Some(12.0));
    assert_eq!(meta.get_str("DataVersion"), Some("3.7"));
    assert_eq!(meta.get_i64("time_resolution"), Some(60));
}

#[test]
fn test_solaranywhere_json_without_results() {
    let err = parse_solaranywhere_json(r#"{"Status": "Done"}"#, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

// =============================================================================
// ACIS
// =============================================================================

#[test]
fn test_acis_grid() {
    let body = r#"{"meta": {"ll": [-105.0, 40.0], "elev": 5000.0},
        "data": [["2020-01-01", 1.5, -2.0, -10.0, -6.0, 0.0, 24.0, 0.0],
                 ["2020-01-02", -999, 1.0, -9.0, -4.0, 0.0, 22.0, 0.0]]}"#;
    let dataset = parse_acis_grid(body, GRID_ELEMENTS, true).unwrap();
    let data = &dataset.data;

    assert_eq!(data.len(), 2);
    assert!(data.offset().is_none());
    assert_eq!(data.index()[1], ts(2020, 1, 2, 0, 0));
    assert_eq!(
        data.float_values("precipitation").unwrap(),
        &[Some(1.5), None]
    );
    assert_eq!(data.float_values("heating_degree_days").unwrap()[0], Some(24.0));

    assert_eq!(dataset.metadata.get_f64("latitude"), Some(40.0));
    assert_eq!(dataset.metadata.get_f64("longitude"), Some(-105.0));
    assert!(approx(dataset.metadata.get_f64("altitude"), 1524.0));
}

#[test]
fn test_acis_grid_raw_names_keep_lat_lon() {
    let body = r#"{"meta": {"ll": [-105.0, 40.0]}, "data": [["2020-01-01", 1.0]]}"#;
    let elements = &GRID_ELEMENTS[..1];
    let dataset = parse_acis_grid(body, elements, false).unwrap();
    assert!(dataset.data.has_column("pcpn"));
    assert_eq!(dataset.metadata.get_f64("lat"), Some(40.0));
}

#[test]
fn test_acis_station_flags() {
    let body = r#"{"meta": {"name": "BOULDER", "state": "CO", "ll": [-105.27, 39.99], "elev": 5484.0},
        "data": [["2020-01-01", "5", "-3", "1.0", "2", "T", "0.5A", "M", "0", "17", "0"],
                 ["2020-01-02", "6", "-2", "2.0", "3", "0.10", "S", "4", "0", "16", "0"]]}"#;
    let dataset = parse_acis_station_data(body, STATION_ELEMENTS, 0.001, true).unwrap();
    let data = &dataset.data;

    assert_eq!(data.float_values("temp_air_max").unwrap()[0], Some(5.0));
    assert_eq!(
        data.float_values("precipitation").unwrap(),
        &[Some(0.001), Some(0.1)]
    );
    assert_eq!(data.float_values("snowfall").unwrap(), &[Some(0.5), None]);
    assert_eq!(data.float_values("snowdepth").unwrap(), &[None, Some(4.0)]);
    assert!(data.has_column("obst"));

    assert_eq!(dataset.metadata.get_str("name"), Some("BOULDER"));
    assert!(approx(dataset.metadata.get_f64("altitude"), 5484.0 * 0.3048));
}

#[test]
fn test_acis_error_payload_is_service_error() {
    let err = parse_acis_grid(r#"{"error": "bad loc"}"#, GRID_ELEMENTS, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Service);
    assert!(err.to_string().contains("bad loc"));
}

#[test]
fn test_acis_row_width_mismatch() {
    let body = r#"{"meta": {}, "data": [["2020-01-01", 1.0]]}"#;
    let err = parse_acis_grid(body, GRID_ELEMENTS, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_acis_stations() {
    let body = r#"{"meta": [
        {"name": "BOULDER", "sids": ["050848 2", "BOUthr 9"], "state": "CO",
         "ll": [-105.2667, 39.9919], "elev": 5484.0, "uid": 1234},
        {"name": "NO COORDS", "sids": []}
    ]}"#;
    let stations = parse_acis_stations(body).unwrap();

    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].sids, vec!["050848 2", "BOUthr 9"]);
    assert_eq!(stations[0].latitude, Some(39.9919));
    assert_eq!(stations[0].uid, Some(1234));
    assert!(approx(stations[0].elevation, 1671.5232));
    assert_eq!(stations[1].latitude, None);
    assert_eq!(stations[1].state, None);
}
