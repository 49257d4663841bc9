//! Tests for format selection and the generic entry points

use super::*;
use crate::ErrorKind;
use crate::app::services::format_readers::{FileFormat, ReadOptions, parse_any, read_any};
use std::path::Path;

#[test]
fn test_format_names_round_trip() {
    for format in FileFormat::ALL {
        let parsed: FileFormat = format.to_string().parse().unwrap();
        assert_eq!(parsed, *format);
        assert!(!format.description().is_empty());
    }
}

#[test]
fn test_format_from_str_accepts_underscores_and_case() {
    assert_eq!("midc_raw".parse::<FileFormat>().unwrap(), FileFormat::MidcRaw);
    assert_eq!("PVGIS-TMY".parse::<FileFormat>().unwrap(), FileFormat::PvgisTmy);
    assert_eq!(" epw ".parse::<FileFormat>().unwrap(), FileFormat::Epw);
}

#[test]
fn test_unknown_format_lists_choices() {
    let err = "netcdf".parse::<FileFormat>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("tmy3"));
}

#[test]
fn test_format_from_path() {
    assert_eq!(
        FileFormat::from_path(Path::new("weather/NLD_Amsterdam.EPW")),
        Some(FileFormat::Epw)
    );
    assert_eq!(
        FileFormat::from_path(Path::new("03812.tm2")),
        Some(FileFormat::Tmy2)
    );
    assert_eq!(FileFormat::from_path(Path::new("722287TY.csv")), None);
    assert_eq!(FileFormat::from_path(Path::new("README")), None);
}

#[test]
fn test_read_any_fixtures() {
    let cases = [
        (FileFormat::Tmy3, "722287TY.csv", 50),
        (FileFormat::Tmy2, "03812.tm2", 24),
        (FileFormat::Epw, "NLD_Amsterdam062400_IWEC.epw", 24),
        (FileFormat::Srml, "EUPO1801.txt", 48),
        (FileFormat::Surfrad, "surfrad-slv16001.dat", 5),
        (FileFormat::Solrad, "abq19056.dat", 4),
        (FileFormat::Crn, "CRNS0101-05-2019-AZ_Tucson_11_W.txt", 4),
        (FileFormat::Midc, "midc_20181014.txt", 6),
        (FileFormat::MidcRaw, "midc_raw_20181018.txt", 5),
        (FileFormat::Bsrn, "bsrn-pay0616.dat.gz", 4),
        (FileFormat::Psm3, "test_psm3_2017.csv", 6),
        (FileFormat::PvgisTmy, "tmy_45.000_8.000_2005_2016.json", 3),
        (FileFormat::PvgisHourly, "pvgis_hourly_45.000_8.000_2016.csv", 3),
        (FileFormat::Cams, "cams_radiation_1h.csv", 4),
        (FileFormat::SolarAnywhere, "solaranywhere_tmy_20200101.csv", 4),
    ];
    for (format, name, rows) in cases {
        let dataset = read_any(format, fixture(name), &ReadOptions::default())
            .unwrap_or_else(|e| panic!("{} failed: {}", format, e));
        assert_eq!(dataset.data.len(), rows, "row count for {}", format);
    }
}

#[test]
fn test_parse_any_honours_raw_names() {
    let content = std::fs::read_to_string(fixture("cams_radiation_1h.csv")).unwrap();

    let mapped = parse_any(FileFormat::Cams, &content, &ReadOptions::default()).unwrap();
    assert!(mapped.data.has_column("ghi"));

    let raw = parse_any(FileFormat::Cams, &content, &ReadOptions::raw_names()).unwrap();
    assert!(raw.data.has_column("GHI"));
    assert!(!raw.data.has_column("ghi"));
}

#[test]
fn test_parse_any_wrong_format_fails() {
    let content = std::fs::read_to_string(fixture("test_psm3_2017.csv")).unwrap();
    let err = parse_any(FileFormat::Epw, &content, &ReadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_read_any_missing_file_is_io_error() {
    let err = read_any(
        FileFormat::Tmy3,
        fixture("does-not-exist.csv"),
        &ReadOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_read_any_from_temp_file() {
    let file = create_temp_file_with_suffix(
        "Source,Time Zone\nNSRDB,0\nYear,Month,Day,Hour,Minute,GHI\n2017,1,1,0,0,5\n",
        ".csv",
    );
    let dataset = read_any(FileFormat::Psm3, file.path(), &ReadOptions::default()).unwrap();
    assert_eq!(dataset.data.float_values("ghi").unwrap(), &[Some(5.0)]);
}
