//! Application constants for solar data readers and fetchers
//!
//! Service endpoints, missing-value sentinels and the tables that map each
//! format's native column names to the crate's naming convention.

// =============================================================================
// Service Endpoints
// =============================================================================

pub mod urls {
    /// NSRDB PSM3 hourly/half-hourly download
    pub const PSM3: &str = "https://developer.nrel.gov/api/nsrdb/v2/solar/psm3-download.csv";

    /// NSRDB PSM3 typical-year download
    pub const PSM3_TMY: &str =
        "https://developer.nrel.gov/api/nsrdb/v2/solar/psm3-tmy-download.csv";

    /// NSRDB PSM3 5/15-minute download
    pub const PSM3_5MIN: &str =
        "https://developer.nrel.gov/api/nsrdb/v2/solar/psm3-5min-download.csv";

    /// PVGIS API root; endpoint names are appended
    pub const PVGIS: &str = "https://re.jrc.ec.europa.eu/api/";

    /// CAMS radiation service WPS endpoint
    pub const CAMS: &str = "https://api.soda-solardata.com/service/wps";

    /// BSRN station-to-archive files (HTTPS mirror)
    pub const BSRN: &str = "https://bsrn.awi.de/data/";

    /// University of Oregon SRML monthly files
    pub const SRML: &str = "http://solardata.uoregon.edu/download/Archive/";

    /// MIDC raw data API
    pub const MIDC_RAW: &str = "https://midcdmz.nrel.gov/apps/data_api.pl";

    /// ACIS web services root
    pub const ACIS: &str = "https://data.rcc-acis.org/";

    /// SolarAnywhere API root
    pub const SOLARANYWHERE: &str = "https://service.solaranywhere.com/api/v2";
}

// =============================================================================
// Defaults
// =============================================================================

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!("solar-iotools/", env!("CARGO_PKG_VERSION"));

/// Config directory name below the platform config dir
pub const CONFIG_DIR_NAME: &str = "solar-iotools";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "SOLAR_IOTOOLS_";

/// Bundled example data directory, relative to the crate root
pub const DATA_DIR_NAME: &str = "data";

/// Seconds between SolarAnywhere result polls
pub const SOLARANYWHERE_POLL_SECS: u64 = 5;

/// Default upper bound on SolarAnywhere result polling in seconds
pub const SOLARANYWHERE_MAX_RESPONSE_SECS: u64 = 300;

/// SolarAnywhere output fields requested when the caller gives none
pub const SOLARANYWHERE_DEFAULT_VARIABLES: &[&str] = &[
    "StartTime",
    "ObservationTime",
    "EndTime",
    "GlobalHorizontalIrradiance_WattsPerMeterSquared",
    "DirectNormalIrradiance_WattsPerMeterSquared",
    "DiffuseHorizontalIrradiance_WattsPerMeterSquared",
    "AmbientTemperature_DegreesC",
    "WindSpeed_MetersPerSecond",
    "Albedo_Unitless",
    "DataVersion",
];

/// PSM3 attributes requested when the caller gives none
pub const PSM3_DEFAULT_ATTRIBUTES: &[&str] = &[
    "air_temperature",
    "dew_point",
    "dhi",
    "dni",
    "ghi",
    "surface_albedo",
    "surface_pressure",
    "wind_direction",
    "wind_speed",
];

/// PSM3 averaging intervals in minutes
pub const PSM3_INTERVALS: &[u32] = &[5, 15, 30, 60];

// =============================================================================
// Missing-Value Sentinels
// =============================================================================

pub mod sentinels {
    pub const SURFRAD: &[f64] = &[-9999.9];
    pub const SOLRAD: &[f64] = &[-9999.9];
    pub const MIDC: &[f64] = &[-9900.0];
    pub const CRN: &[f64] = &[-99.0, -999.0, -9999.0, -99999.0];
    pub const BSRN: &[f64] = &[-999.0, -99.9];

    /// SRML flag marking its value as missing
    pub const SRML_MISSING_FLAG: i64 = 99;

    /// TMY2 source flag marking a missing value
    pub const TMY2_MISSING_SOURCE: &str = "?";

    /// Tolerance used when comparing a value against a sentinel
    pub const TOLERANCE: f64 = 1e-6;
}

// =============================================================================
// Variable Maps
// =============================================================================

/// Native column name to crate column name
pub type VariableMap = &'static [(&'static str, &'static str)];

pub mod variables {
    use super::VariableMap;

    pub const TMY3: VariableMap = &[
        ("GHI (W/m^2)", "ghi"),
        ("DNI (W/m^2)", "dni"),
        ("DHI (W/m^2)", "dhi"),
        ("ETR (W/m^2)", "ghi_extra"),
        ("ETRN (W/m^2)", "dni_extra"),
        ("Dry-bulb (C)", "temp_air"),
        ("Dew-point (C)", "temp_dew"),
        ("RHum (%)", "relative_humidity"),
        ("Pressure (mbar)", "pressure"),
        ("Wdir (degrees)", "wind_direction"),
        ("Wspd (m/s)", "wind_speed"),
        ("Alb (unitless)", "albedo"),
        ("Pwat (cm)", "precipitable_water"),
    ];

    pub const SURFRAD: VariableMap = &[
        ("zen", "solar_zenith"),
        ("dw_solar", "ghi"),
        ("dw_solar_flag", "ghi_flag"),
        ("direct_n", "dni"),
        ("direct_n_flag", "dni_flag"),
        ("diffuse", "dhi"),
        ("diffuse_flag", "dhi_flag"),
        ("temp", "temp_air"),
        ("temp_flag", "temp_air_flag"),
        ("windspd", "wind_speed"),
        ("windspd_flag", "wind_speed_flag"),
        ("winddir", "wind_direction"),
        ("winddir_flag", "wind_direction_flag"),
        ("rh", "relative_humidity"),
        ("rh_flag", "relative_humidity_flag"),
    ];

    pub const SOLRAD: VariableMap = &[
        ("zen", "solar_zenith"),
        ("dw_psp", "ghi"),
        ("qc_dwpsp", "ghi_flag"),
        ("direct", "dni"),
        ("qc_direct", "dni_flag"),
        ("diffuse", "dhi"),
        ("qc_diffuse", "dhi_flag"),
    ];

    pub const CRN: VariableMap = &[
        ("LONGITUDE", "longitude"),
        ("LATITUDE", "latitude"),
        ("AIR_TEMPERATURE", "temp_air"),
        ("SOLAR_RADIATION", "ghi"),
        ("SR_FLAG", "ghi_flag"),
        ("RELATIVE_HUMIDITY", "relative_humidity"),
        ("RH_FLAG", "relative_humidity_flag"),
        ("WIND_1_5", "wind_speed"),
        ("WIND_FLAG", "wind_speed_flag"),
    ];

    /// MIDC field name prefixes; the instrument name that follows is kept
    /// as a suffix
    pub const MIDC: VariableMap = &[
        ("Direct", "dni"),
        ("Global", "ghi"),
        ("Diffuse", "dhi"),
        ("Airmass", "airmass"),
        ("Azimuth Angle", "solar_azimuth"),
        ("Zenith Angle", "solar_zenith"),
    ];

    pub const PSM3: VariableMap = &[
        ("GHI", "ghi"),
        ("DHI", "dhi"),
        ("DNI", "dni"),
        ("Clearsky GHI", "ghi_clear"),
        ("Clearsky DHI", "dhi_clear"),
        ("Clearsky DNI", "dni_clear"),
        ("Temperature", "temp_air"),
        ("Dew Point", "temp_dew"),
        ("Relative Humidity", "relative_humidity"),
        ("Pressure", "pressure"),
        ("Wind Speed", "wind_speed"),
        ("Wind Direction", "wind_direction"),
        ("Surface Albedo", "albedo"),
        ("Precipitable Water", "precipitable_water"),
        ("Solar Zenith Angle", "solar_zenith"),
    ];

    pub const PVGIS: VariableMap = &[
        ("G(h)", "ghi"),
        ("Gb(n)", "dni"),
        ("Gd(h)", "dhi"),
        ("IR(h)", "ghi_infrared"),
        ("G(i)", "poa_global"),
        ("Gb(i)", "poa_direct"),
        ("Gd(i)", "poa_diffuse"),
        ("Gr(i)", "poa_ground_diffuse"),
        ("H_sun", "solar_elevation"),
        ("T2m", "temp_air"),
        ("RH", "relative_humidity"),
        ("SP", "pressure"),
        ("WS10m", "wind_speed"),
        ("WD10m", "wind_direction"),
    ];

    pub const CAMS: VariableMap = &[
        ("TOA", "ghi_extra"),
        ("Clear sky GHI", "ghi_clear"),
        ("Clear sky BHI", "bhi_clear"),
        ("Clear sky DHI", "dhi_clear"),
        ("Clear sky BNI", "dni_clear"),
        ("GHI", "ghi"),
        ("BHI", "bhi"),
        ("DHI", "dhi"),
        ("BNI", "dni"),
        ("sza", "solar_zenith"),
    ];

    pub const SOLARANYWHERE: VariableMap = &[
        ("Global Horizontal Irradiance (GHI) W/m2", "ghi"),
        ("GlobalHorizontalIrradiance_WattsPerMeterSquared", "ghi"),
        ("DirectNormalIrradiance_WattsPerMeterSquared", "dni"),
        ("Direct Normal Irradiance (DNI) W/m2", "dni"),
        ("Diffuse Horizontal Irradiance (DIF) W/m2", "dhi"),
        ("DiffuseHorizontalIrradiance_WattsPerMeterSquared", "dhi"),
        ("AmbientTemperature (deg C)", "temp_air"),
        ("AmbientTemperature_DegreesC", "temp_air"),
        ("WindSpeed (m/s)", "wind_speed"),
        ("WindSpeed_MetersPerSecond", "wind_speed"),
        ("Relative Humidity (%)", "relative_humidity"),
        ("RelativeHumidity_Percent", "relative_humidity"),
        ("Clear Sky GHI", "ghi_clear"),
        ("ClearSkyGHI_WattsPerMeterSquared", "ghi_clear"),
        ("Clear Sky DNI", "dni_clear"),
        ("ClearSkyDNI_WattsPerMeterSquared", "dni_clear"),
        ("Clear Sky DHI", "dhi_clear"),
        ("ClearSkyDHI_WattsPerMeterSquared", "dhi_clear"),
        ("Albedo", "albedo"),
        ("Albedo_Unitless", "albedo"),
    ];

    pub const ACIS: VariableMap = &[
        ("pcpn", "precipitation"),
        ("maxt", "temp_air_max"),
        ("mint", "temp_air_min"),
        ("avgt", "temp_air_average"),
        ("cdd", "cooling_degree_days"),
        ("hdd", "heating_degree_days"),
        ("gdd", "growing_degree_days"),
        ("snow", "snowfall"),
        ("snwd", "snowdepth"),
    ];

    /// SRML element code prefixes
    pub const SRML_ELEMENTS: VariableMap = &[
        ("100", "ghi"),
        ("201", "dni"),
        ("300", "dhi"),
        ("920", "wind_dir"),
        ("921", "wind_speed"),
        ("930", "temp_air"),
        ("931", "temp_dew"),
        ("933", "relative_humidity"),
        ("937", "temp_cell"),
    ];
}

/// Look up a native name in a variable map
pub fn lookup_variable(map: VariableMap, name: &str) -> Option<&'static str> {
    map.iter().find(|(from, _)| *from == name).map(|(_, to)| *to)
}

// =============================================================================
// Timezone Abbreviations
// =============================================================================

/// Fixed UTC offsets in hours for the abbreviations MIDC and similar
/// feeds use as column labels
pub const TIMEZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
    ("AKST", -9),
    ("AKDT", -8),
    ("HST", -10),
];

/// UTC offset in hours of a timezone abbreviation
pub fn timezone_offset_hours(abbreviation: &str) -> Option<i32> {
    TIMEZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation.trim()))
        .map(|(_, hours)| *hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_variable() {
        assert_eq!(lookup_variable(variables::TMY3, "GHI (W/m^2)"), Some("ghi"));
        assert_eq!(lookup_variable(variables::PVGIS, "Gb(n)"), Some("dni"));
        assert_eq!(lookup_variable(variables::PVGIS, "Int"), None);
    }

    #[test]
    fn test_timezone_offsets() {
        assert_eq!(timezone_offset_hours("PST"), Some(-8));
        assert_eq!(timezone_offset_hours("mst"), Some(-7));
        assert_eq!(timezone_offset_hours("XYZ"), None);
    }

    #[test]
    fn test_psm3_intervals_include_hourly() {
        assert!(PSM3_INTERVALS.contains(&60));
        assert!(!PSM3_INTERVALS.contains(&10));
    }
}
