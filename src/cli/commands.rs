//! Command implementations for the solar-iotools CLI
//!
//! This module contains the command execution logic, progress reporting
//! and result summaries. Library errors are wrapped with `anyhow` context
//! naming the file or service involved.

use crate::app::models::{AcisStation, Dataset, HorizonProfile, Location, TimeSeries};
use crate::app::services::dataset_writer::{write_dataframe, write_dataset};
use crate::app::services::example_data::{
    example_data_dir, find_example_dataset, list_example_datasets,
};
use crate::app::services::format_readers::{BsrnOptions, FileFormat, ReadOptions, read_any};
use crate::app::services::remote_fetchers::{
    AcisGridRequest, AcisStationRequest, AcisStationsRequest, BsrnRequest, CamsRequest, Fetcher,
    MidcRawRequest, Psm3Request, PvgisHourlyRequest, PvgisTmyRequest, SolarAnywhereRequest,
    SrmlRequest,
};
use crate::cli::args::{
    Args, Commands, ExampleArgs, FetchArgs, FetchService, FormatChoice, OutputFormat, ReadArgs,
};
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::{Column, DataFrame};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Services reachable through `fetch`, with a short description
const SERVICES: &[(&str, &str)] = &[
    ("psm3", "NREL NSRDB PSM3 (historical years and typical years)"),
    ("pvgis-tmy", "PVGIS typical meteorological year"),
    ("pvgis-hourly", "PVGIS hourly radiation and PV output"),
    ("pvgis-horizon", "PVGIS horizon profile"),
    ("bsrn", "BSRN station-to-archive files (account required)"),
    ("cams", "CAMS radiation service and McClear clear-sky (SoDa account)"),
    ("srml", "University of Oregon SRML archive"),
    ("midc-raw", "NREL MIDC raw data API"),
    ("acis-grid", "ACIS PRISM, NRCC and MPE gridded daily data"),
    ("acis-station", "ACIS daily station observations"),
    ("acis-stations", "ACIS station search by bounding box"),
    ("solaranywhere", "SolarAnywhere historical and typical years (API key)"),
];

/// Result of a fetch, by shape
#[derive(Debug)]
enum FetchOutcome {
    Table(Dataset),
    Horizon(HorizonProfile),
    Stations(Vec<AcisStation>),
}

/// Main command runner
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    let config = load_configuration(&args)?;
    let Some(command) = args.command.clone() else {
        bail!("no command given, see --help");
    };

    match command {
        Commands::Read(read) => run_read(&args, &config, &read),
        Commands::Fetch(fetch) => run_fetch(&args, &config, &fetch).await,
        Commands::Formats => {
            print_formats(args.output_format)?;
            Ok(())
        }
        Commands::Example(example) => run_example(&args, &config, &example),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("solar_iotools={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration: defaults, file, then environment
fn load_configuration(args: &Args) -> Result<Config> {
    let config = Config::load(args.config_file.as_deref()).with_context(|| {
        match &args.config_file {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "failed to load configuration".to_string(),
        }
    })?;
    debug!("Loaded configuration: {:?}", config.network);
    Ok(config)
}

fn spinner(args: &Args, message: String) -> Option<ProgressBar> {
    if !args.show_progress() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

// =============================================================================
// read
// =============================================================================

/// Expand a glob pattern, or pass a plain path through unchanged
fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }
    let mut paths = glob::glob(pattern)
        .with_context(|| format!("invalid glob pattern '{}'", pattern))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("cannot expand '{}'", pattern))?;
    paths.sort();
    if paths.is_empty() {
        bail!("no files match '{}'", pattern);
    }
    Ok(paths)
}

fn resolve_format(choice: FormatChoice, path: &Path) -> Result<FileFormat> {
    match choice {
        FormatChoice::Named(format) => Ok(format),
        FormatChoice::Auto => FileFormat::from_path(path).ok_or_else(|| {
            anyhow!(
                "cannot detect the format of {}, name it explicitly (see `solar-iotools formats`)",
                path.display()
            )
        }),
    }
}

fn run_read(args: &Args, config: &Config, read: &ReadArgs) -> Result<()> {
    let start_time = Instant::now();
    let paths = resolve_inputs(&read.input)?;
    let options = ReadOptions {
        map_variables: !read.raw_names,
        coerce_year: read.coerce_year,
    };

    let progress = if args.show_progress() && paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let mut combined = Dataset::default();
    let mut formats = Vec::new();
    for path in &paths {
        let format = resolve_format(read.format, path)?;
        if let Some(pb) = &progress {
            pb.set_message(format!("{}", path.display()));
        }
        let dataset = read_any(format, path, &options)
            .with_context(|| format!("failed to read {} as {}", path.display(), format))?;
        combined
            .append(dataset)
            .with_context(|| format!("cannot concatenate {}", path.display()))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    info!(
        "Read {} files in {:.2?}",
        paths.len(),
        start_time.elapsed()
    );

    let title = match paths.as_slice() {
        [single] => single.display().to_string(),
        many => format!("{} ({} files)", read.input, many.len()),
    };
    let location = match formats.as_slice() {
        [FileFormat::Tmy2 | FileFormat::Tmy3] => Location::from_tmy(&combined.metadata).ok(),
        [FileFormat::Epw] => Location::from_epw(&combined.metadata).ok(),
        _ => None,
    };
    report_dataset(args.output_format, &title, &combined, location.as_ref())?;

    if let Some(output) = &read.output {
        write_dataset(&combined, output, &config.output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        report_written(args, output);
    }
    Ok(())
}

// =============================================================================
// fetch
// =============================================================================

/// Flag value, else configured value, else an error naming both
fn credential(
    flag: &Option<String>,
    configured: &Option<String>,
    what: &str,
    env: &str,
) -> Result<String> {
    flag.clone()
        .or_else(|| configured.clone())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} is required: pass it as a flag, set {} or add it to the config file", what, env))
}

async fn run_fetch(args: &Args, config: &Config, fetch: &FetchArgs) -> Result<()> {
    let fetcher = Fetcher::new(config).context("failed to set up the HTTP client")?;
    let (name, outcome) = {
        let name = service_name(&fetch.service);
        let pb = spinner(args, format!("Fetching from {}", name));
        let outcome = fetch_service(&fetcher, config, fetch).await;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        (name, outcome.with_context(|| format!("{} request failed", name))?)
    };

    match &outcome {
        FetchOutcome::Table(dataset) => report_dataset(args.output_format, name, dataset, None)?,
        FetchOutcome::Horizon(profile) => report_horizon(args.output_format, profile)?,
        FetchOutcome::Stations(stations) => report_stations(args.output_format, stations)?,
    }

    if let Some(output) = &fetch.output {
        match outcome {
            FetchOutcome::Table(dataset) => write_dataset(&dataset, output, &config.output),
            FetchOutcome::Horizon(profile) => horizon_frame(&profile)
                .and_then(|mut frame| write_dataframe(&mut frame, output, &config.output).map(|_| ())),
            FetchOutcome::Stations(stations) => stations_frame(&stations)
                .and_then(|mut frame| write_dataframe(&mut frame, output, &config.output).map(|_| ())),
        }
        .with_context(|| format!("failed to write {}", output.display()))?;
        report_written(args, output);
    }
    Ok(())
}

fn service_name(service: &FetchService) -> &'static str {
    match service {
        FetchService::Psm3 { .. } => "PSM3",
        FetchService::PvgisTmy { .. } => "PVGIS TMY",
        FetchService::PvgisHourly { .. } => "PVGIS hourly",
        FetchService::PvgisHorizon { .. } => "PVGIS horizon",
        FetchService::Bsrn { .. } => "BSRN",
        FetchService::Cams { .. } => "CAMS",
        FetchService::Srml { .. } => "SRML",
        FetchService::MidcRaw { .. } => "MIDC",
        FetchService::AcisGrid { .. } => "ACIS grid",
        FetchService::AcisStation { .. } => "ACIS station",
        FetchService::AcisStations { .. } => "ACIS station search",
        FetchService::Solaranywhere { .. } => "SolarAnywhere",
    }
}

async fn fetch_service(fetcher: &Fetcher, config: &Config, fetch: &FetchArgs) -> Result<FetchOutcome> {
    let credentials = &config.credentials;
    let map_variables = !fetch.raw_names;

    let outcome = match &fetch.service {
        FetchService::Psm3 {
            point,
            names,
            interval,
            attributes,
            leap_day,
            utc,
            api_key,
            email,
        } => {
            let api_key = credential(api_key, &credentials.nrel_api_key, "an NREL API key", "NREL_API_KEY")?;
            let email = credential(email, &credentials.nrel_email, "an NREL account email", "SOLAR_IOTOOLS_NREL_EMAIL")?;
            let mut request = Psm3Request::new(point.latitude, point.longitude, api_key, email)
                .with_names(names.as_str())
                .with_interval(*interval);
            if let Some(list) = attributes {
                request.attributes = list.split(',').map(|a| a.trim().to_string()).collect();
            }
            request.leap_day = *leap_day;
            request.utc = *utc;
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_psm3(&request).await?)
        }
        FetchService::PvgisTmy {
            point,
            format,
            no_horizon,
            userhorizon,
            startyear,
            endyear,
        } => {
            let mut request =
                PvgisTmyRequest::new(point.latitude, point.longitude).with_format(*format);
            request.usehorizon = !no_horizon;
            request.userhorizon = userhorizon.clone();
            request.startyear = *startyear;
            request.endyear = *endyear;
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_pvgis_tmy(&request).await?)
        }
        FetchService::PvgisHourly {
            point,
            surface_tilt,
            surface_azimuth,
            format,
            start,
            end,
            raddatabase,
            pvcalculation,
            peakpower,
            loss,
            trackingtype,
            optimal_surface_tilt,
            optimalangles,
            no_components,
        } => {
            let mut request = PvgisHourlyRequest::new(point.latitude, point.longitude);
            request.surface_tilt = *surface_tilt;
            request.surface_azimuth = *surface_azimuth;
            request.format = *format;
            request.start = *start;
            request.end = *end;
            request.raddatabase = raddatabase.clone();
            request.pvcalculation = *pvcalculation;
            request.peakpower = *peakpower;
            request.loss = *loss;
            request.trackingtype = *trackingtype;
            request.optimal_surface_tilt = *optimal_surface_tilt;
            request.optimalangles = *optimalangles;
            request.components = !no_components;
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_pvgis_hourly(&request).await?)
        }
        FetchService::PvgisHorizon { point } => FetchOutcome::Horizon(
            fetcher
                .get_pvgis_horizon(point.latitude, point.longitude)
                .await?,
        ),
        FetchService::Bsrn {
            station,
            range,
            username,
            password,
            records,
        } => {
            let username = credential(username, &credentials.bsrn_username, "a BSRN username", "SOLAR_IOTOOLS_BSRN_USERNAME")?;
            let password = credential(password, &credentials.bsrn_password, "a BSRN password", "SOLAR_IOTOOLS_BSRN_PASSWORD")?;
            let mut request = BsrnRequest::new(station.as_str(), range.start, range.end, username, password);
            if let Some(records) = records {
                request.options = BsrnOptions {
                    logical_records: records.clone(),
                };
            }
            FetchOutcome::Table(fetcher.get_bsrn(&request).await?)
        }
        FetchService::Cams {
            point,
            range,
            identifier,
            time_step,
            time_ref,
            altitude,
            integrated,
            label,
            email,
        } => {
            let email = credential(email, &credentials.cams_email, "a SoDa account email", "SOLAR_IOTOOLS_CAMS_EMAIL")?;
            let mut request =
                CamsRequest::new(point.latitude, point.longitude, range.start, range.end, email);
            request.identifier = *identifier;
            request.time_step = *time_step;
            request.time_ref = (*time_ref).into();
            request.altitude = *altitude;
            request.integrated = *integrated;
            request.label = (*label).into();
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_cams(&request).await?)
        }
        FetchService::Srml {
            station,
            range,
            filetype,
        } => {
            let mut request = SrmlRequest::new(station.as_str(), range.start, range.end)
                .with_filetype(filetype.as_str());
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_srml(&request).await?)
        }
        FetchService::MidcRaw { site, range } => {
            let mut request = MidcRawRequest::new(site.as_str(), range.start, range.end);
            request.options.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_midc_raw(&request).await?)
        }
        FetchService::AcisGrid {
            product,
            point,
            range,
        } => {
            let mut request = AcisGridRequest::new(
                point.latitude,
                point.longitude,
                range.start,
                range.end,
                *product,
            );
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_acis_grid(&request).await?)
        }
        FetchService::AcisStation {
            station,
            range,
            trace_value,
        } => {
            let mut request = AcisStationRequest::new(station.as_str(), range.start, range.end);
            request.trace_value = *trace_value;
            request.map_variables = map_variables;
            FetchOutcome::Table(fetcher.get_acis_station_data(&request).await?)
        }
        FetchService::AcisStations {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            start,
            end,
        } => {
            let mut request = AcisStationsRequest::new((*lat_min, *lat_max), (*lon_min, *lon_max));
            if let (Some(start), Some(end)) = (start, end) {
                request = request.with_dates(*start, *end);
            }
            FetchOutcome::Stations(fetcher.get_acis_available_stations(&request).await?)
        }
        FetchService::Solaranywhere {
            point,
            start,
            end,
            source,
            time_resolution,
            probability_of_exceedance,
            true_dynamics,
            api_key,
            max_response_time,
        } => {
            let api_key = credential(api_key, &credentials.solaranywhere_api_key, "a SolarAnywhere API key", "SOLAR_IOTOOLS_SOLARANYWHERE_API_KEY")?;
            let mut request = SolarAnywhereRequest::new(point.latitude, point.longitude, api_key)
                .with_source(source.as_str());
            if let (Some(start), Some(end)) = (start, end) {
                request = request.with_range(*start, *end);
            }
            request.time_resolution_minutes = *time_resolution;
            request.probability_of_exceedance = *probability_of_exceedance;
            request.true_dynamics = *true_dynamics;
            request.map_variables = map_variables;
            if let Some(secs) = max_response_time {
                request.max_response_time = Duration::from_secs(*secs);
            }
            FetchOutcome::Table(fetcher.get_solaranywhere(&request).await?)
        }
    };
    Ok(outcome)
}

fn horizon_frame(profile: &HorizonProfile) -> crate::Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new("azimuth".into(), profile.azimuth.as_slice()),
        Column::new("elevation".into(), profile.elevation.as_slice()),
    ])?)
}

fn stations_frame(stations: &[AcisStation]) -> crate::Result<DataFrame> {
    let names: Vec<&str> = stations.iter().map(|s| s.name.as_str()).collect();
    let sids: Vec<String> = stations.iter().map(|s| s.sids.join(" ")).collect();
    let states: Vec<Option<&str>> = stations.iter().map(|s| s.state.as_deref()).collect();
    let latitudes: Vec<Option<f64>> = stations.iter().map(|s| s.latitude).collect();
    let longitudes: Vec<Option<f64>> = stations.iter().map(|s| s.longitude).collect();
    let elevations: Vec<Option<f64>> = stations.iter().map(|s| s.elevation).collect();
    let uids: Vec<Option<i64>> = stations.iter().map(|s| s.uid).collect();
    Ok(DataFrame::new(vec![
        Column::new("name".into(), names),
        Column::new("sids".into(), sids),
        Column::new("state".into(), states),
        Column::new("latitude".into(), latitudes),
        Column::new("longitude".into(), longitudes),
        Column::new("elevation".into(), elevations),
        Column::new("uid".into(), uids),
    ])?)
}

// =============================================================================
// formats / example
// =============================================================================

fn print_formats(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let formats: Vec<Value> = FileFormat::ALL
                .iter()
                .map(|f| json!({"name": f.name(), "description": f.description()}))
                .collect();
            let services: Vec<Value> = SERVICES
                .iter()
                .map(|(name, description)| json!({"name": name, "description": description}))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"formats": formats, "services": services}))?
            );
        }
        OutputFormat::Human => {
            println!("{}", "File formats (read)".bold());
            for f in FileFormat::ALL {
                println!("  {:<15} {}", f.name().cyan(), f.description());
            }
            println!("  {:<15} detect from extension (.epw, .tm2, .json)", "auto".cyan());
            println!();
            println!("{}", "Services (fetch)".bold());
            for (name, description) in SERVICES {
                println!("  {:<15} {}", name.cyan(), description);
            }
        }
    }
    Ok(())
}

fn run_example(args: &Args, config: &Config, example: &ExampleArgs) -> Result<()> {
    let dir = config.data_dir.clone().unwrap_or_else(example_data_dir);
    match &example.name {
        Some(name) => {
            let path = find_example_dataset(&dir, name)
                .with_context(|| format!("no example dataset named '{}'", name))?;
            match args.output_format {
                OutputFormat::Json => println!("{}", json!({"name": name, "path": path})),
                OutputFormat::Human => println!("{}", path.display()),
            }
        }
        None => {
            let names = list_example_datasets(&dir)
                .with_context(|| format!("cannot list {}", dir.display()))?;
            match args.output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                OutputFormat::Human => {
                    println!("{} {}", "Example datasets in".bold(), dir.display());
                    for name in names {
                        println!("  {}", name);
                    }
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Reports
// =============================================================================

fn series_summary(series: &TimeSeries) -> Value {
    let columns: Vec<Value> = series
        .columns()
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "dtype": c.data.dtype(),
                "missing": c.data.missing_count(),
            })
        })
        .collect();
    let (start, end) = match series.time_range() {
        Some((start, end)) => (Some(start.to_string()), Some(end.to_string())),
        None => (None, None),
    };
    json!({
        "rows": series.len(),
        "start": start,
        "end": end,
        "utc_offset": series.offset().map(|o| o.to_string()),
        "columns": columns,
    })
}

fn report_dataset(
    format: OutputFormat,
    title: &str,
    dataset: &Dataset,
    location: Option<&Location>,
) -> Result<()> {
    if format == OutputFormat::Json {
        let mut summary = series_summary(&dataset.data);
        summary["source"] = json!(title);
        summary["metadata"] = serde_json::to_value(&dataset.metadata)?;
        if let Some(location) = location {
            summary["location"] = serde_json::to_value(location)?;
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let series = &dataset.data;
    println!("{}", title.green().bold());
    println!("  {:<10} {}", "Rows:".cyan(), series.len());
    if let Some((start, end)) = series.time_range() {
        let zone = series
            .offset()
            .map_or_else(|| "no offset".to_string(), |o| format!("UTC{}", o));
        println!("  {:<10} {} to {} ({})", "Period:".cyan(), start, end, zone);
    }
    println!("  {:<10}", "Columns:".cyan());
    for column in series.columns() {
        let missing = column.data.missing_count();
        let note = if missing > 0 {
            format!("{} missing", missing).yellow().to_string()
        } else {
            String::new()
        };
        println!("    {:<40} {:<4} {}", column.name, column.data.dtype(), note);
    }
    if !dataset.metadata.is_empty() {
        println!("  {:<10}", "Metadata:".cyan());
        for (key, value) in dataset.metadata.iter() {
            println!("    {:<24} {}", key, value);
        }
    }
    if let Some(location) = location {
        println!(
            "  {:<10} {:.4}, {:.4}, {} m, UTC{:+}",
            "Location:".cyan(),
            location.latitude(),
            location.longitude(),
            location.elevation(),
            location.tz_hours()
        );
    }
    Ok(())
}

fn report_horizon(format: OutputFormat, profile: &HorizonProfile) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }
    println!("{} ({} points)", "Horizon profile".green().bold(), profile.len());
    for (azimuth, elevation) in profile.points() {
        println!("  {:>7.1}  {:>6.2}", azimuth, elevation);
    }
    Ok(())
}

fn report_stations(format: OutputFormat, stations: &[AcisStation]) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(stations)?);
        return Ok(());
    }
    println!("{} ({})", "ACIS stations".green().bold(), stations.len());
    for station in stations {
        let position = match (station.latitude, station.longitude) {
            (Some(lat), Some(lon)) => format!("{:.4}, {:.4}", lat, lon),
            _ => "unknown position".to_string(),
        };
        println!(
            "  {:<32} {:<3} {:<22} {}",
            station.name,
            station.state.as_deref().unwrap_or("-"),
            position,
            station.sids.first().map(String::as_str).unwrap_or("")
        );
    }
    Ok(())
}

fn report_written(args: &Args, output: &Path) {
    info!("Wrote {}", output.display());
    if args.show_progress() {
        println!("{} {}", "Wrote".green(), output.display());
    }
}
