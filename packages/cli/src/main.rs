#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the casillas geocoder.
//!
//! `casillas prepare` enriches the nested JSON export, `casillas geocode`
//! resolves every casilla against Nominatim and writes a `GeoJSON`
//! `FeatureCollection`, and `casillas services` lists the configured
//! geocoding services.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use casillas_geo_address::query::QueryStrategy;
use casillas_geo_address::region::{DEFAULT_REGION, RegionProfile, builtin_ids};
use casillas_geo_cli_utils::{IndicatifProgress, MultiProgress};
use casillas_geo_geocoder::service_registry::{all_services, default_service, find};
use casillas_geo_io::output::write_feature_collection;
use casillas_geo_io::paths;
use casillas_geo_io::prepare::prepare;
use casillas_geo_io::records::{InputFormat, read_records};
use casillas_geo_io::sections::read_section_municipalities;
use casillas_geo_models::{GeocodeStatus, SectionMunicipalities};
use casillas_geo_resolve::engine::DEFAULT_RECORD_PAUSE;
use casillas_geo_resolve::engine_for_service;
use casillas_geo_resolve::pipeline::Pipeline;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "casillas",
    about = "Geocode polling-station (casilla) addresses into GeoJSON"
)]
struct Cli {
    /// Data directory holding `casillas/` inputs and outputs
    #[arg(long, global = true, env = "CASILLAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every casilla to a coordinate and write a `GeoJSON` file
    Geocode {
        /// Input file (default: `casillas/ubi_casillas_direcciones.csv`)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Input shape: csv, json, or geojson (default: from the extension)
        #[arg(long, value_parser = parse_input_format)]
        input_format: Option<InputFormat>,
        /// Output `GeoJSON` (default: `casillas/puntos_casillas.geojson`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Section -> municipality CSV. Missing is fatal when given here;
        /// the default `casillas/secciones_municipio.csv` is optional.
        #[arg(long)]
        municipalities: Option<PathBuf>,
        /// Built-in region id or path to a region profile TOML
        #[arg(long, default_value = DEFAULT_REGION)]
        region: String,
        /// Fallback order: `urban` (address first) or `rural` (locality first)
        #[arg(long, default_value = "urban", value_parser = parse_strategy)]
        strategy: QueryStrategy,
        /// Geocoding service id (default: highest-priority enabled service)
        #[arg(long)]
        service: Option<String>,
        /// Override the service's search endpoint
        #[arg(long, env = "CASILLAS_NOMINATIM_URL")]
        base_url: Option<String>,
        /// Pause between casillas in milliseconds
        #[arg(long, default_value_t = default_record_pause_ms())]
        record_pause_ms: u64,
    },
    /// Add DOMICILIO_LIMPIO / DOMICILIO_CORTO to the nested JSON export and
    /// write a skeleton `GeoJSON` for `geocode --input-format geojson`
    Prepare {
        /// Nested JSON (default: `casillas/casillas_min_por_seccion.json`)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Enriched JSON output
        #[arg(long)]
        enriched: Option<PathBuf>,
        /// Skeleton `GeoJSON` output
        #[arg(long)]
        skeleton: Option<PathBuf>,
    },
    /// List the configured geocoding services
    Services,
}

fn default_record_pause_ms() -> u64 {
    u64::try_from(DEFAULT_RECORD_PAUSE.as_millis()).unwrap_or(200)
}

fn parse_input_format(value: &str) -> Result<InputFormat, String> {
    value
        .parse()
        .map_err(|_| format!("unknown input format '{value}' (expected csv, json, or geojson)"))
}

fn parse_strategy(value: &str) -> Result<QueryStrategy, String> {
    value
        .parse()
        .map_err(|_| format!("unknown strategy '{value}' (expected urban or rural)"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = casillas_geo_cli_utils::init_logger();
    let cli = Cli::parse();
    let data = cli.data_dir.unwrap_or_else(paths::data_dir);

    match cli.command {
        Commands::Services => {
            println!("{:<18} {:<8} {:<6} URL", "ID", "ENABLED", "PRIO");
            println!("{}", "-".repeat(72));
            for service in &all_services() {
                println!(
                    "{:<18} {:<8} {:<6} {}",
                    service.id,
                    service.enabled,
                    service.priority,
                    service.base_url()
                );
            }
        }
        Commands::Prepare {
            input,
            enriched,
            skeleton,
        } => {
            let input = input.unwrap_or_else(|| paths::sections_json_path(&data));
            let enriched = enriched.unwrap_or_else(|| paths::enriched_json_path(&data));
            let skeleton = skeleton.unwrap_or_else(|| paths::skeleton_geojson_path(&data));

            log::info!("Preparing {}", input.display());
            let summary = prepare(&input, &enriched, &skeleton)?;
            log::info!(
                "Prepared {} casillas in {} sections:\n  enriched JSON: {}\n  skeleton GeoJSON: {}",
                summary.casillas,
                summary.sections,
                summary.enriched_path.display(),
                summary.skeleton_path.display()
            );
        }
        Commands::Geocode {
            input,
            input_format,
            output,
            municipalities,
            region,
            strategy,
            service,
            base_url,
            record_pause_ms,
        } => {
            let options = GeocodeOptions {
                input: input.unwrap_or_else(|| paths::records_csv_path(&data)),
                input_format,
                output: output.unwrap_or_else(|| paths::output_geojson_path(&data)),
                municipalities,
                default_municipalities: paths::municipalities_csv_path(&data),
                region,
                strategy,
                service,
                base_url,
                record_pause: Duration::from_millis(record_pause_ms),
            };
            geocode(&multi, options).await?;
        }
    }

    Ok(())
}

struct GeocodeOptions {
    input: PathBuf,
    input_format: Option<InputFormat>,
    output: PathBuf,
    municipalities: Option<PathBuf>,
    default_municipalities: PathBuf,
    region: String,
    strategy: QueryStrategy,
    service: Option<String>,
    base_url: Option<String>,
    record_pause: Duration,
}

async fn geocode(
    multi: &MultiProgress,
    options: GeocodeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    // Everything that can fail up front does so before the first lookup.
    let profile = load_region(&options.region)?;
    let municipalities =
        load_municipalities(options.municipalities.as_deref(), &options.default_municipalities)?;

    let format = options
        .input_format
        .or_else(|| InputFormat::from_path(&options.input))
        .unwrap_or(InputFormat::Csv);
    let records = read_records(&options.input, format)?;

    let pipeline =
        Pipeline::from_profile(&profile, options.strategy)?.with_municipalities(municipalities);

    let service = match options.service.as_deref() {
        Some(id) => find(id).ok_or_else(|| format!("Unknown geocoding service: {id}"))?,
        None => default_service()?,
    };
    let mut engine =
        engine_for_service(&service, options.base_url.as_deref(), options.record_pause)?;

    log::info!(
        "Region: {} ({}, {}), strategy: {}",
        profile.name,
        profile.state,
        profile.country,
        options.strategy
    );

    let progress = IndicatifProgress::casillas_bar(multi, "Geocoding casillas");
    let start = Instant::now();
    let report = pipeline.run(&mut engine, &records, &progress).await;
    let elapsed = start.elapsed();

    let tally = report.tally.clone();
    let cache = report.cache;
    write_feature_collection(&options.output, &report.into_collection())?;

    log::info!(
        "Geocoding complete in {:.1}s: {} OK, {} FAIL ({} SIN_MATCH, {} SIN_DIRECCION)",
        elapsed.as_secs_f64(),
        tally.ok,
        tally.fail,
        tally.count(GeocodeStatus::SinMatch),
        tally.count(GeocodeStatus::SinDireccion)
    );
    log::info!("Query cache: {cache}");
    log::info!("Output: {}", options.output.display());

    Ok(())
}

/// Loads a built-in profile by id, or a profile TOML from disk.
fn load_region(region: &str) -> Result<RegionProfile, Box<dyn std::error::Error>> {
    if let Some(profile) = RegionProfile::builtin(region) {
        return Ok(profile);
    }

    let path = Path::new(region);
    if path.is_file() {
        let text = std::fs::read_to_string(path)?;
        return Ok(RegionProfile::from_toml_str(&text)?);
    }

    Err(format!(
        "Unknown region '{region}': not a built-in profile ({}) or a file",
        builtin_ids().join(", ")
    )
    .into())
}

/// Reads the section table. An explicitly requested table must exist; the
/// default one is skipped with a warning when absent.
fn load_municipalities(
    requested: Option<&Path>,
    default: &Path,
) -> Result<SectionMunicipalities, Box<dyn std::error::Error>> {
    if let Some(path) = requested {
        return Ok(read_section_municipalities(path)?);
    }

    if default.is_file() {
        Ok(read_section_municipalities(default)?)
    } else {
        log::warn!(
            "No section -> municipality table at {}; municipalities come from addresses only",
            default.display()
        );
        Ok(SectionMunicipalities::new())
    }
}
