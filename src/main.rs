use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use rirdb::config::{Config, OutputConfig, OutputFormat};
use rirdb::config_loader::{self, CliOverrides};
use rirdb::country::CountryCodeTable;
use rirdb::loader::{BatchLoader, BulkInsert, JsonLinesWriter, LoadReport, SqlScriptWriter};
use rirdb::rir::{acquire_package, CacheDirFetcher, Package};

/// Load RIR delegation statistics into an IP range / country table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML answers file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file, overriding the answers file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verify and count records without writing any output
    #[arg(long)]
    scan_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Starting rirdb v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => config_loader::load_config(path)?,
        None => Config::default(),
    };
    config_loader::apply_overrides(
        &mut config,
        &CliOverrides {
            output: args.output.clone(),
        },
    )?;

    let countries = Arc::new(match &config.country_codes {
        Some(path) => CountryCodeTable::from_path(path)
            .wrap_err_with(|| format!("Failed to load country codes from '{}'", path.display()))?,
        None => CountryCodeTable::bundled().wrap_err("Failed to load bundled country codes")?,
    });
    info!("Loaded {} country codes", countries.len());

    let packages = acquire_and_scan(&config, &countries)?;
    let total: u64 = packages.iter().map(Package::total_record_count).sum();
    info!("{} records found in {} packages", total, packages.len());

    if args.scan_only {
        info!("Scan only requested, no output written");
        return Ok(());
    }

    let report = write_output(&config, &packages, &countries)?;

    info!("Output written to: {:?}", config.output.path);
    info!(
        "Load completed: {} records processed, {} confirmed, {} batches, {} lines skipped",
        report.processed, report.confirmed, report.batches, report.skipped_errors
    );
    Ok(())
}

/// Verify and pre-scan every configured registry, in configured order
fn acquire_and_scan(config: &Config, countries: &Arc<CountryCodeTable>) -> Result<Vec<Package>> {
    let policy = config.error_policy();
    let mut fetcher = CacheDirFetcher::new(&config.cache_dir);

    let mut packages = Vec::new();
    for dialect in config.dialects()? {
        let mut package = acquire_package(dialect, &mut fetcher)?;
        package
            .scan(countries, policy)
            .wrap_err_with(|| format!("Failed to scan package for {}", dialect.display_name))?;
        packages.push(package);
    }
    Ok(packages)
}

fn write_output(config: &Config, packages: &[Package], countries: &Arc<CountryCodeTable>) -> Result<LoadReport> {
    let output: &OutputConfig = &config.output;
    let file = File::create(&output.path)
        .wrap_err_with(|| format!("Failed to create output file '{}'", output.path.display()))?;
    let writer = BufWriter::new(file);

    let loader = BatchLoader::new(config.batch_size, config.error_policy())?;
    let mut sink: Box<dyn BulkInsert> = match output.format {
        OutputFormat::Sql => {
            let mut sql = SqlScriptWriter::new(writer, output.table.as_str());
            sql.write_preamble(output.drop_existing, output.create_table)
                .wrap_err("Failed to write table preamble")?;
            Box::new(sql)
        }
        OutputFormat::JsonLines => Box::new(JsonLinesWriter::new(writer)),
    };

    let report = loader.load(packages, countries, sink.as_mut(), |progress| {
        if progress.total > 0 {
            info!(
                "Loaded {} of {} records ({:.1}%)",
                progress.processed,
                progress.total,
                progress.processed as f64 * 100.0 / progress.total as f64
            );
        } else {
            info!("Loaded {} records", progress.processed);
        }
    })?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["rirdb", "--config", "rirdb.yaml"]);

        assert_eq!(args.config, Some(PathBuf::from("rirdb.yaml")));
        assert_eq!(args.output, None);
        assert!(!args.scan_only);
        assert!(!args.verbose);
    }

    #[test]
    fn test_scan_only_and_output_args() {
        let args = Args::parse_from(["rirdb", "--scan-only", "-v", "--output", "out.sql"]);

        assert_eq!(args.config, None);
        assert_eq!(args.output, Some(PathBuf::from("out.sql")));
        assert!(args.scan_only);
        assert!(args.verbose);
    }
}
