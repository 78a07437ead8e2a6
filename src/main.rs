use admission_percentile::analyzer::MatchSummary;
use admission_percentile::history::{EvictionSummary, MergeOutcome};
use admission_percentile::{telemetry, Config, Pipeline};
use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::Path;

fn cli() -> Command {
    Command::new("admission-percentile")
        .version("1.0")
        .about("Normalizes admission cut-offs, resolves cohort percentiles and maintains the historical archive")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml")
                .global(true),
        )
        .arg(
            Arg::new("year")
                .short('y')
                .long("year")
                .value_name("YEAR")
                .help("Admission year being processed (overrides current_year)")
                .value_parser(value_parser!(u32))
                .global(true),
        )
        .arg(
            Arg::new("keep")
                .short('k')
                .long("keep")
                .value_name("YEARS")
                .help("Number of most recent years kept in the archive (overrides years_to_keep)")
                .value_parser(value_parser!(u32))
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(Command::new("import-exam").about("Convert the exam results CSV into the department dataset"))
        .subcommand(
            Command::new("import-distribution")
                .about("Convert the score distribution CSV into percentile tables"),
        )
        .subcommand(Command::new("extract-schools").about("Extract school regions from listing pages"))
        .subcommand(Command::new("match").about("Match departments to subject groups and percentiles"))
        .subcommand(Command::new("archive").about("Merge the matched output into the historical archive"))
        .subcommand(Command::new("run").about("Import, match and archive in one pass"))
}

fn load_config(matches: &ArgMatches) -> Result<Option<Config>> {
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    if !Path::new(config_file).exists() {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default()
            .save_to_file(config_file)
            .with_context(|| format!("writing default configuration to {}", config_file))?;
        println!("⚠️  Please edit {} (current_year and paths), then run the program again.", config_file);
        return Ok(None);
    }

    let mut config = Config::load_from_file(config_file)
        .with_context(|| format!("loading configuration from {}", config_file))?;
    if let Some(year) = matches.get_one::<u32>("year") {
        config.current_year = *year;
    }
    if let Some(keep) = matches.get_one::<u32>("keep") {
        config.years_to_keep = *keep;
    }
    config.validate()?;
    Ok(Some(config))
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let Some(config) = load_config(&matches)? else {
        return Ok(());
    };
    telemetry::init(&config.log_level)?;

    let pipeline = Pipeline::new(&config);

    match matches.subcommand_name() {
        Some("import-exam") => {
            let summary = pipeline
                .import_exam_results()
                .context("exam results import failed")?;
            println!(
                "✅ Imported {} of {} departments ({} skipped, {} kept raw) -> {}",
                summary.imported,
                summary.rows_read,
                summary.skipped,
                summary.unnormalized,
                config.paths.department_data.display()
            );
        }
        Some("import-distribution") => {
            let summary = pipeline
                .import_distribution()
                .context("score distribution import failed")?;
            println!(
                "✅ Imported {} rows into {} groups ({} skipped) -> {}",
                summary.rows_imported,
                summary.groups,
                summary.rows_skipped,
                config.paths.score_distribution.display()
            );
        }
        Some("extract-schools") => {
            let count = pipeline
                .extract_school_regions()
                .context("school region extraction failed")?;
            println!(
                "✅ Extracted {} schools -> {}",
                count,
                config.paths.school_regions.display()
            );
        }
        Some("match") => {
            let (_, summary) = pipeline.match_departments().context("matching failed")?;
            print_match_summary(&summary);
            println!("📄 Matched output: {}", config.paths.matched_output.display());
        }
        Some("archive") => {
            let (outcome, eviction) = pipeline
                .archive_matched_output()
                .context("archive update failed")?;
            print_archive_summary(&config, outcome, eviction);
        }
        Some("run") => {
            let report = pipeline.run().context("pipeline run failed")?;
            if let Some(import) = report.exam_import {
                println!(
                    "📥 Exam results: {} imported, {} skipped",
                    import.imported, import.skipped
                );
            }
            if let Some(import) = report.distribution_import {
                println!("📥 Score distribution: {} groups", import.groups);
            }
            print_match_summary(&report.matching);
            if let Some(outcome) = report.merge {
                print_archive_summary(&config, outcome, report.eviction);
            }
        }
        _ => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}

fn print_match_summary(summary: &MatchSummary) {
    println!("\n📊 MATCH SUMMARY");
    println!("================");
    println!("   Departments: {}", summary.departments);
    println!("   ✅ Matched to a subject group: {}", summary.matched_groups);
    println!("   📈 Percentile resolved: {}", summary.resolved_percentiles);
    println!("   ❓ Without a group: {}", summary.unmatched());
}

fn print_archive_summary(config: &Config, outcome: MergeOutcome, eviction: Option<EvictionSummary>) {
    match outcome {
        MergeOutcome::Merged { departments } => {
            println!(
                "🗂️  Merged {} departments as year {} into {}",
                departments,
                config.current_year,
                config.paths.historical_archive.display()
            );
        }
        MergeOutcome::Skipped => {
            println!("⚠️  No department data for year {}, archive left untouched", config.current_year);
        }
    }
    if let Some(eviction) = eviction {
        println!(
            "🧹 Removed {} entries older than {}",
            eviction.removed_entries, eviction.min_year_kept
        );
    }
}
