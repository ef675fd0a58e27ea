use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use chart_trends::aggregate::compute_reports;
use chart_trends::clean::clean_with_stats;
use chart_trends::error::Stage;
use chart_trends::loader::load_csv;
use chart_trends::models::{PipelineStats, SliceSize};
use chart_trends::progress::{create_progress_bar, format_duration, set_log_only, StageProgress};
use chart_trends::safety::validate_output_path;
use chart_trends::slice::slice_by_countries;
use chart_trends::store::{
    country_table_names, IfExists, Store, ARTIST_REACH_TABLE, ARTIST_TIERS_TABLE, CLEANED_TABLE,
    NUMBER_ONE_GENRES_TABLE, POPULAR_ARTISTS_TABLE, TOP_GENRES_TABLE,
};

const DEFAULT_COUNTRIES: &str = "Spain,South Africa,Japan,United States";

#[derive(Parser)]
#[command(name = "chart-trends")]
#[command(about = "Clean per-country Top 50 chart data and compute cross-country reports")]
struct Args {
    /// Chart CSV with Country, Rank, Title, Artists and Genre columns
    source: PathBuf,

    /// SQLite database to write (.sqlite3, .sqlite or .db)
    output: PathBuf,

    /// Countries to slice and report on (comma-separated, case-insensitive)
    #[arg(long, default_value = DEFAULT_COUNTRIES)]
    countries: String,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Write pipeline statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide spinners and report progress through the log only
    #[arg(long)]
    log_only: bool,

    /// Append to existing tables instead of replacing them
    #[arg(long)]
    append: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    validate_output_path(&args.output, &[args.source.as_path()])?;

    let countries: Vec<String> = args
        .countries
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    info!("Reporting on countries: {:?}", countries);

    let if_exists = if args.append { IfExists::Append } else { IfExists::Replace };
    let start = Instant::now();
    let mut stats = PipelineStats::default();

    // Phase 1: load
    let progress = StageProgress::start(Stage::Loader, "Phase 1: Loading CSV");
    let dataset = load_csv(&args.source)
        .with_context(|| format!("Failed to load chart data from {:?}", args.source))?;
    stats.records_loaded = dataset.len();
    progress.finish(&format!("Loaded {} records", dataset.len()));

    // Phase 2: clean
    let progress = StageProgress::start(Stage::Cleaner, "Phase 2: Cleaning records");
    let (cleaned, cleaning) = clean_with_stats(&dataset);
    drop(dataset);
    progress.finish(&format!(
        "{} records kept, {} duplicates removed",
        cleaning.output_records, cleaning.duplicates_removed
    ));
    stats.cleaning = cleaning;

    // Phase 3: slice
    let progress = StageProgress::start(Stage::Slicer, "Phase 3: Slicing countries");
    let slices = slice_by_countries(&cleaned, &countries);
    stats.slices = slices
        .iter()
        .map(|s| SliceSize {
            country: s.country.clone(),
            records: s.len(),
        })
        .collect();
    progress.finish(&format!("Sliced {} countries", slices.len()));

    // Phase 4: reports
    let progress = StageProgress::start(Stage::Aggregator, "Phase 4: Computing reports");
    let reports = compute_reports(&slices);
    stats.top_genre_rows = reports.top_genres.len();
    stats.number_one_genre_rows = reports.number_one_genres.len();
    stats.artist_reach_rows = reports.artist_reach.len();
    stats.popular_artist_rows = reports.popular_artists.len();
    progress.finish("Reports ready");

    // Phase 5: persist
    let mut store = Store::open(&args.output)
        .with_context(|| format!("Failed to open output database {:?}", args.output))?;

    let slice_tables = country_table_names(&slices.countries());
    let pb = create_progress_bar(
        (1 + slice_tables.len() + 5) as u64,
        "Phase 5: Writing tables",
    );
    let mut tables_written = 0;

    store
        .save_table(CLEANED_TABLE, &cleaned, if_exists)
        .with_context(|| format!("Failed to save {}", CLEANED_TABLE))?;
    tables_written += 1;
    pb.inc(1);

    for (slice, table) in slices.iter().zip(&slice_tables) {
        store
            .save_table(table, &slice.records, if_exists)
            .with_context(|| format!("Failed to save slice for {} as {}", slice.country, table))?;
        tables_written += 1;
        pb.inc(1);
    }

    store
        .save_table(TOP_GENRES_TABLE, &reports.top_genres, if_exists)
        .with_context(|| format!("Failed to save {}", TOP_GENRES_TABLE))?;
    tables_written += 1;
    pb.inc(1);
    store
        .save_table(NUMBER_ONE_GENRES_TABLE, &reports.number_one_genres, if_exists)
        .with_context(|| format!("Failed to save {}", NUMBER_ONE_GENRES_TABLE))?;
    tables_written += 1;
    pb.inc(1);
    store
        .save_table(ARTIST_REACH_TABLE, &reports.artist_reach, if_exists)
        .with_context(|| format!("Failed to save {}", ARTIST_REACH_TABLE))?;
    tables_written += 1;
    pb.inc(1);
    store
        .save_table(ARTIST_TIERS_TABLE, &reports.artist_tiers, if_exists)
        .with_context(|| format!("Failed to save {}", ARTIST_TIERS_TABLE))?;
    tables_written += 1;
    pb.inc(1);
    store
        .save_table(POPULAR_ARTISTS_TABLE, &reports.popular_artists, if_exists)
        .with_context(|| format!("Failed to save {}", POPULAR_ARTISTS_TABLE))?;
    tables_written += 1;
    pb.inc(1);

    pb.finish_with_message(format!("Phase 5: Wrote {} tables", tables_written));
    stats.tables_written = tables_written;

    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();

    let empty = stats.empty_countries();
    if !empty.is_empty() {
        info!("Countries without chart records: {}", empty.join(", "));
    }

    info!("{:=<60}", "");
    info!("Pipeline complete!");
    info!(
        "  Records: {} loaded, {} cleaned",
        stats.records_loaded, stats.cleaning.output_records
    );
    info!("  Countries: {}", slices.len());
    info!("  Artists: {}", stats.artist_reach_rows);
    info!("  Tables: {} written, {} in database", tables_written, store.list_tables()?.len());
    info!("  Elapsed: {}", format_duration(elapsed));
    info!("{:=<60}", "");

    if let Some(path) = args.stats {
        stats
            .write_to_file(&path)
            .with_context(|| format!("Failed to write stats to {:?}", path))?;
        info!("Wrote stats to {:?}", path);
    } else {
        stats.log_phase("pipeline");
    }

    Ok(())
}
