//! Rank target sites against a site catalogue and export table, summary and map

use chrono::Local;
use clap::Parser;
use nearsite::config::{self, FileSourceConfig, RunConfig, SiteSourceConfig};
use nearsite::logger;
use nearsite::site::{
    generate_random_sites, load_sites, log_ranking_table, log_summary, maps_link, render_map,
    save_sites_csv, write_report_csv, write_report_json, CoordinatePolicy, NeighborRanker, Point,
    RankingSummary,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a .pkl or .json configuration file
    #[arg(long)]
    config: Option<String>,

    /// All-sites file (csv, tsv or json); overrides config
    #[arg(long)]
    candidates: Option<String>,

    /// Target-sites file (csv, tsv or json); overrides config
    #[arg(long)]
    targets: Option<String>,

    /// Number of neighbours per target
    #[arg(short, long)]
    k: Option<usize>,

    /// Output directory
    #[arg(long)]
    output: Option<String>,

    /// Reject coordinates outside the valid latitude/longitude ranges
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Keep a target in its own ranking when it is also a candidate
    #[arg(long, default_value_t = false)]
    no_exclude_self: bool,

    /// Disable map output (overrides config)
    #[arg(long, default_value_t = false)]
    disable_viz: bool,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(path) = &self.candidates {
            config.data.candidates = SiteSourceConfig::File(FileSourceConfig { path: path.clone() });
        }
        if let Some(path) = &self.targets {
            config.data.targets = SiteSourceConfig::File(FileSourceConfig { path: path.clone() });
        }
        if let Some(k) = self.k {
            config.rank.k = k;
        }
        if let Some(dir) = &self.output {
            config.output.dir = dir.clone();
        }
        if self.strict {
            config.rank.strict_coordinates = true;
        }
        if self.no_exclude_self {
            config.rank.exclude_self = false;
        }
        if self.disable_viz {
            config.viz.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.output.log_level = level.clone();
        }
    }
}

fn load_collection(
    name: &str,
    source: &SiteSourceConfig,
    policy: CoordinatePolicy,
    result_dir: &Path,
) -> anyhow::Result<Vec<Point>> {
    match source {
        SiteSourceConfig::Random(params) => {
            info!("Generating {} random {}", params.count, name);
            let sites = generate_random_sites(params)?;
            save_sites_csv(&sites, &result_dir.join(format!("{name}.csv")))?;
            Ok(sites)
        }
        SiteSourceConfig::File(cfg) => {
            info!("Loading {} from file: {}", name, cfg.path);
            let path = Path::new(&cfg.path);
            if let Some(file_name) = path.file_name()
                && let Err(e) = std::fs::copy(path, result_dir.join(file_name))
            {
                warn!("Failed to copy {} file: {}", name, e);
            }
            load_sites(path, policy)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: RunConfig = match &cli.config {
        Some(path) => match config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                return Err(e.into());
            }
        },
        None => RunConfig::default(),
    };
    cli.apply(&mut config);

    let output = &config.output;
    let result_dir: PathBuf = if output.use_timestamp {
        let date_str = Local::now().format(&output.timestamp_fmt).to_string();
        Path::new(&output.dir).join(date_str)
    } else {
        PathBuf::from(&output.dir)
    };
    std::fs::create_dir_all(&result_dir)?;

    let _guard = logger::init(result_dir.join("nearsite.log"), &output.log_level)?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }
    info!("Results will be saved to: {}", result_dir.display());

    let policy = config.rank.policy();
    let candidates = load_collection("candidates", &config.data.candidates, policy, &result_dir)?;
    let targets = load_collection("targets", &config.data.targets, policy, &result_dir)?;

    let start = Instant::now();
    let ranker = NeighborRanker::new(config.rank.k, config.rank.identity())?;
    #[cfg(feature = "parallel")]
    let report = ranker.rank_parallel(&candidates, &targets);
    #[cfg(not(feature = "parallel"))]
    let report = ranker.rank(&candidates, &targets);
    info!(
        "Ranking took {:.2} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let decimals = config.rank.decimals;
    log_ranking_table(&report, decimals);
    log_summary(&RankingSummary::from_report(&report));

    let csv_path = write_report_csv(&report, result_dir.join(&output.csv_name), decimals)?;
    info!("Result table saved to {}", csv_path.display());
    let summary_path = write_report_json(&report, &result_dir, decimals)?;
    info!("JSON summary saved to {}", summary_path.display());

    if report.len() == 1 {
        let only = &report.results[0];
        info!(
            "Route {} -> neighbours -> {}: {:.3} km",
            only.target.id(),
            only.target.id(),
            only.route().total_km
        );
        info!("Open in maps: {}", maps_link(only));
    }

    if config.viz.enabled {
        let map_path = result_dir.join(&config.viz.file_name);
        render_map(
            &map_path,
            &format!("{} nearest sites", config.rank.k),
            &report,
            &candidates,
            &config.viz,
        )?;
        info!("Map saved to {}", map_path.display());
    }

    Ok(())
}
