use anyhow::{anyhow, Context};
use clap::Parser;
use indicatif::ProgressBar;
use road_merge::{
    compare::mismatches::find_mismatches,
    geofile::geojson::{read_road_collection, write_features_to_geojson},
    merge::stats::StatsRecord,
    MergeParams, RoadMerger,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use std::{fs, fs::read_to_string, path::Path};

/// Merge two GeoJSON road networks into one.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

#[derive(Deserialize, Debug)]
struct Config {
    left_geofile_path: PathBuf,
    right_geofile_path: PathBuf,
    data_dir: PathBuf,
    #[serde(default)]
    merge_params: MergeParams,
    /// Also write an id-based comparison of the two inputs.
    #[serde(default)]
    compare: bool,
}

fn write_json<T: serde::Serialize>(value: &T, output_filepath: &Path) -> anyhow::Result<()> {
    log::info!("Writing {:?}", output_filepath);
    fs::write(output_filepath, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Writing {:?}", output_filepath))
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;

    let left = read_road_collection(&config.left_geofile_path)
        .with_context(|| format!("Reading {:?}", config.left_geofile_path))?;
    let right = read_road_collection(&config.right_geofile_path)
        .with_context(|| format!("Reading {:?}", config.right_geofile_path))?;
    fs::create_dir_all(&config.data_dir)?;

    let merger = RoadMerger::new(config.merge_params)?
        .with_progress_bar(ProgressBar::new(left.len() as u64));
    let start = Instant::now();
    let result = merger.merge(&left, &right)?;
    log::info!("Merged roads in {} ms", start.elapsed().as_millis());

    write_features_to_geojson(
        &result.features,
        &config.data_dir.join("merged_roads.geojson"),
    )?;
    write_json(
        &StatsRecord::from(result.stats),
        &config.data_dir.join("merge_stats.json"),
    )?;

    if config.compare {
        let report = find_mismatches(&left, &right);
        write_json(&report, &config.data_dir.join("mismatches.json"))?;
    }
    log::info!("Road merging process completed successfully!");
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
