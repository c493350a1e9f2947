use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info, warn};
use rayon::prelude::*;

use donut_mask_lib::config::Config;
use donut_mask_lib::image_io::{get_image_files_in_dir, load_image};
use donut_mask_lib::output::{save_pipeline_outputs, write_summary_csv, write_summary_json, ImageReport};
use donut_mask_lib::pipeline::process;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "DonutMask - Ring Object Segmentation")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long)]
    config: Option<String>,

    /// Working width images are rescaled to (overwrites config)
    #[clap(short = 'w', long)]
    target_width: Option<u32>,

    /// Process images one after another instead of in parallel
    #[clap(long)]
    sequential: bool,

    /// Write the default configuration to the given path and exit
    #[clap(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Enable debug mode (save intermediate bitmaps and log every stage)
    #[clap(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH)?,
        None => {
            info!("No {} found, using default configuration", DEFAULT_CONFIG_PATH);
            Config::default()
        }
    };

    // Override config with command-line arguments
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(output) = &args.output {
        config.output_base_dir = output.clone();
    }
    if let Some(width) = args.target_width {
        config.pipeline.target_width = width;
    }
    if args.sequential {
        config.use_parallel = false;
    }

    Ok(config)
}

/// Load, segment and save one image; never fails the batch
fn run_one(path: &Path, config: &Config, debug: bool) -> ImageReport {
    let display_name = path.display().to_string();

    let input_image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            error!("Error loading {}: {}", display_name, e);
            return ImageReport::from_error(&display_name, e.to_string());
        }
    };

    let result = match process(&input_image.raster, &config.pipeline) {
        Ok(result) => result,
        Err(e) => {
            error!("Error processing {}: {}", display_name, e);
            return ImageReport::from_error(&display_name, e.to_string());
        }
    };

    if let Some(kind) = result.failure_kind() {
        warn!("{}: {}", display_name, kind);
    } else {
        info!("Processed: {}", display_name);
    }

    let report = ImageReport::from_result(&display_name, &result);
    if let Err(e) = save_pipeline_outputs(&result, &input_image.filename, config, debug) {
        error!("Error saving outputs for {}: {}", display_name, e);
        return ImageReport::from_error(&display_name, e.to_string());
    }

    report
}

/// Main function
fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Some(path) = &args.write_default_config {
        Config::default()
            .save_to_file(path)
            .with_context(|| format!("writing default configuration to {}", path.display()))?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;

    // Validate configuration
    config.validate()?;

    // Start timing
    let start_time = Instant::now();

    // Create output directories
    config.create_output_dirs()?;

    // Collect input
    let input_path = PathBuf::from(&config.input_path);
    let image_files = if input_path.is_file() {
        vec![input_path]
    } else if input_path.is_dir() {
        get_image_files_in_dir(&input_path, &config.image_extensions)?
    } else {
        bail!("Invalid input path: {}", input_path.display());
    };

    if image_files.is_empty() {
        warn!("No images found in {}", config.input_path);
        return Ok(());
    }
    println!("Processing {} image(s)...", image_files.len());

    let reports: Vec<ImageReport> = if config.use_parallel {
        image_files
            .par_iter()
            .map(|path| run_one(path, &config, args.debug))
            .collect()
    } else {
        image_files
            .iter()
            .map(|path| run_one(path, &config, args.debug))
            .collect()
    };

    let output_base = PathBuf::from(&config.output_base_dir);
    write_summary_csv(&reports, output_base.join("summary.csv"))?;
    write_summary_json(&reports, output_base.join("summary.json"))?;

    // Report
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    let elapsed = start_time.elapsed();
    println!("{}", "-".repeat(30));
    println!(
        "Processed {} image(s): {} succeeded, {} failed",
        reports.len(),
        succeeded,
        reports.len() - succeeded
    );
    println!("Results saved under {}", output_base.display());
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
