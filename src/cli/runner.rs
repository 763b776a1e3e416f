use chrono::{Days, Utc};
use tracing::{info, warn};

use s2rgb::api;
use s2rgb::cdse::ProductQuery;
use s2rgb::core::params::{ComposeParams, StretchParams};

use super::args::{CliArgs, Command, ComposeArgs, FetchArgs};
use super::errors::AppError;

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    match args.command {
        Command::Fetch(fetch) => run_fetch(fetch),
        Command::Compose(compose) => run_compose(compose),
    }
}

fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bbox: [f64; 4] = args
        .bbox
        .as_slice()
        .try_into()
        .map_err(|_| AppError::InvalidBbox {
            got: args.bbox.len(),
        })?;

    let end_date = args.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start_date = args
        .start_date
        .unwrap_or_else(|| end_date - Days::new(args.days));
    if start_date >= end_date {
        return Err(AppError::InvalidDateWindow {
            start: start_date.to_string(),
            end: end_date.to_string(),
        }
        .into());
    }

    let query = ProductQuery {
        collection: "SENTINEL-2".to_string(),
        bbox,
        start_date,
        end_date,
        max_cloud_cover: args.max_cloud_cover,
        limit: args.limit,
    };

    info!(
        "Searching for products between {} and {} (cloud cover < {}%)",
        start_date, end_date, args.max_cloud_cover
    );
    let report = api::fetch_products_to_dir(&query, &args.credentials, &args.output_dir)?;

    info!("Fetch complete!");
    info!("Found: {}", report.found);
    info!("Downloaded: {}", report.downloaded);
    info!("Skipped: {}", report.skipped);
    if report.errors > 0 {
        warn!("Errors: {}", report.errors);
    }

    Ok(())
}

fn run_compose(args: ComposeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let params = ComposeParams {
        format: args.format,
        stretch: StretchParams::new(args.low_percentile, args.high_percentile),
        ..ComposeParams::default()
    };

    let batch_mode = args.input_dir.is_some() || args.output_dir.is_some();
    if batch_mode {
        let input_dir = args.input_dir.ok_or(AppError::MissingArgument {
            arg: "--input-dir".to_string(),
        })?;
        let output_dir = args.output_dir.ok_or(AppError::MissingArgument {
            arg: "--output-dir".to_string(),
        })?;

        info!("Starting batch composition from directory: {:?}", input_dir);
        info!("Output directory: {:?}", output_dir);

        let report =
            api::compose_directory_to_path(&input_dir, &output_dir, &params, true, args.overwrite)?;

        info!("Batch composition complete!");
        info!("Processed: {}", report.processed);
        info!("Skipped: {}", report.skipped);
        if report.errors > 0 {
            warn!("Errors: {}", report.errors);
        }
    } else {
        let input = args.input.ok_or(AppError::MissingArgument {
            arg: "--input".to_string(),
        })?;
        let output = args.output.ok_or(AppError::MissingArgument {
            arg: "--output".to_string(),
        })?;

        api::compose_product_to_path(&input, &output, &params)?;
        info!("Successfully composed: {:?} -> {:?}", input, output);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn wrong_bbox_arity_is_rejected_before_any_network_call() {
        let args =
            CliArgs::try_parse_from(["s2rgb", "fetch", "--bbox", "0,1,2"]).unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("expected west,south,east,north"));
    }

    #[test]
    fn inverted_date_window_is_rejected() {
        let args = CliArgs::try_parse_from([
            "s2rgb",
            "fetch",
            "--bbox",
            "0,0,1,1",
            "--start-date",
            "2024-08-06",
            "--end-date",
            "2024-04-28",
        ])
        .unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("Invalid date window"));
    }

    #[test]
    fn single_mode_requires_input_and_output() {
        let args = CliArgs::try_parse_from(["s2rgb", "compose"]).unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("--input"));

        let args = CliArgs::try_parse_from(["s2rgb", "compose", "-i", "tile.zip"]).unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("--output"));
    }

    #[test]
    fn batch_mode_requires_both_directories() {
        let args = CliArgs::try_parse_from(["s2rgb", "compose", "--input-dir", "in"]).unwrap();
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("--output-dir"));
    }
}
