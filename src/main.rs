// Main entry point - Dependency injection and command dispatch
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::application::animation_service::{AnimationRequest, AnimationService};
use crate::application::catalog_client::CatalogClient;
use crate::application::frame_exporter::FrameExporter;
use crate::application::location_resolver::LocationResolver;
use crate::domain::visualization::RecipeCatalog;
use crate::infrastructure::config::{BackendKind, load_app_config};
use crate::infrastructure::credentials::{EarthEngineCredentials, UsgsCredentials};
use crate::infrastructure::earth_engine::EarthEngineClient;
use crate::infrastructure::gif_encoder::GifAnimationEncoder;
use crate::infrastructure::nominatim::NominatimGeocoder;
use crate::infrastructure::usgs_m2m::UsgsClient;
use crate::presentation::cli::{Cli, print_modes};
use crate::presentation::progress::{ConsoleProgress, print_summary};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so stdout stays the user-facing report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = load_app_config()?;
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    // Create catalog and exporter for the selected backend (infrastructure layer)
    let (catalog, exporter, recipes): (Arc<dyn CatalogClient>, Arc<dyn FrameExporter>, RecipeCatalog) =
        match config.backend {
            BackendKind::EarthEngine => {
                let client = Arc::new(EarthEngineClient::new(
                    &config.earth_engine,
                    EarthEngineCredentials::from_env(),
                )?);
                let recipes = RecipeCatalog::full(client.naming());
                let catalog: Arc<dyn CatalogClient> = client.clone();
                (catalog, client as Arc<dyn FrameExporter>, recipes)
            }
            BackendKind::Usgs => {
                // Missing credentials surface as an auth error once the run starts
                let client = Arc::new(UsgsClient::new(&config.usgs, UsgsCredentials::from_env().ok())?);
                let recipes = RecipeCatalog::browse_only(client.naming());
                let catalog: Arc<dyn CatalogClient> = client.clone();
                (catalog, client as Arc<dyn FrameExporter>, recipes)
            }
        };

    // Create services (application layer)
    let service = AnimationService::new(
        catalog,
        exporter,
        Arc::new(GifAnimationEncoder),
        recipes,
        config.footprint(),
        config.output_dir.clone(),
    );
    let resolver = LocationResolver::new(Arc::new(NominatimGeocoder::new(&config.geocoder)?));

    print_modes(service.recipes());
    service.recipes().get(&cli.mode)?;

    let location = cli.location_or_prompt()?;
    let center = resolver.resolve(&location).await?;

    let start = match cli.start {
        Some(start) => start,
        None => config.start_date()?,
    };
    let end = cli.end.unwrap_or_else(|| chrono::Utc::now().date_naive());
    if start >= end {
        bail!("Start date {} must be before end date {}", start, end);
    }

    let request = AnimationRequest {
        location,
        center,
        mode: cli.mode.clone(),
        max_cloud_cover: cli.cloud_cover,
        fps: cli.fps,
        start,
        end,
    };

    let summary = service.generate(&request, &ConsoleProgress::new()).await?;
    print_summary(&summary);

    Ok(())
}
