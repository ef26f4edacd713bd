// Command line arguments and interactive prompts
use crate::domain::visualization::{DEFAULT_MODE, MODE_NAMES, RecipeCatalog};
use crate::infrastructure::config::BackendKind;
use anyhow::Context;
use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "landsat-animator")]
#[command(author, version, about = "Generate animated GIFs of Landsat imagery over time", long_about = None)]
pub struct Cli {
    /// Place name or "lat,lon" (prompted when omitted)
    #[arg(short, long)]
    pub location: Option<String>,

    /// Visualization mode
    #[arg(short, long, default_value = DEFAULT_MODE, value_parser = PossibleValuesParser::new(MODE_NAMES))]
    pub mode: String,

    /// Maximum cloud cover percentage
    #[arg(short, long, default_value = "10", value_parser = parse_cloud_cover)]
    pub cloud_cover: f64,

    /// Frames per second in the output GIF
    #[arg(short, long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// First acquisition date (YYYY-MM-DD), defaults to the configured start date
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// End of the window, exclusive (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Imagery backend, overrides the configuration file
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Earthengine,
    Usgs,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Earthengine => BackendKind::EarthEngine,
            BackendArg::Usgs => BackendKind::Usgs,
        }
    }
}

fn parse_cloud_cover(value: &str) -> Result<f64, String> {
    let cover: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=100.0).contains(&cover) {
        Ok(cover)
    } else {
        Err(format!("cloud cover must be between 0 and 100, got {}", cover))
    }
}

impl Cli {
    /// The location flag, or an interactive prompt when it was not given.
    pub fn location_or_prompt(&self) -> anyhow::Result<String> {
        if let Some(location) = &self.location {
            return Ok(location.clone());
        }
        dialoguer::Input::<String>::new()
            .with_prompt("Enter location (city name or lat,lon)")
            .interact_text()
            .context("failed to read location")
    }
}

pub fn print_modes(recipes: &RecipeCatalog) {
    println!("Available visualization modes:");
    for recipe in recipes.iter() {
        println!("  {:<14} {}", recipe.mode, recipe.description);
    }
    println!();
}
