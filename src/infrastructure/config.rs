use crate::domain::region::Footprint;
use crate::error::{AnimatorError, AnimatorResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config/animator";
pub const ENV_PREFIX: &str = "ANIMATOR";
/// Legacy override for the Earth Engine collection id.
pub const COLLECTION_OVERRIDE_VAR: &str = "LANDSAT_COLLECTION";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub backend: BackendKind,
    pub start_date: String,
    pub region: RegionSettings,
    pub earth_engine: EarthEngineSettings,
    pub usgs: UsgsSettings,
    pub geocoder: GeocoderSettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    EarthEngine,
    Usgs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegionSettings {
    pub pixels: u32,
    pub meters_per_pixel: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EarthEngineSettings {
    pub api_base: String,
    pub collection: String,
    #[serde(default)]
    pub project: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsgsSettings {
    pub api_base: String,
    pub dataset: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub user_agent: String,
}

impl AppConfig {
    pub fn start_date(&self) -> AnimatorResult<NaiveDate> {
        NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").map_err(|e| {
            AnimatorError::Config(format!("start_date '{}' is not YYYY-MM-DD: {}", self.start_date, e))
        })
    }

    pub fn footprint(&self) -> Footprint {
        Footprint {
            pixels: self.region.pixels,
            meters_per_pixel: self.region.meters_per_pixel,
        }
    }
}

impl EarthEngineSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl UsgsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn load_app_config() -> AnimatorResult<AppConfig> {
    build_app_config(
        config::File::with_name(CONFIG_FILE).required(false),
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__"),
        std::env::var(COLLECTION_OVERRIDE_VAR).ok(),
    )
}

fn build_app_config(
    file: config::File<config::FileSourceFile, config::FileFormat>,
    env: config::Environment,
    collection_override: Option<String>,
) -> AnimatorResult<AppConfig> {
    let settings = config::Config::builder()
        .set_default("output_dir", "output")?
        .set_default("backend", "earthengine")?
        .set_default("start_date", "2013-01-01")?
        .set_default("region.pixels", 1024)?
        .set_default("region.meters_per_pixel", 60.0)?
        .set_default("earth_engine.api_base", "https://earthengine.googleapis.com")?
        .set_default("earth_engine.collection", "LANDSAT/LC08/C02/T1_L2")?
        .set_default("earth_engine.timeout_secs", 120)?
        .set_default("usgs.api_base", "https://m2m.cr.usgs.gov/api/api/json/stable")?
        .set_default("usgs.dataset", "landsat_ot_c2_l2")?
        .set_default("usgs.timeout_secs", 60)?
        .set_default("geocoder.base_url", "https://nominatim.openstreetmap.org")?
        .set_default("geocoder.user_agent", "landsat_animator")?
        .add_source(file)
        .add_source(env)
        .set_override_option(
            "earth_engine.collection",
            collection_override.filter(|c| !c.trim().is_empty()),
        )?
        .build()?;

    Ok(settings.try_deserialize()?)
}
