// Infrastructure layer - External services and adapters
pub mod config;
pub mod credentials;
pub mod earth_engine;
pub mod gif_encoder;
pub mod nominatim;
pub mod usgs_m2m;
