// Location resolver - Use case for turning user input into coordinates
use crate::domain::location::{Coordinates, Location};
use crate::error::{AnimatorError, AnimatorResult};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for a place name, or None when the service knows no such place.
    async fn geocode(&self, place: &str) -> AnimatorResult<Option<Coordinates>>;
}

#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn resolve(&self, text: &str) -> AnimatorResult<Coordinates> {
        match Location::parse(text)? {
            Location::Point(coords) => Ok(coords),
            Location::Place(place) => match self.geocoder.geocode(&place).await {
                Ok(Some(coords)) => Ok(coords),
                Ok(None) => Err(AnimatorError::InvalidLocation(format!(
                    "Could not find location: {}",
                    place
                ))),
                Err(e) => Err(AnimatorError::InvalidLocation(format!(
                    "Error geocoding location: {}",
                    e
                ))),
            },
        }
    }
}
