// Location domain model
use crate::error::{AnimatorError, AnimatorResult};
use std::fmt;

/// A resolved point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> AnimatorResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AnimatorError::InvalidLocation(format!(
                "latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AnimatorError::InvalidLocation(format!(
                "longitude {} is outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a "lat,lon" pair. Returns None when the text is not a numeric pair
    /// so the caller can fall back to geocoding it as a place name.
    /// Fields after the second comma are ignored.
    pub fn parse_pair(text: &str) -> Option<AnimatorResult<Self>> {
        let mut fields = text.split(',');
        let lat = fields.next()?.trim().parse::<f64>().ok()?;
        let lon = fields.next()?.trim().parse::<f64>().ok()?;
        Some(Self::new(lat, lon))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// What the user typed, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Point(Coordinates),
    Place(String),
}

impl Location {
    pub fn parse(text: &str) -> AnimatorResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AnimatorError::InvalidLocation(
                "location must not be empty".to_string(),
            ));
        }
        match Coordinates::parse_pair(trimmed) {
            Some(coords) => Ok(Location::Point(coords?)),
            None => Ok(Location::Place(trimmed.to_string())),
        }
    }
}

/// Filename-safe form of the user's location text.
pub fn location_slug(text: &str) -> String {
    text.trim().replace([' ', ','], "_")
}
