// Region domain model - square area of interest around a point
use crate::domain::location::Coordinates;
use crate::error::{AnimatorError, AnimatorResult};
use serde_json::json;

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Ground footprint of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub pixels: u32,
    pub meters_per_pixel: f64,
}

impl Footprint {
    pub fn width_meters(&self) -> f64 {
        self.pixels as f64 * self.meters_per_pixel
    }
}

impl Default for Footprint {
    fn default() -> Self {
        // 1:60000 map scale, 1024 px => 61.44 km
        Self {
            pixels: 1024,
            meters_per_pixel: 60.0,
        }
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Region {
    pub fn around(center: Coordinates, footprint: Footprint) -> AnimatorResult<Self> {
        let cos_lat = center.latitude.to_radians().cos();
        if cos_lat <= 1e-9 {
            return Err(AnimatorError::InvalidRegion(format!(
                "cannot build a region at latitude {}",
                center.latitude
            )));
        }

        let width = footprint.width_meters();
        let lat_degrees = width / METERS_PER_DEGREE;
        let lon_degrees = width / (METERS_PER_DEGREE * cos_lat);

        let south = center.latitude - lat_degrees / 2.0;
        let north = center.latitude + lat_degrees / 2.0;
        if south < -90.0 || north > 90.0 || lon_degrees >= 360.0 {
            return Err(AnimatorError::InvalidRegion(format!(
                "a {} m region at latitude {} would cross a pole",
                width, center.latitude
            )));
        }

        Ok(Self {
            west: center.longitude - lon_degrees / 2.0,
            south,
            east: center.longitude + lon_degrees / 2.0,
            north,
        })
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Closed GeoJSON polygon ring, counter-clockwise.
    pub fn to_geojson(&self) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [self.west, self.south],
                [self.east, self.south],
                [self.east, self.north],
                [self.west, self.north],
                [self.west, self.south],
            ]]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_equator_region_is_square_in_degrees() {
        let region = Region::around(at(0.0, 10.0), Footprint::default()).unwrap();
        assert_abs_diff_eq!(region.lon_span(), region.lat_span(), epsilon = 1e-9);
        assert_abs_diff_eq!(region.lat_span(), 61_440.0 / METERS_PER_DEGREE, epsilon = 1e-9);
    }

    #[test]
    fn test_longitude_span_doubles_at_sixty_degrees() {
        let region = Region::around(at(60.0, 10.0), Footprint::default()).unwrap();
        assert_abs_diff_eq!(region.lon_span() / region.lat_span(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_region_is_centered() {
        let region = Region::around(at(37.7749, -122.4194), Footprint::default()).unwrap();
        assert_abs_diff_eq!((region.west + region.east) / 2.0, -122.4194, epsilon = 1e-9);
        assert_abs_diff_eq!((region.south + region.north) / 2.0, 37.7749, epsilon = 1e-9);
    }

    #[test]
    fn test_poles_are_rejected() {
        assert!(matches!(
            Region::around(at(90.0, 0.0), Footprint::default()),
            Err(AnimatorError::InvalidRegion(_))
        ));
        assert!(Region::around(at(-90.0, 0.0), Footprint::default()).is_err());
    }

    #[test]
    fn test_regions_reaching_past_a_pole_are_rejected() {
        assert!(matches!(
            Region::around(at(89.99, 0.0), Footprint::default()),
            Err(AnimatorError::InvalidRegion(_))
        ));
        assert!(Region::around(at(-89.9, 45.0), Footprint::default()).is_err());

        let region = Region::around(at(89.5, 0.0), Footprint::default()).unwrap();
        assert!(region.north <= 90.0);
        assert!(region.lon_span() < 360.0);
        assert!(region.west >= -180.0);
    }

    #[test]
    fn test_geojson_ring_is_closed() {
        let region = Region::around(at(0.0, 0.0), Footprint::default()).unwrap();
        let geojson = region.to_geojson();
        let ring = geojson["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }
}
