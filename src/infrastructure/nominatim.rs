// Nominatim geocoder adapter - place names to coordinates
use crate::application::location_resolver::Geocoder;
use crate::domain::location::Coordinates;
use crate::error::{AnimatorError, AnimatorResult};
use crate::infrastructure::config::GeocoderSettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> AnimatorResult<Self> {
        // Nominatim's usage policy rejects requests without an identifying agent
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, place: &str) -> AnimatorResult<Option<Coordinates>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(place)
        );
        tracing::debug!("Geocoding '{}'", place);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AnimatorError::service(
                "Nominatim",
                format!("search returned {}", response.status()),
            ));
        }

        let places: Vec<Place> = response.json().await?;
        let Some(best) = places.into_iter().next() else {
            return Ok(None);
        };

        let parse = |value: &str| {
            value.trim().parse::<f64>().map_err(|_| {
                AnimatorError::service("Nominatim", format!("unparseable coordinate '{}'", value))
            })
        };
        let coords = Coordinates::new(parse(&best.lat)?, parse(&best.lon)?)?;
        if let Some(name) = best.display_name {
            tracing::info!("Resolved '{}' to {} ({})", place, name, coords);
        }
        Ok(Some(coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(base_url: &str) -> NominatimGeocoder {
        NominatimGeocoder::new(&GeocoderSettings {
            base_url: base_url.to_string(),
            user_agent: "landsat_animator".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_match_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Dubai, UAE"))
            .and(query_param("limit", "1"))
            .and(header("user-agent", "landsat_animator"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "lat": "25.2653471", "lon": "55.2924914", "display_name": "Dubai, United Arab Emirates" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let coords = geocoder(&server.uri())
            .geocode("Dubai, UAE")
            .await
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(coords.latitude, 25.2653471, epsilon = 1e-9);
        assert_abs_diff_eq!(coords.longitude, 55.2924914, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_no_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let coords = geocoder(&server.uri()).geocode("Atlantis").await.unwrap();
        assert_eq!(coords, None);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = geocoder(&server.uri()).geocode("Paris").await.unwrap_err();
        assert!(matches!(err, AnimatorError::Service { service: "Nominatim", .. }));
    }
}
