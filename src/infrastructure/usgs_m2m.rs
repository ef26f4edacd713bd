// USGS Machine-to-Machine API adapter - scene search and browse-image frames
use crate::application::catalog_client::{CatalogClient, SceneQuery, Session};
use crate::application::frame_exporter::FrameExporter;
use crate::domain::region::Region;
use crate::domain::scene::{Calibration, Scene};
use crate::domain::visualization::{BandNaming, RenderDescriptor};
use crate::error::{AnimatorError, AnimatorResult};
use crate::infrastructure::config::UsgsSettings;
use crate::infrastructure::credentials::{USGS_REMEDIATION, UsgsCredentials};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SERVICE: &str = "USGS M2M";
const AUTH_HEADER: &str = "X-Auth-Token";
const PAGE_SIZE: u64 = 500;
/// Optical bands of the Collection 2 Level 2 products
const OPTICAL_BANDS: std::ops::RangeInclusive<u8> = 1..=7;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    results: Vec<SceneResult>,
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    next_record: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneResult {
    entity_id: String,
    #[serde(default)]
    cloud_cover: Value,
    temporal_coverage: Option<TemporalCoverage>,
    #[serde(default)]
    browse: Vec<Browse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemporalCoverage {
    start_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Browse {
    #[serde(default)]
    browse_name: Option<String>,
    #[serde(default)]
    browse_path: Option<String>,
}

#[derive(Clone)]
pub struct UsgsClient {
    http: reqwest::Client,
    api_base: String,
    dataset: String,
    timeout: Duration,
    credentials: Option<UsgsCredentials>,
}

impl UsgsClient {
    /// Missing credentials are reported at `authenticate`, not here, so the
    /// client can be built before the user is asked for anything.
    pub fn new(settings: &UsgsSettings, credentials: Option<UsgsCredentials>) -> AnimatorResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("landsat-animator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            dataset: settings.dataset.clone(),
            timeout: settings.timeout(),
            credentials,
        })
    }

    pub fn naming(&self) -> BandNaming {
        BandNaming::Collection2
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: Option<&str>,
        body: Value,
    ) -> AnimatorResult<Option<T>> {
        let url = format!("{}/{}", self.api_base, endpoint);
        tracing::debug!("POST {}", url);

        let mut request = self.http.post(&url).timeout(self.timeout).json(&body);
        if let Some(token) = token {
            request = request.header(AUTH_HEADER, token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AnimatorError::service(
                SERVICE,
                format!("{} returned {}: {}", endpoint, status, text),
            ));
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|e| {
            AnimatorError::service(SERVICE, format!("unreadable {} response: {}", endpoint, e))
        })?;
        if let Some(code) = envelope.error_code {
            let message = envelope.error_message.unwrap_or_default();
            return Err(AnimatorError::service(
                SERVICE,
                format!("{} failed with {}: {}", endpoint, code, message),
            ));
        }
        Ok(envelope.data)
    }

    fn search_body(&self, query: &SceneQuery, starting_number: u64) -> Value {
        let region = &query.region;
        json!({
            "datasetName": self.dataset,
            "maxResults": PAGE_SIZE,
            "startingNumber": starting_number,
            "metadataType": "summary",
            "sceneFilter": {
                "spatialFilter": {
                    "filterType": "mbr",
                    "lowerLeft": { "latitude": region.south, "longitude": region.west },
                    "upperRight": { "latitude": region.north, "longitude": region.east },
                },
                "acquisitionFilter": {
                    "start": query.start.format("%Y-%m-%d").to_string(),
                    "end": query.end.format("%Y-%m-%d").to_string(),
                },
                "cloudCoverFilter": {
                    "min": 0,
                    "max": query.max_cloud_cover,
                    "includeUnknown": false,
                },
            },
        })
    }

    fn to_scene(&self, result: SceneResult) -> AnimatorResult<Scene> {
        let id = result.entity_id;

        let cloud_cover = match &result.cloud_cover {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| AnimatorError::InvalidScene(format!("{} has no cloud cover", id)))?;

        let start = result
            .temporal_coverage
            .map(|t| t.start_date)
            .ok_or_else(|| AnimatorError::InvalidScene(format!("{} has no acquisition date", id)))?;
        let acquired = start
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .ok_or_else(|| AnimatorError::InvalidScene(format!("{}: bad startDate '{}'", id, start)))?;

        let naming = self.naming();
        let mut scene = Scene::new(id, acquired, cloud_cover)
            .with_bands(OPTICAL_BANDS.map(|n| naming.band(n)))
            .with_calibration(Calibration::COLLECTION2_SR);
        if let Some(url) = natural_color_browse(&result.browse) {
            scene = scene.with_browse_url(url);
        }
        Ok(scene)
    }
}

/// Prefer the natural colour rendering; otherwise the first browse with a path.
fn natural_color_browse(browse: &[Browse]) -> Option<String> {
    let named = |b: &&Browse| {
        b.browse_name
            .as_deref()
            .map(|n| n.to_ascii_lowercase().contains("natural"))
            .unwrap_or(false)
    };
    browse
        .iter()
        .filter(|b| b.browse_path.is_some())
        .find(named)
        .or_else(|| browse.iter().find(|b| b.browse_path.is_some()))
        .and_then(|b| b.browse_path.clone())
}

#[async_trait]
impl CatalogClient for UsgsClient {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    async fn authenticate(&self) -> AnimatorResult<Session> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AnimatorError::auth("USGS credentials are not configured", USGS_REMEDIATION)
        })?;

        let body = json!({ "username": credentials.username, "password": credentials.password });
        let token = match self.call::<String>("login", None, body).await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return Err(AnimatorError::auth("login returned no API key", USGS_REMEDIATION)),
            Err(AnimatorError::Service { message, .. }) => {
                return Err(AnimatorError::auth(message, USGS_REMEDIATION));
            }
            Err(e) => return Err(e),
        };

        tracing::info!("Logged in to USGS M2M as {}", credentials.username);
        Ok(Session::new(token))
    }

    async fn search(&self, session: &Session, query: &SceneQuery) -> AnimatorResult<Vec<Scene>> {
        let mut scenes = Vec::new();
        let mut starting_number = 1;

        loop {
            let body = self.search_body(query, starting_number);
            let Some(page) = self
                .call::<SearchData>("scene-search", Some(&session.token), body)
                .await?
            else {
                break;
            };

            let returned = page.results.len() as u64;
            for result in page.results {
                let scene = self.to_scene(result)?;
                // The API filters are inclusive; keep the ceiling and the end date strict
                if scene.cloud_cover < query.max_cloud_cover && scene.acquired < query.end {
                    scenes.push(scene);
                }
            }

            let next = page.next_record.as_ref().and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            });
            match next {
                Some(next) if returned > 0 && next > starting_number && next <= page.total_hits => {
                    starting_number = next;
                }
                _ => break,
            }
        }

        tracing::debug!("USGS M2M returned {} scenes", scenes.len());
        Ok(scenes)
    }

    async fn logout(&self, session: Session) -> AnimatorResult<()> {
        self.call::<Value>("logout", Some(&session.token), Value::Null)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl FrameExporter for UsgsClient {
    async fn export(
        &self,
        _session: &Session,
        descriptor: &RenderDescriptor,
        _region: &Region,
        width: u32,
        dest: &Path,
    ) -> AnimatorResult<PathBuf> {
        let url = descriptor.browse_url.as_deref().ok_or_else(|| {
            AnimatorError::service(SERVICE, format!("scene {} has no browse image", descriptor.scene_id))
        })?;

        let response = self.http.get(url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(AnimatorError::service(
                SERVICE,
                format!("browse download for {} returned {}", descriptor.scene_id, response.status()),
            ));
        }
        let bytes = response.bytes().await?;

        let frame = image::load_from_memory(&bytes)?
            .resize(width, width, image::imageops::FilterType::Triangle);
        frame.save_with_format(dest, image::ImageFormat::Png)?;
        Ok(dest.to_path_buf())
    }
}
