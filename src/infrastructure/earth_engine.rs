// Earth Engine REST adapter - scene search and server-side frame rendering
use crate::application::catalog_client::{CatalogClient, SceneQuery, Session};
use crate::application::frame_exporter::FrameExporter;
use crate::domain::region::Region;
use crate::domain::scene::{Calibration, Scene};
use crate::domain::visualization::{BandNaming, RenderDescriptor, RenderSource};
use crate::error::{AnimatorError, AnimatorResult};
use crate::infrastructure::config::EarthEngineSettings;
use crate::infrastructure::credentials::{EARTH_ENGINE_REMEDIATION, EarthEngineCredentials};
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";
/// Cloud project that owns the public data catalog.
const PUBLIC_CATALOG_PROJECT: &str = "earthengine-public";
const PAGE_SIZE: usize = 1000;
const SERVICE: &str = "Earth Engine";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<ImageAsset>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAsset {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    bands: Vec<ImageBand>,
}

#[derive(Debug, Deserialize)]
struct ImageBand {
    id: String,
}

#[derive(Clone)]
pub struct EarthEngineClient {
    http: reqwest::Client,
    api_base: String,
    collection: String,
    project: Option<String>,
    credentials: EarthEngineCredentials,
    naming: BandNaming,
    timeout: Duration,
}

impl EarthEngineClient {
    pub fn new(
        settings: &EarthEngineSettings,
        credentials: EarthEngineCredentials,
    ) -> AnimatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("landsat-animator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            project: settings.project.clone(),
            credentials,
            naming: BandNaming::for_collection(&settings.collection),
            timeout: settings.timeout(),
        })
    }

    pub fn naming(&self) -> BandNaming {
        self.naming
    }

    async fn token_provider(&self) -> AnimatorResult<Arc<dyn TokenProvider>> {
        let auth_err = |e: gcp_auth::Error| AnimatorError::auth(e.to_string(), EARTH_ENGINE_REMEDIATION);

        match &self.credentials {
            EarthEngineCredentials::ServiceAccount { email, key_json } => {
                tracing::info!("Authenticating with service account {}", email);
                let account = CustomServiceAccount::from_json(key_json).map_err(auth_err)?;
                Ok(Arc::new(account))
            }
            EarthEngineCredentials::CredentialsFile(path) => {
                tracing::info!("Authenticating with credentials file: {}", path.display());
                let account = CustomServiceAccount::from_file(path).map_err(auth_err)?;
                Ok(Arc::new(account))
            }
            EarthEngineCredentials::ApplicationDefault => {
                tracing::info!("Using default Google authentication");
                gcp_auth::provider().await.map_err(auth_err)
            }
        }
    }

    fn list_images_url(&self, query: &SceneQuery, page_token: Option<&str>) -> String {
        let start = format!("{}T00:00:00Z", query.start.format("%Y-%m-%d"));
        let end = format!("{}T00:00:00Z", query.end.format("%Y-%m-%d"));
        let filter = format!("CLOUD_COVER < {}", query.max_cloud_cover);
        let region = query.region.to_geojson().to_string();

        let mut url = format!(
            "{}/v1/projects/{}/assets/{}:listImages?startTime={}&endTime={}&region={}&filter={}&pageSize={}",
            self.api_base,
            PUBLIC_CATALOG_PROJECT,
            self.collection,
            urlencoding::encode(&start),
            urlencoding::encode(&end),
            urlencoding::encode(&region),
            urlencoding::encode(&filter),
            PAGE_SIZE
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, session: &Session) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&session.token);
        match &session.project {
            Some(project) => builder.header("x-goog-user-project", project),
            None => builder,
        }
    }

    fn to_scene(&self, asset: ImageAsset) -> AnimatorResult<Scene> {
        let id = asset.id.unwrap_or_else(|| {
            asset
                .name
                .split_once("/assets/")
                .map(|(_, id)| id.to_string())
                .unwrap_or_else(|| asset.name.clone())
        });

        let start_time = asset
            .start_time
            .ok_or_else(|| AnimatorError::InvalidScene(format!("{} has no acquisition time", id)))?;
        let acquired = chrono::DateTime::parse_from_rfc3339(&start_time)
            .map_err(|e| AnimatorError::InvalidScene(format!("{}: bad startTime '{}': {}", id, start_time, e)))?
            .with_timezone(&chrono::Utc)
            .date_naive();

        let cloud_cover = asset
            .properties
            .get("CLOUD_COVER")
            .and_then(Value::as_f64)
            .ok_or_else(|| AnimatorError::InvalidScene(format!("{} has no CLOUD_COVER", id)))?;

        let mut scene = Scene::new(id, acquired, cloud_cover)
            .with_bands(asset.bands.into_iter().map(|b| b.id));
        if self.naming == BandNaming::Collection2 {
            scene = scene.with_calibration(Calibration::COLLECTION2_SR);
        }
        Ok(scene)
    }
}

#[async_trait]
impl CatalogClient for EarthEngineClient {
    fn dataset(&self) -> &str {
        &self.collection
    }

    async fn authenticate(&self) -> AnimatorResult<Session> {
        let provider = auth_deadline(self.timeout, "credential discovery", self.token_provider()).await?;
        let token = auth_deadline(self.timeout, "access token request", async {
            provider
                .token(&[EARTH_ENGINE_SCOPE])
                .await
                .map_err(|e| AnimatorError::auth(e.to_string(), EARTH_ENGINE_REMEDIATION))
        })
        .await?;

        let project = match &self.project {
            Some(project) => project.clone(),
            None => auth_deadline(self.timeout, "project lookup", async {
                provider.project_id().await.map(|p| p.to_string()).map_err(|e| {
                    AnimatorError::auth(
                        format!("no Cloud project for Earth Engine requests: {}", e),
                        "Set ANIMATOR_EARTH_ENGINE__PROJECT to a project registered for Earth Engine",
                    )
                })
            })
            .await?,
        };

        Ok(Session::new(token.as_str()).with_project(project))
    }

    async fn search(&self, session: &Session, query: &SceneQuery) -> AnimatorResult<Vec<Scene>> {
        let mut scenes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.list_images_url(query, page_token.as_deref());
            tracing::debug!("Listing images: {}", url);

            let response = self.authorized(self.http.get(&url), session).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AnimatorError::service(
                    SERVICE,
                    format!("listImages returned {}: {}", status, body),
                ));
            }

            let body = response.bytes().await?;
            let page: ListImagesResponse = serde_json::from_slice(&body).map_err(|e| {
                AnimatorError::service(SERVICE, format!("unreadable listImages response: {}", e))
            })?;
            for asset in page.images {
                scenes.push(self.to_scene(asset)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Earth Engine returned {} scenes", scenes.len());
        Ok(scenes)
    }

    async fn logout(&self, _session: Session) -> AnimatorResult<()> {
        // OAuth access tokens simply expire
        Ok(())
    }
}

#[async_trait]
impl FrameExporter for EarthEngineClient {
    async fn export(
        &self,
        session: &Session,
        descriptor: &RenderDescriptor,
        region: &Region,
        width: u32,
        dest: &Path,
    ) -> AnimatorResult<PathBuf> {
        let project = session.project.as_deref().ok_or_else(|| {
            AnimatorError::auth("session has no Cloud project", EARTH_ENGINE_REMEDIATION)
        })?;
        let url = format!("{}/v1/projects/{}/image:computePixels", self.api_base, project);
        let body = compute_pixels_request(descriptor, region, width);
        tracing::debug!(
            "Rendering {} as {} ({} channel(s))",
            descriptor.scene_id,
            descriptor.mode,
            descriptor.channels()
        );

        let response = self
            .authorized(self.http.post(&url), session)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AnimatorError::service(
                SERVICE,
                format!("computePixels for {} returned {}: {}", descriptor.scene_id, status, text),
            ));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(dest.to_path_buf())
    }
}

/// Bounds one authentication step by the configured request timeout.
async fn auth_deadline<T>(
    timeout: Duration,
    step: &str,
    call: impl Future<Output = AnimatorResult<T>>,
) -> AnimatorResult<T> {
    tokio::time::timeout(timeout, call).await.map_err(|_| {
        AnimatorError::auth(
            format!("{} timed out after {}s", step, timeout.as_secs_f64()),
            EARTH_ENGINE_REMEDIATION,
        )
    })?
}

/// Request body for `image:computePixels`: a PNG of `width` x `width` pixels over `region`.
pub fn compute_pixels_request(descriptor: &RenderDescriptor, region: &Region, width: u32) -> Value {
    let size = width.max(1) as f64;
    json!({
        "expression": render_expression(descriptor),
        "fileFormat": "PNG",
        "grid": {
            "dimensions": { "width": width, "height": width },
            "affineTransform": {
                "scaleX": region.lon_span() / size,
                "shearX": 0.0,
                "translateX": region.west,
                "shearY": 0.0,
                "scaleY": -region.lat_span() / size,
                "translateY": region.north,
            },
            "crsCode": "EPSG:4326",
        },
    })
}

/// Serialized Earth Engine expression graph for one descriptor:
/// load -> select -> calibrate -> (normalized difference) -> visualize.
pub fn render_expression(descriptor: &RenderDescriptor) -> Value {
    let mut graph = ExpressionGraph::default();

    let loaded = graph.invoke("Image.load", json!({ "id": constant(&descriptor.scene_id) }));
    let mut image = graph.invoke(
        "Image.select",
        json!({
            "input": reference(&loaded),
            "bandSelectors": constant(descriptor.input_bands()),
        }),
    );

    if let Some(calibration) = descriptor.calibration {
        image = graph.invoke(
            "Image.multiply",
            json!({ "image1": reference(&image), "image2": image_constant(calibration.scale) }),
        );
        image = graph.invoke(
            "Image.add",
            json!({ "image1": reference(&image), "image2": image_constant(calibration.offset) }),
        );
    }

    if let RenderSource::NormalizedDifference(index) = &descriptor.source {
        image = graph.invoke(
            "Image.normalizedDifference",
            json!({
                "input": reference(&image),
                "bandNames": constant([&index.a, &index.b]),
            }),
        );
    }

    let mut visualize = json!({
        "image": reference(&image),
        "min": constant(descriptor.range.min),
        "max": constant(descriptor.range.max),
    });
    if !descriptor.ramp.is_empty() {
        let palette: Vec<String> = descriptor.ramp.iter().map(|c| c.to_hex()).collect();
        visualize["palette"] = constant(palette);
    }
    let result = graph.invoke("Image.visualize", visualize);

    graph.finish(result)
}

#[derive(Default)]
struct ExpressionGraph {
    values: Map<String, Value>,
}

impl ExpressionGraph {
    fn invoke(&mut self, function: &str, arguments: Value) -> String {
        let id = self.values.len().to_string();
        self.values.insert(
            id.clone(),
            json!({
                "functionInvocationValue": {
                    "functionName": function,
                    "arguments": arguments,
                }
            }),
        );
        id
    }

    fn finish(self, result: String) -> Value {
        json!({ "values": self.values, "result": result })
    }
}

fn constant(value: impl serde::Serialize) -> Value {
    json!({ "constantValue": value })
}

fn reference(id: &str) -> Value {
    json!({ "valueReference": id })
}

fn image_constant(value: f64) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": "Image.constant",
            "arguments": { "value": constant(value) },
        }
    })
}
