// Animation service - Use case for building a monthly time-lapse
use crate::application::catalog_client::{CatalogClient, SceneQuery, Session};
use crate::application::frame_exporter::{AnimationEncoder, FrameExporter};
use crate::domain::location::{Coordinates, location_slug};
use crate::domain::region::{Footprint, Region};
use crate::domain::scene::Scene;
use crate::domain::selection::select_monthly;
use crate::domain::visualization::{Recipe, RecipeCatalog};
use crate::error::{AnimatorError, AnimatorResult};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AnimationRequest {
    /// Location exactly as the user gave it, used for the output name
    pub location: String,
    pub center: Coordinates,
    pub mode: String,
    pub max_cloud_cover: f64,
    pub fps: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSummary {
    pub path: PathBuf,
    pub frames: usize,
    pub fps: u32,
}

/// Hooks for user-facing progress output.
pub trait ProgressReporter: Send + Sync {
    fn searching(&self, _request: &AnimationRequest, _recipe: &Recipe, _dataset: &str) {}
    fn scenes_selected(&self, _found: usize, _monthly: usize) {}
    fn frames_started(&self, _total: usize) {}
    fn frame_finished(&self, _scene: &Scene) {}
    fn frames_finished(&self) {}
    fn encoding(&self) {}
}

#[derive(Clone)]
pub struct AnimationService {
    catalog: Arc<dyn CatalogClient>,
    exporter: Arc<dyn FrameExporter>,
    encoder: Arc<dyn AnimationEncoder>,
    recipes: RecipeCatalog,
    footprint: Footprint,
    output_dir: PathBuf,
}

impl AnimationService {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        exporter: Arc<dyn FrameExporter>,
        encoder: Arc<dyn AnimationEncoder>,
        recipes: RecipeCatalog,
        footprint: Footprint,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            exporter,
            encoder,
            recipes,
            footprint,
            output_dir,
        }
    }

    pub fn recipes(&self) -> &RecipeCatalog {
        &self.recipes
    }

    pub async fn generate(
        &self,
        request: &AnimationRequest,
        progress: &dyn ProgressReporter,
    ) -> AnimatorResult<AnimationSummary> {
        let recipe = self.recipes.get(&request.mode)?;
        let region = Region::around(request.center, self.footprint)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let session = self.catalog.authenticate().await?;
        tracing::info!("Authenticated with {}", self.catalog.dataset());

        let result = self
            .run(&session, recipe, region, request, progress)
            .await;

        // Release the session on every exit path; the pipeline result wins.
        if let Err(e) = self.catalog.logout(session).await {
            tracing::warn!("Failed to log out of catalog session: {}", e);
        }

        result
    }

    async fn run(
        &self,
        session: &Session,
        recipe: &Recipe,
        region: Region,
        request: &AnimationRequest,
        progress: &dyn ProgressReporter,
    ) -> AnimatorResult<AnimationSummary> {
        progress.searching(request, recipe, self.catalog.dataset());

        let query = SceneQuery {
            region,
            start: request.start,
            end: request.end,
            max_cloud_cover: request.max_cloud_cover,
        };

        let scenes = match self.catalog.search(session, &query).await {
            Ok(scenes) => scenes,
            Err(e) if e.is_transient() => {
                tracing::warn!("Scene search failed, treating as no results: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let found = scenes.len();
        let monthly = select_monthly(scenes);
        if monthly.is_empty() {
            return Err(AnimatorError::NoScenes);
        }
        tracing::info!("Selected {} monthly scenes from {} candidates", monthly.len(), found);
        progress.scenes_selected(found, monthly.len());

        // Frames live in a scoped directory that is removed however we leave.
        let frames_dir = tempfile::Builder::new()
            .prefix(".frames-")
            .tempdir_in(&self.output_dir)?;

        progress.frames_started(monthly.len());
        let mut frames = Vec::with_capacity(monthly.len());
        for scene in &monthly {
            let descriptor = recipe.render(scene)?;
            let dest = frames_dir
                .path()
                .join(format!("landsat_{}.png", scene.month_key()));

            tracing::debug!("Exporting {} for {}", scene.id, scene.month_key());
            let path = self
                .exporter
                .export(session, &descriptor, &region, self.footprint.pixels, &dest)
                .await?;
            frames.push(path);
            progress.frame_finished(scene);
        }
        progress.frames_finished();

        progress.encoding();
        let output = self.output_dir.join(output_file_name(
            &request.location,
            recipe.mode,
            chrono::Local::now().naive_local(),
        ));
        let path = self.encoder.encode(&frames, request.fps, &output)?;

        frames_dir.close()?;

        Ok(AnimationSummary {
            path,
            frames: frames.len(),
            fps: request.fps,
        })
    }
}

pub fn output_file_name(location: &str, mode: &str, generated_at: chrono::NaiveDateTime) -> String {
    format!(
        "landsat_{}_{}_{}.gif",
        location_slug(location),
        mode,
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::visualization::BandNaming;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct SilentProgress;

    impl ProgressReporter for SilentProgress {}

    #[derive(Default)]
    struct FakeCatalog {
        scenes: Vec<Scene>,
        fail_search_transiently: bool,
        fail_auth: bool,
        events: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        fn dataset(&self) -> &str {
            "fake"
        }

        async fn authenticate(&self) -> AnimatorResult<Session> {
            self.events.lock().unwrap().push("auth".into());
            if self.fail_auth {
                return Err(AnimatorError::auth("denied", "set credentials"));
            }
            Ok(Session::new("token"))
        }

        async fn search(&self, _session: &Session, query: &SceneQuery) -> AnimatorResult<Vec<Scene>> {
            self.events
                .lock()
                .unwrap()
                .push(format!("search<{}", query.max_cloud_cover));
            if self.fail_search_transiently {
                // Nothing listens on the discard port, so the connection is refused
                let err = reqwest::Client::new()
                    .get("http://127.0.0.1:9/")
                    .send()
                    .await
                    .unwrap_err();
                return Err(AnimatorError::Network(err));
            }
            Ok(self.scenes.clone())
        }

        async fn logout(&self, session: Session) -> AnimatorResult<()> {
            self.events.lock().unwrap().push(format!("logout:{}", session.token));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeExporter {
        fail_on: Option<String>,
        exported: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl FrameExporter for FakeExporter {
        async fn export(
            &self,
            _session: &Session,
            descriptor: &crate::domain::visualization::RenderDescriptor,
            _region: &Region,
            width: u32,
            dest: &Path,
        ) -> AnimatorResult<PathBuf> {
            assert_eq!(width, 1024);
            if self.fail_on.as_deref() == Some(descriptor.scene_id.as_str()) {
                return Err(AnimatorError::service("fake", "render failed"));
            }
            std::fs::write(dest, descriptor.scene_id.as_bytes())?;
            self.exported.lock().unwrap().push(dest.to_path_buf());
            Ok(dest.to_path_buf())
        }
    }

    #[derive(Default)]
    struct FakeEncoder {
        encoded: Mutex<Vec<String>>,
    }

    impl AnimationEncoder for FakeEncoder {
        fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> AnimatorResult<PathBuf> {
            let mut names = Vec::new();
            for frame in frames {
                assert!(frame.exists(), "frame {:?} removed before encoding", frame);
                names.push(frame.file_name().unwrap().to_string_lossy().to_string());
            }
            *self.encoded.lock().unwrap() = names;
            std::fs::write(output, format!("{} frames @ {}", frames.len(), fps))?;
            Ok(output.to_path_buf())
        }
    }

    fn scene(id: &str, y: i32, m: u32, d: u32, cloud: f64) -> Scene {
        Scene::new(id, NaiveDate::from_ymd_opt(y, m, d).unwrap(), cloud)
            .with_bands(["SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7"])
    }

    fn request(mode: &str) -> AnimationRequest {
        AnimationRequest {
            location: "San Francisco".into(),
            center: Coordinates::new(37.7749, -122.4194).unwrap(),
            mode: mode.into(),
            max_cloud_cover: 10.0,
            fps: 12,
            start: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        }
    }

    struct Harness {
        catalog: Arc<FakeCatalog>,
        exporter: Arc<FakeExporter>,
        encoder: Arc<FakeEncoder>,
        service: AnimationService,
        dir: tempfile::TempDir,
    }

    fn harness(catalog: FakeCatalog, exporter: FakeExporter) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(catalog);
        let exporter = Arc::new(exporter);
        let encoder = Arc::new(FakeEncoder::default());
        let service = AnimationService::new(
            catalog.clone(),
            exporter.clone(),
            encoder.clone(),
            RecipeCatalog::full(BandNaming::Collection2),
            Footprint::default(),
            dir.path().join("output"),
        );
        Harness {
            catalog,
            exporter,
            encoder,
            service,
            dir,
        }
    }

    fn leftover_frame_dirs(output: &Path) -> usize {
        std::fs::read_dir(output)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with(".frames-"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_generates_one_frame_per_month_in_order() {
        let h = harness(
            FakeCatalog {
                scenes: vec![
                    scene("feb", 2020, 2, 9, 8.0),
                    scene("jan-cloudy", 2020, 1, 3, 5.0),
                    scene("jan-clear", 2020, 1, 19, 2.0),
                ],
                ..Default::default()
            },
            FakeExporter::default(),
        );

        let summary = h.service.generate(&request("ndvi"), &SilentProgress).await.unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.fps, 12);
        assert!(summary.path.exists());
        let name = summary.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("landsat_San_Francisco_ndvi_"));
        assert!(name.ends_with(".gif"));

        assert_eq!(
            *h.encoder.encoded.lock().unwrap(),
            vec!["landsat_2020-01.png".to_string(), "landsat_2020-02.png".to_string()]
        );
        let exported = h.exporter.exported.lock().unwrap().clone();
        assert_eq!(exported.len(), 2);
        assert!(exported.iter().all(|frame| !frame.exists()));
        assert_eq!(leftover_frame_dirs(&h.dir.path().join("output")), 0);
        assert_eq!(h.catalog.events(), vec!["auth", "search<10", "logout:token"]);
    }

    #[tokio::test]
    async fn test_unknown_mode_fails_before_authenticating() {
        let h = harness(FakeCatalog::default(), FakeExporter::default());
        let err = h
            .service
            .generate(&request("thermal"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnimatorError::UnknownMode { .. }));
        assert!(h.catalog.events().is_empty());
    }

    #[tokio::test]
    async fn test_no_scenes_is_reported_and_session_released() {
        let h = harness(FakeCatalog::default(), FakeExporter::default());
        let err = h
            .service
            .generate(&request("rgb"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnimatorError::NoScenes));
        assert_eq!(h.catalog.events().last().unwrap(), "logout:token");
    }

    #[tokio::test]
    async fn test_transient_search_failure_becomes_no_scenes() {
        let h = harness(
            FakeCatalog {
                scenes: vec![scene("jan", 2020, 1, 1, 1.0)],
                fail_search_transiently: true,
                ..Default::default()
            },
            FakeExporter::default(),
        );
        let err = h
            .service
            .generate(&request("rgb"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnimatorError::NoScenes));
        assert_eq!(h.catalog.events().last().unwrap(), "logout:token");
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let h = harness(
            FakeCatalog {
                fail_auth: true,
                ..Default::default()
            },
            FakeExporter::default(),
        );
        let err = h
            .service
            .generate(&request("rgb"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnimatorError::Auth { .. }));
        assert_eq!(h.catalog.events(), vec!["auth".to_string()]);
    }

    #[tokio::test]
    async fn test_export_failure_cleans_up_frames_and_logs_out() {
        let h = harness(
            FakeCatalog {
                scenes: vec![
                    scene("jan", 2020, 1, 1, 1.0),
                    scene("feb", 2020, 2, 1, 1.0),
                    scene("mar", 2020, 3, 1, 1.0),
                ],
                ..Default::default()
            },
            FakeExporter {
                fail_on: Some("feb".into()),
                ..Default::default()
            },
        );

        let err = h
            .service
            .generate(&request("rgb"), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, AnimatorError::Service { .. }));
        assert_eq!(h.exporter.exported.lock().unwrap().len(), 1);
        assert_eq!(leftover_frame_dirs(&h.dir.path().join("output")), 0);
        assert_eq!(h.catalog.events().last().unwrap(), "logout:token");
        assert!(h.encoder.encoded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_band_fails_fast() {
        let h = harness(
            FakeCatalog {
                scenes: vec![scene("jan", 2020, 1, 1, 1.0)],
                ..Default::default()
            },
            FakeExporter::default(),
        );
        let err = h
            .service
            .generate(&request("panchromatic"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnimatorError::MissingBand { ref band, .. } if band == "SR_B8"));
        assert!(h.exporter.exported.lock().unwrap().is_empty());
    }

    #[test]
    fn test_output_file_name() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(
            output_file_name("-3.4653,-62.2159", "ndvi", at),
            "landsat_-3.4653_-62.2159_ndvi_20240305_140709.gif"
        );
    }
}
