// Frame exporter and animation encoder traits
use crate::application::catalog_client::Session;
use crate::domain::region::Region;
use crate::domain::visualization::RenderDescriptor;
use crate::error::AnimatorResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait FrameExporter: Send + Sync {
    /// Render one frame `width` pixels wide and write it to `dest`.
    async fn export(
        &self,
        session: &Session,
        descriptor: &RenderDescriptor,
        region: &Region,
        width: u32,
        dest: &Path,
    ) -> AnimatorResult<PathBuf>;
}

pub trait AnimationEncoder: Send + Sync {
    /// Write `frames` in order as a looping animation at `fps`.
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> AnimatorResult<PathBuf>;
}
