// Console progress output for the animation pipeline
use crate::application::animation_service::{AnimationRequest, AnimationSummary, ProgressReporter};
use crate::domain::scene::Scene;
use crate::domain::visualization::Recipe;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Prints pipeline milestones to stdout and draws a bar while frames export.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }
}

impl ProgressReporter for ConsoleProgress {
    fn searching(&self, request: &AnimationRequest, recipe: &Recipe, dataset: &str) {
        println!("Processing location: {}", request.location);
        println!("Coordinates: {}", request.center);
        println!(
            "Fetching images from {} to {}",
            request.start.format("%Y-%m-%d"),
            request.end.format("%Y-%m-%d")
        );
        println!("Cloud cover filter: <{}%", request.max_cloud_cover);
        println!("Visualization mode: {} - {}", recipe.mode, recipe.description);
        println!("Using collection: {}", dataset);
    }

    fn scenes_selected(&self, found: usize, monthly: usize) {
        println!("Found {} images, {} monthly images after selection", found, monthly);
    }

    fn frames_started(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        // A bad template only costs the styling
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("Processing images");
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn frame_finished(&self, scene: &Scene) {
        self.with_bar(|bar| {
            bar.set_message(format!("Processing images ({})", scene.month_key()));
            bar.inc(1);
        });
    }

    fn frames_finished(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_with_message("Processing images");
        }
    }

    fn encoding(&self) {
        println!("Creating animated GIF...");
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        // An aborted run leaves the bar half drawn otherwise
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.abandon();
        }
    }
}

pub fn print_summary(summary: &AnimationSummary) {
    println!("\nGIF created successfully: {}", summary.path.display());
    println!("Number of frames: {}", summary.frames);
    println!("Frame rate: {} FPS", summary.fps);
}
