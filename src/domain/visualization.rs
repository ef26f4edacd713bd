// Visualization recipes and render descriptors
use crate::domain::scene::{Calibration, Scene};
use crate::error::{AnimatorError, AnimatorResult};
use std::fmt;

pub const DEFAULT_MODE: &str = "rgb";

/// Every mode any deployment knows about, in display order.
pub const MODE_NAMES: [&str; 6] = [
    "rgb",
    "false_color",
    "ndvi",
    "panchromatic",
    "built_up",
    "snow",
];

/// Band identifiers differ between Landsat dataset generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandNaming {
    /// `B1`..`B11`
    Collection1,
    /// Level-2 surface reflectance, `SR_B1`..`SR_B7`
    Collection2,
}

impl BandNaming {
    pub fn for_collection(collection: &str) -> Self {
        let upper = collection.to_ascii_uppercase();
        if upper.contains("C02") && upper.contains("L2") {
            BandNaming::Collection2
        } else {
            BandNaming::Collection1
        }
    }

    pub fn band(&self, number: u8) -> String {
        match self {
            BandNaming::Collection1 => format!("B{}", number),
            BandNaming::Collection2 => format!("SR_B{}", number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

impl DisplayRange {
    pub const REFLECTANCE: DisplayRange = DisplayRange { min: 0.0, max: 0.3 };
    pub const INDEX: DisplayRange = DisplayRange { min: -1.0, max: 1.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// `(a - b) / (a + b)` evaluated per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDifference {
    pub a: String,
    pub b: String,
}

impl NormalizedDifference {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }
}

impl fmt::Display for NormalizedDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({a} - {b}) / ({a} + {b})", a = self.a, b = self.b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecipeKind {
    BandSelect {
        bands: Vec<String>,
        range: DisplayRange,
    },
    Expression {
        index: NormalizedDifference,
        range: DisplayRange,
        ramp: Vec<Color>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub mode: &'static str,
    pub description: &'static str,
    pub kind: RecipeKind,
}

impl Recipe {
    pub fn required_bands(&self) -> Vec<&str> {
        match &self.kind {
            RecipeKind::BandSelect { bands, .. } => bands.iter().map(String::as_str).collect(),
            RecipeKind::Expression { index, .. } => vec![index.a.as_str(), index.b.as_str()],
        }
    }

    /// Bind this recipe to a scene, failing on the first band the scene lacks.
    pub fn render(&self, scene: &Scene) -> AnimatorResult<RenderDescriptor> {
        if let Some(missing) = self.required_bands().into_iter().find(|b| !scene.has_band(b)) {
            return Err(AnimatorError::MissingBand {
                band: missing.to_string(),
                mode: self.mode.to_string(),
                scene_id: scene.id.clone(),
            });
        }

        let (source, range, ramp) = match &self.kind {
            RecipeKind::BandSelect { bands, range } => {
                (RenderSource::Bands(bands.clone()), *range, Vec::new())
            }
            RecipeKind::Expression { index, range, ramp } => (
                RenderSource::NormalizedDifference(index.clone()),
                *range,
                ramp.clone(),
            ),
        };

        Ok(RenderDescriptor {
            scene_id: scene.id.clone(),
            mode: self.mode,
            source,
            range,
            ramp,
            calibration: scene.calibration,
            browse_url: scene.browse_url.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderSource {
    Bands(Vec<String>),
    NormalizedDifference(NormalizedDifference),
}

/// Everything a frame exporter needs to produce one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDescriptor {
    pub scene_id: String,
    pub mode: &'static str,
    pub source: RenderSource,
    pub range: DisplayRange,
    pub ramp: Vec<Color>,
    pub calibration: Option<Calibration>,
    pub browse_url: Option<String>,
}

impl RenderDescriptor {
    /// 1 for grayscale or index output, 3 for RGB composites.
    pub fn channels(&self) -> usize {
        match &self.source {
            RenderSource::Bands(bands) => bands.len(),
            RenderSource::NormalizedDifference(_) => 1,
        }
    }

    pub fn input_bands(&self) -> Vec<&str> {
        match &self.source {
            RenderSource::Bands(bands) => bands.iter().map(String::as_str).collect(),
            RenderSource::NormalizedDifference(index) => vec![index.a.as_str(), index.b.as_str()],
        }
    }
}

/// Static mode -> recipe table for one deployment.
#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
}

impl RecipeCatalog {
    /// All six recipes, rendered server-side from raw bands.
    pub fn full(naming: BandNaming) -> Self {
        let b = |n| naming.band(n);
        let reflectance = |bands: Vec<String>| RecipeKind::BandSelect {
            bands,
            range: DisplayRange::REFLECTANCE,
        };
        let index = |first: String, second: String, ramp: [Color; 3]| RecipeKind::Expression {
            index: NormalizedDifference::new(first, second),
            range: DisplayRange::INDEX,
            ramp: ramp.to_vec(),
        };

        let recipes = vec![
            Recipe {
                mode: "rgb",
                description: "Natural color (RGB)",
                kind: reflectance(vec![b(4), b(3), b(2)]),
            },
            Recipe {
                mode: "false_color",
                description: "False color infrared",
                kind: reflectance(vec![b(5), b(4), b(3)]),
            },
            Recipe {
                mode: "ndvi",
                description: "Normalized Difference Vegetation Index",
                kind: index(b(5), b(4), [Color::BLUE, Color::WHITE, Color::GREEN]),
            },
            Recipe {
                mode: "panchromatic",
                description: "Panchromatic (grayscale)",
                kind: reflectance(vec![b(8)]),
            },
            Recipe {
                mode: "built_up",
                description: "Built-up index",
                kind: index(b(6), b(5), [Color::WHITE, Color::YELLOW, Color::RED]),
            },
            Recipe {
                mode: "snow",
                description: "Normalized Difference Snow Index",
                kind: index(b(3), b(6), [Color::BLACK, Color::CYAN, Color::WHITE]),
            },
        ];

        Self { recipes }
    }

    /// Only what pre-rendered natural colour browse imagery can show.
    pub fn browse_only(naming: BandNaming) -> Self {
        let full = Self::full(naming);
        Self {
            recipes: full
                .recipes
                .into_iter()
                .filter(|r| r.mode == "rgb")
                .collect(),
        }
    }

    pub fn get(&self, mode: &str) -> AnimatorResult<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.mode == mode)
            .ok_or_else(|| AnimatorError::UnknownMode {
                mode: mode.to_string(),
                available: self.modes().join(", "),
            })
    }

    pub fn modes(&self) -> Vec<&'static str> {
        self.recipes.iter().map(|r| r.mode).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }
}
