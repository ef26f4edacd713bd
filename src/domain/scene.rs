// Scene domain model - catalog entries and their month keys
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Year-month bucket a scene belongs to. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Linear scaling that converts stored digital numbers to reflectance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub scale: f64,
    pub offset: f64,
}

impl Calibration {
    /// Landsat Collection 2 Level 2 surface reflectance.
    pub const COLLECTION2_SR: Calibration = Calibration {
        scale: 0.0000275,
        offset: -0.2,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Catalog handle (Earth Engine asset id or USGS entity id)
    pub id: String,
    pub acquired: NaiveDate,
    pub cloud_cover: f64,
    /// Band identifiers present in the image
    pub bands: Vec<String>,
    pub calibration: Option<Calibration>,
    /// Pre-rendered natural colour preview, when the catalog offers one
    pub browse_url: Option<String>,
}

impl Scene {
    pub fn new(id: impl Into<String>, acquired: NaiveDate, cloud_cover: f64) -> Self {
        Self {
            id: id.into(),
            acquired,
            cloud_cover,
            bands: Vec::new(),
            calibration: None,
            browse_url: None,
        }
    }

    pub fn with_bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bands = bands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn with_browse_url(mut self, url: impl Into<String>) -> Self {
        self.browse_url = Some(url.into());
        self
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(self.acquired)
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands.iter().any(|b| b == band)
    }
}
