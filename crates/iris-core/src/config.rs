use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DATA_PREFIX, DEFAULT_DAEMON_PORT, DEFAULT_FWHM_PERCENTILE, DEFAULT_MERGE_WINDOW_MULTIPLIER,
    ODOMETER_KEYWORD,
};

/// Instrument whose geometry provides the default configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum InstrumentProfile {
    #[default]
    Sitelle,
}

impl std::fmt::Display for InstrumentProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sitelle => write!(f, "SITELLE"),
        }
    }
}

impl InstrumentProfile {
    /// Camera 1 field of view along X, in arcminutes.
    pub fn field_of_view_arcmin(self) -> f64 {
        match self {
            Self::Sitelle => 11.0,
        }
    }

    /// Physical pixel size of camera 1, in micrometers.
    pub fn pixel_size_um(self) -> f64 {
        match self {
            Self::Sitelle => 15.0,
        }
    }

    /// Approximate rotation of camera 2 relative to camera 1, in degrees.
    pub fn init_angle_deg(self) -> f64 {
        match self {
            Self::Sitelle => 0.0,
        }
    }

    /// Approximate camera 2 offset along X and Y, in pixels.
    pub fn init_offset(self) -> (f64, f64) {
        match self {
            Self::Sitelle => (0.0, 0.0),
        }
    }

    /// Expected seeing FWHM in arcseconds.
    pub fn init_fwhm_arc(self) -> f64 {
        match self {
            Self::Sitelle => 0.8,
        }
    }
}

/// Options of a processing run.
///
/// Every field has a default, so a partial TOML file is a valid config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub instrument: InstrumentProfile,
    /// Run directory holding the reference file and the output cubes.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Camera 1 field of view along X, in arcminutes. Together with the
    /// image width it gives the pixel scale.
    #[serde(default = "default_field_of_view")]
    pub field_of_view_arcmin: f64,
    #[serde(default = "default_pixel_size")]
    pub pixel_size_um: f64,
    /// Initial guess of the camera 2 rotation, used only on refresh.
    #[serde(default = "default_init_angle")]
    pub init_angle_deg: f64,
    #[serde(default = "default_init_dx")]
    pub init_dx: f64,
    #[serde(default = "default_init_dy")]
    pub init_dy: f64,
    /// FWHM estimate seeding star detection on refresh.
    #[serde(default = "default_init_fwhm")]
    pub init_fwhm_arc: f64,
    /// Merge window side = multiplier * reference FWHM in pixels.
    #[serde(default = "default_merge_window_multiplier")]
    pub merge_window_multiplier: f64,
    /// Percentile reported as the frame FWHM (best-seeing core).
    #[serde(default = "default_fwhm_percentile")]
    pub fwhm_percentile: f64,
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Header keyword holding the odometer number.
    #[serde(default = "default_odometer_keyword")]
    pub odometer_keyword: String,
    #[serde(default = "default_daemon_port")]
    pub daemon_port: u16,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DATA_PREFIX)
}

fn default_field_of_view() -> f64 {
    InstrumentProfile::default().field_of_view_arcmin()
}

fn default_pixel_size() -> f64 {
    InstrumentProfile::default().pixel_size_um()
}

fn default_init_angle() -> f64 {
    InstrumentProfile::default().init_angle_deg()
}

fn default_init_dx() -> f64 {
    InstrumentProfile::default().init_offset().0
}

fn default_init_dy() -> f64 {
    InstrumentProfile::default().init_offset().1
}

fn default_init_fwhm() -> f64 {
    InstrumentProfile::default().init_fwhm_arc()
}

fn default_merge_window_multiplier() -> f64 {
    DEFAULT_MERGE_WINDOW_MULTIPLIER
}

fn default_fwhm_percentile() -> f64 {
    DEFAULT_FWHM_PERCENTILE
}

fn default_odometer_keyword() -> String {
    ODOMETER_KEYWORD.to_string()
}

fn default_daemon_port() -> u16 {
    DEFAULT_DAEMON_PORT
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::for_instrument(InstrumentProfile::default())
    }
}

impl RunConfig {
    pub fn for_instrument(instrument: InstrumentProfile) -> Self {
        let (init_dx, init_dy) = instrument.init_offset();
        Self {
            instrument,
            data_dir: default_data_dir(),
            field_of_view_arcmin: instrument.field_of_view_arcmin(),
            pixel_size_um: instrument.pixel_size_um(),
            init_angle_deg: instrument.init_angle_deg(),
            init_dx,
            init_dy,
            init_fwhm_arc: instrument.init_fwhm_arc(),
            merge_window_multiplier: DEFAULT_MERGE_WINDOW_MULTIPLIER,
            fwhm_percentile: DEFAULT_FWHM_PERCENTILE,
            detection: DetectionConfig::default(),
            odometer_keyword: default_odometer_keyword(),
            daemon_port: DEFAULT_DAEMON_PORT,
        }
    }

    /// Arcseconds per pixel for an image `dimx` pixels wide.
    pub fn pixel_scale(&self, dimx: usize) -> f64 {
        if dimx == 0 {
            return f64::NAN;
        }
        self.field_of_view_arcmin * 60.0 / dimx as f64
    }
}

/// Star detection parameters of the default aligner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Detection threshold = mean + sigma_multiplier * stddev.
    pub sigma_multiplier: f64,
    /// Brightest stars kept for the reference star list.
    pub max_stars: usize,
    /// Maximum distance between a predicted and a detected camera 2 star.
    pub match_radius: f64,
    /// Connected components smaller than this are rejected as noise.
    pub min_area: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: 5.0,
            max_stars: 40,
            match_radius: 10.0,
            min_area: 3,
        }
    }
}
