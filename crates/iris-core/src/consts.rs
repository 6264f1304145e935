/// Default run directory, relative to the working directory.
pub const DATA_PREFIX: &str = ".iris";

/// File name of the reference store inside a run directory.
pub const REFERENCE_FILE_NAME: &str = "iris.ref";

/// Header keyword carrying the exposure odometer number.
pub const ODOMETER_KEYWORD: &str = "EXPNUM";

/// Side of a merge window, in units of the reference FWHM (pixels).
pub const DEFAULT_MERGE_WINDOW_MULTIPLIER: f64 = 15.0;

/// Percentile used to aggregate per-star FWHM into a frame FWHM.
pub const DEFAULT_FWHM_PERCENTILE: f64 = 10.0;

/// Conversion between Gaussian sigma and FWHM: 2 * sqrt(2 * ln 2).
pub const FWHM_FACTOR: f64 = 2.354_820_045;

/// Default TCP port of the remote-control listener.
pub const DEFAULT_DAEMON_PORT: u16 = 9000;

/// Maximum size of a single remote-control message.
pub const REMOTE_MESSAGE_MAX_BYTES: usize = 1024;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Stamp half-size used by the moment fitter, in units of the FWHM estimate.
pub const FIT_BOX_FWHM_COEFF: f64 = 3.0;

/// Photometric aperture radius, in units of the FWHM estimate.
pub const APERTURE_FWHM_COEFF: f64 = 1.5;

/// Inner and outer background annulus radii, in units of the FWHM estimate.
pub const ANNULUS_INNER_FWHM_COEFF: f64 = 2.0;
pub const ANNULUS_OUTER_FWHM_COEFF: f64 = 3.0;

/// Ordered statistics keys printed for each frame.
pub const KEY_LIST: [&str; 18] = [
    "odometer_nb",
    "star_nb",
    "fwhm-arc-1",
    "fwhm-arc-1_err",
    "fwhm-arc-2",
    "fwhm-arc-2_err",
    "extinction",
    "extinction_err",
    "background",
    "background_err",
    "dx-pix-1",
    "dx-pix-1_err",
    "dy-pix-1",
    "dy-pix-1_err",
    "dx-pix-2",
    "dx-pix-2_err",
    "dy-pix-2",
    "dy-pix-2_err",
];
