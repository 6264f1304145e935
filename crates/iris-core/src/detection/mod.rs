pub mod components;
pub mod stars;
pub mod threshold;

pub use stars::{detect_stars, DetectedStar};
