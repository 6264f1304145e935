pub mod align;
pub mod config;
pub mod consts;
pub mod context;
pub mod detection;
pub mod error;
pub mod fit;
pub mod frame;
pub mod history;
pub mod io;
pub mod merge;
pub mod remote;
pub mod stats;
