//! Montage Render Session Store
//!
//! The filesystem protocol between the editor and its external renderers.
//! The editor writes render parameters and abort requests; renderers write
//! status reports and completion markers; both sides poll. Status survives
//! independent poll ticks and process restarts because it lives on disk.

pub mod status;
pub mod store;

pub use status::*;
pub use store::*;
