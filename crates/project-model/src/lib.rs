//! Montage Project Model
//!
//! Defines the data contracts of container clips:
//! - **Container:** Persistent per-clip data and its deterministic program id
//! - **Render data:** Encoding configuration and project profile
//! - **Timeline:** Clips and the atomic clip replacement edit contract
//! - **Plugins:** Bundled generator scripts
//!
//! Frame positions are integer frame numbers in the project profile's rate.

pub mod container;
pub mod plugin;
pub mod render_data;
pub mod timeline;

pub use container::*;
pub use plugin::*;
pub use render_data::*;
pub use timeline::*;
