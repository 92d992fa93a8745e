//! Montage Render Engine
//!
//! Renders container clips out of process and swaps the results back onto
//! the timeline.
//!
//! # Render Flow
//!
//! ```text
//! render_*() ──► JobQueue (Queued)
//!                    │
//!                    ▼
//!              start_render ──► renderer subprocess
//!                    │                 │ writes status / complete / error
//!                    ▼                 ▼
//!        update_render_status ◄── session store
//!                    │
//!                    ▼
//!        TimelineEditGateway::apply_edit (rendered media replaces clip)
//! ```
//!
//! Program specific behavior (validation, launch arguments, progress
//! interpretation) lives behind [`adapter::ProgramAdapter`].

pub mod actions;
pub mod adapter;
pub mod jobs;
pub mod launcher;
pub mod media;
pub mod placeholder;
pub mod thumbnail;

pub use actions::*;
pub use adapter::{
    adapter_for, clamp_progress, LaunchMode, PreviewRenderer, ProgramAdapter, RenderRange,
    SubprocessPreviewRenderer, ValidationError,
};
pub use jobs::*;
pub use launcher::*;
