//! # pip-compositor: picture-in-picture video compositing core
//!
//! Builds a graph that decodes two video sources, overlays the second onto
//! the first through a compositor, and presents the result. The core owns
//! topology, linking, lifecycle and terminal-event handling; decoding and
//! rendering belong to a media framework behind the
//! [`framework::MediaFramework`] trait.
//!
//! ## Architecture
//!
//! - **Pipeline**: node registry, static and dynamic linkers, mixer slots,
//!   lifecycle controller and event monitor
//! - **Framework**: the media framework seam plus a simulated framework
//! - **Communication**: crossbeam channels for pad announcements and the
//!   message bus
//!
//! ## Configuration
//!
//! `PipConfig` is read from TOML; see [`config`] for the lookup order.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pip_compositor::{config::PipConfig, framework::SimFramework, pipeline::PipelineBuilder};
//!
//! let (pipeline, _ids) = PipelineBuilder::new(PipConfig::default())
//!     .build(Arc::new(SimFramework::new()))?;
//! let report = pipeline.run()?;
//! std::process::exit(report.exit_code());
//! ```

pub mod config;
pub mod error;
pub mod framework;
pub mod pipeline;

// Re-export commonly used types
pub use config::PipConfig;
pub use error::{CompositorError, Result};
pub use framework::{MediaFramework, SimFramework};
pub use pipeline::{Pipeline, PipelineBuilder, RunReport, TerminalEvent};
