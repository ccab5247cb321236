//! weld-core library.
//!
//! Core data layer for the weld fusion pipeline: the typed element graph
//! model, the JSON fragment input contract, configuration, and the
//! Integrity/Shape/Config error taxonomy.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per failure domain; `anyhow::Result`
//!   with context only at orchestration boundaries.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//! - **Determinism**: all maps and sets that feed output are ordered
//!   (`BTreeMap`/`BTreeSet`); element iteration preserves insertion order.

pub mod config;
pub mod error;
pub mod fragment;
pub mod graph;
pub mod model;

pub use config::{FusionConfig, OutputConfig, WeldConfig};
pub use error::{ConfigError, ErrorCode, IntegrityError, ShapeError, WeldError};
pub use fragment::{Fragment, ModelDescriptor};
pub use graph::ElementGraph;
pub use model::{AttrValue, Element, ElementKind};
