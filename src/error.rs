// src/error.rs
//! Error types for the renderer and asset loaders
//!
//! Resource creation failures are fatal and bubble up to the binary through
//! `anyhow`. Missing optional shader bindings are never errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while creating or driving GPU resources
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable graphics adapter found: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create logical device: {0}")]
    DeviceRequest(String),

    #[error("failed to create window surface: {0}")]
    Surface(String),

    #[error("surface lost or out of memory: {0}")]
    SurfaceAcquire(String),

    #[error("invalid texture size {width}x{height} for '{label}' (max {max})")]
    InvalidTextureSize {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("empty {kind} buffer for '{label}'")]
    EmptyBuffer { kind: &'static str, label: String },

    #[error("GPU validation failed while creating '{label}': {message}")]
    Validation { label: String, message: String },

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
}

/// Failures raised while loading geometry or images from disk
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load geometry file {path}: {source}")]
    Geometry {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("geometry file {path} contains no triangles")]
    EmptyGeometry { path: PathBuf },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cubemap face {path} is {width}x{height}, expected a square {expected}x{expected} face")]
    CubemapFace {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },
}
