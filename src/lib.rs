// src/lib.rs
//! shadowbox
//!
//! A small real-time 3D scene renderer on wgpu and winit: textured entities
//! lit by directional, point and spot lights, a shadow map for the main
//! light, a sky cubemap, a blur post-process and an ImGui inspector.

pub mod app;
pub mod config;
pub mod error;
pub mod game;
pub mod gfx;
pub mod input;
pub mod ui;
pub mod wgpu_utils;

pub use app::run;
pub use config::GameConfig;
pub use error::{AssetError, RenderError};
pub use game::Game;
