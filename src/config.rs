// src/config.rs
//! Startup configuration
//!
//! Defaults describe the demo scene. [`GameConfig::from_env`] overlays
//! `SHADOWBOX_*` environment variables so the binary can be tuned without
//! recompiling.

use std::path::PathBuf;
use std::str::FromStr;

use crate::gfx::rendering::shadow_map::ShadowResolution;

/// Window, shadow and post-process settings used by [`crate::game::Game::init`]
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub shadow_resolution: ShadowResolution,
    /// Width and height of the light's orthographic volume in world units
    pub shadow_projection_size: f32,
    pub blur_radius: u32,
    /// Directory holding optional `.obj` meshes, textures and `sky/` cubemap faces
    pub asset_dir: Option<PathBuf>,
    pub animate: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "shadowbox".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            shadow_resolution: ShadowResolution::R2048,
            shadow_projection_size: 20.0,
            blur_radius: 0,
            asset_dir: None,
            animate: true,
        }
    }
}

impl GameConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_shadow_resolution(mut self, resolution: ShadowResolution) -> Self {
        self.shadow_resolution = resolution;
        self
    }

    pub fn with_shadow_projection_size(mut self, size: f32) -> Self {
        self.shadow_projection_size = size;
        self
    }

    pub fn with_blur_radius(mut self, radius: u32) -> Self {
        self.blur_radius = radius;
        self
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = Some(dir.into());
        self
    }

    pub fn with_animation(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }

    /// Defaults overlaid with any `SHADOWBOX_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup. Values that fail to parse are
    /// logged and skipped.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = parse_var(&lookup, "SHADOWBOX_WIDTH") {
            self.width = width;
        }
        if let Some(height) = parse_var(&lookup, "SHADOWBOX_HEIGHT") {
            self.height = height;
        }
        if let Some(vsync) = parse_var(&lookup, "SHADOWBOX_VSYNC") {
            self.vsync = vsync;
        }
        if let Some(size) = parse_var::<u32, _>(&lookup, "SHADOWBOX_SHADOW_RESOLUTION") {
            match ShadowResolution::from_size(size) {
                Some(resolution) => self.shadow_resolution = resolution,
                None => log::warn!(
                    "SHADOWBOX_SHADOW_RESOLUTION={} is not one of {:?}, keeping {}",
                    size,
                    ShadowResolution::ALL.map(|r| r.size()),
                    self.shadow_resolution.size()
                ),
            }
        }
        if let Some(radius) = parse_var(&lookup, "SHADOWBOX_BLUR_RADIUS") {
            self.blur_radius = radius;
        }
        if let Some(dir) = lookup("SHADOWBOX_ASSET_DIR").filter(|d| !d.is_empty()) {
            self.asset_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overlay_applies_valid_values() {
        let config = GameConfig::default().overlay(lookup_from(&[
            ("SHADOWBOX_WIDTH", "1920"),
            ("SHADOWBOX_HEIGHT", "1080"),
            ("SHADOWBOX_SHADOW_RESOLUTION", "4096"),
            ("SHADOWBOX_BLUR_RADIUS", "3"),
            ("SHADOWBOX_ASSET_DIR", "assets"),
        ]));

        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.shadow_resolution, ShadowResolution::R4096);
        assert_eq!(config.blur_radius, 3);
        assert_eq!(config.asset_dir, Some(PathBuf::from("assets")));
    }

    #[test]
    fn test_overlay_ignores_invalid_values() {
        let config = GameConfig::default().overlay(lookup_from(&[
            ("SHADOWBOX_WIDTH", "wide"),
            ("SHADOWBOX_SHADOW_RESOLUTION", "1000"),
            ("SHADOWBOX_VSYNC", "maybe"),
        ]));

        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_builder_methods() {
        let config = GameConfig::default()
            .with_size(800, 400)
            .with_blur_radius(2)
            .with_animation(false);

        assert_eq!(config.aspect_ratio(), 2.0);
        assert_eq!(config.blur_radius, 2);
        assert!(!config.animate);
    }
}
