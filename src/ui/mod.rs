//! # User Interface Module
//!
//! A Dear ImGui debug overlay for the demo scene.
//!
//! - [`UiManager`] wires ImGui into winit and wgpu and draws the overlay on
//!   top of the presented frame
//! - [`panel`] builds the inspector window from a [`SceneSnapshot`]
//! - [`edits`] holds the snapshot and edit types shared with the game
//!
//! The UI never mutates the scene. Edits are queued in [`PendingEdits`] and
//! applied by [`Game::apply_edits`](crate::game::Game::apply_edits) once per
//! frame. While ImGui wants the keyboard or mouse, camera input is masked.

pub mod edits;
pub mod manager;
pub mod panel;

pub use edits::{PendingEdits, SceneEdit, SceneSnapshot};
pub use manager::UiManager;
pub use panel::{debug_panel, PanelState};
