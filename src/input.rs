// src/input.rs
//! Per-frame keyboard and mouse state
//!
//! Window events feed key and button state, raw device motion feeds the
//! mouse delta. The UI can claim keyboard or mouse input, in which case the
//! queries report nothing held and no motion.

use cgmath::{Vector2, Zero};
use std::collections::HashSet;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_delta: Vector2<f32>,
    keyboard_captured: bool,
    mouse_captured: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            mouse_delta: Vector2::zero(),
            keyboard_captured: false,
            mouse_captured: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_mouse(*button),
                ElementState::Released => self.release_mouse(*button),
            },
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    /// Raw mouse motion, unaffected by cursor clamping at the window edge
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.add_mouse_delta(delta.0 as f32, delta.1 as f32);
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        self.mouse_buttons_down.insert(button);
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
    }

    pub fn add_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vector2::new(dx, dy);
    }

    /// Records whether the UI wants keyboard / mouse input this frame
    pub fn set_captured(&mut self, keyboard: bool, mouse: bool) {
        self.keyboard_captured = keyboard;
        self.mouse_captured = mouse;
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        !self.keyboard_captured && self.keys_down.contains(&key)
    }

    /// True only on the frame the key went down
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        !self.keyboard_captured && self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        !self.mouse_captured && self.mouse_buttons_down.contains(&button)
    }

    pub fn mouse_delta(&self) -> Vector2<f32> {
        if self.mouse_captured {
            Vector2::zero()
        } else {
            self.mouse_delta
        }
    }

    /// Clears edge-triggered state; call after the frame's update
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vector2::zero();
    }
}
