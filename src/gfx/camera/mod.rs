pub mod camera_controller;
pub mod fly_camera;

// Re-export main types
pub use camera_controller::{read_movement, CameraMovement};
pub use fly_camera::{Camera, CameraSettings, ProjectionMode};
