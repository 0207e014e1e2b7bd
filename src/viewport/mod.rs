/// Screen and world coordinate mapping.
pub mod mapper;

pub use mapper::{MAX_ZOOM, MIN_ZOOM, Viewport, ZOOM_STEP, screen_to_world, world_to_screen};
