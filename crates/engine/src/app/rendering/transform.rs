use crate::app::viewport::ViewportTransform;
use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Rendered-space point to a framebuffer pixel, letterbox offsets included.
pub fn rendered_to_screen_px(point: Vec2, transform: &ViewportTransform) -> (i32, i32) {
    let screen = transform.rendered_to_container(point);
    (screen.x.round() as i32, screen.y.round() as i32)
}

/// Natural-space point (terrain authoring space) to a framebuffer pixel.
pub fn natural_to_screen_px(point: Vec2, transform: &ViewportTransform) -> (i32, i32) {
    rendered_to_screen_px(transform.natural_to_rendered(point), transform)
}
