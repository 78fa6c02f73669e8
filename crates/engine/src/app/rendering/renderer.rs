use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::action::ActionState;
use crate::app::collision::SurfaceId;
use crate::app::physics::Facing;
use crate::app::simulation::BodySnapshot;
use crate::app::viewport::ViewportTransform;
use crate::geometry::Vec2;
use crate::terrain::TerrainSet;

use super::background::BackgroundImage;
use super::transform::{natural_to_screen_px, rendered_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const LETTERBOX_COLOR: [u8; 4] = [10, 11, 14, 255];
const OUTLINE_COLOR: [u8; 4] = [80, 220, 255, 255];
const GROUND_OUTLINE_COLOR: [u8; 4] = [255, 210, 70, 255];
const DEFAULT_FLOOR_COLOR: [u8; 4] = [255, 120, 120, 255];
const FACING_MARKER_HALF_SIZE_PX: i32 = 3;

/// Everything one frame needs; borrowed from the host for the draw call.
pub struct SceneView<'a> {
    pub transform: Option<ViewportTransform>,
    pub background: Option<&'a BackgroundImage>,
    pub terrain: &'a TerrainSet,
    pub ground: Option<&'a SurfaceId>,
    pub body: BodySnapshot,
    pub char_size: Vec2,
    pub default_floor_y: Option<f32>,
    pub show_background: bool,
    pub show_outlines: bool,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, view: &SceneView<'_>) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        draw_scene(self.pixels.frame_mut(), self.viewport, view);
        self.pixels.render()
    }
}

pub(crate) fn draw_scene(frame: &mut [u8], viewport: Viewport, view: &SceneView<'_>) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&LETTERBOX_COLOR);
    }
    let Some(transform) = view.transform else {
        return;
    };

    let rendered_rect = ScreenRect::from_rendered(&transform);
    match view.background.filter(|_| view.show_background) {
        Some(background) => blit_background(frame, viewport, &transform, background),
        None => fill_rect(frame, viewport, rendered_rect, CLEAR_COLOR),
    }

    if view.show_outlines {
        for polygon in view.terrain.polygons() {
            let is_ground = matches!(
                view.ground,
                Some(SurfaceId::Polygon(id)) if *id == polygon.id
            );
            let color = if is_ground {
                GROUND_OUTLINE_COLOR
            } else {
                OUTLINE_COLOR
            };
            for (start, end) in polygon.edges() {
                let (x0, y0) = natural_to_screen_px(start, &transform);
                let (x1, y1) = natural_to_screen_px(end, &transform);
                draw_line_clipped(frame, viewport, x0, y0, x1, y1, color);
            }
        }
        if let Some(floor_y) = view.default_floor_y {
            let (x0, y) = rendered_to_screen_px(Vec2::new(0.0, floor_y), &transform);
            let (x1, _) =
                rendered_to_screen_px(Vec2::new(transform.rendered_width, floor_y), &transform);
            let color = if view.ground == Some(&SurfaceId::DefaultFloor) {
                GROUND_OUTLINE_COLOR
            } else {
                DEFAULT_FLOOR_COLOR
            };
            draw_line_clipped(frame, viewport, x0, y, x1, y, color);
        }
    }

    draw_character(frame, viewport, &transform, view.body, view.char_size);
}

fn draw_character(
    frame: &mut [u8],
    viewport: Viewport,
    transform: &ViewportTransform,
    body: BodySnapshot,
    char_size: Vec2,
) {
    let (left, top) = rendered_to_screen_px(body.position, transform);
    let (right, bottom) = rendered_to_screen_px(body.position + char_size, transform);
    let color = state_color(body.state);
    let rect = ScreenRect {
        left,
        top,
        right: right - 1,
        bottom: bottom - 1,
    };
    fill_rect(frame, viewport, rect, dim(color));
    outline_rect(frame, viewport, rect, color);

    let marker_x = match body.facing {
        Facing::Left => left + FACING_MARKER_HALF_SIZE_PX,
        Facing::Right => right - 1 - FACING_MARKER_HALF_SIZE_PX,
    };
    let marker_y = top + (bottom - top) / 4;
    let marker = ScreenRect {
        left: marker_x - FACING_MARKER_HALF_SIZE_PX,
        top: marker_y - FACING_MARKER_HALF_SIZE_PX,
        right: marker_x + FACING_MARKER_HALF_SIZE_PX,
        bottom: marker_y + FACING_MARKER_HALF_SIZE_PX,
    };
    fill_rect(frame, viewport, marker, [255, 255, 255, 255]);
}

pub(crate) fn state_color(state: ActionState) -> [u8; 4] {
    match state {
        ActionState::Idle => [220, 220, 240, 255],
        ActionState::Run => [120, 220, 120, 255],
        ActionState::Jump => [120, 160, 255, 255],
        ActionState::Speak => [255, 236, 120, 255],
        ActionState::Dance => [230, 120, 230, 255],
        ActionState::Wave => [255, 170, 90, 255],
    }
}

fn dim(color: [u8; 4]) -> [u8; 4] {
    [color[0] / 3, color[1] / 3, color[2] / 3, 255]
}

/// Nearest-neighbour scale of the natural image into the rendered rect.
fn blit_background(
    frame: &mut [u8],
    viewport: Viewport,
    transform: &ViewportTransform,
    background: &BackgroundImage,
) {
    let rect = ScreenRect::from_rendered(transform).clipped(viewport);
    let Some(rect) = rect else {
        return;
    };
    let inverse_scale = 1.0 / transform.scale;
    for y in rect.top..=rect.bottom {
        let natural_y = ((y as f32 + 0.5 - transform.offset_y) * inverse_scale).max(0.0) as u32;
        for x in rect.left..=rect.right {
            let natural_x =
                ((x as f32 + 0.5 - transform.offset_x) * inverse_scale).max(0.0) as u32;
            write_pixel_rgba_clipped(
                frame,
                viewport.width as usize,
                x,
                y,
                background.sample(natural_x, natural_y),
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl ScreenRect {
    fn from_rendered(transform: &ViewportTransform) -> Self {
        let (left, top) = rendered_to_screen_px(Vec2::ZERO, transform);
        let (right, bottom) = rendered_to_screen_px(
            Vec2::new(transform.rendered_width, transform.rendered_height),
            transform,
        );
        Self {
            left,
            top,
            right: right - 1,
            bottom: bottom - 1,
        }
    }

    fn clipped(self, viewport: Viewport) -> Option<Self> {
        let rect = Self {
            left: self.left.max(0),
            top: self.top.max(0),
            right: self.right.min(viewport.width as i32 - 1),
            bottom: self.bottom.min(viewport.height as i32 - 1),
        };
        (rect.left <= rect.right && rect.top <= rect.bottom).then_some(rect)
    }
}

fn fill_rect(frame: &mut [u8], viewport: Viewport, rect: ScreenRect, color: [u8; 4]) {
    let Some(rect) = rect.clipped(viewport) else {
        return;
    };
    for y in rect.top..=rect.bottom {
        for x in rect.left..=rect.right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn outline_rect(frame: &mut [u8], viewport: Viewport, rect: ScreenRect, color: [u8; 4]) {
    let ScreenRect {
        left,
        top,
        right,
        bottom,
    } = rect;
    draw_line_clipped(frame, viewport, left, top, right, top, color);
    draw_line_clipped(frame, viewport, left, bottom, right, bottom, color);
    draw_line_clipped(frame, viewport, left, top, left, bottom, color);
    draw_line_clipped(frame, viewport, right, top, right, bottom, color);
}

/// Bresenham line; off-screen pixels are skipped.
fn draw_line_clipped(
    frame: &mut [u8],
    viewport: Viewport,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: [u8; 4],
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let step_x = if x0 < x1 { 1 } else { -1 };
    let step_y = if y0 < y1 { 1 } else { -1 };
    let mut error = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        if x >= 0 && y >= 0 && x < viewport.width as i32 && y < viewport.height as i32 {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::viewport::compute_transform;
    use crate::terrain::TerrainPolygon;

    const VIEWPORT: Viewport = Viewport {
        width: 40,
        height: 20,
    };

    fn frame() -> Vec<u8> {
        vec![0; (VIEWPORT.width * VIEWPORT.height * 4) as usize]
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * VIEWPORT.width + x) * 4) as usize;
        let mut out = [0u8; 4];
        out.copy_from_slice(&frame[offset..offset + 4]);
        out
    }

    fn body_at(x: f32, y: f32, state: ActionState) -> BodySnapshot {
        BodySnapshot {
            tick: 0,
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            facing: Facing::Right,
            on_ground: true,
            state,
        }
    }

    fn view<'a>(terrain: &'a TerrainSet, transform: Option<ViewportTransform>) -> SceneView<'a> {
        SceneView {
            transform,
            background: None,
            terrain,
            ground: None,
            body: body_at(0.0, 0.0, ActionState::Idle),
            char_size: Vec2::new(4.0, 6.0),
            default_floor_y: None,
            show_background: true,
            show_outlines: true,
        }
    }

    #[test]
    fn renderer_type_is_non_generic() {
        let _renderer: Option<Renderer> = None;
    }

    #[test]
    fn without_transform_only_letterbox_is_drawn() {
        let terrain = TerrainSet::empty();
        let mut frame = frame();
        draw_scene(&mut frame, VIEWPORT, &view(&terrain, None));
        assert!(frame
            .chunks_exact(4)
            .all(|chunk| chunk == LETTERBOX_COLOR.as_slice()));
    }

    #[test]
    fn background_fills_only_rendered_rect() {
        // 10x10 image in a 40x20 viewport: scale 2, pillarboxed by 10 px.
        let transform = compute_transform(10.0, 10.0, 40.0, 20.0).expect("transform");
        let mut rgba = vec![0u8; 10 * 10 * 4];
        for chunk in rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[1, 2, 3, 255]);
        }
        let background = BackgroundImage::from_rgba(10, 10, rgba).expect("image");
        let terrain = TerrainSet::empty();
        let mut scene = view(&terrain, Some(transform));
        scene.background = Some(&background);
        scene.body = body_at(16.0, 0.0, ActionState::Idle);

        let mut frame = frame();
        draw_scene(&mut frame, VIEWPORT, &scene);

        assert_eq!(pixel(&frame, 5, 10), LETTERBOX_COLOR);
        assert_eq!(pixel(&frame, 10, 19), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, 29, 19), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, 30, 10), LETTERBOX_COLOR);
    }

    #[test]
    fn hidden_background_uses_clear_color() {
        let transform = compute_transform(40.0, 20.0, 40.0, 20.0).expect("transform");
        let background = BackgroundImage::from_rgba(1, 1, vec![9, 9, 9, 255]).expect("image");
        let terrain = TerrainSet::empty();
        let mut scene = view(&terrain, Some(transform));
        scene.background = Some(&background);
        scene.show_background = false;
        scene.body = body_at(30.0, 0.0, ActionState::Idle);

        let mut frame = frame();
        draw_scene(&mut frame, VIEWPORT, &scene);
        assert_eq!(pixel(&frame, 5, 15), CLEAR_COLOR);
    }

    #[test]
    fn character_outline_uses_state_color() {
        let transform = compute_transform(40.0, 20.0, 40.0, 20.0).expect("transform");
        let terrain = TerrainSet::empty();
        let mut scene = view(&terrain, Some(transform));
        scene.body = body_at(2.0, 3.0, ActionState::Dance);
        scene.char_size = Vec2::new(10.0, 12.0);

        let mut frame = frame();
        draw_scene(&mut frame, VIEWPORT, &scene);
        let color = state_color(ActionState::Dance);
        assert_eq!(pixel(&frame, 2, 3), color);
        assert_eq!(pixel(&frame, 11, 14), color);
        assert_eq!(pixel(&frame, 3, 12), dim(color));
        assert_eq!(pixel(&frame, 12, 3), CLEAR_COLOR);
    }

    #[test]
    fn ground_polygon_is_highlighted() {
        let transform = compute_transform(40.0, 20.0, 40.0, 20.0).expect("transform");
        let polygon = TerrainPolygon::new(
            1,
            "ledge",
            vec![
                Vec2::new(10.0, 15.0),
                Vec2::new(30.0, 15.0),
                Vec2::new(30.0, 18.0),
                Vec2::new(10.0, 18.0),
            ],
        );
        let ground = SurfaceId::Polygon(polygon.id.clone());
        let terrain = TerrainSet::new(vec![polygon]).expect("terrain");
        let mut scene = view(&terrain, Some(transform));
        scene.body = body_at(0.0, 0.0, ActionState::Idle);

        let mut frame = frame();
        draw_scene(&mut frame, VIEWPORT, &scene);
        assert_eq!(pixel(&frame, 20, 15), OUTLINE_COLOR);

        scene.ground = Some(&ground);
        draw_scene(&mut frame, VIEWPORT, &scene);
        assert_eq!(pixel(&frame, 20, 15), GROUND_OUTLINE_COLOR);
    }

    #[test]
    fn lines_clip_at_frame_edges() {
        let mut frame = frame();
        draw_line_clipped(&mut frame, VIEWPORT, -10, 5, 100, 5, [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, 0, 5), [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, 39, 5), [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, 0, 6), [0, 0, 0, 0]);
    }
}
