use crate::geometry::Vec2;

/// Contain-fit mapping from natural image space onto the container.
///
/// Rendered space is the scaled image with its origin at the image's top-left
/// corner; the offsets place that origin inside the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rendered_width: f32,
    pub rendered_height: f32,
}

impl ViewportTransform {
    pub fn natural_to_rendered(&self, point: Vec2) -> Vec2 {
        point * self.scale
    }

    pub fn rendered_to_natural(&self, point: Vec2) -> Vec2 {
        point * (1.0 / self.scale)
    }

    pub fn rendered_to_container(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x + self.offset_x, point.y + self.offset_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

pub fn compute_transform(
    natural_width: f32,
    natural_height: f32,
    container_width: f32,
    container_height: f32,
) -> Option<ViewportTransform> {
    let all_positive = [natural_width, natural_height, container_width, container_height]
        .iter()
        .all(|value| value.is_finite() && *value > 0.0);
    if !all_positive {
        return None;
    }

    let container_ratio = container_width / container_height;
    let image_ratio = natural_width / natural_height;

    if image_ratio < container_ratio {
        // Taller than the container: pillarbox.
        let scale = container_height / natural_height;
        let rendered_width = natural_width * scale;
        Some(ViewportTransform {
            scale,
            offset_x: ((container_width - rendered_width) / 2.0).max(0.0),
            offset_y: 0.0,
            rendered_width,
            rendered_height: container_height,
        })
    } else {
        let scale = container_width / natural_width;
        let rendered_height = natural_height * scale;
        Some(ViewportTransform {
            scale,
            offset_x: 0.0,
            offset_y: ((container_height - rendered_height) / 2.0).max(0.0),
            rendered_width: container_width,
            rendered_height,
        })
    }
}

/// Keeps the transform in sync with container resizes and natural-size arrival.
#[derive(Debug, Clone, Default)]
pub struct ViewportMapper {
    natural: Option<NaturalSize>,
    container: (u32, u32),
    transform: Option<ViewportTransform>,
}

impl ViewportMapper {
    pub fn new(container_width: u32, container_height: u32) -> Self {
        Self {
            natural: None,
            container: (container_width, container_height),
            transform: None,
        }
    }

    pub fn transform(&self) -> Option<ViewportTransform> {
        self.transform
    }

    pub fn natural_size(&self) -> Option<NaturalSize> {
        self.natural
    }

    pub fn container_size(&self) -> (u32, u32) {
        self.container
    }

    /// Returns true when the transform changed.
    pub fn set_container_size(&mut self, width: u32, height: u32) -> bool {
        self.container = (width, height);
        self.recompute()
    }

    /// Returns true when the transform changed.
    pub fn set_natural_size(&mut self, natural: NaturalSize) -> bool {
        self.natural = Some(natural);
        self.recompute()
    }

    fn recompute(&mut self) -> bool {
        let next = self.natural.and_then(|natural| {
            compute_transform(
                natural.width as f32,
                natural.height as f32,
                self.container.0 as f32,
                self.container.1 as f32,
            )
        });
        // A minimized window reports zero size; keep the last good transform.
        let next = match (next, self.transform) {
            (None, Some(previous)) if self.natural.is_some() => Some(previous),
            (next, _) => next,
        };
        let changed = next != self.transform;
        self.transform = next;
        changed
    }
}
