use crate::config::SimConfig;
use crate::geometry::{BoundingBox, Vec2};
use crate::terrain::{LocationData, PolygonId, TerrainPolygon, TerrainSet};

use super::viewport::ViewportTransform;

/// Edges narrower than this in X are treated as vertical walls.
pub const EDGE_EPSILON: f32 = 0.001;
pub const DEFAULT_FLOOR_ID: &str = "default-floor";
pub const DEFAULT_FLOOR_NAME: &str = "Default Floor";
const DEFAULT_FLOOR_THICKNESS_PX: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    Polygon(PolygonId),
    DefaultFloor,
}

#[derive(Debug, Clone, Copy)]
pub enum GroundSurface<'a> {
    Polygon(&'a TerrainPolygon),
    DefaultFloor,
}

impl GroundSurface<'_> {
    pub fn id(&self) -> SurfaceId {
        match self {
            GroundSurface::Polygon(polygon) => SurfaceId::Polygon(polygon.id.clone()),
            GroundSurface::DefaultFloor => SurfaceId::DefaultFloor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GroundContact<'a> {
    pub ground_y: f32,
    pub surface: GroundSurface<'a>,
}

impl GroundContact<'_> {
    pub fn location_data(&self, transform: &ViewportTransform) -> LocationData {
        match self.surface {
            GroundSurface::Polygon(polygon) => polygon.location_data(),
            GroundSurface::DefaultFloor => default_floor_location(self.ground_y, transform),
        }
    }
}

/// Default floor described in natural space, like any supplier polygon.
fn default_floor_location(floor_y: f32, transform: &ViewportTransform) -> LocationData {
    let top = transform.rendered_to_natural(Vec2::new(0.0, floor_y));
    let bottom = transform.rendered_to_natural(Vec2::new(
        transform.rendered_width,
        floor_y + DEFAULT_FLOOR_THICKNESS_PX,
    ));
    LocationData {
        id: PolygonId::from(DEFAULT_FLOOR_ID),
        name: DEFAULT_FLOOR_NAME.to_string(),
        bbox: Some(BoundingBox {
            min_x: 0.0,
            min_y: top.y,
            max_x: bottom.x,
            max_y: bottom.y,
        }),
        audio_url: None,
        tts_text: None,
    }
}

/// Height of the edge `start -> end` at `x`, if `x` lies over a non-vertical edge.
pub fn edge_height_at(start: Vec2, end: Vec2, x: f32) -> Option<f32> {
    let min_x = start.x.min(end.x);
    let max_x = start.x.max(end.x);
    if x < min_x || x > max_x {
        return None;
    }
    let dx = end.x - start.x;
    if dx.abs() <= EDGE_EPSILON {
        return None;
    }
    let slope = (end.y - start.y) / dx;
    Some(start.y + slope * (x - start.x))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    char_width: f32,
    char_height: f32,
    threshold_up: f32,
    threshold_down: f32,
    default_floor_inset: f32,
}

impl CollisionResolver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            char_width: config.char_width,
            char_height: config.char_height,
            threshold_up: config.collision_threshold_up,
            threshold_down: config.collision_threshold_down,
            default_floor_inset: config.default_floor_inset,
        }
    }

    /// Bottom-center of the character box whose top-left is `(x, y)`.
    pub fn foot_position(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x + self.char_width / 2.0, y + self.char_height)
    }

    pub fn default_floor_y(&self, transform: &ViewportTransform) -> f32 {
        transform.rendered_height - self.default_floor_inset
    }

    /// Finds the topmost walkable edge under the feet, falling back to the
    /// default floor. Polygons are scaled on every call.
    pub fn check_ground<'a>(
        &self,
        x: f32,
        y: f32,
        terrain: &'a TerrainSet,
        transform: &ViewportTransform,
    ) -> Option<GroundContact<'a>> {
        let foot = self.foot_position(x, y);
        let mut best: Option<GroundContact<'a>> = None;

        for polygon in terrain.polygons() {
            for (start, end) in polygon.edges() {
                let start = transform.natural_to_rendered(start);
                let end = transform.natural_to_rendered(end);
                let Some(line_y) = edge_height_at(start, end, foot.x) else {
                    continue;
                };
                if !self.within_window(foot.y, line_y) {
                    continue;
                }
                let is_higher = best.map_or(true, |current| line_y < current.ground_y);
                if is_higher {
                    best = Some(GroundContact {
                        ground_y: line_y,
                        surface: GroundSurface::Polygon(polygon),
                    });
                }
            }
        }

        if best.is_some() {
            return best;
        }

        let floor_y = self.default_floor_y(transform);
        self.within_window(foot.y, floor_y)
            .then_some(GroundContact {
                ground_y: floor_y,
                surface: GroundSurface::DefaultFloor,
            })
    }

    fn within_window(&self, foot_y: f32, line_y: f32) -> bool {
        foot_y >= line_y - self.threshold_down && foot_y <= line_y + self.threshold_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::viewport::compute_transform;

    fn resolver() -> CollisionResolver {
        CollisionResolver::new(&SimConfig::default())
    }

    fn identity() -> ViewportTransform {
        compute_transform(800.0, 600.0, 800.0, 600.0).expect("transform")
    }

    fn rect(id: i64, top: f32, bottom: f32, left: f32, right: f32) -> TerrainPolygon {
        TerrainPolygon::new(
            id,
            format!("rect_{id}"),
            vec![
                Vec2::new(left, top),
                Vec2::new(right, top),
                Vec2::new(right, bottom),
                Vec2::new(left, bottom),
            ],
        )
    }

    fn terrain(polygons: Vec<TerrainPolygon>) -> TerrainSet {
        TerrainSet::new(polygons).expect("terrain")
    }

    fn polygon_id(contact: &GroundContact<'_>) -> SurfaceId {
        contact.surface.id()
    }

    #[test]
    fn flat_platform_catches_feet_inside_window() {
        let terrain = terrain(vec![rect(1, 500.0, 560.0, 0.0, 800.0)]);
        let resolver = resolver();
        let transform = identity();

        // Character box is 60x100, so foot_y = y + 100.
        for y in [390.0, 400.0, 412.5, 425.0] {
            let contact = resolver
                .check_ground(100.0, y, &terrain, &transform)
                .unwrap_or_else(|| panic!("contact expected at y={y}"));
            assert_eq!(contact.ground_y, 500.0);
            assert_eq!(polygon_id(&contact), SurfaceId::Polygon(PolygonId::Int(1)));
        }
    }

    #[test]
    fn feet_outside_window_miss_the_platform() {
        let terrain = terrain(vec![rect(1, 300.0, 320.0, 0.0, 800.0)]);
        let resolver = resolver();
        let transform = identity();

        assert!(resolver
            .check_ground(100.0, 189.0, &terrain, &transform)
            .is_none());
        let below = resolver.check_ground(100.0, 226.0, &terrain, &transform);
        assert!(below.map_or(true, |contact| contact.ground_y != 300.0));
    }

    #[test]
    fn falling_character_is_caught_once_feet_enter_window() {
        let terrain = terrain(vec![rect(1, 500.0, 580.0, 0.0, 800.0)]);
        let resolver = resolver();
        let transform = identity();

        let mut y = 450.0 - 100.0 - 40.0;
        let vy = 5.0;
        let mut caught = None;
        for _ in 0..40 {
            y += vy;
            if let Some(contact) = resolver.check_ground(100.0, y, &terrain, &transform) {
                caught = Some((y, contact.ground_y));
                break;
            }
        }
        let (y, ground_y) = caught.expect("caught");
        let foot_y = y + 100.0;
        assert_eq!(ground_y, 500.0);
        assert!((490.0..=525.0).contains(&foot_y), "foot_y={foot_y}");
    }

    #[test]
    fn topmost_of_overlapping_platforms_wins() {
        let terrain = terrain(vec![
            rect(1, 520.0, 600.0, 0.0, 800.0),
            rect(2, 505.0, 515.0, 50.0, 300.0),
        ]);
        let contact = resolver()
            .check_ground(100.0, 412.0, &terrain, &identity())
            .expect("contact");
        assert_eq!(contact.ground_y, 505.0);
        assert_eq!(polygon_id(&contact), SurfaceId::Polygon(PolygonId::Int(2)));
    }

    #[test]
    fn sloped_edge_is_interpolated() {
        let ramp = TerrainPolygon::new(
            3,
            "ramp",
            vec![
                Vec2::new(0.0, 400.0),
                Vec2::new(400.0, 300.0),
                Vec2::new(400.0, 600.0),
                Vec2::new(0.0, 600.0),
            ],
        );
        let terrain = terrain(vec![ramp]);
        // foot_x = 170 + 30 = 200, halfway up the ramp.
        let contact = resolver()
            .check_ground(170.0, 250.0, &terrain, &identity())
            .expect("contact");
        assert!((contact.ground_y - 350.0).abs() < 0.001);
    }

    #[test]
    fn polygons_are_scaled_to_the_current_viewport() {
        let terrain = terrain(vec![rect(1, 1000.0, 1100.0, 0.0, 1600.0)]);
        let half = compute_transform(1600.0, 1200.0, 800.0, 600.0).expect("transform");
        let contact = resolver()
            .check_ground(100.0, 400.0, &terrain, &half)
            .expect("contact");
        assert_eq!(contact.ground_y, 500.0);

        let full = compute_transform(1600.0, 1200.0, 1600.0, 1200.0).expect("transform");
        let contact = resolver()
            .check_ground(100.0, 900.0, &terrain, &full)
            .expect("contact");
        assert_eq!(contact.ground_y, 1000.0);
    }

    #[test]
    fn vertical_and_degenerate_edges_are_ignored() {
        let wall = TerrainPolygon::new(
            4,
            "wall",
            vec![Vec2::new(130.0, 100.0), Vec2::new(130.0, 590.0)],
        );
        let dot = TerrainPolygon::new(5, "dot", vec![Vec2::new(130.0, 300.0)]);
        let collinear = TerrainPolygon::new(
            6,
            "line",
            vec![
                Vec2::new(130.0, 200.0),
                Vec2::new(130.0, 250.0),
                Vec2::new(130.0, 260.0),
            ],
        );
        let terrain = terrain(vec![wall, dot, collinear]);
        assert!(resolver()
            .check_ground(100.0, 200.0, &terrain, &identity())
            .is_none());
    }

    #[test]
    fn default_floor_catches_when_no_polygon_does() {
        let transform = identity();
        let resolver = resolver();
        let empty = TerrainSet::empty();
        // Floor line sits 20px above the rendered bottom.
        let contact = resolver
            .check_ground(100.0, 480.0, &empty, &transform)
            .expect("floor contact");
        assert_eq!(contact.ground_y, 580.0);
        assert_eq!(contact.surface.id(), SurfaceId::DefaultFloor);

        let location = contact.location_data(&transform);
        assert_eq!(location.id, PolygonId::from(DEFAULT_FLOOR_ID));
        assert_eq!(location.name, DEFAULT_FLOOR_NAME);
        let bbox = location.bbox.expect("bbox");
        assert_eq!(bbox.min_y, 580.0);
        assert_eq!(bbox.max_y, 630.0);
        assert_eq!(bbox.max_x, 800.0);
    }

    #[test]
    fn default_floor_bbox_is_reported_in_natural_space() {
        let transform = compute_transform(1600.0, 1200.0, 800.0, 600.0).expect("transform");
        let terrain = TerrainSet::empty();
        let contact = resolver()
            .check_ground(100.0, 480.0, &terrain, &transform)
            .expect("floor contact");
        let bbox = contact.location_data(&transform).bbox.expect("bbox");
        assert_eq!(bbox.min_y, 1160.0);
        assert_eq!(bbox.max_x, 1600.0);
    }

    #[test]
    fn terrain_contact_suppresses_default_floor() {
        let terrain = terrain(vec![rect(1, 585.0, 600.0, 0.0, 800.0)]);
        let contact = resolver()
            .check_ground(100.0, 482.0, &terrain, &identity())
            .expect("contact");
        assert_eq!(contact.ground_y, 585.0);
        assert_eq!(polygon_id(&contact), SurfaceId::Polygon(PolygonId::Int(1)));
    }

    #[test]
    fn edge_height_respects_inclusive_extents() {
        let start = Vec2::new(0.0, 100.0);
        let end = Vec2::new(100.0, 200.0);
        assert_eq!(edge_height_at(start, end, 0.0), Some(100.0));
        assert_eq!(edge_height_at(end, start, 100.0), Some(200.0));
        assert_eq!(edge_height_at(start, end, 100.1), None);
        assert_eq!(edge_height_at(start, Vec2::new(0.0005, 300.0), 0.0), None);
    }
}
