//! Pointer picking: NDC → ray → nearest pickable node, plus hover tracking.
//!
//! Rays are tested against each node's [`PickShape`] in node-local space, so
//! scaled and rotated models pick correctly without baking their geometry.

use glam::{Mat4, Vec2, Vec3};
use tracing::info;

use crate::ecs::components::scene::PickShape;
use crate::renderer::viewer::Viewer;
use crate::scene::{NodeId, Scene};

/// Hits closer than this are treated as starting behind the ray origin.
const MIN_HIT_DISTANCE: f32 = 1.0e-6;

/// A world-space ray with unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray. Returns `None` for a zero-length or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        if !origin.is_finite() {
            return None;
        }
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray through a normalized device coordinate.
    ///
    /// NDC outside `[-1, 1]` on either axis, or non-finite, yields `None`.
    /// The ray starts on the near plane and heads toward the far plane.
    pub fn from_ndc(ndc: Vec2, viewer: &dyn Viewer) -> Option<Self> {
        if !ndc.is_finite() || ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            return None;
        }
        let near = viewer.unproject(ndc.extend(0.0))?;
        let far = viewer.unproject(ndc.extend(1.0))?;
        Self::new(near, far - near)
    }
}

/// Nearest intersection found by [`PointerPicker::pick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
}

/// Ray against a shape placed by `world` (which may carry scale).
///
/// Returns the world-space distance along `ray`.
pub fn intersect_shape(ray: &Ray, shape: &PickShape, world: &Mat4) -> Option<f32> {
    if world.determinant().abs() < f32::EPSILON * f32::EPSILON {
        return None;
    }
    let inv = world.inverse();
    // The local direction keeps its length, so the ray parameter stays a
    // world-space distance.
    let origin = inv.transform_point3(ray.origin);
    let direction = inv.transform_vector3(ray.direction);

    match shape {
        PickShape::Box { half_extents } => ray_aabb(origin, direction, -*half_extents, *half_extents),
        PickShape::Sphere { radius } => ray_sphere(origin, direction, *radius),
        PickShape::Triangles(triangles) => triangles
            .iter()
            .filter_map(|[v0, v1, v2]| ray_triangle(origin, direction, *v0, *v1, *v2))
            .min_by(f32::total_cmp),
    }
}

/// Slab test. Returns the entry distance, or the exit distance when the
/// origin is inside the box.
fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv_d = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv_d;
        let mut t1 = (max[axis] - o) * inv_d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    nearest_positive(t_min, t_max)
}

fn ray_sphere(origin: Vec3, direction: Vec3, radius: f32) -> Option<f32> {
    let a = direction.length_squared();
    let b = 2.0 * origin.dot(direction);
    let c = origin.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    nearest_positive((-b - sqrt_d) / (2.0 * a), (-b + sqrt_d) / (2.0 * a))
}

/// Möller–Trumbore, two-sided.
fn ray_triangle(origin: Vec3, direction: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1.0e-8;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None; // Parallel
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > MIN_HIT_DISTANCE).then_some(t)
}

fn nearest_positive(t0: f32, t1: f32) -> Option<f32> {
    if t0 > MIN_HIT_DISTANCE {
        Some(t0)
    } else if t1 > MIN_HIT_DISTANCE {
        Some(t1)
    } else {
        None
    }
}

/// Hover state carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    NoHover,
    Hovering(NodeId),
}

/// Transition emitted by [`PointerPicker::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverEvent {
    Enter(NodeId),
    Leave(NodeId),
}

/// Casts pointer rays into a [`Scene`] and tracks which node is hovered.
#[derive(Debug, Default)]
pub struct PointerPicker {
    state: HoverState,
}

impl PointerPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    /// Node under the pointer as of the last [`PointerPicker::update`].
    pub fn hovered(&self) -> Option<NodeId> {
        match self.state {
            HoverState::NoHover => None,
            HoverState::Hovering(node) => Some(node),
        }
    }

    /// Nearest pickable candidate under `ndc`, as seen by `viewer`.
    pub fn pick(&self, ndc: Vec2, viewer: &dyn Viewer, scene: &Scene, candidates: &[NodeId]) -> Option<PickHit> {
        let ray = Ray::from_ndc(ndc, viewer)?;
        self.pick_ray(&ray, scene, candidates)
    }

    /// Nearest hit along `ray` among `candidates`.
    ///
    /// Only pickable, visible nodes with pick geometry are tested. Equal
    /// distances keep the earlier candidate.
    pub fn pick_ray(&self, ray: &Ray, scene: &Scene, candidates: &[NodeId]) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;

        for &node in candidates {
            if !scene.is_pick_candidate(node) {
                continue;
            }
            let (Some(shape), Some(world)) = (scene.pick_shape(node), scene.global_matrix(node)) else {
                continue;
            };
            let Some(distance) = intersect_shape(ray, &shape, &world) else {
                continue;
            };
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(PickHit {
                    node,
                    distance,
                    point: ray.point_at(distance),
                });
            }
        }

        best
    }

    /// Advance the hover state machine with this frame's pick result.
    pub fn update(&mut self, hit: Option<NodeId>) -> Vec<HoverEvent> {
        let mut events = Vec::new();
        match (self.state, hit) {
            (HoverState::NoHover, None) => {}
            (HoverState::NoHover, Some(node)) => {
                events.push(HoverEvent::Enter(node));
            }
            (HoverState::Hovering(current), None) => {
                events.push(HoverEvent::Leave(current));
            }
            (HoverState::Hovering(current), Some(node)) if current == node => {}
            (HoverState::Hovering(current), Some(node)) => {
                events.push(HoverEvent::Leave(current));
                events.push(HoverEvent::Enter(node));
            }
        }

        for event in &events {
            match event {
                HoverEvent::Enter(node) => info!(?node, "Pointer entered node"),
                HoverEvent::Leave(node) => info!(?node, "Pointer left node"),
            }
        }

        self.state = match hit {
            Some(node) => HoverState::Hovering(node),
            None => HoverState::NoHover,
        };
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::viewer::Camera;
    use crate::scene::VisualNodeDesc;
    use glam::Quat;

    fn camera() -> Camera {
        Camera::new_perspective(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0, 0.1, 100.0)
    }

    fn scene_with(descs: Vec<VisualNodeDesc>) -> (Scene, Vec<NodeId>) {
        let mut scene = Scene::new();
        let ids = descs.into_iter().map(|d| scene.spawn(d)).collect();
        scene.update_transforms();
        (scene, ids)
    }

    #[test]
    fn test_ray_rejects_degenerate_input() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
        assert!(Ray::from_ndc(Vec2::new(1.5, 0.0), &camera()).is_none());
        assert!(Ray::from_ndc(Vec2::new(f32::INFINITY, 0.0), &camera()).is_none());
    }

    #[test]
    fn test_center_ray_looks_down_view_axis() {
        let ray = Ray::from_ndc(Vec2::ZERO, &camera()).unwrap();
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.z - 4.9).abs() < 1e-3);
    }

    #[test]
    fn test_nearest_hit_wins() {
        let (scene, ids) = scene_with(vec![
            VisualNodeDesc::new("far")
                .with_position(Vec3::new(0.0, 0.0, -2.0))
                .pickable(PickShape::cuboid(Vec3::splat(0.5))),
            VisualNodeDesc::new("near").pickable(PickShape::cuboid(Vec3::splat(0.5))),
        ]);

        let picker = PointerPicker::new();
        let hit = picker.pick(Vec2::ZERO, &camera(), &scene, &ids).unwrap();
        assert_eq!(hit.node, ids[1]);
        assert!((hit.distance - 4.4).abs() < 1e-3);
        assert!((hit.point.z - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_orthographic_rays_stay_parallel() {
        let camera = Camera::new_orthographic(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 4.0, 4.0, 0.1, 100.0);
        let (scene, ids) = scene_with(vec![VisualNodeDesc::new("side")
            .with_position(Vec3::new(1.0, 0.0, 0.0))
            .pickable(PickShape::cuboid(Vec3::splat(0.25)))]);

        let ray = Ray::from_ndc(Vec2::new(0.5, 0.0), &camera).unwrap();
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin - Vec3::new(1.0, 0.0, 4.9)).length() < 1e-3);

        let picker = PointerPicker::new();
        let hit = picker.pick(Vec2::new(0.5, 0.0), &camera, &scene, &ids).unwrap();
        assert_eq!(hit.node, ids[0]);
        assert!((hit.distance - 4.65).abs() < 1e-3, "distance = {}", hit.distance);
        assert!(picker.pick(Vec2::ZERO, &camera, &scene, &ids).is_none());
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let (scene, ids) = scene_with(vec![
            VisualNodeDesc::new("a").pickable(PickShape::cuboid(Vec3::splat(0.5))),
            VisualNodeDesc::new("b").pickable(PickShape::cuboid(Vec3::splat(0.5))),
        ]);
        let picker = PointerPicker::new();

        let hit = picker.pick(Vec2::ZERO, &camera(), &scene, &ids).unwrap();
        assert_eq!(hit.node, ids[0]);
        let reversed = [ids[1], ids[0]];
        let hit = picker.pick(Vec2::ZERO, &camera(), &scene, &reversed).unwrap();
        assert_eq!(hit.node, ids[1]);
    }

    #[test]
    fn test_scaled_rotated_node_picks_in_local_space() {
        // A model authored in centimetres, scaled down and turned.
        let (scene, ids) = scene_with(vec![VisualNodeDesc::new("model")
            .with_scale(Vec3::splat(0.01))
            .with_rotation(Quat::from_rotation_y(0.3))
            .pickable(PickShape::Sphere { radius: 50.0 })]);

        let picker = PointerPicker::new();
        let hit = picker.pick(Vec2::ZERO, &camera(), &scene, &ids).unwrap();
        assert!((hit.distance - 4.4).abs() < 1e-3, "distance = {}", hit.distance);
        assert!(picker.pick(Vec2::new(0.5, 0.5), &camera(), &scene, &ids).is_none());
    }

    #[test]
    fn test_triangle_soup_hit() {
        let tri = [Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        let (scene, ids) = scene_with(vec![VisualNodeDesc::new("tri").pickable(PickShape::triangles(vec![tri]))]);

        let picker = PointerPicker::new();
        let hit = picker.pick(Vec2::ZERO, &camera(), &scene, &ids).unwrap();
        assert!((hit.distance - 4.9).abs() < 1e-3);
    }

    #[test]
    fn test_hidden_and_unpickable_nodes_skipped() {
        let (scene, ids) = scene_with(vec![
            VisualNodeDesc::new("hidden").pickable(PickShape::cuboid(Vec3::splat(0.5))).hidden(),
            VisualNodeDesc::new("decor").with_position(Vec3::new(0.0, 0.0, -1.0)),
        ]);
        let picker = PointerPicker::new();
        assert!(picker.pick(Vec2::ZERO, &camera(), &scene, &ids).is_none());
    }

    #[test]
    fn test_hover_fires_once_per_transition() {
        let mut world = hecs::World::new();
        let n = NodeId(world.spawn(()));
        let m = NodeId(world.spawn(()));

        let mut picker = PointerPicker::new();
        let events: Vec<HoverEvent> = [Some(n), Some(n), Some(n), None, None, Some(m)]
            .into_iter()
            .flat_map(|hit| picker.update(hit))
            .collect();

        assert_eq!(
            events,
            vec![HoverEvent::Enter(n), HoverEvent::Leave(n), HoverEvent::Enter(m)]
        );
        assert_eq!(picker.state(), HoverState::Hovering(m));
    }

    #[test]
    fn test_hover_switches_directly_between_nodes() {
        let mut world = hecs::World::new();
        let n = NodeId(world.spawn(()));
        let m = NodeId(world.spawn(()));

        let mut picker = PointerPicker::new();
        picker.update(Some(n));
        assert_eq!(picker.update(Some(m)), vec![HoverEvent::Leave(n), HoverEvent::Enter(m)]);
        assert_eq!(picker.hovered(), Some(m));
    }
}
