//! Transform hierarchy propagation system.

use glam::Mat4;

use crate::ecs::components::transform::{Children, GlobalTransform, Parent, Transform};

/// Recompute every `GlobalTransform` from local transforms and the
/// Parent/Children hierarchy. Returns the number of entities updated.
///
/// Roots (no `Parent`) take their local matrix; descendants are visited
/// depth-first with an explicit stack, so deep model hierarchies cannot
/// overflow the call stack.
pub fn transform_system(world: &mut hecs::World) -> usize {
    let mut stack: Vec<(hecs::Entity, Mat4)> = world
        .query_mut::<hecs::Without<(&Transform, &mut GlobalTransform), &Parent>>()
        .into_iter()
        .map(|(entity, (transform, global))| {
            global.0 = transform.to_matrix();
            (entity, global.0)
        })
        .collect();

    let mut updated = stack.len();

    while let Some((parent, parent_global)) = stack.pop() {
        let children = match world.get::<&Children>(parent) {
            Ok(c) => c.0.clone(),
            Err(_) => continue,
        };

        for child in children {
            let child_global = match world.get::<&Transform>(child) {
                Ok(transform) => parent_global * transform.to_matrix(),
                Err(_) => parent_global,
            };
            if let Ok(mut global) = world.get::<&mut GlobalTransform>(child) {
                global.0 = child_global;
                updated += 1;
            }
            stack.push((child, child_global));
        }
    }

    updated
}
