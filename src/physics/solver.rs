//! Sequential impulse constraint solver.

use std::collections::HashMap;

use glam::{Mat3, Vec3};

use crate::ecs::components::physics::{RigidBody, SleepInfo};
use crate::ecs::components::transform::Pose;

use super::contact::ContactManifold;

/// Baumgarte stabilization parameter.
const BAUMGARTE_BETA: f32 = 0.2;
/// Penetration slop (allowed penetration before position correction).
const PENETRATION_SLOP: f32 = 0.005;
/// Approach speed below which restitution is ignored, so resting contacts settle.
const RESTITUTION_THRESHOLD: f32 = 1.0;

/// Velocity state of one body for the duration of a solve.
#[derive(Debug, Clone, Copy)]
struct SolverBody {
    entity: hecs::Entity,
    position: Vec3,
    inv_mass: f32,
    inv_inertia: Mat3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    dynamic: bool,
}

impl SolverBody {
    #[inline]
    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    #[inline]
    fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        if self.dynamic {
            self.linear_velocity += impulse * self.inv_mass;
            self.angular_velocity += self.inv_inertia * r.cross(impulse);
        }
    }
}

/// Solve contact constraints using sequential impulse iteration.
///
/// Manifolds must already carry warm-start impulses. Resulting velocities are
/// written back to the bodies' `RigidBody` components.
pub fn solve_contacts(
    manifolds: &mut [ContactManifold],
    world: &mut hecs::World,
    solver_iterations: u32,
    dt: f32,
) {
    if manifolds.is_empty() {
        return;
    }

    let (mut bodies, index) = gather_bodies(manifolds, world);

    for manifold in manifolds.iter_mut() {
        let (Some(&ia), Some(&ib)) = (index.get(&manifold.body_a), index.get(&manifold.body_b)) else {
            continue;
        };
        prepare_manifold(manifold, &bodies[ia], &bodies[ib], dt);
        warm_start_manifold(manifold, &mut bodies, ia, ib);
    }

    for _ in 0..solver_iterations {
        for manifold in manifolds.iter_mut() {
            let (Some(&ia), Some(&ib)) = (index.get(&manifold.body_a), index.get(&manifold.body_b)) else {
                continue;
            };
            solve_manifold(manifold, &mut bodies, ia, ib);
        }
    }

    for body in bodies.iter().filter(|b| b.dynamic) {
        if let Ok(mut rb) = world.get::<&mut RigidBody>(body.entity) {
            rb.linear_velocity = body.linear_velocity;
            rb.angular_velocity = body.angular_velocity;
        }
    }
}

/// Snapshot every body touched by a manifold, in first-seen order.
fn gather_bodies(
    manifolds: &[ContactManifold],
    world: &hecs::World,
) -> (Vec<SolverBody>, HashMap<hecs::Entity, usize>) {
    let mut bodies = Vec::new();
    let mut index = HashMap::new();

    for entity in manifolds.iter().flat_map(|m| [m.body_a, m.body_b]) {
        if index.contains_key(&entity) {
            continue;
        }
        let Ok(mut query) = world.query_one::<(&RigidBody, &Pose, Option<&SleepInfo>)>(entity) else {
            continue;
        };
        let Some((rb, pose, sleep)) = query.get() else {
            continue;
        };
        // Sleeping bodies act as immovable until something wakes them.
        let dynamic = rb.is_dynamic() && !sleep.is_some_and(|s| s.is_sleeping());
        index.insert(entity, bodies.len());
        bodies.push(SolverBody {
            entity,
            position: pose.position,
            inv_mass: if dynamic { rb.inv_mass } else { 0.0 },
            inv_inertia: if dynamic {
                rb.inv_inertia_world(pose.orientation)
            } else {
                Mat3::ZERO
            },
            linear_velocity: rb.linear_velocity,
            angular_velocity: rb.angular_velocity,
            dynamic,
        });
    }

    (bodies, index)
}

fn effective_mass(a: &SolverBody, b: &SolverBody, r_a: Vec3, r_b: Vec3, direction: Vec3) -> f32 {
    let ra_x = r_a.cross(direction);
    let rb_x = r_b.cross(direction);
    let k = a.inv_mass + b.inv_mass + (a.inv_inertia * ra_x).dot(ra_x) + (b.inv_inertia * rb_x).dot(rb_x);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

fn prepare_manifold(manifold: &mut ContactManifold, a: &SolverBody, b: &SolverBody, dt: f32) {
    let normal = manifold.normal;
    let (t1, t2) = normal.any_orthonormal_pair();

    for contact in &mut manifold.contacts {
        contact.r_a = contact.position - a.position;
        contact.r_b = contact.position - b.position;
        contact.normal_mass = effective_mass(a, b, contact.r_a, contact.r_b, normal);
        contact.tangent_mass = [
            effective_mass(a, b, contact.r_a, contact.r_b, t1),
            effective_mass(a, b, contact.r_a, contact.r_b, t2),
        ];

        // Baumgarte position correction
        let correction = BAUMGARTE_BETA / dt * (contact.penetration - PENETRATION_SLOP).max(0.0);

        let approach = (b.velocity_at(contact.r_b) - a.velocity_at(contact.r_a)).dot(normal);
        let bounce = if approach < -RESTITUTION_THRESHOLD {
            -manifold.restitution * approach
        } else {
            0.0
        };

        contact.bias = correction.max(bounce);
    }
}

fn warm_start_manifold(manifold: &ContactManifold, bodies: &mut [SolverBody], ia: usize, ib: usize) {
    let (t1, t2) = manifold.normal.any_orthonormal_pair();
    for contact in &manifold.contacts {
        let impulse = manifold.normal * contact.normal_impulse
            + t1 * contact.tangent_impulse[0]
            + t2 * contact.tangent_impulse[1];
        if impulse == Vec3::ZERO {
            continue;
        }
        bodies[ia].apply_impulse(-impulse, contact.r_a);
        bodies[ib].apply_impulse(impulse, contact.r_b);
    }
}

fn solve_manifold(manifold: &mut ContactManifold, bodies: &mut [SolverBody], ia: usize, ib: usize) {
    let normal = manifold.normal;
    let tangents = {
        let (t1, t2) = normal.any_orthonormal_pair();
        [t1, t2]
    };

    for contact in &mut manifold.contacts {
        // Normal impulse
        let dv = bodies[ib].velocity_at(contact.r_b) - bodies[ia].velocity_at(contact.r_a);
        let vn = dv.dot(normal);
        let lambda = contact.normal_mass * (-vn + contact.bias);

        // Clamp accumulated normal impulse
        let old_impulse = contact.normal_impulse;
        contact.normal_impulse = (old_impulse + lambda).max(0.0);
        let applied = normal * (contact.normal_impulse - old_impulse);
        bodies[ia].apply_impulse(-applied, contact.r_a);
        bodies[ib].apply_impulse(applied, contact.r_b);

        // Coulomb friction: |Jt| <= mu * |Jn|
        let max_friction = manifold.friction * contact.normal_impulse;
        for (k, tangent) in tangents.iter().enumerate() {
            let dv = bodies[ib].velocity_at(contact.r_b) - bodies[ia].velocity_at(contact.r_a);
            let lambda = -dv.dot(*tangent) * contact.tangent_mass[k];

            let old_impulse = contact.tangent_impulse[k];
            contact.tangent_impulse[k] = (old_impulse + lambda).clamp(-max_friction, max_friction);
            let applied = *tangent * (contact.tangent_impulse[k] - old_impulse);
            bodies[ia].apply_impulse(-applied, contact.r_a);
            bodies[ib].apply_impulse(applied, contact.r_b);
        }
    }
}
