//! Rigid body integration functions.

use glam::{Quat, Vec3};

use crate::ecs::components::physics::{RigidBody, SleepInfo, SleepState};
use crate::ecs::components::transform::Pose;

use super::PhysicsConfig;

/// Apply gravity force to all awake dynamic rigid bodies.
pub fn apply_gravity(world: &mut hecs::World, gravity: Vec3) {
    for (_, (rb, sleep)) in world.query_mut::<(&mut RigidBody, Option<&SleepInfo>)>() {
        let is_sleeping = sleep.is_some_and(|s| s.is_sleeping());
        if rb.is_dynamic() && !is_sleeping {
            rb.force_accumulator += gravity * rb.mass;
        }
    }
}

/// Integrate velocities using semi-implicit Euler: v += (F/m) * dt.
///
/// Returns the number of bodies integrated.
pub fn integrate_velocities(world: &mut hecs::World, dt: f32) -> usize {
    let mut count = 0;
    for (_, (rb, pose, sleep)) in
        world.query_mut::<(&mut RigidBody, &Pose, Option<&SleepInfo>)>()
    {
        let is_sleeping = sleep.is_some_and(|s| s.is_sleeping());
        if !rb.is_dynamic() || is_sleeping {
            continue;
        }

        rb.linear_velocity += rb.force_accumulator * rb.inv_mass * dt;
        let inv_inertia = rb.inv_inertia_world(pose.orientation);
        rb.angular_velocity += inv_inertia * rb.torque_accumulator * dt;

        // Damping is expressed per second
        rb.linear_velocity *= (1.0 - rb.linear_damping).max(0.0).powf(dt);
        rb.angular_velocity *= (1.0 - rb.angular_damping).max(0.0).powf(dt);
        count += 1;
    }
    count
}

/// Integrate positions: p += v * dt, q += 0.5 * omega * q * dt.
pub fn integrate_positions(world: &mut hecs::World, dt: f32) {
    for (_, (rb, pose, sleep)) in world.query_mut::<(&RigidBody, &mut Pose, Option<&SleepInfo>)>() {
        let is_sleeping = sleep.is_some_and(|s| s.is_sleeping());
        if !rb.is_dynamic() || is_sleeping {
            continue;
        }

        pose.position += rb.linear_velocity * dt;

        let omega = rb.angular_velocity;
        if omega.length_squared() > 1e-10 {
            let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
            let q_dot = omega_quat * pose.orientation * 0.5;
            pose.orientation = Quat::from_xyzw(
                pose.orientation.x + q_dot.x * dt,
                pose.orientation.y + q_dot.y * dt,
                pose.orientation.z + q_dot.z * dt,
                pose.orientation.w + q_dot.w * dt,
            )
            .normalize();
        }
    }
}

/// Clear force and torque accumulators on all rigid bodies.
pub fn clear_forces(world: &mut hecs::World) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        rb.force_accumulator = Vec3::ZERO;
        rb.torque_accumulator = Vec3::ZERO;
    }
}

/// Update sleep states for all dynamic bodies.
///
/// Bodies with velocities below the configured thresholds for
/// `sleep_time_limit` seconds transition to `Sleeping` and lose their
/// residual velocity. Sleeping bodies skip integration and gravity.
pub fn update_sleep_states(world: &mut hecs::World, dt: f32, config: &PhysicsConfig) {
    if !config.allow_sleep {
        return;
    }
    for (_, (rb, sleep)) in world.query_mut::<(&mut RigidBody, &mut SleepInfo)>() {
        if !rb.is_dynamic() || sleep.is_sleeping() {
            continue;
        }

        let linear_speed = rb.linear_velocity.length();
        let angular_speed = rb.angular_velocity.length();

        if linear_speed < config.sleep_linear_threshold && angular_speed < config.sleep_angular_threshold {
            sleep.timer += dt;
            if sleep.timer >= config.sleep_time_limit {
                sleep.state = SleepState::Sleeping;
                rb.linear_velocity = Vec3::ZERO;
                rb.angular_velocity = Vec3::ZERO;
            }
        } else {
            sleep.timer = 0.0;
        }
    }
}

/// Wake up a specific entity's rigid body. Returns true if it was asleep.
///
/// Awake bodies keep their sleep timer.
pub fn wake_body(world: &mut hecs::World, entity: hecs::Entity) -> bool {
    if let Ok(mut sleep) = world.get::<&mut SleepInfo>(entity) {
        if sleep.is_sleeping() {
            sleep.state = SleepState::Awake;
            sleep.timer = 0.0;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Collider;

    fn spawn_body(world: &mut hecs::World, position: Vec3, mass: f32) -> hecs::Entity {
        let collider = Collider::cuboid(Vec3::splat(0.5));
        let rb = RigidBody::new(mass, &collider);
        world.spawn((Pose::from_position(position), rb, collider, SleepInfo::default()))
    }

    #[test]
    fn test_free_fall() {
        let mut world = hecs::World::new();
        let entity = spawn_body(&mut world, Vec3::new(0.0, 10.0, 0.0), 1.0);

        let gravity = Vec3::new(0.0, -9.82, 0.0);
        let dt = 1.0 / 60.0;

        // Simulate 1 second (60 steps)
        for _ in 0..60 {
            apply_gravity(&mut world, gravity);
            integrate_velocities(&mut world, dt);
            integrate_positions(&mut world, dt);
            clear_forces(&mut world);
        }

        let pose = world.get::<&Pose>(entity).unwrap();

        // y = 10 - 0.5 * 9.82 * 1^2 ≈ 5.09; semi-implicit Euler lands a bit lower
        assert!(pose.position.y < 5.2, "y = {}", pose.position.y);
        assert!(pose.position.y > 4.8, "y = {}", pose.position.y);

        let eps = 1e-5;
        assert!(pose.position.x.abs() < eps);
        assert!(pose.position.z.abs() < eps);
    }

    #[test]
    fn test_static_body_unaffected() {
        let mut world = hecs::World::new();
        let entity = spawn_body(&mut world, Vec3::ZERO, 0.0);

        let gravity = Vec3::new(0.0, -9.82, 0.0);
        let dt = 1.0 / 60.0;

        for _ in 0..60 {
            apply_gravity(&mut world, gravity);
            assert_eq!(integrate_velocities(&mut world, dt), 0);
            integrate_positions(&mut world, dt);
            clear_forces(&mut world);
        }

        let pose = world.get::<&Pose>(entity).unwrap();
        assert_eq!(pose.position, Vec3::ZERO);
    }

    #[test]
    fn test_clear_forces() {
        let mut world = hecs::World::new();
        let entity = spawn_body(&mut world, Vec3::ZERO, 1.0);
        {
            let mut rb = world.get::<&mut RigidBody>(entity).unwrap();
            rb.force_accumulator = Vec3::new(10.0, 20.0, 30.0);
            rb.torque_accumulator = Vec3::new(1.0, 2.0, 3.0);
        }

        clear_forces(&mut world);

        let rb = world.get::<&RigidBody>(entity).unwrap();
        assert_eq!(rb.force_accumulator, Vec3::ZERO);
        assert_eq!(rb.torque_accumulator, Vec3::ZERO);
    }

    #[test]
    fn test_slow_body_falls_asleep_and_wakes() {
        let mut world = hecs::World::new();
        let entity = spawn_body(&mut world, Vec3::ZERO, 1.0);
        world.get::<&mut RigidBody>(entity).unwrap().linear_velocity = Vec3::new(0.05, 0.0, 0.0);

        let config = PhysicsConfig::default();
        let dt = 1.0 / 60.0;
        for _ in 0..59 {
            update_sleep_states(&mut world, dt, &config);
        }
        assert!(!world.get::<&SleepInfo>(entity).unwrap().is_sleeping());

        for _ in 0..2 {
            update_sleep_states(&mut world, dt, &config);
        }
        assert!(world.get::<&SleepInfo>(entity).unwrap().is_sleeping());
        assert_eq!(world.get::<&RigidBody>(entity).unwrap().linear_velocity, Vec3::ZERO);

        // Sleeping bodies are not integrated.
        assert_eq!(integrate_velocities(&mut world, dt), 0);

        assert!(wake_body(&mut world, entity));
        assert!(!wake_body(&mut world, entity));
        assert_eq!(integrate_velocities(&mut world, dt), 1);
    }

    #[test]
    fn test_sleep_disabled() {
        let mut world = hecs::World::new();
        let entity = spawn_body(&mut world, Vec3::ZERO, 1.0);
        let config = PhysicsConfig {
            allow_sleep: false,
            ..PhysicsConfig::default()
        };
        for _ in 0..600 {
            update_sleep_states(&mut world, 1.0 / 60.0, &config);
        }
        assert!(!world.get::<&SleepInfo>(entity).unwrap().is_sleeping());
    }
}
