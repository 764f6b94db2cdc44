//! Contact data structures for collision response.

use std::collections::HashMap;

use glam::Vec3;

/// One sampled point of contact between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSample {
    /// Contact position in world space.
    pub position: Vec3,
    /// Penetration depth along the contact normal.
    pub penetration: f32,
}

/// Narrowphase result for one shape pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B).
    pub normal: Vec3,
    pub points: Vec<ContactSample>,
}

impl ContactInfo {
    pub fn single(normal: Vec3, position: Vec3, penetration: f32) -> Self {
        Self {
            normal,
            points: vec![ContactSample {
                position,
                penetration,
            }],
        }
    }

    /// Same contact seen from shape B.
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    pub fn max_penetration(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.penetration)
            .fold(0.0, f32::max)
    }
}

/// A single contact point with accumulated impulse data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactPoint {
    /// Contact position in world space.
    pub position: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Accumulated normal impulse.
    pub normal_impulse: f32,
    /// Accumulated tangent impulses (two friction directions).
    pub tangent_impulse: [f32; 2],
    pub(crate) r_a: Vec3,
    pub(crate) r_b: Vec3,
    pub(crate) normal_mass: f32,
    pub(crate) tangent_mass: [f32; 2],
    /// Target separating velocity from position correction and restitution.
    pub(crate) bias: f32,
}

impl ContactPoint {
    pub fn new(position: Vec3, penetration: f32) -> Self {
        Self {
            position,
            penetration,
            ..Default::default()
        }
    }
}

/// Contact points between one part of body A and one part of body B.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub body_a: hecs::Entity,
    pub body_b: hecs::Entity,
    pub part_a: usize,
    pub part_b: usize,
    /// Contact normal (from A to B).
    pub normal: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub contacts: Vec<ContactPoint>,
}

impl ContactManifold {
    fn key(&self) -> ContactKey {
        (self.body_a, self.body_b, self.part_a, self.part_b)
    }
}

type ContactKey = (hecs::Entity, hecs::Entity, usize, usize);

/// Cached contact data for warm-starting the solver.
#[derive(Debug, Clone, Copy)]
struct CachedContact {
    /// Contact position in world space (used for matching).
    position: Vec3,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// Maximum distance squared for matching contacts across steps.
const CONTACT_MATCH_THRESHOLD_SQ: f32 = 0.02 * 0.02;

/// Cache of contact impulses for warm-starting the constraint solver.
///
/// Keyed by body pair and part indices. Only ever looked up by key, so the
/// map's iteration order never reaches the simulation.
#[derive(Debug, Default)]
pub struct ContactCache {
    cache: HashMap<ContactKey, Vec<CachedContact>>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Seed current manifolds with last step's impulses where contacts match.
    pub fn warm_start(&self, manifolds: &mut [ContactManifold]) {
        for manifold in manifolds.iter_mut() {
            let Some(cached) = self.cache.get(&manifold.key()) else {
                continue;
            };
            for contact in &mut manifold.contacts {
                let nearest = cached.iter().min_by(|a, b| {
                    let da = (a.position - contact.position).length_squared();
                    let db = (b.position - contact.position).length_squared();
                    da.total_cmp(&db)
                });
                if let Some(cc) = nearest {
                    if (cc.position - contact.position).length_squared() < CONTACT_MATCH_THRESHOLD_SQ {
                        contact.normal_impulse = cc.normal_impulse;
                        contact.tangent_impulse = cc.tangent_impulse;
                    }
                }
            }
        }
    }

    /// Replace the cache with this step's solved contacts.
    pub fn update(&mut self, manifolds: &[ContactManifold]) {
        self.cache.clear();
        for manifold in manifolds {
            let contacts = manifold
                .contacts
                .iter()
                .map(|c| CachedContact {
                    position: c.position,
                    normal_impulse: c.normal_impulse,
                    tangent_impulse: c.tangent_impulse,
                })
                .collect();
            self.cache.insert(manifold.key(), contacts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifold(a: hecs::Entity, b: hecs::Entity, position: Vec3) -> ContactManifold {
        ContactManifold {
            body_a: a,
            body_b: b,
            part_a: 0,
            part_b: 0,
            normal: Vec3::Y,
            friction: 0.3,
            restitution: 0.0,
            contacts: vec![ContactPoint::new(position, 0.01)],
        }
    }

    #[test]
    fn test_warm_start_matches_nearby_contacts() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());

        let mut solved = manifold(a, b, Vec3::ZERO);
        solved.contacts[0].normal_impulse = 2.5;
        let mut cache = ContactCache::new();
        cache.update(&[solved]);

        let mut near = [manifold(a, b, Vec3::new(0.01, 0.0, 0.0))];
        cache.warm_start(&mut near);
        assert_eq!(near[0].contacts[0].normal_impulse, 2.5);

        let mut far = [manifold(a, b, Vec3::new(1.0, 0.0, 0.0))];
        cache.warm_start(&mut far);
        assert_eq!(far[0].contacts[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_update_drops_separated_pairs() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let c = world.spawn(());

        let mut cache = ContactCache::new();
        cache.update(&[manifold(a, b, Vec3::ZERO), manifold(a, c, Vec3::X)]);
        assert_eq!(cache.len(), 2);

        cache.update(&[manifold(a, c, Vec3::X)]);
        assert_eq!(cache.len(), 1);
        let mut again = [manifold(a, b, Vec3::ZERO)];
        again[0].contacts[0].normal_impulse = 0.0;
        cache.warm_start(&mut again);
        assert_eq!(again[0].contacts[0].normal_impulse, 0.0);

        cache.update(&[]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_flipped_reverses_normal() {
        let info = ContactInfo::single(Vec3::X, Vec3::ZERO, 0.1).flipped();
        assert_eq!(info.normal, -Vec3::X);
        assert_eq!(info.max_penetration(), 0.1);
    }
}
