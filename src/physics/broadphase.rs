//! Broadphase collision detection using sweep-and-prune on the X axis.

use crate::ecs::components::physics::{Collider, RigidBody, SleepInfo};
use crate::ecs::components::transform::Pose;

use super::collider::PhysicsAabb;

/// Broadphase entry for one body.
#[derive(Debug, Clone, Copy)]
pub struct Proxy {
    pub entity: hecs::Entity,
    pub aabb: PhysicsAabb,
    pub dynamic: bool,
    pub sleeping: bool,
    /// Set when the body was moved by hand since the last substep.
    pub teleported: bool,
    /// Bounds covering the body before and after its teleports this substep.
    pub swept: Option<PhysicsAabb>,
}

impl Proxy {
    #[inline]
    fn is_active(&self) -> bool {
        self.dynamic && !self.sleeping
    }
}

/// Sweep-and-prune broadphase.
///
/// Proxies are kept sorted by `aabb.min.x` between steps. Bodies move little
/// per substep, so an insertion sort restores the order in near linear time.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    proxies: Vec<Proxy>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Register a body. Its AABB is sorted into place on the next `find_pairs`.
    pub fn insert(&mut self, entity: hecs::Entity, aabb: PhysicsAabb, dynamic: bool) {
        self.proxies.push(Proxy {
            entity,
            aabb,
            dynamic,
            sleeping: false,
            teleported: false,
            swept: None,
        });
    }

    /// Flag a body as moved by hand so its AABB is recomputed and it may wake
    /// sleeping neighbours. `from` is the body's AABB before the move.
    pub fn mark_teleported(&mut self, entity: hecs::Entity, from: PhysicsAabb) {
        if let Some(proxy) = self.proxies.iter_mut().find(|p| p.entity == entity) {
            proxy.teleported = true;
            proxy.swept = Some(proxy.swept.map_or(from, |swept| swept.union(&from)));
        }
    }

    pub fn clear_teleported(&mut self) {
        for proxy in &mut self.proxies {
            proxy.teleported = false;
            proxy.swept = None;
        }
    }

    /// Sleeping dynamic bodies inside the swept bounds of a teleported body.
    ///
    /// A body that rested on something which moved away no longer overlaps
    /// it, so contact-based waking would miss it. Returned proxies are
    /// marked awake.
    pub fn take_swept_sleepers(&mut self) -> Vec<hecs::Entity> {
        let swept: Vec<(hecs::Entity, PhysicsAabb)> = self
            .proxies
            .iter()
            .filter_map(|p| p.swept.map(|aabb| (p.entity, aabb)))
            .collect();
        if swept.is_empty() {
            return Vec::new();
        }

        let mut woken = Vec::new();
        for proxy in &mut self.proxies {
            if !(proxy.dynamic && proxy.sleeping) {
                continue;
            }
            let touched = swept
                .iter()
                .any(|(entity, aabb)| *entity != proxy.entity && aabb.overlaps(&proxy.aabb));
            if touched {
                proxy.sleeping = false;
                woken.push(proxy.entity);
            }
        }
        woken
    }

    /// Recompute AABBs of moving and teleported bodies and refresh sleep flags.
    pub fn refresh(&mut self, world: &hecs::World) {
        for proxy in &mut self.proxies {
            let Ok(mut query) = world
                .query_one::<(&Pose, &Collider, &RigidBody, Option<&SleepInfo>)>(proxy.entity)
            else {
                continue;
            };
            let Some((pose, collider, rb, sleep)) = query.get() else {
                continue;
            };
            proxy.dynamic = rb.is_dynamic();
            proxy.sleeping = sleep.is_some_and(|s| s.is_sleeping());
            if proxy.is_active() || proxy.teleported {
                proxy.aabb = collider.compute_aabb(pose);
            }
            if let Some(swept) = proxy.swept {
                proxy.swept = Some(swept.union(&proxy.aabb));
            }
        }
    }

    /// Find all pairs of bodies whose AABBs overlap and that need narrowphase.
    ///
    /// A pair is kept when one side is an awake dynamic body, or when one side
    /// was teleported and the other is a dynamic body. Static-static pairs
    /// are never returned. Pairs come out as `(smaller, larger)` entity.
    pub fn find_pairs(&mut self) -> Vec<(hecs::Entity, hecs::Entity)> {
        insertion_sort(&mut self.proxies);

        let mut pairs = Vec::new();
        for i in 0..self.proxies.len() {
            let a = &self.proxies[i];
            for b in &self.proxies[i + 1..] {
                if b.aabb.min.x > a.aabb.max.x {
                    break;
                }
                if !needs_test(a, b) || !a.aabb.overlaps(&b.aabb) {
                    continue;
                }
                if a.entity < b.entity {
                    pairs.push((a.entity, b.entity));
                } else {
                    pairs.push((b.entity, a.entity));
                }
            }
        }
        pairs
    }
}

fn needs_test(a: &Proxy, b: &Proxy) -> bool {
    if !a.dynamic && !b.dynamic {
        return false;
    }
    a.is_active() || b.is_active() || (a.teleported && b.dynamic) || (b.teleported && a.dynamic)
}

/// Stable insertion sort on `aabb.min.x`.
fn insertion_sort(proxies: &mut [Proxy]) {
    for i in 1..proxies.len() {
        let mut j = i;
        while j > 0 && proxies[j - 1].aabb.min.x > proxies[j].aabb.min.x {
            proxies.swap(j - 1, j);
            j -= 1;
        }
    }
}
