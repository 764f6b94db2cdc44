//! Body ↔ visual node pairing and per-frame pose propagation.

use tracing::debug;

use crate::physics::{BodyHandle, PhysicsWorld};
use crate::scene::{NodeId, Scene};

/// Weak link between one simulated body and one visual node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyVisualPair {
    pub body: BodyHandle,
    pub node: NodeId,
}

/// Index of a slot in a [`PairingTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

/// State of one pairing slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairSlot {
    /// Waiting on an asset load.
    Pending { label: String },
    /// Committed. Never changes again.
    Linked(BodyVisualPair),
    /// The load failed; no pair will ever exist for this slot.
    Failed { label: String, reason: String },
}

/// All body/node pairings of a session.
///
/// Slots only move forward: `Pending → Linked` or `Pending → Failed`.
#[derive(Debug, Default)]
pub struct PairingTable {
    slots: Vec<PairSlot>,
}

impl PairingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a pair that will arrive later.
    pub fn reserve(&mut self, label: impl Into<String>) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(PairSlot::Pending { label: label.into() });
        id
    }

    /// Add an already-complete pair.
    pub fn link(&mut self, body: BodyHandle, node: NodeId) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(PairSlot::Linked(BodyVisualPair { body, node }));
        id
    }

    /// Commit a pending slot. Returns `false` if the slot is not pending.
    pub fn resolve(&mut self, slot: SlotId, pair: BodyVisualPair) -> bool {
        let Some(s) = self.slots.get_mut(slot.0) else {
            return false;
        };
        if !matches!(s, PairSlot::Pending { .. }) {
            return false;
        }
        *s = PairSlot::Linked(pair);
        debug!(?slot, ?pair, "Pair committed");
        true
    }

    /// Mark a pending slot as failed. Returns `false` if the slot is not pending.
    pub fn fail(&mut self, slot: SlotId, reason: impl Into<String>) -> bool {
        let Some(s) = self.slots.get_mut(slot.0) else {
            return false;
        };
        let PairSlot::Pending { label } = s else {
            return false;
        };
        let label = std::mem::take(label);
        *s = PairSlot::Failed {
            label,
            reason: reason.into(),
        };
        true
    }

    pub fn slot(&self, slot: SlotId) -> Option<&PairSlot> {
        self.slots.get(slot.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Committed pairs in slot order.
    pub fn linked(&self) -> impl Iterator<Item = BodyVisualPair> + '_ {
        self.slots.iter().filter_map(|s| match s {
            PairSlot::Linked(pair) => Some(*pair),
            _ => None,
        })
    }

    pub fn body_for_node(&self, node: NodeId) -> Option<BodyHandle> {
        self.linked().find(|p| p.node == node).map(|p| p.body)
    }

    pub fn node_for_body(&self, body: BodyHandle) -> Option<NodeId> {
        self.linked().find(|p| p.body == body).map(|p| p.node)
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, PairSlot::Pending { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, PairSlot::Failed { .. }))
            .count()
    }
}

/// Result of one [`PoseSynchronizer::sync`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    /// Pairs whose body or node is gone.
    pub skipped: usize,
}

/// Copies simulated body poses onto their paired visual nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoseSynchronizer;

impl PoseSynchronizer {
    /// Write every linked body's current pose onto its node's local
    /// transform. Position and orientation land in one assignment; scale is
    /// left alone. Pending and failed slots are ignored.
    pub fn sync(&self, pairs: &PairingTable, physics: &PhysicsWorld, scene: &mut Scene) -> SyncReport {
        let mut report = SyncReport::default();
        for pair in pairs.linked() {
            match physics.pose(pair.body) {
                Some(pose) if scene.set_pose(pair.node, pose) => report.synced += 1,
                _ => report.skipped += 1,
            }
        }
        report
    }
}
