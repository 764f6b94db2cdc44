//! Asynchronous asset completion and atomic pair commits.
//!
//! A loader gets a [`LoadResolver`] for a reserved pairing slot and resolves
//! it exactly once, from any thread. The frame loop drains completions at the
//! start of a frame and commits each one in a single call: nodes spawned,
//! body added, pair linked, reaction registered. A sync pass never sees a
//! half-built pair.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::ecs::components::physics::RigidBodyDesc;
use crate::interaction::{InteractionController, Reaction};
use crate::physics::PhysicsWorld;
use crate::scene::{NodeId, Scene, VisualNodeDesc};
use crate::sync::{BodyVisualPair, PairingTable, SlotId};

/// Why an asset never produced a pair.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("reaction target child {index} out of range ({children} children)")]
    InvalidReactionTarget { index: usize, children: usize },

    #[error("loader dropped without resolving")]
    Abandoned,
}

/// Node of a loaded asset that receives its click reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionTarget {
    #[default]
    Root,
    /// Index into [`LoadedAsset::children`].
    Child(usize),
}

/// A finished load: visual nodes, the matching body, and an optional
/// click reaction.
pub struct LoadedAsset {
    /// Root node. The body is paired with this node.
    pub node: VisualNodeDesc,
    /// Spawned as children of the root, in order.
    pub children: Vec<VisualNodeDesc>,
    pub body: RigidBodyDesc,
    pub reaction: Option<(ReactionTarget, Box<dyn Reaction>)>,
}

impl LoadedAsset {
    pub fn new(node: VisualNodeDesc, body: RigidBodyDesc) -> Self {
        Self {
            node,
            children: Vec::new(),
            body,
            reaction: None,
        }
    }

    pub fn with_child(mut self, child: VisualNodeDesc) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_reaction(mut self, target: ReactionTarget, reaction: impl Reaction + 'static) -> Self {
        self.reaction = Some((target, Box::new(reaction)));
        self
    }
}

impl std::fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("node", &self.node.name)
            .field("children", &self.children.len())
            .field("mass", &self.body.mass)
            .field("reaction", &self.reaction.as_ref().map(|(target, _)| *target))
            .finish()
    }
}

struct Completion {
    slot: SlotId,
    label: String,
    result: Result<LoadedAsset, LoadError>,
}

/// One-shot completion handle for a pending load.
///
/// Dropping it unresolved fails the slot with [`LoadError::Abandoned`].
pub struct LoadResolver {
    slot: SlotId,
    label: String,
    sender: Option<Sender<Completion>>,
}

impl LoadResolver {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn resolve(mut self, result: Result<LoadedAsset, LoadError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<LoadedAsset, LoadError>) {
        if let Some(sender) = self.sender.take() {
            // The inbox is gone only when the loop is; nothing to report to.
            let _ = sender.send(Completion {
                slot: self.slot,
                label: std::mem::take(&mut self.label),
                result,
            });
        }
    }
}

impl Drop for LoadResolver {
    fn drop(&mut self) {
        self.send(Err(LoadError::Abandoned));
    }
}

/// Outcome of one [`AssetInbox::drain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub committed: Vec<BodyVisualPair>,
    pub failed: usize,
}

/// Receives load completions for the frame loop.
pub struct AssetInbox {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl Default for AssetInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetInbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Reserve a pending slot and hand out its resolver.
    pub fn begin(&self, pairs: &mut PairingTable, label: impl Into<String>) -> LoadResolver {
        let label = label.into();
        let slot = pairs.reserve(label.clone());
        debug!(?slot, %label, "Asset load started");
        LoadResolver {
            slot,
            label,
            sender: Some(self.sender.clone()),
        }
    }

    /// Commit or fail every completion that has arrived.
    pub fn drain(
        &self,
        pairs: &mut PairingTable,
        physics: &mut PhysicsWorld,
        scene: &mut Scene,
        controller: &mut InteractionController,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let completion = match self.receiver.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            let outcome = completion
                .result
                .and_then(|asset| commit(completion.slot, asset, pairs, physics, scene, controller));
            match outcome {
                Ok(pair) => report.committed.push(pair),
                Err(err) => {
                    warn!(label = %completion.label, error = %err, "Asset load failed");
                    pairs.fail(completion.slot, err.to_string());
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Apply one loaded asset. Validation happens before anything is spawned,
/// so an error leaves every store untouched.
fn commit(
    slot: SlotId,
    asset: LoadedAsset,
    pairs: &mut PairingTable,
    physics: &mut PhysicsWorld,
    scene: &mut Scene,
    controller: &mut InteractionController,
) -> Result<BodyVisualPair, LoadError> {
    if let Some((ReactionTarget::Child(index), _)) = &asset.reaction {
        if *index >= asset.children.len() {
            return Err(LoadError::InvalidReactionTarget {
                index: *index,
                children: asset.children.len(),
            });
        }
    }

    let root = scene.spawn(asset.node);
    let children: Vec<NodeId> = asset
        .children
        .into_iter()
        .map(|child| scene.spawn(child.with_parent(root)))
        .collect();
    let body = physics.add_body(asset.body);
    let pair = BodyVisualPair { body, node: root };
    pairs.resolve(slot, pair);

    if let Some((target, reaction)) = asset.reaction {
        let node = match target {
            ReactionTarget::Root => root,
            ReactionTarget::Child(index) => children.get(index).copied().unwrap_or(root),
        };
        controller.register(node, reaction);
    }

    Ok(pair)
}
