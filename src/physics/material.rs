//! Physics materials and pairwise contact coefficients.

use std::collections::BTreeMap;

/// Index into a [`MaterialTable`]. `MaterialId::DEFAULT` always exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MaterialId(pub u16);

impl MaterialId {
    pub const DEFAULT: Self = Self(0);
}

/// Named surface material.
#[derive(Debug, Clone)]
pub struct PhysicsMaterial {
    pub name: String,
    pub friction: f32,
    pub restitution: f32,
}

/// Coefficients used when two materials touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

/// Registered materials plus explicit per-pair overrides.
#[derive(Debug, Clone)]
pub struct MaterialTable {
    materials: Vec<PhysicsMaterial>,
    pairs: BTreeMap<(MaterialId, MaterialId), ContactMaterial>,
}

impl MaterialTable {
    pub fn new(default_friction: f32, default_restitution: f32) -> Self {
        Self {
            materials: vec![PhysicsMaterial {
                name: "default".to_string(),
                friction: default_friction,
                restitution: default_restitution,
            }],
            pairs: BTreeMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        friction: f32,
        restitution: f32,
    ) -> MaterialId {
        let id = MaterialId(self.materials.len() as u16);
        self.materials.push(PhysicsMaterial {
            name: name.into(),
            friction,
            restitution,
        });
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&PhysicsMaterial> {
        self.materials.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| MaterialId(i as u16))
    }

    pub fn set_contact_material(&mut self, a: MaterialId, b: MaterialId, material: ContactMaterial) {
        self.pairs.insert(Self::pair_key(a, b), material);
    }

    /// Coefficients for a touching pair: the explicit override if one was
    /// registered, otherwise the average of both materials.
    pub fn combine(&self, a: MaterialId, b: MaterialId) -> ContactMaterial {
        if let Some(cm) = self.pairs.get(&Self::pair_key(a, b)) {
            return *cm;
        }
        let fallback = &self.materials[0];
        let ma = self.get(a).unwrap_or(fallback);
        let mb = self.get(b).unwrap_or(fallback);
        ContactMaterial {
            friction: (ma.friction + mb.friction) * 0.5,
            restitution: (ma.restitution + mb.restitution) * 0.5,
        }
    }

    fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
