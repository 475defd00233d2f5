//! Drawing object entity and the session object registry.
//!
//! # Responsibility
//! - Define the named, uniquely-identified drawable entity.
//! - Keep the registry that assigns process-stable integer ids and
//!   preserves first-registered lookup order.
//!
//! # Invariants
//! - An `ObjectId` is never reused for another object within one session.
//! - Objects are destroyed only by explicit removal, never silently while a
//!   model lists them.
//! - Display names are not guaranteed unique; name lookups return the
//!   first-registered match.

use crate::model::geometry::{GeometryKind, GeometryStore};
use crate::model::property::PropertyStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Process-stable integer identity for a drawing object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named visual entity owning styling properties and geometry buffers,
/// one [`GeometryStore`] per primitive kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingObject {
    id: ObjectId,
    name: String,
    pub properties: PropertyStore,
    geometry: BTreeMap<GeometryKind, GeometryStore>,
}

impl DrawingObject {
    fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            properties: PropertyStore::new(),
            geometry: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Read-only geometry for one primitive kind, when populated.
    pub fn geometry(&self, kind: GeometryKind) -> Option<&GeometryStore> {
        self.geometry.get(&kind)
    }

    /// Mutable geometry for one primitive kind, created on demand.
    pub fn geometry_mut(&mut self, kind: GeometryKind) -> &mut GeometryStore {
        self.geometry.entry(kind).or_default()
    }

    /// Per-kind block counts; empty kinds are omitted.
    pub fn geometry_counts(&self) -> BTreeMap<GeometryKind, usize> {
        self.geometry
            .iter()
            .filter(|(_, store)| !store.is_empty())
            .map(|(kind, store)| (*kind, store.block_count()))
            .collect()
    }

    /// Total per-vertex elements across every primitive kind.
    pub fn total_elements(&self) -> usize {
        self.geometry.values().map(GeometryStore::total_elements).sum()
    }

    /// Union bounds over all primitive kinds with vertex data.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut union: Option<([f32; 3], [f32; 3])> = None;
        for store in self.geometry.values() {
            let Some((min, max)) = store.bounds() else {
                continue;
            };
            union = Some(match union {
                None => (min, max),
                Some((mut umin, mut umax)) => {
                    for axis in 0..3 {
                        umin[axis] = umin[axis].min(min[axis]);
                        umax[axis] = umax[axis].max(max[axis]);
                    }
                    (umin, umax)
                }
            });
        }
        union
    }

    /// Clears geometry for one kind, or for all kinds. Irreversible.
    pub fn clear_geometry(&mut self, kind: Option<GeometryKind>) {
        match kind {
            Some(kind) => {
                self.geometry.remove(&kind);
            }
            None => self.geometry.clear(),
        }
    }

    /// Runs the dedup/compression pass on every kind.
    pub fn compact(&mut self) -> usize {
        self.geometry.values_mut().map(GeometryStore::compact).sum()
    }
}

/// Registration error for explicit-id inserts (state load path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateObjectId(pub ObjectId);

impl Display for DuplicateObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "object id already in use: {}", self.0)
    }
}

impl std::error::Error for DuplicateObjectId {}

/// Owned object container with id assignment and ordered name lookup.
#[derive(Debug)]
pub struct ObjectRegistry {
    objects: Vec<DrawingObject>,
    next_id: u32,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
        }
    }

    /// Creates an object with a fresh id and returns the id.
    pub fn create(&mut self, name: impl Into<String>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(DrawingObject::new(id, name));
        id
    }

    /// Inserts an object under a caller-provided id (state document load).
    ///
    /// The id counter advances past `id` so later [`ObjectRegistry::create`]
    /// calls never collide.
    pub fn insert_with_id(
        &mut self,
        id: ObjectId,
        name: impl Into<String>,
    ) -> Result<ObjectId, DuplicateObjectId> {
        if self.get(id).is_some() {
            return Err(DuplicateObjectId(id));
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.objects.push(DrawingObject::new(id, name));
        Ok(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&DrawingObject> {
        self.objects.iter().find(|object| object.id() == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut DrawingObject> {
        self.objects.iter_mut().find(|object| object.id() == id)
    }

    /// First-registered object with this exact display name.
    pub fn find_by_name(&self, name: &str) -> Option<&DrawingObject> {
        self.objects.iter().find(|object| object.name() == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut DrawingObject> {
        self.objects.iter_mut().find(|object| object.name() == name)
    }

    /// Object by 0-based registration index.
    pub fn by_index(&self, index: usize) -> Option<&DrawingObject> {
        self.objects.get(index)
    }

    /// Removes an object entirely. The id is retired, never reassigned.
    pub fn remove(&mut self, id: ObjectId) -> Option<DrawingObject> {
        let index = self.objects.iter().position(|object| object.id() == id)?;
        Some(self.objects.remove(index))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawingObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DrawingObject> {
        self.objects.iter_mut()
    }
}
