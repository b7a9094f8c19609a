use crate::geometry::Geometry;

/// Identifier assigned by the remote store. Immutable once observed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub i64);

impl EntityId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named geometry record. `id` is `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: Option<EntityId>,
    pub name: String,
    /// Geographic frame.
    pub geometry: Geometry,
}

impl Entity {
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: None,
            name: name.into(),
            geometry,
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }
}
