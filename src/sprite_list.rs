use crate::spatial::SpatialHash;
use crate::sprite::RenderableEntity;
use macroquad::prelude::*;

/// Ordered entities of one layer, optionally backed by a spatial hash.
#[derive(Debug, Clone, Default)]
pub struct SpriteList {
    entities: Vec<RenderableEntity>,
    spatial: Option<SpatialHash>,
}

impl SpriteList {
    /// Empty list; `use_spatial_hash` enables the collision index.
    pub fn new(use_spatial_hash: bool) -> Self {
        Self {
            entities: Vec::new(),
            spatial: use_spatial_hash.then(SpatialHash::default),
        }
    }

    /// Append, keeping draw order.
    pub fn push(&mut self, entity: RenderableEntity) {
        if let Some(hash) = self.spatial.as_mut() {
            let (min, max) = entity.bounds();
            hash.insert(self.entities.len(), min, max);
        }
        self.entities.push(entity);
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// `true` when the list holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity by draw index.
    pub fn get(&self, index: usize) -> Option<&RenderableEntity> {
        self.entities.get(index)
    }

    /// Entities in draw order.
    pub fn iter(&self) -> std::slice::Iter<'_, RenderableEntity> {
        self.entities.iter()
    }

    /// All entities as a slice.
    pub fn as_slice(&self) -> &[RenderableEntity] {
        &self.entities
    }

    /// `true` if a spatial hash backs this list.
    pub fn uses_spatial_hash(&self) -> bool {
        self.spatial.is_some()
    }

    /// Entities whose bounds overlap the rectangle spanned by `a` and `b`,
    /// in draw order.
    pub fn query_rect(&self, a: Vec2, b: Vec2) -> Vec<&RenderableEntity> {
        let (lo, hi) = (a.min(b), a.max(b));
        let overlaps = |e: &RenderableEntity| {
            let (min, max) = e.bounds();
            min.x <= hi.x && max.x >= lo.x && min.y <= hi.y && max.y >= lo.y
        };
        match &self.spatial {
            Some(hash) => hash
                .query_rect(lo, hi)
                .into_iter()
                .map(|i| &self.entities[i])
                .filter(|e| overlaps(e))
                .collect(),
            None => self.entities.iter().filter(|e| overlaps(e)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SpriteList {
    type Item = &'a RenderableEntity;
    type IntoIter = std::slice::Iter<'a, RenderableEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
