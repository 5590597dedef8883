use crate::error::MapError;
use crate::map::LoadedMap;
use crate::sprite::RenderableEntity;
use crate::sprite_list::SpriteList;

/// Named sprite lists in draw order: index 0 is drawn first.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    lists: Vec<(String, SpriteList)>,
}

impl Scene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every sprite list of `map`, keeping the map's layer order.
    pub fn from_map(map: LoadedMap) -> Self {
        Self {
            lists: map.sprite_lists.into_iter().collect(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.lists.iter().position(|(n, _)| n == name)
    }

    fn insert_at(&mut self, at: usize, name: String, list: SpriteList) -> Result<(), MapError> {
        if self.position(&name).is_some() {
            return Err(MapError::DuplicateLayer(name));
        }
        self.lists.insert(at, (name, list));
        Ok(())
    }

    /// Append on top of everything else.
    pub fn add_sprite_list(
        &mut self,
        name: impl Into<String>,
        list: SpriteList,
    ) -> Result<(), MapError> {
        let at = self.lists.len();
        self.insert_at(at, name.into(), list)
    }

    /// Push one entity onto the list `name`, creating the list on top of the
    /// scene when it does not exist yet.
    pub fn add_sprite(&mut self, name: &str, entity: RenderableEntity) {
        match self.get_mut(name) {
            Some(list) => list.push(entity),
            None => {
                let mut list = SpriteList::new(false);
                list.push(entity);
                self.lists.push((name.to_owned(), list));
            }
        }
    }

    /// Insert so that `name` is drawn just before `before`.
    pub fn add_sprite_list_before(
        &mut self,
        name: impl Into<String>,
        list: SpriteList,
        before: &str,
    ) -> Result<(), MapError> {
        let at = self
            .position(before)
            .ok_or_else(|| MapError::LayerNotFound(before.to_owned()))?;
        self.insert_at(at, name.into(), list)
    }

    /// Insert so that `name` is drawn just after `after`.
    pub fn add_sprite_list_after(
        &mut self,
        name: impl Into<String>,
        list: SpriteList,
        after: &str,
    ) -> Result<(), MapError> {
        let at = self
            .position(after)
            .ok_or_else(|| MapError::LayerNotFound(after.to_owned()))?;
        self.insert_at(at + 1, name.into(), list)
    }

    /// Detach a list, returning it.
    pub fn remove(&mut self, name: &str) -> Option<SpriteList> {
        let at = self.position(name)?;
        Some(self.lists.remove(at).1)
    }

    /// List by name.
    pub fn get(&self, name: &str) -> Option<&SpriteList> {
        self.lists.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    /// Mutable list by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SpriteList> {
        self.lists.iter_mut().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    /// Names in draw order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|(n, _)| n.as_str())
    }

    /// Lists in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpriteList)> {
        self.lists.iter().map(|(n, l)| (n.as_str(), l))
    }

    /// Every entity of every list, back to front.
    pub fn entities(&self) -> impl Iterator<Item = &RenderableEntity> {
        self.lists.iter().flat_map(|(_, l)| l.iter())
    }

    /// Number of lists.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// `true` without lists.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::prelude::*;

    fn one(x: f32) -> SpriteList {
        let mut l = SpriteList::new(false);
        l.push(RenderableEntity::new(vec2(x, 0.0), vec2(1.0, 1.0)));
        l
    }

    #[test]
    fn relative_insertion_orders_lists() {
        let mut scene = Scene::new();
        scene.add_sprite_list("ground", one(0.0)).unwrap();
        scene.add_sprite_list("walls", one(1.0)).unwrap();
        scene
            .add_sprite_list_before("shadows", one(2.0), "walls")
            .unwrap();
        scene
            .add_sprite_list_after("player", one(3.0), "walls")
            .unwrap();
        scene
            .add_sprite_list_after("sky", SpriteList::new(false), "player")
            .unwrap();

        assert_eq!(
            scene.names().collect::<Vec<_>>(),
            ["ground", "shadows", "walls", "player", "sky"]
        );
        let xs: Vec<f32> = scene.entities().map(|e| e.position.x).collect();
        assert_eq!(xs, [0.0, 2.0, 1.0, 3.0]);
    }

    #[test]
    fn unknown_anchor_and_duplicates_fail() {
        let mut scene = Scene::new();
        scene.add_sprite_list("a", one(0.0)).unwrap();
        assert!(matches!(
            scene.add_sprite_list_before("b", one(0.0), "missing"),
            Err(MapError::LayerNotFound(ref n)) if n == "missing"
        ));
        assert!(matches!(
            scene.add_sprite_list("a", one(0.0)),
            Err(MapError::DuplicateLayer(_))
        ));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn add_sprite_creates_missing_lists() {
        let mut scene = Scene::new();
        scene.add_sprite("player", RenderableEntity::new(Vec2::ZERO, Vec2::ONE));
        scene.add_sprite("player", RenderableEntity::new(Vec2::ONE, Vec2::ONE));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get("player").map(SpriteList::len), Some(2));
    }

    #[test]
    fn remove_and_lookup() {
        let mut scene = Scene::new();
        scene.add_sprite_list("a", one(0.0)).unwrap();
        scene.add_sprite_list("b", one(5.0)).unwrap();
        scene
            .get_mut("b")
            .unwrap()
            .push(RenderableEntity::new(Vec2::ZERO, Vec2::ONE));
        assert_eq!(scene.get("b").map(SpriteList::len), Some(2));

        let removed = scene.remove("a").expect("present");
        assert_eq!(removed.len(), 1);
        assert!(scene.remove("a").is_none());
        assert!(scene.get("a").is_none());
        assert_eq!(scene.names().collect::<Vec<_>>(), ["b"]);
    }
}
