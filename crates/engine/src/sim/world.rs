use super::entity::{Brood, Entity, EntityId, EntityKind, Health, Lane};

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Owns every live entity plus the pending spawn/despawn queues. Mutation
/// requests made while systems iterate the pool take effect at
/// `apply_pending`, so iteration order never observes a half-applied change.
#[derive(Debug, Default)]
pub struct LaneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl LaneWorld {
    pub fn spawn_hostile(
        &mut self,
        kind: EntityKind,
        lane: Lane,
        offset: f32,
        speed: f32,
        height: f32,
        health: f64,
    ) -> EntityId {
        self.spawn_internal(
            kind,
            lane,
            offset,
            speed,
            height,
            Some(Health::full(health)),
            None,
            None,
        )
    }

    pub fn spawn_elite(
        &mut self,
        lane: Lane,
        offset: f32,
        speed: f32,
        height: f32,
        health: f64,
        brood: Brood,
    ) -> EntityId {
        self.spawn_internal(
            EntityKind::Elite,
            lane,
            offset,
            speed,
            height,
            Some(Health::full(health)),
            None,
            Some(brood),
        )
    }

    pub fn spawn_pickup(
        &mut self,
        kind: EntityKind,
        lane: Lane,
        offset: f32,
        speed: f32,
        height: f32,
    ) -> EntityId {
        self.spawn_internal(kind, lane, offset, speed, height, None, None, None)
    }

    /// `speed` is along the travel axis: pass a negative value to ascend.
    pub fn spawn_projectile(
        &mut self,
        lane: Lane,
        offset: f32,
        speed: f32,
        height: f32,
        damage: f64,
    ) -> EntityId {
        self.spawn_internal(
            EntityKind::Projectile,
            lane,
            offset,
            speed,
            height,
            None,
            Some(damage),
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_internal(
        &mut self,
        kind: EntityKind,
        lane: Lane,
        offset: f32,
        speed: f32,
        height: f32,
        health: Option<Health>,
        projectile_damage: Option<f64>,
        brood: Option<Brood>,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            kind,
            lane,
            offset,
            speed,
            height,
            active: true,
            health,
            projectile_damage,
            brood,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    #[allow(dead_code)]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    #[allow(dead_code)]
    pub fn live_count_of(&self, kind: EntityKind) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.active && entity.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_enemy(world: &mut LaneWorld, lane: Lane) -> EntityId {
        world.spawn_hostile(EntityKind::Enemy, lane, -100.0, 100.0, 100.0, 1.0)
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn spawns_land_at_apply_pending() {
        let mut world = LaneWorld::default();
        spawn_enemy(&mut world, Lane(0));
        assert_eq!(world.entity_count(), 0);

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn duplicate_pending_despawns_are_safe_and_idempotent() {
        let mut world = LaneWorld::default();
        let doomed = spawn_enemy(&mut world, Lane(0));
        let survivor = spawn_enemy(&mut world, Lane(1));
        world.apply_pending();
        assert_eq!(world.entity_count(), 2);

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(doomed).is_none());
        assert!(world.find_entity(survivor).is_some());
    }

    #[test]
    fn despawn_of_unknown_id_is_a_no_op() {
        let mut world = LaneWorld::default();
        assert!(!world.despawn(EntityId(99)));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_cancels_a_pending_spawn() {
        let mut world = LaneWorld::default();
        let id = spawn_enemy(&mut world, Lane(4));
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn live_count_skips_inactive_entities() {
        let mut world = LaneWorld::default();
        let a = spawn_enemy(&mut world, Lane(0));
        spawn_enemy(&mut world, Lane(1));
        world.apply_pending();

        world
            .find_entity_mut(a)
            .expect("spawned enemy exists")
            .active = false;
        assert_eq!(world.live_count_of(EntityKind::Enemy), 1);
    }

    #[test]
    fn projectile_spawn_carries_damage_and_direction() {
        let mut world = LaneWorld::default();
        let id = world.spawn_projectile(Lane(2), 500.0, -400.0, 34.0, 1.5);
        world.apply_pending();

        let projectile = world.find_entity(id).expect("projectile exists");
        assert_eq!(projectile.kind, EntityKind::Projectile);
        assert!(projectile.speed < 0.0);
        assert!((projectile.projectile_damage.expect("damage set") - 1.5).abs() < 0.0001);
    }
}
