use super::entity::{Entity, EntityId, EntityKind};
use super::world::LaneWorld;

const PICKUP_PRIORITY: [EntityKind; 4] = [
    EntityKind::Barrel,
    EntityKind::Crate,
    EntityKind::Heart,
    EntityKind::Bee,
];

/// Picks the single entity a projectile hits this tick, or `None`.
///
/// Pickups are claimed before anything else, in a fixed order, so a heart
/// overlapping an enemy is never wasted on the enemy. Among regular hostiles
/// the one furthest down the lane wins. A boss soaks the shot only when
/// nothing else overlaps.
pub fn find_target(world: &LaneWorld, projectile: &Entity) -> Option<EntityId> {
    for kind in PICKUP_PRIORITY {
        if let Some(entity) = world
            .entities()
            .iter()
            .find(|entity| entity.kind == kind && entity.active && projectile.overlaps(entity))
        {
            return Some(entity.id);
        }
    }

    let mut nearest: Option<&Entity> = None;
    for entity in world.entities() {
        let ranked = matches!(
            entity.kind,
            EntityKind::Enemy | EntityKind::Elite | EntityKind::Minion
        );
        if !ranked || !entity.active || !projectile.overlaps(entity) {
            continue;
        }
        let further = nearest.map_or(true, |best| entity.offset > best.offset);
        if further {
            nearest = Some(entity);
        }
    }
    if let Some(entity) = nearest {
        return Some(entity.id);
    }

    world
        .entities()
        .iter()
        .find(|entity| {
            entity.kind == EntityKind::Boss && entity.active && projectile.overlaps(entity)
        })
        .map(|entity| entity.id)
}
