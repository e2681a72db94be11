#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lane(pub u8);

impl Lane {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Steps `delta` lanes over, wrapping at both edges.
    pub fn shifted(self, delta: i8, lane_count: u8) -> Lane {
        let count = i16::from(lane_count.max(1));
        let raw = (i16::from(self.0) + i16::from(delta)).rem_euclid(count);
        Lane(raw as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Enemy,
    Elite,
    Minion,
    Boss,
    Projectile,
    Barrel,
    Crate,
    Bee,
    Heart,
}

impl EntityKind {
    pub fn is_damageable(self) -> bool {
        matches!(self, Self::Enemy | Self::Elite | Self::Minion | Self::Boss)
    }

    pub fn costs_life_at_boundary(self) -> bool {
        self.is_damageable()
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Enemy => "enemy",
            Self::Elite => "elite",
            Self::Minion => "minion",
            Self::Boss => "boss",
            Self::Projectile => "projectile",
            Self::Barrel => "barrel",
            Self::Crate => "crate",
            Self::Bee => "bee",
            Self::Heart => "heart",
        }
    }
}

/// Health readings are kept at one-decimal precision; every mutation
/// re-rounds so repeated fractional damage never drifts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    current: f64,
    initial: f64,
}

impl Health {
    pub fn full(initial: f64) -> Self {
        let rounded = round_tenths(initial);
        Self {
            current: rounded,
            initial: rounded,
        }
    }

    #[allow(dead_code)]
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn fraction(&self) -> f64 {
        if self.initial <= 0.0 {
            return 0.0;
        }
        (self.current / self.initial).clamp(0.0, 1.0)
    }
}

/// Minion production state carried by an elite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brood {
    pub next_spawn_ms: u64,
    pub spawned: u32,
    pub cap: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    Damaged,
    Killed,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub lane: Lane,
    /// Position of the entity's top edge along the travel axis, in logical
    /// units from the field top. Grows downward.
    pub offset: f32,
    /// Units per second along the travel axis. Positive descends.
    pub speed: f32,
    pub height: f32,
    pub active: bool,
    pub health: Option<Health>,
    pub projectile_damage: Option<f64>,
    pub brood: Option<Brood>,
}

impl Entity {
    pub fn advance(&mut self, dt_seconds: f32) {
        if self.active {
            self.offset += self.speed * dt_seconds;
        }
    }

    /// No-op on inactive or non-damageable entities. Lethal damage flips the
    /// active flag exactly once; later calls report `Ignored`.
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        if !self.active {
            return DamageOutcome::Ignored;
        }
        let Some(health) = self.health.as_mut() else {
            return DamageOutcome::Ignored;
        };
        health.current = round_tenths(health.current - amount);
        if health.current <= 0.0 {
            self.active = false;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged
        }
    }

    pub fn top(&self) -> f32 {
        self.offset
    }

    pub fn bottom(&self) -> f32 {
        self.offset + self.height
    }

    pub fn overlaps(&self, other: &Entity) -> bool {
        self.lane == other.lane && self.bottom() >= other.top() && self.top() <= other.bottom()
    }

    pub fn reached_line(&self, boundary_offset: f32) -> bool {
        self.bottom() >= boundary_offset
    }

    /// True once an ascending projectile has fully left the field.
    pub fn cleared_top(&self) -> bool {
        self.bottom() <= 0.0
    }
}

pub(crate) fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(health: f64) -> Entity {
        Entity {
            id: EntityId(0),
            kind: EntityKind::Enemy,
            lane: Lane(2),
            offset: 50.0,
            speed: 100.0,
            height: 100.0,
            active: true,
            health: Some(Health::full(health)),
            projectile_damage: None,
            brood: None,
        }
    }

    #[test]
    fn lane_shift_wraps_both_edges() {
        assert_eq!(Lane(0).shifted(-1, 7), Lane(6));
        assert_eq!(Lane(6).shifted(1, 7), Lane(0));
        assert_eq!(Lane(3).shifted(1, 7), Lane(4));
        assert_eq!(Lane(3).shifted(0, 7), Lane(3));
    }

    #[test]
    fn advance_scales_with_dt() {
        let mut entity = enemy(1.0);
        entity.advance(0.25);
        assert!((entity.offset - 75.0).abs() < 0.0001);
    }

    #[test]
    fn inactive_entity_does_not_move() {
        let mut entity = enemy(1.0);
        entity.active = false;
        entity.advance(1.0);
        assert!((entity.offset - 50.0).abs() < 0.0001);
    }

    #[test]
    fn damage_rounds_to_one_decimal() {
        let mut entity = enemy(3.0);
        assert_eq!(entity.apply_damage(1.5), DamageOutcome::Damaged);
        let health = entity.health.expect("enemy keeps health");
        assert!((health.current() - 1.5).abs() < 0.0001);
    }

    #[test]
    fn lethal_damage_kills_exactly_once() {
        let mut entity = enemy(1.0);
        assert_eq!(entity.apply_damage(1.5), DamageOutcome::Killed);
        assert!(!entity.active);

        let after_death = entity.health.expect("health record survives death");
        assert_eq!(entity.apply_damage(1.5), DamageOutcome::Ignored);
        assert_eq!(
            entity.health.expect("health record survives death").current(),
            after_death.current()
        );
    }

    #[test]
    fn damage_on_non_damageable_kind_is_ignored() {
        let mut barrel = enemy(1.0);
        barrel.kind = EntityKind::Barrel;
        barrel.health = None;
        assert_eq!(barrel.apply_damage(9.0), DamageOutcome::Ignored);
        assert!(barrel.active);
    }

    #[test]
    fn overlap_requires_same_lane() {
        let a = enemy(1.0);
        let mut b = enemy(1.0);
        b.id = EntityId(1);
        b.lane = Lane(3);
        assert!(!a.overlaps(&b));
        b.lane = a.lane;
        assert!(a.overlaps(&b));
    }

    #[test]
    fn interval_overlap_at_edges_counts() {
        let a = enemy(1.0);
        let mut projectile = enemy(1.0);
        projectile.kind = EntityKind::Projectile;
        projectile.height = 34.0;
        projectile.offset = a.bottom();
        assert!(projectile.overlaps(&a));
        projectile.offset = a.bottom() + 0.5;
        assert!(!projectile.overlaps(&a));
    }

    #[test]
    fn boundary_tests_use_edges() {
        let mut entity = enemy(1.0);
        entity.offset = 459.0;
        assert!(!entity.reached_line(560.0));
        entity.offset = 460.0;
        assert!(entity.reached_line(560.0));

        let mut projectile = enemy(1.0);
        projectile.kind = EntityKind::Projectile;
        projectile.height = 34.0;
        projectile.offset = -33.0;
        assert!(!projectile.cleared_top());
        projectile.offset = -34.0;
        assert!(projectile.cleared_top());
    }

    #[test]
    fn health_fraction_tracks_initial() {
        let mut entity = enemy(2.0);
        entity.apply_damage(0.5);
        let health = entity.health.expect("health");
        assert!((health.fraction() - 0.75).abs() < 0.0001);
    }
}
