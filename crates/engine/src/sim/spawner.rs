use rand::Rng;
use tracing::{debug, info};

use super::economy;
use super::entity::{round_tenths, Brood, EntityKind, Lane};
use super::events::{EngineEvent, EventBus};
use super::world::LaneWorld;
use crate::tuning::Tuning;

/// Advisory cue queued when a special spawns, due at the spawn instant
/// itself. Consumed once due; has no effect on the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telegraph {
    pub lane: Lane,
    pub due_ms: u64,
}

/// All time-driven entity generation: the wave lifecycle plus the fixed
/// cadences for crates, bees, bosses and elites. Cadence is deterministic;
/// lane choice and category rolls come from the injected RNG.
#[derive(Debug, Default)]
pub struct Spawner {
    wave_number: u32,
    next_wave_start_ms: u64,
    spawns_left: u32,
    slot_interval_ms: u64,
    next_slot_ms: u64,
    last_crate_mark: u64,
    last_bee_mark: u64,
    last_boss_minute: u64,
    last_elite_roll_second: Option<u64>,
    last_elite_spawn_second: Option<u64>,
    telegraphs: Vec<Telegraph>,
}

impl Spawner {
    pub fn arm(&mut self, tuning: &Tuning) {
        self.wave_number = 0;
        self.next_wave_start_ms = tuning.first_wave_at_ms;
        self.spawns_left = 0;
        self.slot_interval_ms = tuning.slot_interval_base_ms;
        self.next_slot_ms = 0;
        self.last_crate_mark = 0;
        self.last_bee_mark = 0;
        self.last_boss_minute = 0;
        self.last_elite_roll_second = None;
        self.last_elite_spawn_second = None;
        self.telegraphs.clear();
    }

    pub fn wave_number(&self) -> u32 {
        self.wave_number
    }

    #[allow(dead_code)]
    pub fn wave_draining(&self) -> bool {
        self.spawns_left > 0
    }

    #[allow(dead_code)]
    pub fn telegraphs(&self) -> &[Telegraph] {
        &self.telegraphs
    }

    pub fn advance(
        &mut self,
        elapsed_ms: u64,
        world: &mut LaneWorld,
        events: &mut EventBus,
        rng: &mut impl Rng,
        tuning: &Tuning,
        base_health: f64,
    ) {
        self.advance_cadences(elapsed_ms, world, events, rng, tuning);
        self.advance_waves(elapsed_ms, world, events, rng, tuning, base_health);
    }

    /// Pops every telegraph whose due time has passed.
    pub fn take_due_telegraphs(&mut self, elapsed_ms: u64) -> Vec<Lane> {
        let mut due = Vec::new();
        self.telegraphs.retain(|telegraph| {
            if telegraph.due_ms <= elapsed_ms {
                due.push(telegraph.lane);
                false
            } else {
                true
            }
        });
        due
    }

    fn advance_waves(
        &mut self,
        elapsed_ms: u64,
        world: &mut LaneWorld,
        events: &mut EventBus,
        rng: &mut impl Rng,
        tuning: &Tuning,
        base_health: f64,
    ) {
        // A wave may only start once the previous one has fully drained.
        // Overdue starts happen on the first tick after the drain completes.
        if self.spawns_left == 0 && elapsed_ms >= self.next_wave_start_ms {
            self.wave_number += 1;
            let multiplier = economy::generation_multiplier(elapsed_ms, tuning);
            let count = (f64::from(self.wave_number) * multiplier).ceil() as u32;
            self.spawns_left = count;
            self.slot_interval_ms = tuning.slot_interval_base_ms
                + tuning.slot_interval_step_ms * u64::from(self.wave_number - 1);
            self.next_slot_ms = elapsed_ms;
            self.next_wave_start_ms += tuning.wave_cadence_ms;
            info!(
                wave = self.wave_number,
                spawns = count,
                slot_interval_ms = self.slot_interval_ms,
                "wave_started"
            );
            events.emit(EngineEvent::WaveStarted {
                wave: self.wave_number,
                spawn_count: count,
            });
        }

        while self.spawns_left > 0 && elapsed_ms >= self.next_slot_ms {
            self.spawn_wave_slot(elapsed_ms, world, events, rng, tuning, base_health);
            self.spawns_left -= 1;
            self.next_slot_ms += self.slot_interval_ms;
        }
    }

    fn spawn_wave_slot(
        &mut self,
        elapsed_ms: u64,
        world: &mut LaneWorld,
        events: &mut EventBus,
        rng: &mut impl Rng,
        tuning: &Tuning,
        base_health: f64,
    ) {
        let lane = random_lane(rng, tuning);
        if roll_one_in(rng, tuning.heart_one_in) {
            self.spawn_special(EntityKind::Heart, lane, elapsed_ms, world, events, tuning);
        } else if elapsed_ms / 1000 >= tuning.barrel_min_elapsed_s
            && roll_one_in(rng, tuning.barrel_one_in)
        {
            self.spawn_special(EntityKind::Barrel, lane, elapsed_ms, world, events, tuning);
        } else {
            let discount = rng.gen::<f64>() * tuning.health_discount_max;
            let health = round_tenths(base_health * (1.0 - discount));
            let id = world.spawn_hostile(
                EntityKind::Enemy,
                lane,
                tuning.spawn_offset,
                tuning.descent_speed,
                tuning.enemy_height,
                health,
            );
            debug!(lane = lane.0, health, "enemy_spawned");
            events.emit(EngineEvent::Spawned {
                id,
                kind: EntityKind::Enemy,
                lane,
            });
        }
    }

    fn advance_cadences(
        &mut self,
        elapsed_ms: u64,
        world: &mut LaneWorld,
        events: &mut EventBus,
        rng: &mut impl Rng,
        tuning: &Tuning,
    ) {
        let seconds = elapsed_ms / 1000;

        // Crate and bee checks run at most once per crossed cadence mark.
        // Marks skipped by a large tick are dropped, never replayed.
        if tuning.crate_cadence_s > 0 {
            let mark = seconds / tuning.crate_cadence_s;
            if mark > self.last_crate_mark {
                self.last_crate_mark = mark;
                if roll_one_in(rng, tuning.crate_one_in) {
                    let lane = random_lane(rng, tuning);
                    self.spawn_special(EntityKind::Crate, lane, elapsed_ms, world, events, tuning);
                }
            }
        }
        if tuning.bee_cadence_s > 0 {
            let mark = seconds / tuning.bee_cadence_s;
            if mark > self.last_bee_mark {
                self.last_bee_mark = mark;
                if roll_one_in(rng, tuning.bee_one_in) {
                    let lane = random_lane(rng, tuning);
                    self.spawn_special(EntityKind::Bee, lane, elapsed_ms, world, events, tuning);
                }
            }
        }

        // Exactly one boss per crossed minute, each with its own minute's
        // health, even when one tick crosses several.
        let minute = elapsed_ms / 60_000;
        while self.last_boss_minute < minute {
            self.last_boss_minute += 1;
            let health = round_tenths(
                tuning.boss_health_base
                    * tuning.boss_health_growth.powi(self.last_boss_minute as i32),
            );
            let lane = random_lane(rng, tuning);
            let id = world.spawn_hostile(
                EntityKind::Boss,
                lane,
                tuning.spawn_offset,
                tuning.descent_speed,
                tuning.boss_height,
                health,
            );
            info!(minute = self.last_boss_minute, lane = lane.0, health, "boss_spawned");
            events.emit(EngineEvent::Spawned {
                id,
                kind: EntityKind::Boss,
                lane,
            });
        }

        // One roll per second value, and never during the opening second.
        if tuning.elite_one_in > 0 && seconds > 0 && self.last_elite_roll_second != Some(seconds) {
            self.last_elite_roll_second = Some(seconds);
            let gap_ok = self
                .last_elite_spawn_second
                .map_or(true, |last| seconds.saturating_sub(last) >= tuning.elite_gap_s);
            if gap_ok && roll_one_in(rng, tuning.elite_one_in) {
                let lane = random_lane(rng, tuning);
                let cap = rng.gen_range(tuning.minion_cap_min..=tuning.minion_cap_max);
                let brood = Brood {
                    next_spawn_ms: elapsed_ms + tuning.minion_interval_ms,
                    spawned: 0,
                    cap,
                };
                let id = world.spawn_elite(
                    lane,
                    tuning.spawn_offset,
                    tuning.descent_speed,
                    tuning.elite_height,
                    tuning.elite_health,
                    brood,
                );
                self.last_elite_spawn_second = Some(seconds);
                debug!(lane = lane.0, minion_cap = cap, "elite_spawned");
                events.emit(EngineEvent::Spawned {
                    id,
                    kind: EntityKind::Elite,
                    lane,
                });
            }
        }
    }

    fn spawn_special(
        &mut self,
        kind: EntityKind,
        lane: Lane,
        elapsed_ms: u64,
        world: &mut LaneWorld,
        events: &mut EventBus,
        tuning: &Tuning,
    ) {
        let id = world.spawn_pickup(
            kind,
            lane,
            tuning.spawn_offset,
            tuning.descent_speed,
            tuning.pickup_height,
        );
        self.telegraphs.push(Telegraph { lane, due_ms: elapsed_ms });
        debug!(kind = kind.as_token(), lane = lane.0, "special_spawned");
        events.emit(EngineEvent::Spawned { id, kind, lane });
    }
}

fn random_lane(rng: &mut impl Rng, tuning: &Tuning) -> Lane {
    Lane(rng.gen_range(0..tuning.lane_count))
}

fn roll_one_in(rng: &mut impl Rng, one_in: u32) -> bool {
    one_in > 0 && rng.gen_range(0..one_in) == 0
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::sim::events::EngineEventKind;

    struct Harness {
        spawner: Spawner,
        world: LaneWorld,
        events: EventBus,
        rng: StdRng,
        tuning: Tuning,
    }

    fn harness(mutate: impl FnOnce(&mut Tuning)) -> Harness {
        let mut tuning = Tuning::default();
        mutate(&mut tuning);
        let mut spawner = Spawner::default();
        spawner.arm(&tuning);
        Harness {
            spawner,
            world: LaneWorld::default(),
            events: EventBus::default(),
            rng: StdRng::seed_from_u64(7),
            tuning,
        }
    }

    /// Disables every cadence special so only wave spawns remain.
    fn waves_only(tuning: &mut Tuning) {
        tuning.heart_one_in = 0;
        tuning.barrel_one_in = 0;
        tuning.crate_one_in = 0;
        tuning.bee_one_in = 0;
        tuning.elite_one_in = 0;
    }

    impl Harness {
        fn advance(&mut self, elapsed_ms: u64) {
            let base_health = 1.0;
            self.spawner.advance(
                elapsed_ms,
                &mut self.world,
                &mut self.events,
                &mut self.rng,
                &self.tuning,
                base_health,
            );
            self.world.apply_pending();
        }

        fn advance_with_health(&mut self, elapsed_ms: u64, base_health: f64) {
            self.spawner.advance(
                elapsed_ms,
                &mut self.world,
                &mut self.events,
                &mut self.rng,
                &self.tuning,
                base_health,
            );
            self.world.apply_pending();
        }

        fn count_of(&self, kind: EntityKind) -> usize {
            self.world
                .entities()
                .iter()
                .filter(|entity| entity.kind == kind)
                .count()
        }
    }

    #[test]
    fn first_wave_spawns_one_enemy_by_its_due_time() {
        let mut h = harness(waves_only);
        h.advance(999);
        assert_eq!(h.world.entity_count(), 0);

        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Enemy), 1);
        assert_eq!(h.spawner.wave_number(), 1);
        assert!(!h.spawner.wave_draining());
    }

    #[test]
    fn wave_drains_fully_before_the_next_starts() {
        let mut h = harness(waves_only);
        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Enemy), 1);

        // Wave 2 is due at 6000 with two slots 3100 ms apart. A tick far in
        // the future must not let wave 3 start until both slots landed.
        h.advance(20_000);
        assert_eq!(h.spawner.wave_number(), 2);
        assert_eq!(h.count_of(EntityKind::Enemy), 2);
        assert!(h.spawner.wave_draining());

        h.advance(23_100);
        assert_eq!(h.count_of(EntityKind::Enemy), 3);
        assert!(!h.spawner.wave_draining());

        h.advance(23_101);
        assert_eq!(h.spawner.wave_number(), 3);
    }

    #[test]
    fn wave_slot_count_is_exact_under_tick_jitter() {
        let mut h = harness(waves_only);
        // Jittered tick times: nothing lands exactly on a slot boundary.
        let ticks = [
            1_003, 6_007, 7_450, 9_201, 12_399, 17_777, 26_001, 26_500, 29_900, 33_333, 36_500,
        ];
        for elapsed in ticks {
            h.advance(elapsed);
        }
        let started: Vec<u32> = h
            .events
            .emitted()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::WaveStarted { wave, spawn_count } => Some((*wave, *spawn_count)),
                _ => None,
            })
            .map(|(wave, _)| wave)
            .collect();
        assert_eq!(started, vec![1, 2, 3, 4]);

        // Waves 1..=4 in the first minute spawn 1 + 2 + 3 + 4 slots.
        assert_eq!(h.count_of(EntityKind::Enemy), 10);
    }

    #[test]
    fn enemy_health_discount_stays_within_range() {
        let mut h = harness(waves_only);
        let base_health = 8.0;
        let mut elapsed = 1000;
        for _ in 0..40 {
            h.advance_with_health(elapsed, base_health);
            elapsed += 5000;
        }
        let enemies: Vec<f64> = h
            .world
            .entities()
            .iter()
            .filter(|entity| entity.kind == EntityKind::Enemy)
            .map(|entity| entity.health.expect("enemies carry health").current())
            .collect();
        assert!(!enemies.is_empty());
        for health in enemies {
            assert!(health <= base_health + 0.0001, "health {health} above base");
            assert!(
                health >= base_health * 0.7 - 0.0501,
                "health {health} discounted beyond 30%"
            );
        }
    }

    #[test]
    fn crate_mark_is_checked_once_and_missed_marks_skip() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.crate_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(19_999);
        assert_eq!(h.count_of(EntityKind::Crate), 0);

        h.advance(20_000);
        assert_eq!(h.count_of(EntityKind::Crate), 1);
        h.advance(20_700);
        assert_eq!(h.count_of(EntityKind::Crate), 1);

        // Jumping across marks 2 and 3 rolls once, not twice.
        h.advance(61_000);
        assert_eq!(h.count_of(EntityKind::Crate), 2);
    }

    #[test]
    fn bee_cadence_follows_its_own_marks() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.bee_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(9_999);
        assert_eq!(h.count_of(EntityKind::Bee), 0);
        h.advance(10_000);
        assert_eq!(h.count_of(EntityKind::Bee), 1);
        h.advance(19_000);
        assert_eq!(h.count_of(EntityKind::Bee), 1);
        h.advance(20_000);
        assert_eq!(h.count_of(EntityKind::Bee), 2);
    }

    #[test]
    fn one_boss_per_crossed_minute_with_compounding_health() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(59_999);
        assert_eq!(h.count_of(EntityKind::Boss), 0);

        h.advance(185_000);
        let bosses: Vec<f64> = h
            .world
            .entities()
            .iter()
            .filter(|entity| entity.kind == EntityKind::Boss)
            .map(|entity| entity.health.expect("bosses carry health").current())
            .collect();
        assert_eq!(bosses.len(), 3);
        assert!((bosses[0] - 13.0).abs() < 0.0001);
        assert!((bosses[1] - 16.9).abs() < 0.0001);
        assert!((bosses[2] - 22.0).abs() < 0.0001);
    }

    #[test]
    fn elite_roll_skips_the_opening_second() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.elite_one_in = 1;
            tuning.elite_gap_s = 0;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(0);
        h.advance(500);
        h.advance(999);
        assert_eq!(h.count_of(EntityKind::Elite), 0);

        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Elite), 1);
    }

    #[test]
    fn elite_respects_the_minimum_gap() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.elite_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Elite), 1);

        for second in 2..41 {
            h.advance(second * 1000);
        }
        assert_eq!(h.count_of(EntityKind::Elite), 1);

        h.advance(41_000);
        assert_eq!(h.count_of(EntityKind::Elite), 2);
    }

    #[test]
    fn elite_rolls_at_most_once_per_second_value() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.elite_one_in = 1;
            tuning.elite_gap_s = 0;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(1000);
        h.advance(1400);
        h.advance(1900);
        assert_eq!(h.count_of(EntityKind::Elite), 1);
        h.advance(2000);
        assert_eq!(h.count_of(EntityKind::Elite), 2);
    }

    #[test]
    fn elite_brood_cap_stays_in_configured_range() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.elite_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(1000);
        let elite = h
            .world
            .entities()
            .iter()
            .find(|entity| entity.kind == EntityKind::Elite)
            .expect("elite spawned");
        let brood = elite.brood.expect("elite carries brood state");
        assert!(brood.cap >= 2 && brood.cap <= 6);
        assert_eq!(brood.next_spawn_ms, 2000);
    }

    #[test]
    fn special_telegraphs_come_due_at_the_spawn_instant() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.crate_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(20_000);
        assert_eq!(h.spawner.telegraphs().len(), 1);
        let telegraph = h.spawner.telegraphs()[0];
        assert_eq!(telegraph.due_ms, 20_000);

        let due = h.spawner.take_due_telegraphs(20_000);
        assert_eq!(due, vec![telegraph.lane]);
        assert!(h.spawner.telegraphs().is_empty());
    }

    #[test]
    fn bosses_and_elites_are_not_telegraphed() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.elite_one_in = 1;
            tuning.first_wave_at_ms = 9_999_999;
        });
        h.advance(61_000);
        assert!(h.count_of(EntityKind::Boss) > 0);
        assert!(h.count_of(EntityKind::Elite) > 0);
        assert!(h.spawner.telegraphs().is_empty());
    }

    #[test]
    fn heart_roll_takes_priority_over_enemy() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.heart_one_in = 1;
        });
        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Heart), 1);
        assert_eq!(h.count_of(EntityKind::Enemy), 0);
        assert_eq!(
            h.events
                .emitted()
                .iter()
                .filter(|event| event.kind() == EngineEventKind::Spawned)
                .count(),
            1
        );
    }

    #[test]
    fn barrel_roll_waits_for_its_elapsed_gate() {
        let mut h = harness(|tuning| {
            waves_only(tuning);
            tuning.barrel_one_in = 1;
        });
        h.advance(1000);
        assert_eq!(h.count_of(EntityKind::Barrel), 0);
        assert_eq!(h.count_of(EntityKind::Enemy), 1);

        // Past the gate every wave slot rolls a barrel.
        h.advance(37_000);
        assert!(h.count_of(EntityKind::Barrel) > 0);
    }
}
