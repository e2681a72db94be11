use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::clock::RunClock;
use super::collision;
use super::economy::{self, Economy, UpgradeTrack};
use super::entity::{round_tenths, DamageOutcome, Entity, EntityId, EntityKind, Lane};
use super::events::{DestroyCause, EngineEvent, EventBus};
use super::firing::{FireControl, ShotParams};
use super::spawner::Spawner;
use super::surface::AudioSurface;
use super::world::LaneWorld;
use crate::tuning::{Tuning, TuningError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Paused,
    GameOver,
}

impl RunPhase {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::GameOver => "game_over",
        }
    }
}

/// Render snapshot of one entity. Offsets are logical units from the field
/// top, so callers scale them to whatever surface they draw on.
#[derive(Debug, Clone)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub lane: Lane,
    pub offset: f32,
    pub height: f32,
    pub health_fraction: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FrameView {
    pub phase: RunPhase,
    pub elapsed_ms: u64,
    pub lives: u32,
    pub balance: f64,
    pub loot_value: f64,
    pub wave: u32,
    pub player_lane: Lane,
    pub lane_count: u8,
    pub boundary_offset: f32,
    pub rapid_fire_active: bool,
    pub barrage_active: bool,
    pub auto_buy: Option<UpgradeTrack>,
    pub speed_level: u32,
    pub speed_price: f64,
    pub damage_level: u32,
    pub damage_price: f64,
    pub entities: Vec<EntityView>,
}

/// The whole simulation behind one mutable handle. Commands arrive between
/// ticks; `tick` advances the run to the supplied instant and hands back the
/// events produced since the previous drain.
///
/// Every command except `start` and `resume` is a silent no-op outside the
/// `Running` phase.
pub struct Game {
    tuning: Tuning,
    phase: RunPhase,
    clock: RunClock,
    last_elapsed_ms: u64,
    world: LaneWorld,
    spawner: Spawner,
    fire: FireControl,
    economy: Economy,
    lives: u32,
    player_lane: Lane,
    rng: StdRng,
    audio: Box<dyn AudioSurface>,
    events: EventBus,
    final_elapsed_ms: Option<u64>,
}

impl Game {
    pub fn new(tuning: Tuning, audio: Box<dyn AudioSurface>) -> Result<Self, TuningError> {
        Self::from_rng(tuning, audio, StdRng::from_entropy())
    }

    /// Deterministic variant: every lane choice and category roll replays
    /// identically for the same seed and tick instants.
    pub fn with_seed(
        tuning: Tuning,
        audio: Box<dyn AudioSurface>,
        seed: u64,
    ) -> Result<Self, TuningError> {
        Self::from_rng(tuning, audio, StdRng::seed_from_u64(seed))
    }

    fn from_rng(
        tuning: Tuning,
        audio: Box<dyn AudioSurface>,
        rng: StdRng,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;
        let lives = tuning.starting_lives;
        let player_lane = Lane(tuning.player_start_lane);
        let economy = Economy::new(&tuning);
        let fire = FireControl::new(tuning.lane_count);
        Ok(Self {
            tuning,
            phase: RunPhase::Idle,
            clock: RunClock::started_at(Instant::now()),
            last_elapsed_ms: 0,
            world: LaneWorld::default(),
            spawner: Spawner::default(),
            fire,
            economy,
            lives,
            player_lane,
            rng,
            audio,
            events: EventBus::default(),
            final_elapsed_ms: None,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn player_lane(&self) -> Lane {
        self.player_lane
    }

    pub fn balance(&self) -> f64 {
        self.economy.balance()
    }

    pub fn auto_buy(&self) -> Option<UpgradeTrack> {
        self.economy.auto_buy()
    }

    /// Applies a remembered selection without the running-phase gate, for
    /// callers that restore preferences before the first run.
    pub fn restore_auto_buy(&mut self, track: Option<UpgradeTrack>) {
        self.economy.set_auto_buy(track);
    }

    pub fn start(&mut self, now: Instant) {
        if self.phase != RunPhase::Idle {
            debug!(phase = self.phase.as_token(), "start_ignored");
            return;
        }
        self.begin_run(now);
    }

    /// Abandons whatever run is in progress and begins a fresh one. The
    /// auto-buy selection is the only state that survives.
    pub fn restart(&mut self, now: Instant) {
        if self.phase == RunPhase::Idle {
            debug!("restart_ignored_before_first_run");
            return;
        }
        self.begin_run(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if self.phase != RunPhase::Running {
            debug!(phase = self.phase.as_token(), "pause_ignored");
            return;
        }
        self.phase = RunPhase::Paused;
        self.clock.pause(now);
        self.audio.music_paused();
        info!("run_paused");
        self.events.emit(EngineEvent::RunPaused);
    }

    pub fn resume(&mut self, now: Instant) {
        if self.phase != RunPhase::Paused {
            debug!(phase = self.phase.as_token(), "resume_ignored");
            return;
        }
        self.phase = RunPhase::Running;
        self.clock.resume(now);
        self.audio.music_resumed();
        info!("run_resumed");
        self.events.emit(EngineEvent::RunResumed);
    }

    pub fn move_left(&mut self) {
        self.shift_player(-1);
    }

    pub fn move_right(&mut self) {
        self.shift_player(1);
    }

    pub fn buy(&mut self, track: UpgradeTrack) {
        if self.phase != RunPhase::Running {
            debug!(track = track.as_token(), "purchase_ignored");
            return;
        }
        match self.economy.try_purchase(track, &self.tuning) {
            Some(outcome) => {
                info!(
                    track = outcome.track.as_token(),
                    level = outcome.level,
                    price_paid = outcome.price_paid,
                    "upgrade_purchased"
                );
                self.events.emit(EngineEvent::Purchased {
                    track: outcome.track,
                    level: outcome.level,
                    price_paid: outcome.price_paid,
                });
                self.events.emit(EngineEvent::BalanceChanged {
                    balance: self.economy.balance(),
                });
            }
            None => debug!(track = track.as_token(), "purchase_unaffordable"),
        }
    }

    pub fn toggle_auto_buy(&mut self, track: UpgradeTrack) {
        if self.phase != RunPhase::Running {
            debug!(track = track.as_token(), "auto_buy_toggle_ignored");
            return;
        }
        let selected = self.economy.toggle_auto_buy(track);
        info!(track = ?selected.map(UpgradeTrack::as_token), "auto_buy_toggled");
        self.events.emit(EngineEvent::AutoBuySelected { track: selected });
    }

    /// Advances the run to `now` and drains everything emitted since the
    /// last call. Outside `Running` only the drain happens.
    pub fn tick(&mut self, now: Instant) -> Vec<EngineEvent> {
        if self.phase == RunPhase::Running {
            self.step(now);
        }
        self.events.drain()
    }

    pub fn frame_view(&self, now: Instant) -> FrameView {
        let elapsed_ms = match self.phase {
            RunPhase::Idle => 0,
            RunPhase::GameOver => self.final_elapsed_ms.unwrap_or(0),
            RunPhase::Running | RunPhase::Paused => self.clock.elapsed_ms(now),
        };
        FrameView {
            phase: self.phase,
            elapsed_ms,
            lives: self.lives,
            balance: self.economy.balance(),
            loot_value: economy::loot_value(elapsed_ms, &self.tuning),
            wave: self.spawner.wave_number(),
            player_lane: self.player_lane,
            lane_count: self.tuning.lane_count,
            boundary_offset: self.tuning.boundary_offset,
            rapid_fire_active: self.fire.rapid_active(elapsed_ms),
            barrage_active: self.fire.barrage_active(elapsed_ms),
            auto_buy: self.economy.auto_buy(),
            speed_level: self.economy.level(UpgradeTrack::Speed),
            speed_price: self.economy.price(UpgradeTrack::Speed),
            damage_level: self.economy.level(UpgradeTrack::Damage),
            damage_price: self.economy.price(UpgradeTrack::Damage),
            entities: self
                .world
                .entities()
                .iter()
                .filter(|entity| entity.active)
                .map(entity_view)
                .collect(),
        }
    }

    fn begin_run(&mut self, now: Instant) {
        self.phase = RunPhase::Running;
        self.clock.restart(now);
        self.last_elapsed_ms = 0;
        self.events.clear();
        self.world.clear();
        self.spawner.arm(&self.tuning);
        self.fire = FireControl::new(self.tuning.lane_count);
        self.fire.arm(0);
        self.economy.reset(&self.tuning);
        self.lives = self.tuning.starting_lives;
        self.player_lane = Lane(self.tuning.player_start_lane);
        self.final_elapsed_ms = None;
        self.audio.music_started();
        info!(lives = self.lives, lane = self.player_lane.0, "run_started");
        self.events.emit(EngineEvent::RunStarted);
    }

    fn step(&mut self, now: Instant) {
        let elapsed_ms = self.clock.elapsed_ms(now);
        let dt_ms = elapsed_ms.saturating_sub(self.last_elapsed_ms);
        self.last_elapsed_ms = elapsed_ms;
        let dt_seconds = dt_ms as f32 / 1000.0;

        self.economy.advance_base_health(elapsed_ms, &self.tuning);
        self.spawner.advance(
            elapsed_ms,
            &mut self.world,
            &mut self.events,
            &mut self.rng,
            &self.tuning,
            self.economy.base_health(),
        );
        self.advance_entities(dt_seconds);
        if self.lives == 0 {
            self.finish_run(elapsed_ms, now);
            return;
        }
        self.produce_minions(elapsed_ms);
        self.fire_projectiles(elapsed_ms);
        self.resolve_collisions(elapsed_ms);
        if let Some(outcome) = self.economy.run_auto_buy(&self.tuning) {
            debug!(
                track = outcome.track.as_token(),
                level = outcome.level,
                "auto_buy_purchased"
            );
            self.events.emit(EngineEvent::Purchased {
                track: outcome.track,
                level: outcome.level,
                price_paid: outcome.price_paid,
            });
            self.events.emit(EngineEvent::BalanceChanged {
                balance: self.economy.balance(),
            });
        }
        for lane in self.spawner.take_due_telegraphs(elapsed_ms) {
            debug!(lane = lane.0, "telegraph_cue");
            self.events.emit(EngineEvent::TelegraphCue { lane });
        }
        self.world.apply_pending();
    }

    /// Moves everything, then settles what left the field. Projectiles fade
    /// at the top without an event; descenders that cross the line cost a
    /// life when hostile and simply vanish when not.
    fn advance_entities(&mut self, dt_seconds: f32) {
        let boundary = self.tuning.boundary_offset;
        let mut cleared: Vec<EntityId> = Vec::new();
        let mut breached: Vec<(EntityId, EntityKind)> = Vec::new();
        for entity in self.world.entities_mut() {
            if !entity.active {
                continue;
            }
            entity.advance(dt_seconds);
            if entity.kind == EntityKind::Projectile {
                if entity.cleared_top() {
                    entity.active = false;
                    cleared.push(entity.id);
                }
            } else if entity.reached_line(boundary) {
                entity.active = false;
                breached.push((entity.id, entity.kind));
            }
        }
        for id in cleared {
            self.world.despawn(id);
        }
        for (id, kind) in breached {
            self.world.despawn(id);
            if !kind.costs_life_at_boundary() {
                debug!(kind = kind.as_token(), "special_drifted_out");
                continue;
            }
            let before = self.lives;
            self.lives = self.lives.saturating_sub(1);
            debug!(kind = kind.as_token(), lives = self.lives, "line_breached");
            self.events.emit(EngineEvent::Destroyed {
                id,
                kind,
                cause: DestroyCause::Boundary,
            });
            if self.lives != before {
                self.events.emit(EngineEvent::LivesChanged { lives: self.lives });
            }
        }
    }

    fn finish_run(&mut self, elapsed_ms: u64, now: Instant) {
        self.phase = RunPhase::GameOver;
        self.clock.pause(now);
        self.final_elapsed_ms = Some(elapsed_ms);
        self.world.clear();
        self.audio.music_stopped();
        info!(elapsed_ms, wave = self.spawner.wave_number(), "game_over");
        self.events.emit(EngineEvent::GameOver { elapsed_ms });
    }

    fn produce_minions(&mut self, elapsed_ms: u64) {
        let interval_ms = self.tuning.minion_interval_ms;
        let mut spawn_lanes: Vec<Lane> = Vec::new();
        for entity in self.world.entities_mut() {
            if !entity.active || entity.kind != EntityKind::Elite {
                continue;
            }
            let Some(brood) = entity.brood.as_mut() else {
                continue;
            };
            while brood.spawned < brood.cap && elapsed_ms >= brood.next_spawn_ms {
                brood.spawned += 1;
                brood.next_spawn_ms += interval_ms;
                spawn_lanes.push(entity.lane);
            }
        }
        if spawn_lanes.is_empty() {
            return;
        }
        let health = round_tenths(self.economy.base_health() * self.tuning.minion_health_factor);
        for lane in spawn_lanes {
            let id = self.world.spawn_hostile(
                EntityKind::Minion,
                lane,
                self.tuning.spawn_offset,
                self.tuning.descent_speed,
                self.tuning.minion_height,
                health,
            );
            debug!(lane = lane.0, health, "minion_spawned");
            self.events.emit(EngineEvent::Spawned {
                id,
                kind: EntityKind::Minion,
                lane,
            });
        }
    }

    fn fire_projectiles(&mut self, elapsed_ms: u64) {
        let params = ShotParams {
            player_lane: self.player_lane,
            base_interval_ms: self.economy.fire_interval_ms(),
            rapid_interval_ms: self.tuning.rapid_fire_interval_ms,
            projectile_speed: self.economy.projectile_speed(),
            barrage_speed: self.tuning.barrage_projectile_speed,
            damage: self.economy.projectile_damage(),
        };
        let shots = self.fire.plan_shots(elapsed_ms, &params);
        if shots.is_empty() {
            return;
        }
        let offset = self.tuning.boundary_offset - self.tuning.projectile_height / 2.0;
        for shot in shots {
            self.world.spawn_projectile(
                shot.lane,
                offset,
                -shot.speed,
                self.tuning.projectile_height,
                shot.damage,
            );
        }
    }

    fn resolve_collisions(&mut self, elapsed_ms: u64) {
        let projectile_ids: Vec<EntityId> = self
            .world
            .entities()
            .iter()
            .filter(|entity| entity.active && entity.kind == EntityKind::Projectile)
            .map(|entity| entity.id)
            .collect();
        for projectile_id in projectile_ids {
            let Some((target_id, damage)) = self.acquire_target(projectile_id) else {
                continue;
            };
            if let Some(projectile) = self.world.find_entity_mut(projectile_id) {
                projectile.active = false;
            }
            self.world.despawn(projectile_id);
            self.apply_hit(target_id, damage, elapsed_ms);
        }
    }

    fn acquire_target(&self, projectile_id: EntityId) -> Option<(EntityId, f64)> {
        let projectile = self.world.find_entity(projectile_id)?;
        let damage = projectile.projectile_damage?;
        let target_id = collision::find_target(&self.world, projectile)?;
        Some((target_id, damage))
    }

    fn apply_hit(&mut self, target_id: EntityId, damage: f64, elapsed_ms: u64) {
        let (kind, outcome) = {
            let Some(target) = self.world.find_entity_mut(target_id) else {
                return;
            };
            let kind = target.kind;
            let outcome = if kind.is_damageable() {
                target.apply_damage(damage)
            } else {
                target.active = false;
                DamageOutcome::Killed
            };
            (kind, outcome)
        };
        if outcome != DamageOutcome::Killed {
            return;
        }
        self.world.despawn(target_id);
        self.events.emit(EngineEvent::Destroyed {
            id: target_id,
            kind,
            cause: DestroyCause::Shot,
        });
        match kind {
            EntityKind::Barrel => {
                let balance = self.economy.deposit(self.tuning.barrel_award);
                self.events.emit(EngineEvent::BalanceChanged { balance });
                self.blast(elapsed_ms);
            }
            EntityKind::Crate => {
                let balance = self.economy.deposit(self.tuning.crate_award);
                self.events.emit(EngineEvent::BalanceChanged { balance });
                let until_ms = self
                    .fire
                    .start_barrage(elapsed_ms, self.tuning.barrage_duration_ms);
                info!(until_ms, "barrage_started");
                self.events.emit(EngineEvent::BarrageStarted { until_ms });
            }
            EntityKind::Heart => {
                self.lives += 1;
                debug!(lives = self.lives, "heart_collected");
                self.events.emit(EngineEvent::LivesChanged { lives: self.lives });
            }
            EntityKind::Bee => {
                let until_ms = self
                    .fire
                    .extend_rapid(elapsed_ms, self.tuning.rapid_fire_duration_ms);
                debug!(until_ms, "rapid_fire_extended");
                self.events.emit(EngineEvent::RapidFireStarted { until_ms });
            }
            _ => self.award_kill(kind, elapsed_ms),
        }
    }

    /// Only plain hostiles drop the time-scaled loot when shot down. An
    /// elite pays its flat bounty instead and a boss doubles the balance
    /// outright.
    fn award_kill(&mut self, kind: EntityKind, elapsed_ms: u64) {
        let balance = match kind {
            EntityKind::Elite => self.economy.deposit(self.tuning.elite_award),
            EntityKind::Boss => {
                let balance = self.economy.double_balance();
                info!(balance, "boss_bounty_doubled");
                balance
            }
            _ => {
                let loot = economy::loot_value(elapsed_ms, &self.tuning);
                self.economy.deposit(loot)
            }
        };
        self.events.emit(EngineEvent::BalanceChanged { balance });
    }

    /// Barrel chain: every active hostile on the field dies at once, each
    /// paying plain loot. Elite and boss bonuses do not apply here.
    fn blast(&mut self, elapsed_ms: u64) {
        let victims: Vec<(EntityId, EntityKind)> = self
            .world
            .entities()
            .iter()
            .filter(|entity| entity.active && entity.kind.is_damageable())
            .map(|entity| (entity.id, entity.kind))
            .collect();
        if victims.is_empty() {
            return;
        }
        let loot = economy::loot_value(elapsed_ms, &self.tuning);
        info!(victims = victims.len(), loot, "barrel_blast");
        for (id, kind) in &victims {
            if let Some(entity) = self.world.find_entity_mut(*id) {
                entity.active = false;
            }
            self.world.despawn(*id);
            self.economy.deposit(loot);
            self.events.emit(EngineEvent::Destroyed {
                id: *id,
                kind: *kind,
                cause: DestroyCause::Blast,
            });
        }
        self.events.emit(EngineEvent::BalanceChanged {
            balance: self.economy.balance(),
        });
    }

    fn shift_player(&mut self, delta: i8) {
        if self.phase != RunPhase::Running {
            debug!(phase = self.phase.as_token(), "move_ignored");
            return;
        }
        self.player_lane = self.player_lane.shifted(delta, self.tuning.lane_count);
        self.audio.play_note(self.player_lane);
        self.events.emit(EngineEvent::LaneChanged {
            lane: self.player_lane,
        });
    }
}

fn entity_view(entity: &Entity) -> EntityView {
    EntityView {
        id: entity.id,
        kind: entity.kind,
        lane: entity.lane,
        offset: entity.offset,
        height: entity.height,
        health_fraction: entity.health.as_ref().map(super::entity::Health::fraction),
    }
}
