use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Every gameplay constant in one place. Probability fields follow a
/// "one in n" convention: `heart_one_in = 30` means a 1/30 roll, and 0
/// disables the roll entirely.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    pub lane_count: u8,
    pub player_start_lane: u8,
    pub starting_lives: u32,

    // Field geometry, in logical units measured downward from the field top.
    pub spawn_offset: f32,
    pub boundary_offset: f32,
    pub descent_speed: f32,
    pub enemy_height: f32,
    pub elite_height: f32,
    pub minion_height: f32,
    pub boss_height: f32,
    pub pickup_height: f32,
    pub projectile_height: f32,

    pub projectile_speed_base: f32,
    pub projectile_speed_per_level: f32,
    pub barrage_projectile_speed: f32,
    pub projectile_damage_base: f64,
    pub projectile_damage_per_level: f64,
    pub fire_interval_base_ms: u64,
    pub fire_interval_step_ms: u64,
    pub fire_interval_floor_ms: u64,
    pub speed_levels_per_interval_step: u32,
    pub rapid_fire_interval_ms: u64,
    pub rapid_fire_duration_ms: u64,
    pub barrage_duration_ms: u64,

    pub first_wave_at_ms: u64,
    pub wave_cadence_ms: u64,
    pub slot_interval_base_ms: u64,
    pub slot_interval_step_ms: u64,

    pub heart_one_in: u32,
    pub barrel_one_in: u32,
    pub barrel_min_elapsed_s: u64,
    pub crate_cadence_s: u64,
    pub crate_one_in: u32,
    pub bee_cadence_s: u64,
    pub bee_one_in: u32,
    pub elite_one_in: u32,
    pub elite_gap_s: u64,
    pub elite_health: f64,
    pub minion_health_factor: f64,
    pub minion_cap_min: u32,
    pub minion_cap_max: u32,
    pub minion_interval_ms: u64,
    pub boss_health_base: f64,
    pub boss_health_growth: f64,

    pub base_health_start: f64,
    pub base_health_step: f64,
    pub health_discount_max: f64,
    pub loot_base: f64,
    pub loot_step: f64,
    pub generation_growth: f64,
    pub barrel_award: f64,
    pub crate_award: f64,
    pub elite_award: f64,
    pub upgrade_price_start: f64,
    pub upgrade_price_step: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            lane_count: 7,
            player_start_lane: 3,
            starting_lives: 3,

            spawn_offset: -100.0,
            boundary_offset: 560.0,
            descent_speed: 100.0,
            enemy_height: 100.0,
            elite_height: 120.0,
            minion_height: 70.0,
            boss_height: 140.0,
            pickup_height: 60.0,
            projectile_height: 34.0,

            projectile_speed_base: 400.0,
            projectile_speed_per_level: 30.0,
            barrage_projectile_speed: 600.0,
            projectile_damage_base: 1.5,
            projectile_damage_per_level: 0.3,
            fire_interval_base_ms: 1000,
            fire_interval_step_ms: 10,
            fire_interval_floor_ms: 100,
            speed_levels_per_interval_step: 5,
            rapid_fire_interval_ms: 50,
            rapid_fire_duration_ms: 8000,
            barrage_duration_ms: 5000,

            first_wave_at_ms: 1000,
            wave_cadence_ms: 5000,
            slot_interval_base_ms: 3000,
            slot_interval_step_ms: 100,

            heart_one_in: 30,
            barrel_one_in: 15,
            barrel_min_elapsed_s: 37,
            crate_cadence_s: 20,
            crate_one_in: 3,
            bee_cadence_s: 10,
            bee_one_in: 4,
            elite_one_in: 35,
            elite_gap_s: 40,
            elite_health: 1.0,
            minion_health_factor: 0.6,
            minion_cap_min: 2,
            minion_cap_max: 6,
            minion_interval_ms: 1000,
            boss_health_base: 10.0,
            boss_health_growth: 1.3,

            base_health_start: 1.0,
            base_health_step: 0.1,
            health_discount_max: 0.3,
            loot_base: 0.5,
            loot_step: 0.05,
            generation_growth: 1.2,
            barrel_award: 10.0,
            crate_award: 5.0,
            elite_award: 12.0,
            upgrade_price_start: 1.0,
            upgrade_price_step: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning JSON at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("lane_count must be at least 1")]
    NoLanes,
    #[error("player_start_lane {start_lane} is outside lane range 0..{lane_count}")]
    StartLaneOutOfRange { start_lane: u8, lane_count: u8 },
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("fire_interval_floor_ms {floor} exceeds fire_interval_base_ms {base}")]
    IntervalFloorAboveBase { floor: u64, base: u64 },
    #[error("minion_cap_min {min} exceeds minion_cap_max {max}")]
    MinionCapInverted { min: u32, max: u32 },
    #[error("health_discount_max {value} must lie in [0, 1)")]
    DiscountOutOfRange { value: f64 },
}

impl Tuning {
    pub fn from_path(path: &Path) -> Result<Self, TuningError> {
        let raw = fs::read_to_string(path).map_err(|source| TuningError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TuningError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let tuning: Tuning =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                TuningError::Parse {
                    path: error.path().to_string(),
                    source: error.into_inner(),
                }
            })?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.lane_count == 0 {
            return Err(TuningError::NoLanes);
        }
        if self.player_start_lane >= self.lane_count {
            return Err(TuningError::StartLaneOutOfRange {
                start_lane: self.player_start_lane,
                lane_count: self.lane_count,
            });
        }
        for (field, value) in [
            ("boundary_offset", f64::from(self.boundary_offset)),
            ("descent_speed", f64::from(self.descent_speed)),
            ("projectile_speed_base", f64::from(self.projectile_speed_base)),
            (
                "barrage_projectile_speed",
                f64::from(self.barrage_projectile_speed),
            ),
            ("projectile_height", f64::from(self.projectile_height)),
            ("projectile_damage_base", self.projectile_damage_base),
            ("base_health_start", self.base_health_start),
            ("boss_health_base", self.boss_health_base),
            ("boss_health_growth", self.boss_health_growth),
            ("generation_growth", self.generation_growth),
            ("elite_health", self.elite_health),
            ("minion_health_factor", self.minion_health_factor),
        ] {
            if value <= 0.0 {
                return Err(TuningError::NonPositive { field });
            }
        }
        for (field, value) in [
            ("fire_interval_base_ms", self.fire_interval_base_ms),
            ("fire_interval_floor_ms", self.fire_interval_floor_ms),
            ("rapid_fire_interval_ms", self.rapid_fire_interval_ms),
            ("slot_interval_base_ms", self.slot_interval_base_ms),
            ("wave_cadence_ms", self.wave_cadence_ms),
            ("minion_interval_ms", self.minion_interval_ms),
        ] {
            if value == 0 {
                return Err(TuningError::NonPositive { field });
            }
        }
        if self.fire_interval_floor_ms > self.fire_interval_base_ms {
            return Err(TuningError::IntervalFloorAboveBase {
                floor: self.fire_interval_floor_ms,
                base: self.fire_interval_base_ms,
            });
        }
        if self.minion_cap_min > self.minion_cap_max {
            return Err(TuningError::MinionCapInverted {
                min: self.minion_cap_min,
                max: self.minion_cap_max,
            });
        }
        if !(0.0..1.0).contains(&self.health_discount_max) {
            return Err(TuningError::DiscountOutOfRange {
                value: self.health_discount_max,
            });
        }
        Ok(())
    }
}
