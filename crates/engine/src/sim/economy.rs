use super::entity::round_tenths;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeTrack {
    Speed,
    Damage,
}

impl UpgradeTrack {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Damage => "damage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseOutcome {
    pub track: UpgradeTrack,
    pub level: u32,
    pub price_paid: f64,
}

/// Currency, upgrade ladders and the elapsed-time difficulty curves.
/// Balance is kept at two decimals, health curves at one.
#[derive(Debug)]
pub struct Economy {
    balance: f64,
    base_health: f64,
    last_health_second: u64,
    speed_price: f64,
    speed_level: u32,
    damage_price: f64,
    damage_level: u32,
    projectile_speed: f32,
    projectile_damage: f64,
    fire_interval_ms: u64,
    auto_buy: Option<UpgradeTrack>,
}

impl Economy {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            balance: 0.0,
            base_health: round_tenths(tuning.base_health_start),
            last_health_second: 0,
            speed_price: tuning.upgrade_price_start,
            speed_level: 0,
            damage_price: tuning.upgrade_price_start,
            damage_level: 0,
            projectile_speed: tuning.projectile_speed_base,
            projectile_damage: tuning.projectile_damage_base,
            fire_interval_ms: tuning.fire_interval_base_ms,
            auto_buy: None,
        }
    }

    /// Restart reset. The auto-buy selection deliberately survives; every
    /// other field returns to its starting value.
    pub fn reset(&mut self, tuning: &Tuning) {
        let auto_buy = self.auto_buy;
        *self = Self::new(tuning);
        self.auto_buy = auto_buy;
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn deposit(&mut self, amount: f64) -> f64 {
        self.balance = round_cents(self.balance + amount);
        self.balance
    }

    pub fn double_balance(&mut self) -> f64 {
        self.balance = round_cents(self.balance * 2.0);
        self.balance
    }

    pub fn base_health(&self) -> f64 {
        self.base_health
    }

    /// One step per elapsed whole second, catching up across large jumps.
    pub fn advance_base_health(&mut self, elapsed_ms: u64, tuning: &Tuning) {
        let seconds = elapsed_ms / 1000;
        while self.last_health_second < seconds {
            self.last_health_second += 1;
            self.base_health = round_tenths(self.base_health + tuning.base_health_step);
        }
    }

    pub fn projectile_speed(&self) -> f32 {
        self.projectile_speed
    }

    pub fn projectile_damage(&self) -> f64 {
        self.projectile_damage
    }

    pub fn fire_interval_ms(&self) -> u64 {
        self.fire_interval_ms
    }

    pub fn price(&self, track: UpgradeTrack) -> f64 {
        match track {
            UpgradeTrack::Speed => self.speed_price,
            UpgradeTrack::Damage => self.damage_price,
        }
    }

    pub fn level(&self, track: UpgradeTrack) -> u32 {
        match track {
            UpgradeTrack::Speed => self.speed_level,
            UpgradeTrack::Damage => self.damage_level,
        }
    }

    /// Returns `None` without touching any state when the balance cannot
    /// cover the current price.
    pub fn try_purchase(
        &mut self,
        track: UpgradeTrack,
        tuning: &Tuning,
    ) -> Option<PurchaseOutcome> {
        let price = self.price(track);
        if self.balance < price {
            return None;
        }
        self.balance = round_cents(self.balance - price);
        let level = match track {
            UpgradeTrack::Speed => {
                self.speed_level += 1;
                self.projectile_speed += tuning.projectile_speed_per_level;
                let step = tuning.speed_levels_per_interval_step;
                if step > 0 && self.speed_level % step == 0 {
                    self.fire_interval_ms = self
                        .fire_interval_ms
                        .saturating_sub(tuning.fire_interval_step_ms)
                        .max(tuning.fire_interval_floor_ms);
                }
                self.speed_price += tuning.upgrade_price_step;
                self.speed_level
            }
            UpgradeTrack::Damage => {
                self.damage_level += 1;
                self.projectile_damage =
                    round_tenths(self.projectile_damage + tuning.projectile_damage_per_level);
                self.damage_price += tuning.upgrade_price_step;
                self.damage_level
            }
        };
        Some(PurchaseOutcome {
            track,
            level,
            price_paid: price,
        })
    }

    pub fn auto_buy(&self) -> Option<UpgradeTrack> {
        self.auto_buy
    }

    /// Direct assignment, used when restoring a remembered selection.
    pub fn set_auto_buy(&mut self, track: Option<UpgradeTrack>) {
        self.auto_buy = track;
    }

    /// Toggle semantics: selecting the enabled track disables it, selecting
    /// the other track switches. At most one track is ever enabled.
    pub fn toggle_auto_buy(&mut self, track: UpgradeTrack) -> Option<UpgradeTrack> {
        self.auto_buy = if self.auto_buy == Some(track) {
            None
        } else {
            Some(track)
        };
        self.auto_buy
    }

    /// At most one purchase per call.
    pub fn run_auto_buy(&mut self, tuning: &Tuning) -> Option<PurchaseOutcome> {
        let track = self.auto_buy?;
        self.try_purchase(track, tuning)
    }
}

pub fn loot_value(elapsed_ms: u64, tuning: &Tuning) -> f64 {
    let seconds = (elapsed_ms / 1000) as f64;
    round_cents(tuning.loot_base + tuning.loot_step * seconds)
}

/// Wave-size multiplier. Flat during the first minute, then compounding
/// per elapsed whole minute.
pub fn generation_multiplier(elapsed_ms: u64, tuning: &Tuning) -> f64 {
    let minutes = elapsed_ms / 60_000;
    if minutes == 0 {
        1.0
    } else {
        tuning.generation_growth.powi(minutes as i32)
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
