use super::entity::Lane;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireAt {
    Never,
    At(u64),
}

impl FireAt {
    pub fn due(self, elapsed_ms: u64) -> bool {
        match self {
            FireAt::At(at) => elapsed_ms >= at,
            FireAt::Never => false,
        }
    }

    fn advanced_by(self, interval_ms: u64) -> FireAt {
        match self {
            FireAt::At(at) => FireAt::At(at.saturating_add(interval_ms)),
            FireAt::Never => FireAt::Never,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedShot {
    pub lane: Lane,
    pub speed: f32,
    pub damage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotParams {
    pub player_lane: Lane,
    pub base_interval_ms: u64,
    pub rapid_interval_ms: u64,
    pub projectile_speed: f32,
    pub barrage_speed: f32,
    pub damage: f64,
}

/// Shot scheduling. The player's own lane follows one due time; a barrage
/// arms every lane through a separate per-lane map. At most one shot per
/// schedule per tick, with the own-lane due time advancing by `+=` so the
/// average rate stays exact under frame jitter.
#[derive(Debug)]
pub struct FireControl {
    own_next: FireAt,
    lane_next: Vec<FireAt>,
    rapid_until_ms: u64,
    barrage_until_ms: u64,
}

impl FireControl {
    pub fn new(lane_count: u8) -> Self {
        Self {
            own_next: FireAt::Never,
            lane_next: vec![FireAt::Never; usize::from(lane_count)],
            rapid_until_ms: 0,
            barrage_until_ms: 0,
        }
    }

    /// Run start: the own lane is due immediately, everything else idles.
    pub fn arm(&mut self, elapsed_ms: u64) {
        self.own_next = FireAt::At(elapsed_ms);
        self.lane_next.fill(FireAt::Never);
        self.rapid_until_ms = 0;
        self.barrage_until_ms = 0;
    }

    pub fn rapid_active(&self, elapsed_ms: u64) -> bool {
        elapsed_ms < self.rapid_until_ms
    }

    pub fn barrage_active(&self, elapsed_ms: u64) -> bool {
        elapsed_ms < self.barrage_until_ms
    }

    /// Extends the rapid-fire window (never stacks) and arms the own lane.
    pub fn extend_rapid(&mut self, elapsed_ms: u64, duration_ms: u64) -> u64 {
        self.rapid_until_ms = self.rapid_until_ms.max(elapsed_ms + duration_ms);
        self.own_next = FireAt::At(elapsed_ms);
        self.rapid_until_ms
    }

    /// Extends the barrage window (never stacks) and arms every lane.
    pub fn start_barrage(&mut self, elapsed_ms: u64, duration_ms: u64) -> u64 {
        self.barrage_until_ms = self.barrage_until_ms.max(elapsed_ms + duration_ms);
        self.lane_next.fill(FireAt::At(elapsed_ms));
        self.barrage_until_ms
    }

    pub fn plan_shots(&mut self, elapsed_ms: u64, params: &ShotParams) -> Vec<PlannedShot> {
        let mut shots = Vec::new();
        if self.barrage_active(elapsed_ms) {
            for (index, slot) in self.lane_next.iter_mut().enumerate() {
                if slot.due(elapsed_ms) {
                    shots.push(PlannedShot {
                        lane: Lane(index as u8),
                        speed: params.barrage_speed,
                        damage: params.damage,
                    });
                    *slot = FireAt::At(elapsed_ms + params.base_interval_ms);
                }
            }
            // The own-lane schedule keeps running during a barrage, so the
            // player's lane can fire from both maps in the same window.
            if self.own_next.due(elapsed_ms) {
                shots.push(PlannedShot {
                    lane: params.player_lane,
                    speed: params.barrage_speed,
                    damage: params.damage,
                });
                self.own_next = FireAt::At(elapsed_ms + params.base_interval_ms);
            }
        } else {
            if self.barrage_until_ms != 0 {
                self.barrage_until_ms = 0;
                self.lane_next.fill(FireAt::Never);
            }
            if self.own_next.due(elapsed_ms) {
                let interval = if self.rapid_active(elapsed_ms) {
                    params.rapid_interval_ms
                } else {
                    params.base_interval_ms
                };
                shots.push(PlannedShot {
                    lane: params.player_lane,
                    speed: params.projectile_speed,
                    damage: params.damage,
                });
                self.own_next = self.own_next.advanced_by(interval);
            }
        }
        shots
    }
}
