use super::economy::UpgradeTrack;
use super::entity::{EntityId, EntityKind, Lane};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    RunStarted,
    RunPaused,
    RunResumed,
    GameOver { elapsed_ms: u64 },
    LaneChanged { lane: Lane },
    WaveStarted { wave: u32, spawn_count: u32 },
    Spawned { id: EntityId, kind: EntityKind, lane: Lane },
    Destroyed { id: EntityId, kind: EntityKind, cause: DestroyCause },
    BalanceChanged { balance: f64 },
    LivesChanged { lives: u32 },
    Purchased { track: UpgradeTrack, level: u32, price_paid: f64 },
    AutoBuySelected { track: Option<UpgradeTrack> },
    RapidFireStarted { until_ms: u64 },
    BarrageStarted { until_ms: u64 },
    TelegraphCue { lane: Lane },
}

/// How an entity left the field. `Shot` covers direct projectile hits,
/// `Blast` the barrel chain, `Boundary` a descent past the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    Shot,
    Blast,
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEventKind {
    RunStarted,
    RunPaused,
    RunResumed,
    GameOver,
    LaneChanged,
    WaveStarted,
    Spawned,
    Destroyed,
    BalanceChanged,
    LivesChanged,
    Purchased,
    AutoBuySelected,
    RapidFireStarted,
    BarrageStarted,
    TelegraphCue,
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            Self::RunStarted => EngineEventKind::RunStarted,
            Self::RunPaused => EngineEventKind::RunPaused,
            Self::RunResumed => EngineEventKind::RunResumed,
            Self::GameOver { .. } => EngineEventKind::GameOver,
            Self::LaneChanged { .. } => EngineEventKind::LaneChanged,
            Self::WaveStarted { .. } => EngineEventKind::WaveStarted,
            Self::Spawned { .. } => EngineEventKind::Spawned,
            Self::Destroyed { .. } => EngineEventKind::Destroyed,
            Self::BalanceChanged { .. } => EngineEventKind::BalanceChanged,
            Self::LivesChanged { .. } => EngineEventKind::LivesChanged,
            Self::Purchased { .. } => EngineEventKind::Purchased,
            Self::AutoBuySelected { .. } => EngineEventKind::AutoBuySelected,
            Self::RapidFireStarted { .. } => EngineEventKind::RapidFireStarted,
            Self::BarrageStarted { .. } => EngineEventKind::BarrageStarted,
            Self::TelegraphCue { .. } => EngineEventKind::TelegraphCue,
        }
    }
}

/// Events accumulate during a tick and are handed over whole to whoever
/// drains them. The engine never inspects its own bus.
#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<EngineEvent>,
}

impl EventBus {
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[cfg(test)]
    pub fn emitted(&self) -> &[EngineEvent] {
        &self.events
    }
}
