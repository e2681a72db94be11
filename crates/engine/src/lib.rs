pub mod sim;
pub mod tuning;

pub use sim::{
    AudioSurface, DestroyCause, EngineEvent, EngineEventKind, EntityId, EntityKind, EntityView,
    FrameView, Game, Lane, NullAudio, RunPhase, UpgradeTrack,
};
pub use tuning::{Tuning, TuningError};
