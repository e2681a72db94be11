mod clock;
mod collision;
mod economy;
mod entity;
mod events;
mod firing;
mod game;
mod spawner;
mod surface;
mod world;

pub use economy::UpgradeTrack;
pub use entity::{EntityId, EntityKind, Lane};
pub use events::{DestroyCause, EngineEvent, EngineEventKind};
pub use game::{EntityView, FrameView, Game, RunPhase};
pub use surface::{AudioSurface, NullAudio};
