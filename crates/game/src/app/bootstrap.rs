use std::path::Path;

use engine::{AudioSurface, Game, Lane, Tuning, TuningError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use super::prefs::{self, Preferences};

const TUNING_ENV_VAR: &str = "LANESIEGE_TUNING";

pub(crate) struct AppWiring {
    pub(crate) game: Game,
    pub(crate) prefs: Preferences,
}

pub(crate) fn build_app() -> Result<AppWiring, TuningError> {
    init_tracing();
    info!("=== Lane Siege Startup ===");

    let tuning = load_tuning_from_env();
    let prefs = prefs::load();
    let mut game = Game::new(tuning, Box::new(DebugAudio))?;
    game.restore_auto_buy(prefs.auto_buy_track());

    Ok(AppWiring { game, prefs })
}

fn init_tracing() {
    // Logs land on stderr so they never bleed into the alternate screen.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_tuning_from_env() -> Tuning {
    let Ok(path) = std::env::var(TUNING_ENV_VAR) else {
        return Tuning::default();
    };
    match Tuning::from_path(Path::new(&path)) {
        Ok(tuning) => {
            info!(path, "tuning_loaded");
            tuning
        }
        Err(error) => {
            warn!(error = %error, path, "tuning_rejected_using_defaults");
            Tuning::default()
        }
    }
}

/// Terminal builds carry no audio device, so cues land in the debug log
/// where the hooks stay observable.
struct DebugAudio;

impl AudioSurface for DebugAudio {
    fn play_note(&mut self, lane: Lane) {
        debug!(lane = lane.index(), "audio_note");
    }

    fn music_started(&mut self) {
        debug!("audio_music_started");
    }

    fn music_paused(&mut self) {
        debug!("audio_music_paused");
    }

    fn music_resumed(&mut self) {
        debug!("audio_music_resumed");
    }

    fn music_stopped(&mut self) {
        debug!("audio_music_stopped");
    }
}
