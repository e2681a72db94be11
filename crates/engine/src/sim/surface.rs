use super::entity::Lane;

/// Audio side of the simulation. Implementations run inside the tick and
/// must return promptly; dropping a cue is always acceptable, blocking is
/// not.
pub trait AudioSurface {
    fn play_note(&mut self, lane: Lane) {
        let _ = lane;
    }

    fn music_started(&mut self) {}

    fn music_paused(&mut self) {}

    fn music_resumed(&mut self) {}

    fn music_stopped(&mut self) {}
}

pub struct NullAudio;

impl AudioSurface for NullAudio {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingAudio {
        notes: Vec<Lane>,
        started: u32,
    }

    impl AudioSurface for CountingAudio {
        fn play_note(&mut self, lane: Lane) {
            self.notes.push(lane);
        }

        fn music_started(&mut self) {
            self.started += 1;
        }
    }

    #[test]
    fn default_hooks_are_no_ops() {
        let mut audio = NullAudio;
        audio.play_note(Lane(0));
        audio.music_started();
        audio.music_stopped();
    }

    #[test]
    fn implementations_observe_calls() {
        let mut audio = CountingAudio::default();
        audio.play_note(Lane(5));
        audio.music_started();
        assert_eq!(audio.notes, vec![Lane(5)]);
        assert_eq!(audio.started, 1);
    }
}
