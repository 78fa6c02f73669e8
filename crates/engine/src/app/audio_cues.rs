use super::action::ActionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioClip {
    Running,
    Jump,
    Land,
    DanceMusic,
}

impl AudioClip {
    pub const ALL: [AudioClip; 4] = [
        AudioClip::Running,
        AudioClip::Jump,
        AudioClip::Land,
        AudioClip::DanceMusic,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCue {
    Start(AudioClip),
    Stop(AudioClip),
    OneShot(AudioClip),
    Speech { url: String },
    SpeechStop,
}

/// What happened during one tick, as far as sound is concerned.
#[derive(Debug, Clone, Copy)]
pub struct CueInputs<'a> {
    pub state: ActionState,
    pub on_ground: bool,
    pub jumped: bool,
    pub landed: bool,
    pub ground_audio_url: Option<&'a str>,
}

/// Turns per-tick state into start/stop edges for looping sounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioCueTracker {
    running: bool,
    dancing: bool,
    speech: Option<String>,
}

impl AudioCueTracker {
    pub fn speech_url(&self) -> Option<&str> {
        self.speech.as_deref()
    }

    pub fn update(&mut self, inputs: CueInputs<'_>) -> Vec<AudioCue> {
        let mut cues = Vec::new();

        let running = inputs.state == ActionState::Run && inputs.on_ground;
        toggle_loop(&mut self.running, running, AudioClip::Running, &mut cues);

        let dancing = inputs.state == ActionState::Dance;
        toggle_loop(&mut self.dancing, dancing, AudioClip::DanceMusic, &mut cues);

        if inputs.jumped {
            cues.push(AudioCue::OneShot(AudioClip::Jump));
        }
        if inputs.landed {
            cues.push(AudioCue::OneShot(AudioClip::Land));
        }

        let wanted_speech = (inputs.state == ActionState::Speak)
            .then_some(inputs.ground_audio_url)
            .flatten();
        match (wanted_speech, self.speech.as_deref()) {
            (Some(url), current) if current != Some(url) => {
                self.speech = Some(url.to_string());
                cues.push(AudioCue::Speech {
                    url: url.to_string(),
                });
            }
            (None, Some(_)) => {
                self.speech = None;
                cues.push(AudioCue::SpeechStop);
            }
            _ => {}
        }

        cues
    }
}

fn toggle_loop(playing: &mut bool, wanted: bool, clip: AudioClip, cues: &mut Vec<AudioCue>) {
    if wanted == *playing {
        return;
    }
    *playing = wanted;
    cues.push(if wanted {
        AudioCue::Start(clip)
    } else {
        AudioCue::Stop(clip)
    });
}
