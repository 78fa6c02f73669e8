use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::action::ActionState;
use super::audio_cues::AudioClip;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceHandleError {
    #[error("resource handle must not be empty")]
    Empty,
    #[error("resource handle must not be only whitespace")]
    Blank,
    #[error("resource handle contains control character {character:?}")]
    ControlCharacter { character: char },
}

/// Opaque reference to a sprite or audio asset: a URL or a relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(value: impl Into<String>) -> Result<Self, ResourceHandleError> {
        let value = value.into();
        validate_resource_handle(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_resource_handle(value: &str) -> Result<(), ResourceHandleError> {
    if value.is_empty() {
        return Err(ResourceHandleError::Empty);
    }
    if value.trim().is_empty() {
        return Err(ResourceHandleError::Blank);
    }
    if let Some(character) = value.chars().find(|ch| ch.is_control()) {
        return Err(ResourceHandleError::ControlCharacter { character });
    }
    Ok(())
}

/// Keyword table checked in order; the first matching state claims a URL.
const SPRITE_KEYWORDS: [(ActionState, &[&str]); 6] = [
    (ActionState::Idle, &["standing", "idle"]),
    (ActionState::Run, &["running", "run", "walk"]),
    (ActionState::Jump, &["jumping", "jump"]),
    (ActionState::Wave, &["waving", "wave"]),
    (ActionState::Dance, &["dancing", "dance", "jesse"]),
    (ActionState::Speak, &["speaking", "speak", "talk"]),
];

/// Sprite per action state, falling back to the idle sprite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSprites {
    sprites: HashMap<ActionState, ResourceHandle>,
}

impl ActionSprites {
    pub fn insert(&mut self, state: ActionState, handle: ResourceHandle) {
        self.sprites.insert(state, handle);
    }

    pub fn with(mut self, state: ActionState, handle: ResourceHandle) -> Self {
        self.insert(state, handle);
        self
    }

    /// Assigns supplier URLs to states by filename keywords. Invalid URLs are
    /// skipped; without an idle match the first valid URL becomes idle.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Self {
        let handles: Vec<ResourceHandle> = urls
            .iter()
            .filter_map(|url| ResourceHandle::new(url.as_ref()).ok())
            .collect();

        let mut sprites = Self::default();
        for (state, keywords) in SPRITE_KEYWORDS {
            let matched = handles.iter().find(|handle| {
                let lowered = handle.as_str().to_ascii_lowercase();
                keywords.iter().any(|keyword| lowered.contains(keyword))
            });
            if let Some(handle) = matched {
                sprites.insert(state, handle.clone());
            }
        }
        if !sprites.sprites.contains_key(&ActionState::Idle) {
            if let Some(first) = handles.first() {
                sprites.insert(ActionState::Idle, first.clone());
            }
        }
        sprites
    }

    pub fn resolve(&self, state: ActionState) -> Option<&ResourceHandle> {
        self.sprites
            .get(&state)
            .or_else(|| self.sprites.get(&ActionState::Idle))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

pub const DEFAULT_AUDIO_PATHS: [(AudioClip, &str); 4] = [
    (AudioClip::Running, "assets/run.mp3"),
    (AudioClip::Jump, "assets/jump.mp3"),
    (AudioClip::Land, "assets/land.mp3"),
    (AudioClip::DanceMusic, "assets/dance_music.mp3"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBank {
    clips: HashMap<AudioClip, ResourceHandle>,
}

impl AudioBank {
    pub fn empty() -> Self {
        Self {
            clips: HashMap::new(),
        }
    }

    pub fn insert(&mut self, clip: AudioClip, handle: ResourceHandle) {
        self.clips.insert(clip, handle);
    }

    pub fn resolve(&self, clip: AudioClip) -> Option<&ResourceHandle> {
        self.clips.get(&clip)
    }
}

impl Default for AudioBank {
    fn default() -> Self {
        let mut bank = Self::empty();
        for (clip, path) in DEFAULT_AUDIO_PATHS {
            // Static paths always pass validation.
            if let Ok(handle) = ResourceHandle::new(path) {
                bank.insert(clip, handle);
            }
        }
        bank
    }
}
