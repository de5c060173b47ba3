//! Speech module for spoken output
//!
//! `SpeechEngine` is the device text-to-speech seam; `Speaker` layers the
//! preemption rule and voice selection on top of any engine.

mod espeak;
mod speaker;
mod voice;

use thiserror::Error;

pub use espeak::EspeakSpeech;
pub use speaker::Speaker;
pub use voice::{Voice, VoicePreference};

/// Speech engine failures
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to start speech program: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A device text-to-speech engine
pub trait SpeechEngine: Send {
    /// Voices the engine offers
    fn voices(&self) -> &[Voice];

    /// Begin speaking without waiting for the utterance to finish
    ///
    /// `None` selects the engine's default voice.
    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<(), SpeechError>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);

    fn is_speaking(&mut self) -> bool;
}
