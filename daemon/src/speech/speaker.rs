//! Speech dispatch: one audible utterance at a time, newest wins

use tracing::{debug, warn};

use super::voice::{select_voice, VoicePreference};
use super::SpeechEngine;

/// Owns the speech engine on behalf of the detection loop
pub struct Speaker {
    engine: Box<dyn SpeechEngine>,
    preference: VoicePreference,
}

impl Speaker {
    pub fn new(engine: Box<dyn SpeechEngine>, preference: VoicePreference) -> Self {
        Self { engine, preference }
    }

    /// Speak `text`, cutting off whatever is currently being said
    ///
    /// Fire-and-forget: engine failures are logged, never returned.
    pub fn speak(&mut self, text: &str) {
        if self.engine.is_speaking() {
            debug!("preempting current utterance");
            self.engine.cancel();
        }

        let voice = select_voice(self.engine.voices(), &self.preference).cloned();
        debug!(voice = ?voice.as_ref().map(|v| &v.name), text, "speaking");

        if let Err(e) = self.engine.speak(text, voice.as_ref()) {
            warn!(?e, "speech output failed");
        }
    }

    /// Silence any current utterance. Idempotent.
    pub fn cancel(&mut self) {
        if self.engine.is_speaking() {
            self.engine.cancel();
        }
    }
}
