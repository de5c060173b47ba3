//! Speech engine driving the `espeak-ng` command line synthesizer

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;

use super::{SpeechEngine, SpeechError, Voice};

/// espeak-ng's default speaking rate in words per minute
const BASE_WPM: f32 = 175.0;

/// One `espeak-ng` process per utterance
pub struct EspeakSpeech {
    program: PathBuf,
    rate_wpm: u32,
    voices: Vec<Voice>,
    current: Option<Child>,
}

impl EspeakSpeech {
    /// Create an engine and load its voice list
    ///
    /// A failed voice listing is not fatal; the engine then always uses its
    /// default voice.
    pub async fn discover(config: &SpeechConfig) -> Self {
        let voices = match Command::new(&config.program)
            .arg("--voices")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                parse_voice_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                warn!(status = ?output.status, "voice listing failed");
                Vec::new()
            }
            Err(e) => {
                warn!(?e, program = ?config.program, "could not run speech program");
                Vec::new()
            }
        };

        info!(count = voices.len(), "speech voices discovered");

        Self {
            program: config.program.clone(),
            rate_wpm: (BASE_WPM * config.rate).round() as u32,
            voices,
            current: None,
        }
    }
}

impl SpeechEngine for EspeakSpeech {
    fn voices(&self) -> &[Voice] {
        &self.voices
    }

    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<(), SpeechError> {
        let mut command = Command::new(&self.program);
        command.arg("-s").arg(self.rate_wpm.to_string());
        if let Some(voice) = voice {
            command.arg("-v").arg(&voice.name);
        }

        let child = command
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        self.current = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.start_kill() {
                debug!(?e, "utterance already finished");
            }
        }
    }

    fn is_speaking(&mut self) -> bool {
        let running = match self.current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if !running {
            self.current = None;
        }
        running
    }
}

/// Parse `espeak-ng --voices` output
///
/// Columns: Pty, Language, Age/Gender, VoiceName, File, Other Languages.
fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let locale = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            Some(Voice {
                name: name.to_string(),
                locale: locale.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en           (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";

    #[test]
    fn test_parse_voice_list() {
        let voices = parse_voice_list(VOICES);
        assert_eq!(voices.len(), 3);
        assert_eq!(
            voices[2],
            Voice {
                name: "English_(America)".into(),
                locale: "en-us".into(),
            }
        );
    }

    #[test]
    fn test_parse_ignores_short_lines() {
        assert!(parse_voice_list("\n 5 af\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_has_no_voices() {
        let config = SpeechConfig {
            program: PathBuf::from("/nonexistent/aura-vision/espeak"),
            rate: 1.1,
            preference: crate::speech::VoicePreference {
                preferred_name: "Google US English".into(),
                provider_family: "Google".into(),
                locale: "en-US".into(),
            },
        };
        let mut engine = EspeakSpeech::discover(&config).await;

        assert!(engine.voices().is_empty());
        assert_eq!(engine.rate_wpm, 193);
        assert!(!engine.is_speaking());
        assert!(engine.speak("hello", None).is_err());
    }
}
