//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::detection::{DEFAULT_INTERVAL, MAX_INTERVAL, MIN_INTERVAL};
use crate::speech::VoicePreference;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Initial time between detection ticks
    pub interval: Duration,

    pub camera: CameraConfig,
    pub speech: SpeechConfig,
    pub analyzer: AnalyzerConfig,
}

/// Frame grabber settings
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Video device node
    pub device: PathBuf,
    /// ffmpeg executable
    pub ffmpeg: PathBuf,
    /// MJPEG quantizer, 2 (best) to 31 (worst)
    pub jpeg_quality: u8,
    /// How long to wait for the first frame
    pub start_timeout: Duration,
}

/// Speech synthesis settings
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// espeak-ng executable
    pub program: PathBuf,
    /// Multiplier on the engine's normal speaking rate
    pub rate: f32,
    pub preference: VoicePreference,
}

/// Remote vision service settings
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

// Keeps the API key out of logs
impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("aura-vision");

        let socket_path = lookup("AURA_SOCKET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let interval = match parse_var::<u64, _>(&lookup, "AURA_INTERVAL_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_INTERVAL,
        };
        if interval < MIN_INTERVAL || interval > MAX_INTERVAL {
            bail!(
                "AURA_INTERVAL_MS must be between {} and {}",
                MIN_INTERVAL.as_millis(),
                MAX_INTERVAL.as_millis()
            );
        }

        let jpeg_quality = parse_var(&lookup, "AURA_JPEG_QUALITY")?.unwrap_or(5u8);
        if !(2..=31).contains(&jpeg_quality) {
            bail!("AURA_JPEG_QUALITY must be between 2 and 31");
        }

        let camera = CameraConfig {
            device: path_var(&lookup, "AURA_CAMERA_DEVICE", "/dev/video0"),
            ffmpeg: path_var(&lookup, "AURA_FFMPEG", "ffmpeg"),
            jpeg_quality,
            start_timeout: Duration::from_millis(
                parse_var(&lookup, "AURA_CAMERA_TIMEOUT_MS")?.unwrap_or(5000),
            ),
        };

        let rate = parse_var(&lookup, "AURA_SPEECH_RATE")?.unwrap_or(1.1f32);
        if rate.is_nan() || rate <= 0.0 {
            bail!("AURA_SPEECH_RATE must be positive");
        }

        let speech = SpeechConfig {
            program: path_var(&lookup, "AURA_ESPEAK", "espeak-ng"),
            rate,
            preference: VoicePreference {
                preferred_name: lookup("AURA_VOICE")
                    .unwrap_or_else(|| "Google US English".to_string()),
                provider_family: lookup("AURA_VOICE_FAMILY")
                    .unwrap_or_else(|| "Google".to_string()),
                locale: lookup("AURA_LOCALE").unwrap_or_else(|| "en-US".to_string()),
            },
        };

        let analyzer = AnalyzerConfig {
            api_key: lookup("GEMINI_API_KEY")
                .or_else(|| lookup("API_KEY"))
                .filter(|key| !key.is_empty()),
            model: lookup("AURA_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            base_url: lookup("AURA_API_BASE").unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            timeout: Duration::from_millis(
                parse_var(&lookup, "AURA_ANALYZE_TIMEOUT_MS")?.unwrap_or(15_000),
            ),
        };

        Ok(Self {
            socket_path,
            data_dir,
            interval,
            camera,
            speech,
            analyzer,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn path_var<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, value))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("HOME", "/home/aura")]).unwrap();

        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/aura/.local/share/aura-vision/daemon.sock")
        );
        assert_eq!(config.interval, Duration::from_millis(3000));
        assert_eq!(config.camera.device, PathBuf::from("/dev/video0"));
        assert_eq!(config.speech.preference.locale, "en-US");
        assert_eq!(config.analyzer.model, "gemini-2.5-flash");
        assert!(config.analyzer.api_key.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("HOME", "/home/aura"),
            ("AURA_INTERVAL_MS", "1500"),
            ("AURA_SOCKET_PATH", "/tmp/aura.sock"),
            ("API_KEY", "secret"),
            ("AURA_SPEECH_RATE", "1.5"),
        ])
        .unwrap();

        assert_eq!(config.interval, Duration::from_millis(1500));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/aura.sock"));
        assert_eq!(config.analyzer.api_key.as_deref(), Some("secret"));
        assert_eq!(config.speech.rate, 1.5);
        assert!(!format!("{:?}", config.analyzer).contains("secret"));
    }

    #[test]
    fn test_gemini_key_preferred() {
        let config = load(&[
            ("HOME", "/home/aura"),
            ("API_KEY", "generic"),
            ("GEMINI_API_KEY", "gemini"),
        ])
        .unwrap();
        assert_eq!(config.analyzer.api_key.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(load(&[]).is_err());
        assert!(load(&[("HOME", "/h"), ("AURA_INTERVAL_MS", "500")]).is_err());
        assert!(load(&[("HOME", "/h"), ("AURA_INTERVAL_MS", "fast")]).is_err());
        assert!(load(&[("HOME", "/h"), ("AURA_JPEG_QUALITY", "1")]).is_err());
        assert!(load(&[("HOME", "/h"), ("AURA_SPEECH_RATE", "0")]).is_err());
    }
}
