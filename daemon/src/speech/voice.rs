//! Voice descriptions and the preferred-voice fallback chain

use serde::{Deserialize, Serialize};

/// One voice offered by a speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 style tag, e.g. `en-US`
    pub locale: String,
}

/// What voice to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePreference {
    /// Exact voice name tried first
    pub preferred_name: String,
    /// Provider family matched as a substring of the voice name
    pub provider_family: String,
    /// Target locale
    pub locale: String,
}

/// Pick a voice: exact name, then locale within the provider family, then
/// any voice in the locale. `None` means the device default.
pub fn select_voice<'a>(voices: &'a [Voice], preference: &VoicePreference) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|v| v.name == preference.preferred_name)
        .or_else(|| {
            voices.iter().find(|v| {
                locale_matches(&v.locale, &preference.locale)
                    && v.name.contains(&preference.provider_family)
            })
        })
        .or_else(|| {
            voices
                .iter()
                .find(|v| locale_matches(&v.locale, &preference.locale))
        })
}

/// Compare locale tags ignoring case and `_` versus `-`
pub fn locale_matches(a: &str, b: &str) -> bool {
    let normalize = |tag: &str| tag.replace('_', "-").to_ascii_lowercase();
    normalize(a) == normalize(b)
}
