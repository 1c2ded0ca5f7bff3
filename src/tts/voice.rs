//! Voice preference vocabulary and the preference-to-model lookup table.

use std::fmt;

/// Default narrator model for the male preference.
pub const DEFAULT_MALE_VOICE: &str = "uz-UZ-SardorNeural";
/// Default narrator model for the female preference.
pub const DEFAULT_FEMALE_VOICE: &str = "uz-UZ-MadinaNeural";

/// A user's stored voice preference.
///
/// The vocabulary is closed: parsing never fails, anything that is not
/// exactly `"male"` falls back to the female voice. Legacy databases
/// carry `"women"` rows, which land on the fallback as well until the
/// normalization migration rewrites them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePreference {
    Male,
    #[default]
    Female,
}

impl VoicePreference {
    /// Total parse of a stored or user-supplied preference value.
    pub fn parse(value: &str) -> Self {
        match value {
            "male" => Self::Male,
            _ => Self::Female,
        }
    }

    /// Canonical storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for VoicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a [`VoicePreference`] to the narrator model sent to the TTS service.
#[derive(Debug, Clone)]
pub struct VoiceTable {
    pub male: String,
    pub female: String,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self {
            male: DEFAULT_MALE_VOICE.to_string(),
            female: DEFAULT_FEMALE_VOICE.to_string(),
        }
    }
}

impl VoiceTable {
    pub fn model_for(&self, voice: VoicePreference) -> &str {
        match voice {
            VoicePreference::Male => &self.male,
            VoicePreference::Female => &self.female,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_male_parses_to_male_model() {
        let table = VoiceTable::default();
        let voice = VoicePreference::parse("male");
        assert_eq!(voice, VoicePreference::Male);
        assert_eq!(table.model_for(voice), DEFAULT_MALE_VOICE);
    }

    #[test]
    fn test_everything_else_falls_back_to_female_model() {
        let table = VoiceTable::default();
        for value in ["female", "women", "", "MALE", "robot", "  male "] {
            let voice = VoicePreference::parse(value);
            assert_eq!(voice, VoicePreference::Female, "value {value:?}");
            assert_eq!(table.model_for(voice), DEFAULT_FEMALE_VOICE);
        }
    }

    #[test]
    fn test_storage_form_round_trips() {
        for voice in [VoicePreference::Male, VoicePreference::Female] {
            assert_eq!(VoicePreference::parse(voice.as_str()), voice);
        }
    }

    #[test]
    fn test_custom_table_overrides_models() {
        let table = VoiceTable {
            male: "en-US-GuyNeural".into(),
            female: "en-US-AriaNeural".into(),
        };
        assert_eq!(table.model_for(VoicePreference::Male), "en-US-GuyNeural");
        assert_eq!(table.model_for(VoicePreference::Female), "en-US-AriaNeural");
    }
}
