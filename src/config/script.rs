//! Funnel message script and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{MAX_BUTTON_LABEL_LENGTH, MAX_CAPTION_LENGTH};

/// Placeholder in the invitation text replaced by the tracking link.
pub const LINK_PLACEHOLDER: &str = "{link}";

/// Characters counted for each [`LINK_PLACEHOLDER`] when checking caption length.
///
/// Covers a base URL plus the `c`, `ts` and `sig` query parameters.
pub const RESERVED_LINK_LENGTH: usize = 256;

/// Errors that can occur during script validation.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Step '{step}' exceeds maximum caption length: {length} > {max_length}")]
    TooLong {
        step: Step,
        length: usize,
        max_length: usize,
    },

    #[error("Step '{step}' is empty")]
    Empty { step: Step },

    #[error("Invitation text must contain the {{link}} placeholder")]
    MissingLinkPlaceholder,

    #[error("Button label must be 1..={max} characters, got {length}", max = MAX_BUTTON_LABEL_LENGTH)]
    InvalidButtonLabel { length: usize },

    #[error("Failed to read script file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse script file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Length of `text` as a rendered caption, counting each [`LINK_PLACEHOLDER`]
/// as [`RESERVED_LINK_LENGTH`] characters.
#[must_use]
pub fn caption_length(text: &str) -> usize {
    let links = text.matches(LINK_PLACEHOLDER).count();
    text.chars().count() - links * LINK_PLACEHOLDER.chars().count() + links * RESERVED_LINK_LENGTH
}

/// One message of the funnel. The photo for step `n` comes from `FUNNEL_PHOTO{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Message 1, sent on `/start`.
    Welcome,
    /// Message 2, sent on `/start` with the tracking link.
    Invitation,
    /// Message 3, sent after the form was submitted.
    Confirmation,
    /// Message 4, the short-delay reminder.
    ShortReminder,
    /// Message 5, the long-delay reminder.
    LongReminder,
}

impl Step {
    /// All steps in message order.
    pub const ALL: [Self; 5] = [
        Self::Welcome,
        Self::Invitation,
        Self::Confirmation,
        Self::ShortReminder,
        Self::LongReminder,
    ];

    /// Zero-based index of the step's photo slot.
    #[must_use]
    pub const fn photo_index(self) -> usize {
        match self {
            Self::Welcome => 0,
            Self::Invitation => 1,
            Self::Confirmation => 2,
            Self::ShortReminder => 3,
            Self::LongReminder => 4,
        }
    }

    /// Name used in logs and validation messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Invitation => "invitation",
            Self::Confirmation => "confirmation",
            Self::ShortReminder => "short_reminder",
            Self::LongReminder => "long_reminder",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Texts of the five funnel messages plus the link button label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunnelScript {
    pub welcome: String,

    /// Must contain [`LINK_PLACEHOLDER`].
    pub invitation: String,

    pub confirmation: String,

    pub short_reminder: String,

    pub long_reminder: String,

    #[serde(default = "default_button_label")]
    pub button_label: String,
}

fn default_button_label() -> String {
    "🔗 Anketani to‘ldirish".to_owned()
}

impl Default for FunnelScript {
    fn default() -> Self {
        Self {
            welcome: "Salom! Biz xursandmiz, Siz deyarli jamoamizga qo‘shildingi 🚀".to_owned(),
            invitation: "Jietti brendining ambassadori bo‘lish uchun qisqa anketa to‘ldiring. \
                         Biz 2 soat ichida Siz bilan bog‘lanamiz.\n\nHavola: {link}"
                .to_owned(),
            confirmation: "Tabriklaymiz! 🎉 Arizangiz qabul qilindi. \
                           Tez orada menejerimiz Siz bilan bog‘lanadi."
                .to_owned(),
            short_reminder: "Eslatma: anketani hali to‘ldirmadingiz. ⏳ Joylar soni cheklangan."
                .to_owned(),
            long_reminder: "Oxirgi eslatma! 🚨 Faqat bir nechta joy qoldi. Qulay paytda to‘ldiring."
                .to_owned(),
            button_label: default_button_label(),
        }
    }
}

impl FunnelScript {
    /// Loads a script from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path)?;
        let script: Self = serde_json::from_str(&content)?;
        Ok(script)
    }

    /// Saves the script to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the raw text of a step (the invitation still has its placeholder).
    #[must_use]
    pub fn text(&self, step: Step) -> &str {
        match step {
            Step::Welcome => &self.welcome,
            Step::Invitation => &self.invitation,
            Step::Confirmation => &self.confirmation,
            Step::ShortReminder => &self.short_reminder,
            Step::LongReminder => &self.long_reminder,
        }
    }

    /// Renders the invitation with the given tracking link.
    #[must_use]
    pub fn invitation_with_link(&self, link: &str) -> String {
        self.invitation.replace(LINK_PLACEHOLDER, link)
    }

    /// Validates the script.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ScriptError> {
        self.validate_all().into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Returns every validation problem, one entry per step plus the button label.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), ScriptError>> {
        let mut results: Vec<_> = Step::ALL.iter().map(|&step| self.validate_step(step)).collect();

        let label_length = self.button_label.chars().count();
        results.push(if label_length == 0 || label_length > MAX_BUTTON_LABEL_LENGTH {
            Err(ScriptError::InvalidButtonLabel { length: label_length })
        } else {
            Ok(())
        });

        results
    }

    fn validate_step(&self, step: Step) -> Result<(), ScriptError> {
        let text = self.text(step);

        if text.trim().is_empty() {
            return Err(ScriptError::Empty { step });
        }

        if step == Step::Invitation && !text.contains(LINK_PLACEHOLDER) {
            return Err(ScriptError::MissingLinkPlaceholder);
        }

        // Every step may carry a photo, so the caption limit applies to all.
        let length = caption_length(text);
        if length > MAX_CAPTION_LENGTH {
            return Err(ScriptError::TooLong {
                step,
                length,
                max_length: MAX_CAPTION_LENGTH,
            });
        }

        Ok(())
    }

    /// Creates an example script for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_script_is_valid() {
        assert!(FunnelScript::default().validate().is_ok());
    }

    #[test]
    fn test_invitation_with_link() {
        let script = FunnelScript::default();
        let text = script.invitation_with_link("https://example.com/?c=1");
        assert!(text.ends_with("Havola: https://example.com/?c=1"));
        assert!(!text.contains(LINK_PLACEHOLDER));
    }

    #[test]
    fn test_validation_empty_step() {
        let script = FunnelScript {
            confirmation: "   ".to_owned(),
            ..FunnelScript::default()
        };
        assert!(matches!(
            script.validate(),
            Err(ScriptError::Empty { step: Step::Confirmation })
        ));
    }

    #[test]
    fn test_validation_missing_placeholder() {
        let script = FunnelScript {
            invitation: "Fill the form".to_owned(),
            ..FunnelScript::default()
        };
        assert!(matches!(script.validate(), Err(ScriptError::MissingLinkPlaceholder)));
    }

    #[test]
    fn test_validation_too_long() {
        let script = FunnelScript {
            long_reminder: "a".repeat(MAX_CAPTION_LENGTH + 1),
            ..FunnelScript::default()
        };
        assert!(matches!(
            script.validate(),
            Err(ScriptError::TooLong { step: Step::LongReminder, .. })
        ));
    }

    #[test]
    fn test_invitation_length_counts_the_link() {
        let fits_raw = format!(
            "{} {LINK_PLACEHOLDER}",
            "a".repeat(MAX_CAPTION_LENGTH - LINK_PLACEHOLDER.len() - 1)
        );
        assert_eq!(fits_raw.chars().count(), MAX_CAPTION_LENGTH);

        let script = FunnelScript {
            invitation: fits_raw,
            ..FunnelScript::default()
        };
        assert!(matches!(
            script.validate(),
            Err(ScriptError::TooLong { step: Step::Invitation, .. })
        ));

        let room = MAX_CAPTION_LENGTH - RESERVED_LINK_LENGTH;
        let script = FunnelScript {
            invitation: format!("{}{LINK_PLACEHOLDER}", "a".repeat(room)),
            ..FunnelScript::default()
        };
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_validation_button_label() {
        let script = FunnelScript {
            button_label: String::new(),
            ..FunnelScript::default()
        };
        assert!(matches!(
            script.validate(),
            Err(ScriptError::InvalidButtonLabel { length: 0 })
        ));
    }

    #[test]
    fn test_validate_all_reports_every_step() {
        let results = FunnelScript::default().validate_all();
        assert_eq!(results.len(), Step::ALL.len() + 1);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_button_label_defaults_when_missing() {
        let json = r#"{
            "welcome": "hi",
            "invitation": "go {link}",
            "confirmation": "thanks",
            "short_reminder": "soon",
            "long_reminder": "last"
        }"#;
        let script: FunnelScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.button_label, default_button_label());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");

        FunnelScript::example().save_to_file(&path).unwrap();
        let loaded = FunnelScript::load_from_file(&path).unwrap();
        assert_eq!(loaded, FunnelScript::example());
    }

    #[test]
    fn test_step_photo_indices_are_distinct() {
        let indices: std::collections::HashSet<_> = Step::ALL.iter().map(|s| s.photo_index()).collect();
        assert_eq!(indices.len(), Step::ALL.len());
    }
}
