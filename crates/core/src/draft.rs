//! Transient form state for creating or editing a game.

use serde::Serialize;
use thiserror::Error;

use crate::models::Game;

/// Raised when a draft fails required-field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    /// Title missing or no platform tags present.
    #[error("Title and at least one platform are required")]
    MissingFields,
}

/// Unsaved title/platform values for a game being created or edited.
///
/// Serializes to exactly the `{title, platform}` payload the add and
/// update mutations expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameDraft {
    /// Title field.
    pub title: String,
    /// Platform tags, de-duplicated by exact match.
    pub platform: Vec<String>,
}

impl GameDraft {
    /// An empty draft, as used by the add flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a draft from an existing game. The platform list is copied,
    /// never aliased, so editing the draft cannot touch the source row.
    pub fn from_game(game: &Game) -> Self {
        Self {
            title: game.title.clone(),
            platform: game.platform.clone(),
        }
    }

    /// Append a platform tag. Input is trimmed; whitespace-only and
    /// duplicate values are rejected. Returns `true` when a tag was added.
    pub fn add_platform(&mut self, input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() || self.platform.iter().any(|existing| existing == trimmed) {
            return false;
        }
        self.platform.push(trimmed.to_string());
        true
    }

    /// Remove a platform tag by exact value.
    pub fn remove_platform(&mut self, value: &str) {
        self.platform.retain(|existing| existing != value);
    }

    /// A draft may be submitted only with a non-blank title and at least
    /// one platform tag.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() || self.platform.is_empty() {
            return Err(DraftError::MissingFields);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_platform_trims_and_dedupes() {
        let mut draft = GameDraft::new();
        assert!(draft.add_platform("  Xbox  "));
        assert!(!draft.add_platform("Xbox"));
        assert_eq!(draft.platform, vec!["Xbox".to_string()]);
    }

    #[test]
    fn add_platform_is_case_sensitive() {
        let mut draft = GameDraft::new();
        assert!(draft.add_platform("PC"));
        assert!(draft.add_platform("pc"));
        assert_eq!(draft.platform.len(), 2);
    }

    #[test]
    fn add_platform_rejects_whitespace_only() {
        let mut draft = GameDraft::new();
        assert!(!draft.add_platform("   "));
        assert!(draft.platform.is_empty());
    }

    #[test]
    fn remove_platform_by_value() {
        let mut draft = GameDraft::new();
        draft.add_platform("Xbox");
        draft.add_platform("PC");
        draft.remove_platform("Xbox");
        assert_eq!(draft.platform, vec!["PC".to_string()]);
    }

    #[test]
    fn validation_requires_title_and_platform() {
        let mut draft = GameDraft::new();
        assert_eq!(draft.validate(), Err(DraftError::MissingFields));

        draft.title = "Halo".to_string();
        assert_eq!(draft.validate(), Err(DraftError::MissingFields));

        draft.add_platform("Xbox");
        assert_eq!(draft.validate(), Ok(()));

        draft.title = "   ".to_string();
        assert_eq!(draft.validate(), Err(DraftError::MissingFields));
    }

    #[test]
    fn validation_message_is_fixed() {
        assert_eq!(
            DraftError::MissingFields.to_string(),
            "Title and at least one platform are required"
        );
    }

    #[test]
    fn seeding_copies_platform_list() {
        let game = Game {
            id: "1".to_string(),
            title: "Halo".to_string(),
            platform: vec!["Xbox".to_string()],
            reviews: Vec::new(),
        };
        let mut draft = GameDraft::from_game(&game);
        draft.add_platform("PC");
        assert_eq!(game.platform, vec!["Xbox".to_string()]);
        assert_eq!(draft.platform, vec!["Xbox".to_string(), "PC".to_string()]);
    }

    #[test]
    fn serializes_to_mutation_payload() {
        let mut draft = GameDraft::new();
        draft.title = "Halo".to_string();
        draft.add_platform("Xbox");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"title": "Halo", "platform": ["Xbox"]})
        );
    }
}
