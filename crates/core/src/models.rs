//! Domain models mirroring the games GraphQL schema.

use serde::{Deserialize, Serialize};

/// A game record as returned by the `games` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Server-assigned opaque identifier.
    pub id: String,
    /// Game title.
    pub title: String,
    /// Platforms the game is available on, in server order.
    #[serde(default)]
    pub platform: Vec<String>,
    /// Reviews attached to the game, shown in the detail panel.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Game {
    /// Comma-joined platform list for table display.
    pub fn platform_summary(&self) -> String {
        self.platform.join(", ")
    }

    /// Average review rating, if any reviews exist.
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: i64 = self.reviews.iter().map(|review| i64::from(review.rating)).sum();
        Some(total as f64 / self.reviews.len() as f64)
    }
}

/// A review of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Server-assigned opaque identifier.
    pub id: String,
    /// Numeric rating given by the author.
    pub rating: i32,
    /// Who wrote the review.
    pub author: Author,
}

/// The author of a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Server-assigned opaque identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game() -> Game {
        Game {
            id: "1".to_string(),
            title: "Halo".to_string(),
            platform: vec!["Xbox".to_string(), "PC".to_string()],
            reviews: vec![
                Review {
                    id: "r1".to_string(),
                    rating: 7,
                    author: Author {
                        id: "a1".to_string(),
                        name: "mario".to_string(),
                    },
                },
                Review {
                    id: "r2".to_string(),
                    rating: 10,
                    author: Author {
                        id: "a2".to_string(),
                        name: "peach".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn platform_summary_joins_in_order() {
        assert_eq!(sample_game().platform_summary(), "Xbox, PC");
    }

    #[test]
    fn average_rating_requires_reviews() {
        let mut game = sample_game();
        assert_eq!(game.average_rating(), Some(8.5));
        game.reviews.clear();
        assert_eq!(game.average_rating(), None);
    }

    #[test]
    fn deserializes_without_reviews() {
        let game: Game =
            serde_json::from_str(r#"{"id":"2","title":"Pong","platform":["Arcade"]}"#).unwrap();
        assert!(game.reviews.is_empty());
    }
}
