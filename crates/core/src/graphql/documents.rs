//! Static GraphQL documents for the games API.

/// List query. The review/author selection feeds the detail panel.
pub const GAMES: &str = "\
query Games {
  games {
    id
    title
    platform
    reviews {
      id
      rating
      author {
        id
        name
      }
    }
  }
}";

/// Create a game from a `{title, platform}` input.
pub const ADD_GAME: &str = "\
mutation AddGame($game: AddGameInput!) {
  addGame(game: $game) {
    id
    title
    platform
  }
}";

/// Update a game by id with a `{title, platform}` edits payload.
pub const UPDATE_GAME: &str = "\
mutation UpdateGame($id: ID!, $edits: EditGameInput!) {
  updateGame(id: $id, edits: $edits) {
    id
    title
    platform
  }
}";

/// Delete a game by id.
pub const DELETE_GAME: &str = "\
mutation DeleteGame($id: ID!) {
  deleteGame(id: $id) {
    id
  }
}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_name_their_operations() {
        assert!(GAMES.starts_with("query Games"));
        assert!(ADD_GAME.starts_with("mutation AddGame"));
        assert!(UPDATE_GAME.starts_with("mutation UpdateGame"));
        assert!(DELETE_GAME.starts_with("mutation DeleteGame"));
    }

    #[test]
    fn list_query_selects_reviews_and_authors() {
        assert!(GAMES.contains("reviews"));
        assert!(GAMES.contains("author"));
    }
}
