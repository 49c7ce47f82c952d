//! Minimal GraphQL-over-HTTP client for the games API.
//!
//! Documents are static strings (no schema codegen); requests are plain
//! POSTs with a `{query, variables}` body and the standard
//! `{data, errors}` response envelope.

pub mod documents;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{draft::GameDraft, models::Game};

/// Failure modes for a GraphQL request.
#[derive(Debug, Error)]
pub enum GraphQlError {
    /// The HTTP exchange itself failed (connect, timeout, malformed body).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with GraphQL-level errors.
    #[error("{}", .messages.join("; "))]
    Response {
        /// All `errors[].message` values from the response, in order.
        messages: Vec<String>,
    },
    /// A well-formed response carried neither data nor errors.
    #[error("response contained no data")]
    MissingData,
}

impl GraphQlError {
    /// GraphQL-level error messages, if this is a `Response` failure.
    ///
    /// The alert surface reacts to these only; transport failures are
    /// handled at the call site.
    pub fn response_messages(&self) -> Option<&[String]> {
        match self {
            GraphQlError::Response { messages } => Some(messages),
            _ => None,
        }
    }
}

/// Outgoing request body.
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    variables: Value,
}

/// Standard response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlResponseError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponseError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GamesData {
    games: Vec<Game>,
}

fn decode<T>(envelope: GraphQlResponse<T>) -> Result<T, GraphQlError> {
    if !envelope.errors.is_empty() {
        return Err(GraphQlError::Response {
            messages: envelope
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect(),
        });
    }
    envelope.data.ok_or(GraphQlError::MissingData)
}

/// Client bound to one endpoint, shared for the process lifetime.
///
/// Keeps the last successfully fetched game list in memory so the UI can
/// repaint from it while a refetch is in flight; [`GraphQlClient::reset`]
/// drops that cache.
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: String,
    cache: RwLock<Option<Vec<Game>>>,
}

impl GraphQlClient {
    /// Create a client posting to the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            cache: RwLock::new(None),
        }
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: Value,
    ) -> Result<T, GraphQlError> {
        let body = GraphQlRequest { query, variables };
        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let envelope: GraphQlResponse<T> = response.json().await?;
        decode(envelope)
    }

    /// Fetch the full game list and refresh the in-memory cache.
    pub async fn games(&self) -> Result<Vec<Game>, GraphQlError> {
        let data: GamesData = self.execute(documents::GAMES, Value::Null).await?;
        debug!(count = data.games.len(), "game list fetched");
        self.store(data.games.clone());
        Ok(data.games)
    }

    /// Last successfully fetched game list, if any.
    pub fn cached_games(&self) -> Option<Vec<Game>> {
        self.cache.read().clone()
    }

    /// Dispose hook: drop the cached game list.
    pub fn reset(&self) {
        *self.cache.write() = None;
    }

    fn store(&self, games: Vec<Game>) {
        *self.cache.write() = Some(games);
    }

    /// Create a game from a validated draft.
    pub async fn add_game(&self, draft: &GameDraft) -> Result<(), GraphQlError> {
        let result: Result<Value, _> = self
            .execute(documents::ADD_GAME, json!({ "game": draft }))
            .await;
        if let Err(err) = &result {
            warn!(title = %draft.title, error = %err, "add game failed");
        }
        result.map(|_| ())
    }

    /// Update the game with the given id from a validated draft.
    pub async fn update_game(&self, id: &str, edits: &GameDraft) -> Result<(), GraphQlError> {
        let result: Result<Value, _> = self
            .execute(documents::UPDATE_GAME, json!({ "id": id, "edits": edits }))
            .await;
        if let Err(err) = &result {
            warn!(game_id = %id, error = %err, "update game failed");
        }
        result.map(|_| ())
    }

    /// Delete the game with the given id.
    pub async fn delete_game(&self, id: &str) -> Result<(), GraphQlError> {
        let result: Result<Value, _> = self
            .execute(documents::DELETE_GAME, json!({ "id": id }))
            .await;
        if let Err(err) = &result {
            warn!(game_id = %id, error = %err, "delete game failed");
        }
        result.map(|_| ())
    }
}
