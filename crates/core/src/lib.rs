#![warn(clippy::all, missing_docs)]

//! Core domain logic for the gamedex terminal client.
//!
//! This crate hosts the data models, configuration handling,
//! form-draft rules, and the GraphQL client used by the terminal
//! UI and any future frontends.

pub mod config;
pub mod draft;
pub mod graphql;
pub mod models;

pub use config::AppConfig;
pub use draft::{DraftError, GameDraft};
pub use graphql::{GraphQlClient, GraphQlError};
pub use models::{Author, Game, Review};
