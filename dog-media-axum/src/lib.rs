//! dog-media-axum: Axum adapter for dog-media.
//!
//! Exposes the media endpoints as an axum [`Router`](axum::Router):
//!
//! - `GET /videos` lists committed objects
//! - `GET /video/{id}` streams an object, honouring a single `Range`
//! - `POST /upload` ingests the `file` field of a multipart body
//! - `GET /health` answers `ok`
//!
//! Handlers reach the store through a [`StoreGate`](dog_media::StoreGate),
//! so a router can be served before the store has finished opening.

pub mod app;
mod error;
pub mod multipart;
pub mod routes;
pub mod state;

pub use app::MediaApp;
pub use error::{ErrorKind, MediaAxumError};
pub use routes::media_router;
pub use state::{MediaAxumState, DEFAULT_UPLOAD_FIELD};

pub use axum;
