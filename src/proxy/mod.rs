//! B-wiize proxy: the backend half of the learning app.
//!
//! Components:
//! - `tts`: hosted text-to-speech inference client
//! - `video`: video-hosting lookup (video id to stream URL)
//! - `api`: Axum HTTP server the browser frontend talks to

pub mod api;
pub mod tts;
pub mod video;
