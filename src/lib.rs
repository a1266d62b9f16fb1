//! HTTP service for emotion tracking and career assessment.
//!
//! Routes:
//! - `GET /` liveness message
//! - `POST /assess`, `POST /profile_summary`, `POST /learning_mode` prompt
//!   the chat model with a student record
//! - `GET /video_feed` annotated MJPEG webcam stream feeding the tally
//! - `GET /analyze_emotion` dominant emotion over the recent samples

pub mod args;
pub mod error;
pub mod mjpeg;
pub mod server;
pub mod shutdown;

pub use args::Args;
pub use error::ApiError;
pub use server::{AppState, router, run};
pub use shutdown::shutdown_signal;
