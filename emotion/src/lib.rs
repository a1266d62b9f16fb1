//! Emotion sampling for the webcam feed.
//!
//! Faces found in each frame are classified, narrowed to the tracked
//! [`Emotion`] vocabulary and recorded in a shared [`EmotionTally`]. The tally
//! answers "what is the dominant emotion right now" and keeps itself bounded.

mod label;
pub mod pipeline;
pub mod tally;
pub mod vision;

#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use label::{Emotion, UnknownEmotion};
pub use pipeline::FramePipeline;
pub use tally::{Aggregate, DEFAULT_RETENTION, EmotionTally};
pub use vision::{
    Annotation, CaptureSession, EmotionClassifier, EmotionScores, FaceLocator, FaceRegion, Frame,
    FrameEncoder, FrameSource, UnavailableBackend, VisionBackend, VisionError,
};
