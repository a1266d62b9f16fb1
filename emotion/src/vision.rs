//! Boundaries to the camera, face detection and emotion recognition.
//!
//! The service never looks at pixels itself. Each stage is a trait so the
//! OpenCV backend can be swapped for fakes in tests.

use std::collections::HashMap;

/// Raw classifier output: emotion name to score.
///
/// Names are whatever the classifier reports; only the tracked vocabulary is
/// ever read back out.
pub type EmotionScores = HashMap<String, f32>;

/// Owned BGR8 image, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Black frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; width as usize * height as usize * 3])
    }
}

/// Axis-aligned face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Overlay drawn onto a frame before it is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Box around a face with its label above it.
    Face { region: FaceRegion, label: String },
    /// Informational line, stacked from the top-left corner.
    Status(String),
    /// Highlighted line, stacked with the status lines.
    Warning(String),
}

/// Pull-based frame supply.
pub trait FrameSource: Send {
    /// Block until the next frame is available.
    ///
    /// `Ok(None)` means the device stopped delivering frames.
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>>;
}

pub trait FaceLocator: Send {
    /// Candidate faces in `frame`, in no particular order.
    fn locate(&mut self, frame: &Frame) -> anyhow::Result<Vec<FaceRegion>>;
}

pub trait EmotionClassifier: Send {
    fn classify(&mut self, frame: &Frame, face: FaceRegion) -> anyhow::Result<EmotionScores>;
}

pub trait FrameEncoder: Send {
    /// Draw `annotations` onto a copy of `frame` and encode it as JPEG.
    fn encode(&mut self, frame: &Frame, annotations: &[Annotation]) -> anyhow::Result<Vec<u8>>;
}

/// Everything needed to run one video feed.
pub struct CaptureSession {
    pub source: Box<dyn FrameSource>,
    pub locator: Box<dyn FaceLocator>,
    pub classifier: Box<dyn EmotionClassifier>,
    pub encoder: Box<dyn FrameEncoder>,
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("could not open {device}: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("failed to load vision model: {0}")]
    Model(String),
    #[error("camera support is not built into this binary")]
    Unsupported,
}

/// Opens capture sessions on demand. Each video feed gets its own session.
pub trait VisionBackend: Send + Sync {
    /// Open the device and load models. May block.
    fn start(&self) -> Result<CaptureSession, VisionError>;
}

/// Backend used when no camera support is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl VisionBackend for UnavailableBackend {
    fn start(&self) -> Result<CaptureSession, VisionError> {
        Err(VisionError::Unsupported)
    }
}
