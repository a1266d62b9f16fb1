//! Webcam, Haar cascade and FER+ network backed by OpenCV.

use std::path::{Path, PathBuf};

use anyhow::Context;
use opencv::{core, dnn, imgcodecs, imgproc, objdetect, prelude::*, videoio};

use crate::vision::{
    Annotation, CaptureSession, EmotionClassifier, EmotionScores, FaceLocator, FaceRegion, Frame,
    FrameEncoder, FrameSource, VisionBackend, VisionError,
};

/// Output order of the FER+ ONNX model, renamed to the usual emotion names.
const FERPLUS_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];
const FERPLUS_INPUT: i32 = 64;

fn red() -> core::Scalar {
    core::Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn green() -> core::Scalar {
    core::Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn mat_from_frame(frame: &Frame) -> anyhow::Result<core::Mat> {
    let flat = core::Mat::from_slice(&frame.pixels)?;
    let shaped = flat.reshape(3, frame.height as i32)?;
    Ok(shaped.try_clone()?)
}

fn frame_from_mat(mat: &core::Mat) -> anyhow::Result<Frame> {
    let mat = if mat.is_continuous() {
        mat.try_clone()?
    } else {
        let mut copy = core::Mat::default();
        mat.copy_to(&mut copy)?;
        copy
    };
    let size = mat.size()?;
    Ok(Frame::new(
        size.width as u32,
        size.height as u32,
        mat.data_bytes()?.to_vec(),
    ))
}

fn gray(mat: &core::Mat) -> anyhow::Result<core::Mat> {
    let mut out = core::Mat::default();
    imgproc::cvt_color(mat, &mut out, imgproc::COLOR_BGR2GRAY, 0)?;
    Ok(out)
}

fn rect(face: FaceRegion) -> core::Rect {
    core::Rect::new(face.x, face.y, face.width, face.height)
}

/// Opens the webcam and loads both models for every new feed.
#[derive(Debug, Clone)]
pub struct OpenCvBackend {
    camera: i32,
    cascade: PathBuf,
    emotion_model: PathBuf,
    mirror: bool,
}

impl OpenCvBackend {
    pub fn new(camera: i32, cascade: PathBuf, emotion_model: PathBuf) -> Self {
        Self {
            camera,
            cascade,
            emotion_model,
            mirror: true,
        }
    }

    /// Flip frames horizontally so the feed behaves like a mirror. On by default.
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

impl VisionBackend for OpenCvBackend {
    fn start(&self) -> Result<CaptureSession, VisionError> {
        let device = format!("camera {}", self.camera);
        let unavailable = |reason: String| VisionError::DeviceUnavailable {
            device: device.clone(),
            reason,
        };
        let capture = videoio::VideoCapture::new(self.camera, videoio::CAP_ANY)
            .map_err(|e| unavailable(e.to_string()))?;
        if !capture.is_opened().map_err(|e| unavailable(e.to_string()))? {
            return Err(unavailable("device did not open".into()));
        }
        let locator = CascadeLocator::load(&self.cascade)
            .map_err(|e| VisionError::Model(format!("{e:#}")))?;
        let classifier = FerPlusClassifier::load(&self.emotion_model)
            .map_err(|e| VisionError::Model(format!("{e:#}")))?;
        tracing::info!(%device, cascade = ?self.cascade, model = ?self.emotion_model, "camera opened");
        Ok(CaptureSession {
            source: Box::new(CameraSource {
                capture,
                mirror: self.mirror,
            }),
            locator: Box::new(locator),
            classifier: Box::new(classifier),
            encoder: Box::new(JpegEncoder),
        })
    }
}

/// Releases the device when dropped.
pub struct CameraSource {
    capture: videoio::VideoCapture,
    mirror: bool,
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        let mut mat = core::Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        if self.mirror {
            let mut flipped = core::Mat::default();
            core::flip(&mat, &mut flipped, 1)?;
            mat = flipped;
        }
        frame_from_mat(&mat).map(Some)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!(error = ?e, "failed to release camera");
        }
    }
}

pub struct CascadeLocator {
    detector: objdetect::CascadeClassifier,
}

impl CascadeLocator {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let name = path.to_string_lossy();
        let detector = objdetect::CascadeClassifier::new(&name)
            .with_context(|| format!("loading cascade {name}"))?;
        if detector.empty()? {
            anyhow::bail!("cascade {name} is empty");
        }
        Ok(Self { detector })
    }
}

impl FaceLocator for CascadeLocator {
    fn locate(&mut self, frame: &Frame) -> anyhow::Result<Vec<FaceRegion>> {
        let gray = gray(&mat_from_frame(frame)?)?;
        let mut found = core::Vector::<core::Rect>::new();
        self.detector.detect_multi_scale(
            &gray,
            &mut found,
            1.1,
            5,
            0,
            core::Size::new(30, 30),
            core::Size::new(0, 0),
        )?;
        Ok(found
            .iter()
            .map(|r| FaceRegion {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            })
            .collect())
    }
}

/// FER+ emotion network; scores are softmax percentages.
pub struct FerPlusClassifier {
    net: dnn::Net,
}

impl FerPlusClassifier {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let name = path.to_string_lossy();
        let net = dnn::read_net_from_onnx(&name).with_context(|| format!("loading {name}"))?;
        Ok(Self { net })
    }
}

impl EmotionClassifier for FerPlusClassifier {
    fn classify(&mut self, frame: &Frame, face: FaceRegion) -> anyhow::Result<EmotionScores> {
        let mat = mat_from_frame(frame)?;
        let roi = core::Mat::roi(&mat, rect(face))?;
        let face_gray = gray(&roi.try_clone()?)?;
        let blob = dnn::blob_from_image(
            &face_gray,
            1.0,
            core::Size::new(FERPLUS_INPUT, FERPLUS_INPUT),
            core::Scalar::default(),
            false,
            false,
            core::CV_32F,
        )?;
        self.net
            .set_input(&blob, "", 1.0, core::Scalar::default())?;
        let out = self.net.forward_single("")?;
        let logits = out.data_typed::<f32>()?;
        if logits.len() < FERPLUS_LABELS.len() {
            anyhow::bail!("emotion model returned {} scores", logits.len());
        }
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits[..FERPLUS_LABELS.len()]
            .iter()
            .map(|l| (l - max).exp())
            .collect();
        let sum: f32 = exp.iter().sum();
        Ok(FERPLUS_LABELS
            .iter()
            .zip(exp)
            .map(|(name, e)| (name.to_string(), e / sum * 100.0))
            .collect())
    }
}

pub struct JpegEncoder;

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: &Frame, annotations: &[Annotation]) -> anyhow::Result<Vec<u8>> {
        let mut mat = mat_from_frame(frame)?;
        let mut line = 0;
        for annotation in annotations {
            match annotation {
                Annotation::Face { region, label } => {
                    imgproc::rectangle(&mut mat, rect(*region), red(), 2, imgproc::LINE_8, 0)?;
                    imgproc::put_text(
                        &mut mat,
                        label,
                        core::Point::new(region.x, region.y - 10),
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.9,
                        red(),
                        2,
                        imgproc::LINE_8,
                        false,
                    )?;
                }
                Annotation::Status(text) | Annotation::Warning(text) => {
                    let color = if matches!(annotation, Annotation::Warning(_)) {
                        red()
                    } else {
                        green()
                    };
                    line += 1;
                    imgproc::put_text(
                        &mut mat,
                        text,
                        core::Point::new(10, 30 * line),
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.7,
                        color,
                        2,
                        imgproc::LINE_8,
                        false,
                    )?;
                }
            }
        }
        let mut buf = core::Vector::<u8>::new();
        imgcodecs::imencode(".jpg", &mat, &mut buf, &core::Vector::new())?;
        Ok(buf.to_vec())
    }
}
