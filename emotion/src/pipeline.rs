use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::vision::{
    Annotation, CaptureSession, EmotionClassifier, FaceLocator, Frame, FrameEncoder, FrameSource,
};
use crate::{Emotion, EmotionTally};

/// Turns camera frames into annotated JPEGs while feeding the tally.
///
/// Spawns nothing itself; [`run`](Self::run) blocks on the frame source and
/// is meant for a blocking thread.
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn EmotionClassifier>,
    encoder: Box<dyn FrameEncoder>,
    tally: Arc<EmotionTally>,
}

impl FramePipeline {
    pub fn new(session: CaptureSession, tally: Arc<EmotionTally>) -> Self {
        Self {
            source: session.source,
            locator: session.locator,
            classifier: session.classifier,
            encoder: session.encoder,
            tally,
        }
    }

    /// Classify every face in `frame`, record the results and return the
    /// annotated frame as JPEG.
    ///
    /// A face whose classification fails is logged and left out; the rest
    /// of the frame is still processed.
    pub fn process(&mut self, frame: &Frame) -> anyhow::Result<Vec<u8>> {
        let faces = self.locator.locate(frame)?;
        let mut annotations = Vec::with_capacity(faces.len() + 2);
        if faces.is_empty() {
            annotations.push(Annotation::Warning("No face detected".into()));
        }
        let mut recorded = 0;
        for face in faces {
            let scores = match self.classifier.classify(frame, face) {
                Ok(scores) => scores,
                Err(e) => {
                    warn!(error = ?e, ?face, "face analysis failed");
                    continue;
                }
            };
            let Some(emotion) = Emotion::dominant(&scores) else {
                debug!(?face, "classifier reported no tracked emotion");
                continue;
            };
            self.tally.record(emotion);
            recorded += 1;
            annotations.push(Annotation::Face {
                region: face,
                label: emotion.to_string(),
            });
        }
        if recorded > 0 {
            let seen = self.tally.peek();
            annotations.push(Annotation::Status(format!(
                "Detections: {}",
                seen.total_detections
            )));
            annotations.push(Annotation::Status(format!(
                "Most common: {} ({})",
                seen.emotion, seen.count
            )));
        }
        self.encoder.encode(frame, &annotations)
    }

    /// Pull and process the next frame. `Ok(None)` once the source is done.
    pub fn next_jpeg(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        match self.source.next_frame()? {
            Some(frame) => self.process(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Drive the pipeline until the source ends or `sink` returns `false`.
    ///
    /// The sink deciding to stop is how a disconnected client ends the feed.
    pub fn run<F>(mut self, mut sink: F) -> anyhow::Result<()>
    where
        F: FnMut(Vec<u8>) -> bool,
    {
        let mut frames = 0u64;
        while let Some(jpeg) = self.next_jpeg()? {
            frames += 1;
            if !sink(jpeg) {
                info!(frames, "video consumer went away");
                return Ok(());
            }
        }
        info!(frames, "frame source finished");
        Ok(())
    }
}
