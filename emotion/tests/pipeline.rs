use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use emotion::{
    Annotation, CaptureSession, Emotion, EmotionClassifier, EmotionScores, EmotionTally,
    FaceLocator, FaceRegion, Frame, FrameEncoder, FramePipeline, FrameSource,
};
use tracing_test::traced_test;

struct Frames(usize);

impl FrameSource for Frames {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        if self.0 == 0 {
            return Ok(None);
        }
        self.0 -= 1;
        Ok(Some(Frame::blank(8, 8)))
    }
}

struct Faces(usize);

impl FaceLocator for Faces {
    fn locate(&mut self, _frame: &Frame) -> anyhow::Result<Vec<FaceRegion>> {
        Ok((0..self.0)
            .map(|i| FaceRegion {
                x: i as i32,
                y: 0,
                width: 1,
                height: 1,
            })
            .collect())
    }
}

/// Hands out canned classifier results, one per face.
struct Script(VecDeque<anyhow::Result<EmotionScores>>);

impl EmotionClassifier for Script {
    fn classify(&mut self, _frame: &Frame, _face: FaceRegion) -> anyhow::Result<EmotionScores> {
        self.0
            .pop_front()
            .unwrap_or_else(|| Ok(scores(&[("neutral", 1.0)])))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Vec<Annotation>>>>);

impl FrameEncoder for Recorder {
    fn encode(&mut self, _frame: &Frame, annotations: &[Annotation]) -> anyhow::Result<Vec<u8>> {
        self.0.lock().unwrap().push(annotations.to_vec());
        Ok(b"JPEG".to_vec())
    }
}

fn scores(pairs: &[(&str, f32)]) -> EmotionScores {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn pipeline(
    frames: usize,
    faces: usize,
    script: Vec<anyhow::Result<EmotionScores>>,
) -> (FramePipeline, Arc<EmotionTally>, Recorder) {
    let tally = Arc::new(EmotionTally::default());
    let recorder = Recorder::default();
    let session = CaptureSession {
        source: Box::new(Frames(frames)),
        locator: Box::new(Faces(faces)),
        classifier: Box::new(Script(script.into())),
        encoder: Box::new(recorder.clone()),
    };
    (FramePipeline::new(session, tally.clone()), tally, recorder)
}

#[test]
fn records_one_sample_per_face() {
    let (mut p, tally, recorder) = pipeline(
        1,
        2,
        vec![
            Ok(scores(&[("happy", 90.0), ("sad", 95.0)])),
            Ok(scores(&[("angry", 60.0), ("neutral", 30.0)])),
        ],
    );
    let jpeg = p.next_jpeg().unwrap().unwrap();
    assert_eq!(jpeg, b"JPEG");
    assert_eq!(tally.len(), 2);

    let drawn = recorder.0.lock().unwrap();
    let labels: Vec<_> = drawn[0]
        .iter()
        .filter_map(|a| match a {
            Annotation::Face { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec!["happy", "angry"]);
    assert!(drawn[0].contains(&Annotation::Status("Detections: 2".into())));
    assert!(drawn[0].contains(&Annotation::Status("Most common: angry (1)".into())));
}

#[test]
fn empty_frame_warns_and_records_nothing() {
    let (mut p, tally, recorder) = pipeline(1, 0, vec![]);
    p.next_jpeg().unwrap().unwrap();
    assert!(tally.is_empty());
    let drawn = recorder.0.lock().unwrap();
    assert_eq!(
        drawn[0],
        vec![Annotation::Warning("No face detected".into())]
    );
}

#[test]
fn untracked_only_scores_record_nothing() {
    let (mut p, tally, _) = pipeline(1, 1, vec![Ok(scores(&[("fear", 70.0), ("sad", 30.0)]))]);
    p.next_jpeg().unwrap().unwrap();
    assert!(tally.is_empty());
    assert_eq!(tally.query().emotion, Emotion::Neutral);
}

#[traced_test]
#[test]
fn failing_face_is_skipped() {
    let (mut p, tally, _) = pipeline(
        1,
        3,
        vec![
            Ok(scores(&[("happy", 1.0)])),
            Err(anyhow::anyhow!("model exploded")),
            Ok(scores(&[("happy", 1.0)])),
        ],
    );
    p.next_jpeg().unwrap().unwrap();
    assert_eq!(tally.len(), 2);
    assert_eq!(tally.peek().emotion, Emotion::Happy);
    assert!(logs_contain("face analysis failed"));
}

#[test]
fn run_stops_when_sink_refuses() {
    let (p, tally, _) = pipeline(10, 1, vec![]);
    let mut taken = 0;
    p.run(|_| {
        taken += 1;
        taken < 3
    })
    .unwrap();
    assert_eq!(taken, 3);
    assert_eq!(tally.len(), 3);
}

#[test]
fn run_ends_with_source() {
    let (p, _, recorder) = pipeline(4, 1, vec![]);
    let mut out = Vec::new();
    p.run(|jpeg| {
        out.push(jpeg);
        true
    })
    .unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(recorder.0.lock().unwrap().len(), 4);
}
