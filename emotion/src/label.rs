use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vision::EmotionScores;

/// Emotions tracked by the service.
///
/// Variants are declared alphabetically so the derived `Ord` matches the
/// ordering of their label names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Happy,
    Neutral,
}

impl Emotion {
    /// Every tracked emotion, in label order.
    pub const ALL: [Emotion; 3] = [Emotion::Angry, Emotion::Happy, Emotion::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Highest scoring tracked emotion in a classifier result.
    ///
    /// Names outside the vocabulary are dropped before comparing, so a face
    /// that is mostly "sad" still yields whichever of the tracked emotions
    /// scored best. Equal scores resolve to the smaller label. Returns `None`
    /// when no tracked emotion carries a usable score.
    ///
    /// ```
    /// use emotion::{Emotion, EmotionScores};
    /// let scores = EmotionScores::from([
    ///     ("sad".to_string(), 80.0),
    ///     ("happy".to_string(), 12.0),
    ///     ("neutral".to_string(), 8.0),
    /// ]);
    /// assert_eq!(Emotion::dominant(&scores), Some(Emotion::Happy));
    /// ```
    pub fn dominant(scores: &EmotionScores) -> Option<Emotion> {
        scores
            .iter()
            .filter(|(_, score)| !score.is_nan())
            .filter_map(|(name, score)| name.parse::<Emotion>().ok().map(|e| (e, *score)))
            .min_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
            .map(|(emotion, _)| emotion)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("untracked emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownEmotion(name.to_string()))
    }
}
