use serde::{Deserialize, Serialize};

/// Lowest and highest accepted self-assessment score.
pub const SCORE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRecord {
    #[error("{field} must be between 1 and 10, got {value}")]
    ScoreOutOfRange { field: &'static str, value: f64 },
}

/// Self-assessment answers on a 1 to 10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponses {
    /// Interest in space, planets and stars.
    pub space_exploration: f64,
    /// Interest in science experiments.
    pub scientific_experiments: f64,
    /// Interest in helping people.
    pub helping_others: f64,
    pub patience: f64,
    pub creativity: f64,
    pub empathy: f64,
}

impl AssessmentResponses {
    fn scores(&self) -> [(&'static str, f64); 6] {
        [
            ("space_exploration", self.space_exploration),
            ("scientific_experiments", self.scientific_experiments),
            ("helping_others", self.helping_others),
            ("patience", self.patience),
            ("creativity", self.creativity),
            ("empathy", self.empathy),
        ]
    }

    /// Reject any score that is not a finite number within [`SCORE_RANGE`].
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        match self
            .scores()
            .into_iter()
            .find(|(_, v)| !SCORE_RANGE.contains(v))
        {
            Some((field, value)) => Err(InvalidRecord::ScoreOutOfRange { field, value }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub favorite_subjects: Vec<String>,
    pub hobbies: Vec<String>,
}

/// Body of `POST /assess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerAssessment {
    pub responses: AssessmentResponses,
    pub additional_info: AdditionalInfo,
}

impl CareerAssessment {
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        self.responses.validate()
    }
}

/// Learning progress used to write a summary for parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummaryRequest {
    pub student_name: String,
    pub age: u32,
    pub current_theme: String,
    pub total_questions_solved: u32,
    pub total_modules_completed: u32,
    pub current_topic: String,
    pub learning_mode_used: String,
    pub quiz_results: bool,
    pub average_accuracy: f64,
    pub favorite_subject: String,
    pub time_spent_learning: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
}

/// Latest quiz outcome for a topic and the mode it was learned in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModeRequest {
    pub topic: String,
    pub learning_mode_used: String,
    pub quiz_results: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn responses() -> AssessmentResponses {
        serde_json::from_value(json!({
            "space_exploration": 10,
            "scientific_experiments": 10,
            "helping_others": 7.5,
            "patience": 2.5,
            "creativity": 10,
            "empathy": 7.5
        }))
        .unwrap()
    }

    #[test]
    fn integer_scores_deserialize() {
        let r = responses();
        assert_eq!(r.space_exploration, 10.0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn out_of_range_score_is_named() {
        let mut r = responses();
        r.patience = 11.0;
        assert_eq!(
            r.validate(),
            Err(InvalidRecord::ScoreOutOfRange {
                field: "patience",
                value: 11.0
            })
        );
        r.patience = 0.5;
        assert!(r.validate().is_err());
    }

    #[test]
    fn nan_score_is_rejected() {
        let mut r = responses();
        r.empathy = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let req: ProfileSummaryRequest = serde_json::from_value(json!({
            "student_name": "Anmol",
            "age": 10,
            "current_theme": "Astronaut",
            "total_questions_solved": 150,
            "total_modules_completed": 5,
            "current_topic": "Fractions",
            "learning_mode_used": "Gamified Learning",
            "quiz_results": true,
            "average_accuracy": 85,
            "favorite_subject": "Mathematics",
            "time_spent_learning": "2 hours daily"
        }))
        .unwrap();
        assert!(req.strengths.is_empty());
        assert!(req.areas_for_improvement.is_empty());
    }
}
