use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::records::{CareerAssessment, LearningModeRequest, ProfileSummaryRequest};

const CAREER: &str = include_str!("prompts/career.txt");
const PROFILE_SUMMARY: &str = include_str!("prompts/profile_summary.txt");
const LEARNING_MODE: &str = include_str!("prompts/learning_mode.txt");

#[derive(Debug, thiserror::Error)]
#[error("failed to render prompt: {0}")]
pub struct PromptError(#[from] tinytemplate::error::Error);

/// Renders `template` with `{field}` placeholders filled from `ctx`.
///
/// Values are inserted verbatim; no HTML escaping is applied.
///
/// ```
/// use counsel::prompt::render_template;
/// #[derive(serde::Serialize)]
/// struct Ctx { topic: &'static str }
/// let out = render_template("Study {topic}.", &Ctx { topic: "a < b" }).unwrap();
/// assert_eq!(out, "Study a < b.");
/// ```
pub fn render_template<T: Serialize>(template: &str, ctx: &T) -> Result<String, PromptError> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("prompt", template)?;
    Ok(tt.render("prompt", ctx)?.trim_end().to_string())
}

/// A record that can be turned into a single instruction for the model.
pub trait Prompt {
    fn prompt(&self) -> Result<String, PromptError>;
}

#[derive(Serialize)]
struct CareerContext<'a> {
    space_exploration: f64,
    scientific_experiments: f64,
    helping_others: f64,
    patience: f64,
    creativity: f64,
    empathy: f64,
    favorite_subjects: &'a str,
    hobbies: &'a str,
}

impl Prompt for CareerAssessment {
    fn prompt(&self) -> Result<String, PromptError> {
        let r = &self.responses;
        let subjects = self.additional_info.favorite_subjects.join(", ");
        let hobbies = self.additional_info.hobbies.join(", ");
        render_template(
            CAREER,
            &CareerContext {
                space_exploration: r.space_exploration,
                scientific_experiments: r.scientific_experiments,
                helping_others: r.helping_others,
                patience: r.patience,
                creativity: r.creativity,
                empathy: r.empathy,
                favorite_subjects: &subjects,
                hobbies: &hobbies,
            },
        )
    }
}

#[derive(Serialize)]
struct SummaryContext<'a> {
    student_name: &'a str,
    age: u32,
    current_theme: &'a str,
    total_questions_solved: u32,
    total_modules_completed: u32,
    current_topic: &'a str,
    learning_mode_used: &'a str,
    /// `85` for whole percentages, `85.5` otherwise.
    average_accuracy: String,
    favorite_subject: &'a str,
    time_spent_learning: &'a str,
    strengths: String,
    areas_for_improvement: String,
}

impl Prompt for ProfileSummaryRequest {
    fn prompt(&self) -> Result<String, PromptError> {
        render_template(
            PROFILE_SUMMARY,
            &SummaryContext {
                student_name: &self.student_name,
                age: self.age,
                current_theme: &self.current_theme,
                total_questions_solved: self.total_questions_solved,
                total_modules_completed: self.total_modules_completed,
                current_topic: &self.current_topic,
                learning_mode_used: &self.learning_mode_used,
                average_accuracy: self.average_accuracy.to_string(),
                favorite_subject: &self.favorite_subject,
                time_spent_learning: &self.time_spent_learning,
                strengths: self.strengths.join(", "),
                areas_for_improvement: self.areas_for_improvement.join(", "),
            },
        )
    }
}

#[derive(Serialize)]
struct LearningModeContext<'a> {
    topic: &'a str,
    learning_mode_used: &'a str,
    quiz_outcome: bool,
}

impl Prompt for LearningModeRequest {
    fn prompt(&self) -> Result<String, PromptError> {
        render_template(
            LEARNING_MODE,
            &LearningModeContext {
                topic: &self.topic,
                learning_mode_used: &self.learning_mode_used,
                quiz_outcome: self.quiz_results,
            },
        )
    }
}
