//! Prompt building and the remote chat model that answers them.
//!
//! Student records are rendered into single instruction prompts and sent to
//! an OpenAI-compatible chat completions endpoint (Groq by default).

pub mod chat;
pub mod prompt;
pub mod records;

pub use chat::{ChatClient, ChatConfig, Completion, CompletionError};
pub use prompt::{Prompt, PromptError};
pub use records::{
    AdditionalInfo, AssessmentResponses, CareerAssessment, InvalidRecord, LearningModeRequest,
    ProfileSummaryRequest,
};
