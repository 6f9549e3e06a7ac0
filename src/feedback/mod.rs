pub mod demo;
pub mod render;
pub mod rules;
pub mod tutor;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::level::StudentLevel;

pub use tutor::Tutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Syntax,
    Logic,
    Optimization,
    Style,
    Explanation,
    ComprehensiveReview,
    EducationalGuidance,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Syntax => "syntax",
            FeedbackKind::Logic => "logic",
            FeedbackKind::Optimization => "optimization",
            FeedbackKind::Style => "style",
            FeedbackKind::Explanation => "explanation",
            FeedbackKind::ComprehensiveReview => "comprehensive_review",
            FeedbackKind::EducationalGuidance => "educational_guidance",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of feedback about a snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFeedback {
    pub code_snippet: String,
    pub kind: FeedbackKind,
    pub message: String,
    pub suggested_improvement: Option<String>,
    pub difficulty_level: StudentLevel,
    pub learning_objectives: Vec<String>,
}

impl CodeFeedback {
    pub fn new(
        code_snippet: &str,
        kind: FeedbackKind,
        message: impl Into<String>,
        level: StudentLevel,
        objectives: &[&str],
    ) -> Self {
        Self {
            code_snippet: code_snippet.to_string(),
            kind,
            message: message.into(),
            suggested_improvement: None,
            difficulty_level: level,
            learning_objectives: objectives.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_improvement = Some(suggestion.into());
        self
    }
}

/// Where a piece of comprehensive feedback came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    #[default]
    Model,
    Fallback,
    Demo,
}

impl fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSource::Model => write!(f, "model"),
            FeedbackSource::Fallback => write!(f, "fallback"),
            FeedbackSource::Demo => write!(f, "demo"),
        }
    }
}

/// Output of the three-step feedback flow: analysis, quiz, code fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveFeedback {
    pub code_snippet: String,
    pub student_level: StudentLevel,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub issues: Vec<String>,
    pub step_by_step_improvement: Vec<String>,
    pub learning_points: Vec<String>,
    pub review_summary: String,
    pub comprehension_question: String,
    pub comprehension_answer: String,
    pub explanation: String,
    pub improved_code: String,
    pub fix_explanation: String,
    pub difficulty_level: StudentLevel,
    pub learning_objectives: Vec<String>,
    pub estimated_time_to_improve: String,
    pub source: FeedbackSource,
}

/// Top-level sections of rendered feedback, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Analysis,
    StepByStep,
    LearningPoints,
    Quiz,
    CodeFix,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Analysis,
        Section::StepByStep,
        Section::LearningPoints,
        Section::Quiz,
        Section::CodeFix,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            Section::Analysis => "Analysis",
            Section::StepByStep => "Step-by-Step Guide",
            Section::LearningPoints => "Learning Points",
            Section::Quiz => "Quiz",
            Section::CodeFix => "Code Fix",
        }
    }
}

/// Pull a JSON object out of a model reply that may wrap it in prose or fences.
pub fn extract_json_block(text: &str) -> String {
    let trimmed = text.trim();

    // Try: markdown json fence
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim().to_string();
        }
    }

    // Try: markdown plain fence
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let inner = trimmed[start + 3..start + 3 + end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try: find first { and last }
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}
