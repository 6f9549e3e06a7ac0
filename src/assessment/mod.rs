pub mod service;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analyzer::Severity;
use crate::detector::Language;
use crate::level::StudentLevel;

pub use service::AssessmentService;

pub const DEFAULT_SCORE: f64 = 75.0;
pub const DEFAULT_SUMMARY: &str = "Feedback generated successfully";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    #[default]
    General,
    Debugging,
    Style,
    Algorithm,
    BestPractices,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 5] = [
        FeedbackType::General,
        FeedbackType::Debugging,
        FeedbackType::Style,
        FeedbackType::Algorithm,
        FeedbackType::BestPractices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::General => "general",
            FeedbackType::Debugging => "debugging",
            FeedbackType::Style => "style",
            FeedbackType::Algorithm => "algorithm",
            FeedbackType::BestPractices => "best_practices",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "general" => Ok(FeedbackType::General),
            "debugging" => Ok(FeedbackType::Debugging),
            "style" => Ok(FeedbackType::Style),
            "algorithm" => Ok(FeedbackType::Algorithm),
            "best_practices" => Ok(FeedbackType::BestPractices),
            _ => bail!("Unknown feedback type: {}", s),
        }
    }
}

/// A request to score one piece of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub assignment_context: Option<String>,
    #[serde(default)]
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub student_level: StudentLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCategories {
    #[serde(default)]
    pub correctness: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub efficiency: Option<String>,
    #[serde(default)]
    pub best_practices: Option<String>,
    #[serde(default)]
    pub debugging: Option<String>,
}

fn default_issue_type() -> String {
    "general".to_string()
}

/// Models sometimes write "High", "critical" or leave the field out.
fn lenient_severity<'de, D>(deserializer: D) -> std::result::Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.parse().ok())
        .unwrap_or(Severity::Medium))
}

fn medium() -> Severity {
    Severity::Medium
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub line_number: Option<usize>,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default = "medium", deserialize_with = "lenient_severity")]
    pub severity: Severity,
}

/// Scored review returned by `POST /analyze-code` and `codetutor assess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub overall_score: f64,
    pub feedback_categories: FeedbackCategories,
    pub specific_suggestions: Vec<Suggestion>,
    pub corrected_code: Option<String>,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
