//! Corpus preparation for fine-tuning: filter chat datasets by language,
//! normalize them into feedback records, merge and split JSONL files.

pub mod io;

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::assessment::{FeedbackCategories, FeedbackType, Suggestion, DEFAULT_SCORE};
use crate::detector::{detect_in_prompt, detect_language, Language};
use crate::level::StudentLevel;
use crate::llm::prompts;
use crate::util::truncate_chars;

pub const DEFAULT_TRAIN_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub messages: Vec<ChatMessage>,
}

/// A chat example whose user turns mention one of the target languages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub language: Language,
    pub messages: Vec<ChatMessage>,
}

/// Normalized corpus row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub language: String,
    pub prompt: String,
    pub code: String,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub prompt: String,
    pub response: String,
    pub source: String,
}

pub fn filter_by_language(examples: Vec<ChatExample>, targets: &[Language]) -> Vec<TaggedExample> {
    examples
        .into_iter()
        .filter_map(|example| {
            let language = example
                .messages
                .iter()
                .filter(|m| m.role == "user")
                .find_map(|m| detect_in_prompt(&m.content, targets))?;
            Some(TaggedExample {
                id: example.id,
                language,
                messages: example.messages,
            })
        })
        .collect()
}

/// First user turn is the prompt, first assistant turn the code, later
/// assistant turns the feedback.
pub fn standardize_chat(example: &TaggedExample) -> Option<FeedbackRecord> {
    let prompt = example.messages.iter().find(|m| m.role == "user")?;
    let mut assistant = example.messages.iter().filter(|m| m.role == "assistant");
    let code = assistant.next()?;
    let feedback = assistant
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(FeedbackRecord {
        language: example.language.as_str().to_string(),
        prompt: prompt.content.clone(),
        code: code.content.clone(),
        feedback,
        fix: Some(String::new()),
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

/// Strings pass through; anything else is kept as its JSON encoding.
fn as_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Normalize a code-review dataset row.
pub fn standardize_review_row(row: &Value) -> FeedbackRecord {
    let language = row
        .get("meta_data")
        .and_then(|m| m.get("language"))
        .and_then(Value::as_str)
        .unwrap_or("python")
        .to_string();
    let prompt = row
        .get("prompt")
        .filter(|v| is_present(v))
        .or_else(|| row.get("body"));

    FeedbackRecord {
        language,
        prompt: as_text(prompt),
        code: as_text(row.get("response")),
        feedback: as_text(row.get("answer")),
        fix: None,
    }
}

/// Shuffle, then cut at `floor(train_ratio * len)`.
pub fn split<T>(
    mut items: Vec<T>,
    train_ratio: f64,
    seed: Option<u64>,
) -> Result<(Vec<T>, Vec<T>)> {
    if !(train_ratio > 0.0 && train_ratio <= 1.0) {
        bail!("Train ratio must be in (0, 1], got {}", train_ratio);
    }
    match seed {
        Some(seed) => items.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => items.shuffle(&mut rand::rng()),
    }
    let cut = (train_ratio * items.len() as f64).floor() as usize;
    let validation = items.split_off(cut.min(items.len()));
    Ok((items, validation))
}

/// Where a batch of records came from. Decides the level and focus written
/// into the prompt and the reference assessment used as the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Reviewed code with free-text feedback
    #[default]
    Feedback,
    /// Instruction/solution pairs
    Instruction,
    /// Programming problems with a reference solution
    Problem,
    /// Competitive programming solutions
    Contest,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Feedback => "feedback",
            SourceKind::Instruction => "instruction",
            SourceKind::Problem => "problem",
            SourceKind::Contest => "contest",
        }
    }

    pub fn student_level(&self) -> StudentLevel {
        match self {
            SourceKind::Contest => StudentLevel::Advanced,
            _ => StudentLevel::Intermediate,
        }
    }

    pub fn feedback_type(&self) -> FeedbackType {
        match self {
            SourceKind::Feedback | SourceKind::Instruction => FeedbackType::General,
            SourceKind::Problem | SourceKind::Contest => FeedbackType::Algorithm,
        }
    }

    fn score(&self) -> f64 {
        match self {
            SourceKind::Feedback => DEFAULT_SCORE,
            SourceKind::Instruction => 85.0,
            SourceKind::Problem => 90.0,
            SourceKind::Contest => 95.0,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "feedback" => Ok(SourceKind::Feedback),
            "instruction" => Ok(SourceKind::Instruction),
            "problem" => Ok(SourceKind::Problem),
            "contest" => Ok(SourceKind::Contest),
            _ => bail!(
                "Unknown source kind: {} (expected feedback, instruction, problem or contest)",
                s
            ),
        }
    }
}

/// The assessment a fine-tuned model should produce for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTarget {
    pub overall_score: f64,
    pub feedback_categories: FeedbackCategories,
    pub specific_suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_code: Option<String>,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn categories(
    correctness: &str,
    style: &str,
    efficiency: &str,
    best_practices: &str,
) -> FeedbackCategories {
    FeedbackCategories {
        correctness: Some(correctness.to_string()),
        style: Some(style.to_string()),
        efficiency: Some(efficiency.to_string()),
        best_practices: Some(best_practices.to_string()),
        debugging: None,
    }
}

pub fn training_target(record: &FeedbackRecord, kind: SourceKind) -> TrainingTarget {
    let mut target = match kind {
        SourceKind::Feedback => TrainingTarget {
            overall_score: kind.score(),
            feedback_categories: FeedbackCategories::default(),
            specific_suggestions: Vec::new(),
            corrected_code: None,
            summary: record.feedback.clone(),
            strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
        },
        SourceKind::Instruction => TrainingTarget {
            overall_score: kind.score(),
            feedback_categories: categories(
                "Code correctly implements the requested functionality",
                "Good code structure and naming",
                "Reasonable algorithmic approach",
                "Follows standard programming practices",
            ),
            specific_suggestions: Vec::new(),
            corrected_code: None,
            summary: format!(
                "Well-implemented solution for: {}...",
                truncate_chars(&record.prompt, 100)
            ),
            strengths: strings(&["Clear implementation", "Addresses requirements"]),
            areas_for_improvement: strings(&["Consider edge cases", "Add error handling"]),
        },
        SourceKind::Problem => TrainingTarget {
            overall_score: kind.score(),
            feedback_categories: categories(
                "Solution correctly solves the problem",
                "Clean and readable code structure",
                "Efficient algorithmic approach",
                "Good use of language features",
            ),
            specific_suggestions: Vec::new(),
            corrected_code: None,
            summary: "Effective solution with good algorithm design".to_string(),
            strengths: strings(&["Correct logic", "Good algorithm choice"]),
            areas_for_improvement: strings(&["Consider alternative approaches"]),
        },
        SourceKind::Contest => TrainingTarget {
            overall_score: kind.score(),
            feedback_categories: categories(
                "Optimal solution for competitive programming",
                "Efficient competitive programming style",
                "Highly optimized algorithm",
                "Contest-appropriate coding practices",
            ),
            specific_suggestions: Vec::new(),
            corrected_code: None,
            summary: "Excellent competitive programming solution".to_string(),
            strengths: strings(&["Optimal complexity", "Contest-ready"]),
            areas_for_improvement: strings(&["Add comments for readability"]),
        },
    };
    target.corrected_code = record.fix.clone().filter(|f| !f.trim().is_empty());
    target
}

/// Records tagged with an unknown language fall back to detection on the code.
fn record_language(record: &FeedbackRecord) -> Language {
    Language::from_str(&record.language).unwrap_or_else(|_| detect_language(&record.code))
}

pub fn to_training_pair(
    record: &FeedbackRecord,
    kind: SourceKind,
    source: &str,
) -> Result<TrainingPair> {
    let context = if record.prompt.trim().is_empty() {
        "General code review"
    } else {
        record.prompt.as_str()
    };
    let prompt = prompts::training_prompt(
        record_language(record).as_str(),
        &record.code,
        context,
        kind.student_level(),
        kind.feedback_type().as_str(),
    );

    Ok(TrainingPair {
        prompt,
        response: serde_json::to_string_pretty(&training_target(record, kind))?,
        source: source.to_string(),
    })
}
