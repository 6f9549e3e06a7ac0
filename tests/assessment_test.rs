//! Scored assessments and the static analyzer behind them

use anyhow::Result;
use async_trait::async_trait;
use codetutor::analyzer::{Severity, StaticAnalyzer};
use codetutor::assessment::{AssessmentService, CodeSubmission, FeedbackType};
use codetutor::detector::{detect_language, Language};
use codetutor::level::StudentLevel;
use codetutor::llm::{LlmClient, MockLlmClient};
use std::sync::{Arc, Mutex};

/// Remembers the last prompt and answers with a fixed reply.
struct RecordingClient {
    reply: String,
    last_prompt: Mutex<String>,
}

impl RecordingClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last_prompt: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl LlmClient for RecordingClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = prompt.to_string();
        Ok(self.reply.clone())
    }
}

fn submission(code: &str, language: Language) -> CodeSubmission {
    CodeSubmission {
        code: code.to_string(),
        language,
        assignment_context: None,
        feedback_type: FeedbackType::General,
        student_level: StudentLevel::Beginner,
    }
}

#[test]
fn test_static_analyzer_properties() {
    let analyzer = StaticAnalyzer::new();

    let spaces = analyzer.analyze("a=b+c", Language::Python);
    assert!(spaces
        .issues
        .iter()
        .any(|i| i.description.contains("spaces")));

    let long_line = format!("x = '{}'", "a".repeat(74));
    assert_eq!(long_line.len(), 80);
    let report = analyzer.analyze(&long_line, Language::Python);
    assert!(report
        .issues
        .iter()
        .any(|i| i.description.to_lowercase().contains("line too long")));

    let js = analyzer.analyze("var x == 1", Language::JavaScript);
    assert_eq!(js.issues.len(), 2);
    assert_eq!(js.score_adjustment, -4);
    assert_eq!(js.count(Severity::Medium), 1);
}

#[test]
fn test_detected_language_feeds_analyzer() {
    let code = "public class Main {\n    public static void main(String[] args) {\n        int x = 1\n    }\n}\n";
    let language = detect_language(code);
    assert_eq!(language, Language::Java);

    let report = StaticAnalyzer::new().analyze(code, language);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].line_number, Some(3));
    assert_eq!(report.score_adjustment, -3);
}

#[tokio::test]
async fn test_assessment_with_mock_model() -> Result<()> {
    let service = AssessmentService::new(Arc::new(MockLlmClient::new()), 8000);
    let assessment = service
        .assess(&submission(
            "def add(a, b):\n    return a + b\n",
            Language::Python,
        ))
        .await?;

    assert_eq!(assessment.overall_score, 82.0);
    assert_eq!(assessment.summary, "Correct but can be clearer and faster.");
    assert!(assessment.feedback_categories.debugging.is_none());
    assert_eq!(assessment.specific_suggestions[0].severity, Severity::Low);
    Ok(())
}

#[tokio::test]
async fn test_prompt_carries_submission_details() -> Result<()> {
    let client = Arc::new(RecordingClient::new(r#"{"overall_score": 90}"#));
    let service = AssessmentService::new(client.clone(), 8000);
    let mut request = submission("puts 'hi'", Language::Ruby);
    request.assignment_context = Some("Greet the user".to_string());
    request.feedback_type = FeedbackType::Style;
    request.student_level = StudentLevel::Advanced;

    let assessment = service.assess(&request).await?;
    assert_eq!(assessment.overall_score, 90.0);

    let prompt = client.last_prompt.lock().unwrap().clone();
    assert!(prompt.contains("Greet the user"));
    assert!(prompt.contains("ruby"));
    assert!(prompt.contains("puts 'hi'"));
    Ok(())
}

#[tokio::test]
async fn test_scores_stay_in_range() -> Result<()> {
    let bad_python = "if a>1\n    b=a\nwhile c>1\n    d=c\nfor e in f\n    g=e\n";

    let low = AssessmentService::new(
        Arc::new(RecordingClient::new(r#"{"overall_score": 5}"#)),
        8000,
    );
    let assessment = low.assess(&submission(bad_python, Language::Python)).await?;
    assert!(assessment.overall_score >= 0.0);
    assert!(assessment
        .specific_suggestions
        .iter()
        .any(|s| s.issue_type == "static_analysis"));

    let high = AssessmentService::new(
        Arc::new(RecordingClient::new(r#"{"overall_score": "250"}"#)),
        8000,
    );
    let assessment = high
        .assess(&submission("x = 1\n", Language::Python))
        .await?;
    assert_eq!(assessment.overall_score, 100.0);
    Ok(())
}

#[tokio::test]
async fn test_long_submission_is_truncated_before_prompting() -> Result<()> {
    let client = Arc::new(RecordingClient::new("{}"));
    let service = AssessmentService::new(client.clone(), 20);
    let code = format!("x = 1\n{}", "# filler\n".repeat(50));

    service.assess(&submission(&code, Language::Python)).await?;
    let prompt = client.last_prompt.lock().unwrap().clone();
    assert!(!prompt.contains(&code));
    assert!(prompt.contains("x = 1"));
    Ok(())
}
