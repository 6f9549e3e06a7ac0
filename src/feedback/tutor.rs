use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    demo, extract_json_block, rules, CodeFeedback, ComprehensiveFeedback, FeedbackKind,
    FeedbackSource,
};
use crate::config::{FeedbackConfig, FeedbackMode};
use crate::level::StudentLevel;
use crate::llm::{prompts, LlmClient};
use crate::util::truncate_chars;

/// Step 1 reply.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnalysisReply {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub issues: Vec<String>,
    pub step_by_step_improvement: Vec<String>,
    pub learning_points: Vec<String>,
    pub review_summary: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub estimated_time_to_improve: String,
}

/// Step 2 reply.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuizReply {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// Step 3 reply.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CodeFixReply {
    pub improved_code: String,
    #[serde(default)]
    pub fix_explanation: String,
}

/// Drives the model through the tutoring prompts.
pub struct Tutor {
    client: Arc<dyn LlmClient>,
    config: FeedbackConfig,
}

impl Tutor {
    pub fn new(client: Arc<dyn LlmClient>, config: FeedbackConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Reject empty input and cap its length before it reaches a prompt.
    fn prepare<'a>(&self, code: &'a str) -> Result<&'a str> {
        if code.trim().is_empty() {
            bail!("No code provided");
        }
        let limited = truncate_chars(code, self.config.max_input_chars);
        if limited.len() < code.len() {
            warn!(
                "Code truncated to {} characters before sending to the model",
                self.config.max_input_chars
            );
        }
        Ok(limited)
    }

    pub async fn generate_code_review(&self, code: &str, level: StudentLevel) -> Result<String> {
        let code = self.prepare(code)?;
        let reply = self
            .client
            .complete(&prompts::code_review_prompt(code, level))
            .await?;
        Ok(reply.trim().to_string())
    }

    pub async fn generate_educational_feedback(
        &self,
        code: &str,
        level: StudentLevel,
    ) -> Result<String> {
        let code = self.prepare(code)?;
        let reply = self
            .client
            .complete(&prompts::educational_feedback_prompt(code, level))
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Model review plus guidance; rule-based analysis when the model fails.
    pub async fn analyze_student_code(
        &self,
        code: &str,
        level: StudentLevel,
    ) -> Result<Vec<CodeFeedback>> {
        let code = self.prepare(code)?;

        let from_model = async {
            let review = self.generate_code_review(code, level).await?;
            let guidance = self.generate_educational_feedback(code, level).await?;
            Ok::<_, anyhow::Error>((review, guidance))
        };

        match from_model.await {
            Ok((review, guidance)) => Ok(vec![
                CodeFeedback::new(
                    code,
                    FeedbackKind::ComprehensiveReview,
                    review,
                    level,
                    &["code_analysis", "best_practices"],
                ),
                CodeFeedback::new(
                    code,
                    FeedbackKind::EducationalGuidance,
                    guidance,
                    level,
                    &["learning", "improvement"],
                ),
            ]),
            Err(e) => {
                warn!("Model analysis failed, using rule-based analysis: {:#}", e);
                Ok(rules::analyze(code, level))
            }
        }
    }

    /// Analysis, comprehension question and code fix in one record.
    pub async fn generate_comprehensive_feedback(
        &self,
        code: &str,
        level: StudentLevel,
    ) -> Result<ComprehensiveFeedback> {
        let code = self.prepare(code)?;

        if self.config.mode == FeedbackMode::Demo {
            debug!("Demo mode, returning canned feedback");
            return Ok(demo::feedback(code, level));
        }

        match self.run_steps(code, level).await {
            Ok(feedback) => Ok(feedback),
            Err(e) if self.config.fallback_on_error => {
                warn!("Error generating comprehensive feedback: {:#}", e);
                Ok(rules::fallback_feedback(code, level))
            }
            Err(e) => Err(e),
        }
    }

    async fn run_steps(&self, code: &str, level: StudentLevel) -> Result<ComprehensiveFeedback> {
        info!("Step 1/3: analyzing code");
        let analysis: AnalysisReply = self
            .ask(&prompts::comprehensive_analysis_prompt(code, level), "analysis")
            .await?
            .unwrap_or_else(rules::fallback_analysis);

        info!("Step 2/3: generating comprehension question");
        let quiz: QuizReply = self
            .ask(
                &prompts::comprehension_question_prompt(
                    &analysis.learning_points,
                    &analysis.issues,
                    level,
                ),
                "comprehension question",
            )
            .await?
            .unwrap_or_else(rules::fallback_quiz);

        info!("Step 3/3: generating code fix");
        let fix: CodeFixReply = self
            .ask(
                &prompts::code_fix_prompt(code, &analysis.issues, &analysis.learning_points, level),
                "code fix",
            )
            .await?
            .unwrap_or_else(rules::fallback_code_fix);

        Ok(ComprehensiveFeedback {
            code_snippet: code.to_string(),
            student_level: level,
            strengths: analysis.strengths,
            weaknesses: analysis.weaknesses,
            issues: analysis.issues,
            step_by_step_improvement: analysis.step_by_step_improvement,
            learning_points: analysis.learning_points,
            review_summary: analysis.review_summary,
            comprehension_question: quiz.question,
            comprehension_answer: quiz.answer,
            explanation: quiz.explanation,
            improved_code: fix.improved_code,
            fix_explanation: fix.fix_explanation,
            difficulty_level: level,
            learning_objectives: analysis.learning_objectives,
            estimated_time_to_improve: analysis.estimated_time_to_improve,
            source: FeedbackSource::Model,
        })
    }

    /// One completion parsed as JSON. Transport errors propagate; a reply
    /// that does not parse yields None so the caller can use static content.
    async fn ask<T: DeserializeOwned>(&self, prompt: &str, step: &str) -> Result<Option<T>> {
        let reply = self.client.complete(prompt).await?;
        match serde_json::from_str::<T>(&extract_json_block(&reply)) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!("Failed to parse {} JSON ({}), using fallback", step, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClient(&'static str);

    #[async_trait]
    impl LlmClient for FixedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            bail!("Ollama API error 404 Not Found: model not found")
        }
    }

    #[derive(Default)]
    struct CountingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for CountingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    fn tutor(client: Arc<dyn LlmClient>) -> Tutor {
        Tutor::new(client, FeedbackConfig::default())
    }

    #[tokio::test]
    async fn test_comprehensive_feedback_from_model() {
        let t = tutor(Arc::new(MockLlmClient::new()));
        let fb = t
            .generate_comprehensive_feedback("def f(x):\n    return x", StudentLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(fb.source, FeedbackSource::Model);
        assert_eq!(fb.step_by_step_improvement.len(), 3);
        assert!(fb.comprehension_question.contains("set"));
        assert!(fb.improved_code.contains("seen = set()"));
    }

    #[tokio::test]
    async fn test_non_json_replies_use_step_fallbacks() {
        let t = tutor(Arc::new(FixedClient("I think the code is fine.")));
        let fb = t
            .generate_comprehensive_feedback("print(1)", StudentLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(fb.source, FeedbackSource::Model);
        assert_eq!(fb.review_summary, rules::fallback_analysis().review_summary);
        assert_eq!(fb.comprehension_question, rules::fallback_quiz().question);
        assert_eq!(fb.improved_code, rules::fallback_code_fix().improved_code);
    }

    #[tokio::test]
    async fn test_model_error_is_returned() {
        let t = tutor(Arc::new(FailingClient));
        let err = t
            .generate_comprehensive_feedback("print(1)", StudentLevel::Beginner)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn test_model_error_with_fallback_enabled() {
        let config = FeedbackConfig {
            fallback_on_error: true,
            ..FeedbackConfig::default()
        };
        let t = Tutor::new(Arc::new(FailingClient), config);
        let fb = t
            .generate_comprehensive_feedback("print(1)", StudentLevel::Advanced)
            .await
            .unwrap();
        assert_eq!(fb.source, FeedbackSource::Fallback);
        assert_eq!(fb.student_level, StudentLevel::Advanced);
    }

    #[tokio::test]
    async fn test_demo_mode_never_calls_model() {
        let client = Arc::new(CountingClient::default());
        let config = FeedbackConfig {
            mode: FeedbackMode::Demo,
            ..FeedbackConfig::default()
        };
        let t = Tutor::new(client.clone(), config);
        let fb = t
            .generate_comprehensive_feedback("total = 1", StudentLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(fb.source, FeedbackSource::Demo);
        assert!(fb.improved_code.contains("total = 1"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_code_rejected() {
        let t = tutor(Arc::new(MockLlmClient::new()));
        let err = t
            .generate_comprehensive_feedback("  \n ", StudentLevel::Beginner)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No code provided");
    }

    #[tokio::test]
    async fn test_long_code_truncated() {
        let config = FeedbackConfig {
            max_input_chars: 5,
            ..FeedbackConfig::default()
        };
        let t = Tutor::new(Arc::new(FixedClient("not json")), config);
        let fb = t
            .generate_comprehensive_feedback("print('hello')", StudentLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(fb.code_snippet, "print");
    }

    #[tokio::test]
    async fn test_analyze_student_code_from_model() {
        let t = tutor(Arc::new(MockLlmClient::new()));
        let fb = t
            .analyze_student_code("x = 1", StudentLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(fb.len(), 2);
        assert_eq!(fb[0].kind, FeedbackKind::ComprehensiveReview);
        assert!(fb[0].message.starts_with("1."));
        assert_eq!(fb[1].kind, FeedbackKind::EducationalGuidance);
        assert_eq!(fb[1].learning_objectives, vec!["learning", "improvement"]);
    }

    #[tokio::test]
    async fn test_analyze_student_code_falls_back_to_rules() {
        let t = tutor(Arc::new(FailingClient));
        let fb = t
            .analyze_student_code("while True:\n    pass", StudentLevel::Beginner)
            .await
            .unwrap();
        assert!(fb.iter().any(|f| f.kind == FeedbackKind::Logic));
    }
}
