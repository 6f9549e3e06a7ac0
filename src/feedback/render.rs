use anyhow::{Context, Result};
use std::fmt::Write;

use super::{CodeFeedback, ComprehensiveFeedback, FeedbackSource, Section};

fn bullets(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("_None_\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

fn numbered(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("_None_\n");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item);
    }
}

fn section(out: &mut String, feedback: &ComprehensiveFeedback, section: Section) {
    let _ = writeln!(out, "## {}\n", section.heading());
    match section {
        Section::Analysis => {
            if !feedback.review_summary.is_empty() {
                let _ = writeln!(out, "{}\n", feedback.review_summary);
            }
            out.push_str("**Strengths**\n\n");
            bullets(out, &feedback.strengths);
            out.push_str("\n**Weaknesses**\n\n");
            bullets(out, &feedback.weaknesses);
            out.push_str("\n**Issues**\n\n");
            bullets(out, &feedback.issues);
        }
        Section::StepByStep => {
            numbered(out, &feedback.step_by_step_improvement);
            if !feedback.estimated_time_to_improve.is_empty() {
                let _ = writeln!(
                    out,
                    "\nEstimated time to improve: {}",
                    feedback.estimated_time_to_improve
                );
            }
        }
        Section::LearningPoints => {
            bullets(out, &feedback.learning_points);
        }
        Section::Quiz => {
            let _ = writeln!(out, "**Question:** {}\n", feedback.comprehension_question);
            let _ = writeln!(out, "**Answer:** {}\n", feedback.comprehension_answer);
            let _ = writeln!(out, "**Explanation:** {}", feedback.explanation);
        }
        Section::CodeFix => {
            let _ = writeln!(out, "```\n{}\n```", feedback.improved_code.trim_end());
            if !feedback.fix_explanation.is_empty() {
                let _ = writeln!(out, "\n{}", feedback.fix_explanation);
            }
        }
    }
    out.push('\n');
}

/// Markdown report with one heading per section.
pub fn to_markdown(feedback: &ComprehensiveFeedback) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Feedback ({} level)\n",
        feedback.student_level.as_str()
    );
    match feedback.source {
        FeedbackSource::Demo => out.push_str("> Demo mode: this is sample feedback.\n\n"),
        FeedbackSource::Fallback => {
            out.push_str("> The model was unavailable; showing general feedback.\n\n")
        }
        FeedbackSource::Model => {}
    }
    for s in Section::ALL {
        section(&mut out, feedback, s);
    }
    out.trim_end().to_string() + "\n"
}

pub fn to_json(feedback: &ComprehensiveFeedback) -> Result<String> {
    serde_json::to_string_pretty(feedback).context("Failed to serialize feedback")
}

/// Plain listing for the `review` command.
pub fn code_feedback_to_markdown(items: &[CodeFeedback]) -> String {
    if items.is_empty() {
        return "No issues found.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "## {}\n", item.kind);
        let _ = writeln!(out, "{}", item.message);
        if let Some(suggestion) = &item.suggested_improvement {
            let _ = writeln!(out, "\nSuggestion: {}", suggestion);
        }
        if !item.learning_objectives.is_empty() {
            let _ = writeln!(out, "\nObjectives: {}", item.learning_objectives.join(", "));
        }
        out.push('\n');
    }
    out
}
