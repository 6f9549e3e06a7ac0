// Rule-based feedback used when the model is unavailable, plus the static
// content each feedback step falls back to.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyzer::python;
use super::tutor::{AnalysisReply, CodeFixReply, QuizReply};
use super::{CodeFeedback, ComprehensiveFeedback, FeedbackKind, FeedbackSource};
use crate::level::StudentLevel;

static ASSIGN_X: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*x\s*=[^=]").expect("valid assignment regex"));
static IDENT_X: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bx\b").expect("valid identifier regex"));
static FOR_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfor\b").expect("valid for regex"));
static SHORT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[xyz]\b").expect("valid short name regex"));

/// Run every rule over the code.
pub fn analyze(code: &str, level: StudentLevel) -> Vec<CodeFeedback> {
    let mut feedback = Vec::new();
    feedback.extend(check_syntax(code, level));
    feedback.extend(check_logic(code, level));
    feedback.extend(check_optimization(code, level));
    feedback.extend(check_style(code, level));
    feedback
}

/// First block header that is missing its trailing colon.
pub fn check_syntax(code: &str, level: StudentLevel) -> Option<CodeFeedback> {
    let (_, keyword) = python::missing_colon(code)?;
    let message = match keyword.as_str() {
        "if" | "elif" => "Don't forget the colon after your if condition".to_string(),
        "for" => "Don't forget the colon after your for loop".to_string(),
        "while" => "Don't forget the colon after your while loop".to_string(),
        other => format!("Don't forget the colon at the end of the '{}' line", other),
    };
    Some(CodeFeedback::new(
        code,
        FeedbackKind::Syntax,
        message,
        level,
        &["syntax", "basic_python"],
    ))
}

pub fn check_logic(code: &str, level: StudentLevel) -> Vec<CodeFeedback> {
    let mut feedback = Vec::new();

    if code.contains("while True:") && !code.contains("break") {
        feedback.push(CodeFeedback::new(
            code,
            FeedbackKind::Logic,
            "This while loop will run forever! Make sure to include a break statement or condition to exit the loop.",
            level,
            &["control_flow", "loops"],
        ));
    }

    // Every mention of x is an assignment target, so it is never read
    let assignments = ASSIGN_X.find_iter(code).count();
    if assignments > 0 && IDENT_X.find_iter(code).count() == assignments {
        feedback.push(CodeFeedback::new(
            code,
            FeedbackKind::Logic,
            "You created variable 'x' but didn't use it. Consider removing unused variables to keep your code clean.",
            level,
            &["variables", "code_cleanliness"],
        ));
    }

    feedback
}

pub fn check_optimization(code: &str, level: StudentLevel) -> Option<CodeFeedback> {
    if FOR_KEYWORD.find_iter(code).count() > 1 && code.matches("in range").count() > 1 {
        return Some(
            CodeFeedback::new(
                code,
                FeedbackKind::Optimization,
                "You have nested loops here. Consider if you can optimize this to O(n) instead of O(n²).",
                level,
                &["algorithms", "complexity", "optimization"],
            )
            .with_suggestion("Use a hashmap or set to reduce complexity"),
        );
    }
    None
}

pub fn check_style(code: &str, level: StudentLevel) -> Option<CodeFeedback> {
    if SHORT_NAME.is_match(code) {
        return Some(CodeFeedback::new(
            code,
            FeedbackKind::Style,
            "Consider using more descriptive variable names instead of x, y, z. This makes your code easier to understand.",
            level,
            &["naming_conventions", "readability"],
        ));
    }
    None
}

/// Reword a feedback message for the student's level.
pub fn adapt_feedback_complexity(mut feedback: CodeFeedback, level: StudentLevel) -> CodeFeedback {
    match level {
        StudentLevel::Beginner => {
            feedback.message = feedback
                .message
                .replace("O(n²)", "quadratic time (slower)")
                .replace("O(n)", "linear time (faster)");
        }
        StudentLevel::Advanced if feedback.kind == FeedbackKind::Optimization => {
            feedback
                .message
                .push_str(" Consider the space-time tradeoff and cache locality.");
        }
        _ => {}
    }
    feedback
}

pub fn explain_concept(concept: &str, level: StudentLevel) -> String {
    let text = match (concept.trim().to_lowercase().as_str(), level) {
        ("variables", StudentLevel::Beginner) => {
            "Variables are like labeled boxes where you store information. Think of 'name = \"John\"' as putting \"John\" in a box labeled 'name'."
        }
        ("variables", StudentLevel::Intermediate) => {
            "Variables are memory locations that store data. They have a name, type, and value. Python is dynamically typed, so the type is inferred."
        }
        ("variables", StudentLevel::Advanced) => {
            "Variables in Python are references to objects in memory. They're dynamically typed and use reference counting for memory management."
        }
        ("loops", StudentLevel::Beginner) => {
            "Loops repeat code multiple times. 'for' loops are great when you know how many times to repeat, 'while' loops when you don't."
        }
        ("loops", StudentLevel::Intermediate) => {
            "Loops control program flow. 'for' iterates over sequences, 'while' continues until a condition is False. Consider time complexity."
        }
        ("loops", StudentLevel::Advanced) => {
            "Loops are fundamental control structures. Python's 'for' is actually a foreach loop. Consider iterator patterns and generator expressions."
        }
        _ => return format!("Explanation for {} at {} level", concept, level),
    };
    text.to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn fallback_analysis() -> AnalysisReply {
    AnalysisReply {
        strengths: strings(&[
            "Your code has a clear structure",
            "You're using appropriate data types",
        ]),
        weaknesses: strings(&["Could improve variable naming", "Consider adding comments"]),
        issues: strings(&["Basic syntax and style issues"]),
        step_by_step_improvement: strings(&[
            "Step 1: Add descriptive variable names",
            "Step 2: Include comments explaining your logic",
            "Step 3: Consider code optimization",
        ]),
        learning_points: strings(&[
            "Good variable naming improves code readability",
            "Comments help others understand your code",
            "Always consider efficiency in your solutions",
        ]),
        review_summary: "Your code works but could be improved with better practices.".to_string(),
        learning_objectives: strings(&["code_quality", "best_practices", "readability"]),
        estimated_time_to_improve: "10-15 minutes".to_string(),
    }
}

pub(crate) fn fallback_quiz() -> QuizReply {
    QuizReply {
        question: "What is the main concept you learned from this code review?".to_string(),
        answer: "The main concept is understanding code structure and best practices.".to_string(),
        explanation: "This question tests your understanding of the key learning points discussed."
            .to_string(),
    }
}

pub(crate) fn fallback_code_fix() -> CodeFixReply {
    CodeFixReply {
        improved_code: "# Improved version of your code\n# Add comments and improvements here"
            .to_string(),
        fix_explanation:
            "This is a fallback improved version. The model should provide specific improvements."
                .to_string(),
    }
}

/// Complete feedback built without the model.
pub fn fallback_feedback(code: &str, level: StudentLevel) -> ComprehensiveFeedback {
    let analysis = fallback_analysis();
    ComprehensiveFeedback {
        code_snippet: code.to_string(),
        student_level: level,
        strengths: analysis.strengths,
        weaknesses: analysis.weaknesses,
        issues: analysis.issues,
        step_by_step_improvement: analysis.step_by_step_improvement,
        learning_points: analysis.learning_points,
        review_summary: analysis.review_summary,
        comprehension_question: "What is the importance of good variable naming in programming?"
            .to_string(),
        comprehension_answer: "Good variable naming makes code more readable and maintainable."
            .to_string(),
        explanation: "Descriptive variable names help other developers (and yourself) understand what the code does.".to_string(),
        improved_code: "# Improved version\n# Add your improvements here".to_string(),
        fix_explanation:
            "This is a fallback version. The model should provide specific improvements."
                .to_string(),
        difficulty_level: level,
        learning_objectives: analysis.learning_objectives,
        estimated_time_to_improve: analysis.estimated_time_to_improve,
        source: FeedbackSource::Fallback,
    }
}
