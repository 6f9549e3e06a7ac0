// Canned feedback for running without a model (offline demos, hosted previews).

use super::{ComprehensiveFeedback, FeedbackSource};
use crate::level::StudentLevel;

pub const STRENGTHS: [&str; 3] = [
    "Good code structure and formatting",
    "Clear variable naming",
    "Appropriate use of comments",
];

pub const WEAKNESSES: [&str; 3] = [
    "Could benefit from more error handling",
    "Consider adding input validation",
    "Documentation could be more comprehensive",
];

pub const ISSUES: [&str; 2] = ["Missing edge case handling", "No input validation present"];

pub const IMPROVEMENTS: [&str; 3] = [
    "Add try-catch blocks for error handling",
    "Implement input validation",
    "Add comprehensive documentation",
];

pub const LEARNING_POINTS: [&str; 3] = [
    "Error handling is crucial for robust code",
    "Input validation prevents unexpected behavior",
    "Good documentation helps with code maintenance",
];

pub const QUESTIONS: [&str; 3] = [
    "What happens if the user enters invalid input?",
    "How would you handle exceptions in this code?",
    "What are the benefits of input validation?",
];

pub fn code_fix(code: &str) -> String {
    format!(
        "# Improved version of your code:\n{}\n\n# Add error handling and validation here",
        code
    )
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn feedback(code: &str, level: StudentLevel) -> ComprehensiveFeedback {
    ComprehensiveFeedback {
        code_snippet: code.to_string(),
        student_level: level,
        strengths: owned(&STRENGTHS),
        weaknesses: owned(&WEAKNESSES),
        issues: owned(&ISSUES),
        step_by_step_improvement: owned(&IMPROVEMENTS),
        learning_points: owned(&LEARNING_POINTS),
        review_summary: "Demo mode: sample feedback showing the shape of a full review."
            .to_string(),
        comprehension_question: QUESTIONS[0].to_string(),
        comprehension_answer:
            "Without validation, invalid input can raise an exception and stop the program."
                .to_string(),
        explanation: format!("Also think about: {} {}", QUESTIONS[1], QUESTIONS[2]),
        improved_code: code_fix(code),
        fix_explanation: "Wrap risky operations in error handling and validate input before using it."
            .to_string(),
        difficulty_level: level,
        learning_objectives: owned(&["error_handling", "input_validation", "documentation"]),
        estimated_time_to_improve: "10-15 minutes".to_string(),
        source: FeedbackSource::Demo,
    }
}
