// Prompt templates shared by the tutor, the assessment service and the corpus tools.
// The wording of the first two templates matches what the model was fine-tuned on.

use crate::assessment::CodeSubmission;
use crate::level::StudentLevel;

/// One line telling the model how to pitch the feedback for this level.
fn level_guidance(level: StudentLevel) -> String {
    let profile = level.profile();
    let basics = if profile.include_basics {
        "Explain basic concepts as you go."
    } else {
        "Skip explanations of basic syntax."
    };
    format!(
        "Feedback style: {} ({}). {}",
        profile.feedback_style, profile.description, basics
    )
}

pub fn code_review_prompt(code: &str, level: StudentLevel) -> String {
    format!(
        r#"You are an expert programming tutor. Review the following student code and provide educational feedback.

Student Code:
{code}

Student Level: {level}

Please provide:
1. Syntax errors (if any)
2. Logic errors (if any)
3. Style improvements
4. Optimization suggestions
5. Educational explanations

Feedback:"#
    )
}

pub fn educational_feedback_prompt(code: &str, level: StudentLevel) -> String {
    format!(
        r#"You are a helpful programming tutor. The student has written this code:

{code}

Student Level: {level}

Provide constructive, educational feedback that helps the student learn. Focus on:
- What they did well
- What can be improved
- Why the improvement matters
- How to implement the improvement

Feedback:"#
    )
}

pub fn comprehensive_analysis_prompt(code: &str, level: StudentLevel) -> String {
    let guidance = level_guidance(level);
    format!(
        r#"You are an expert programming tutor. Provide comprehensive educational feedback for the following student code.

Student Code:
{code}

Student Level: {level}
{guidance}

Please provide a detailed analysis in the following JSON format:

{{
    "strengths": ["strength1", "strength2", "strength3"],
    "weaknesses": ["weakness1", "weakness2", "weakness3"],
    "issues": ["issue1", "issue2", "issue3"],
    "step_by_step_improvement": [
        "Step 1: Description of first improvement",
        "Step 2: Description of second improvement",
        "Step 3: Description of third improvement"
    ],
    "learning_points": [
        "Learning point 1: What the student should understand",
        "Learning point 2: Key concept to grasp",
        "Learning point 3: Best practice to follow"
    ],
    "review_summary": "A comprehensive review of the code highlighting key areas for improvement",
    "learning_objectives": ["objective1", "objective2", "objective3"],
    "estimated_time_to_improve": "5-10 minutes"
}}

Focus on educational value and constructive feedback that helps the student learn and improve."#
    )
}

pub fn comprehension_question_prompt(
    learning_points: &[String],
    issues: &[String],
    level: StudentLevel,
) -> String {
    let learning_points = learning_points.join(", ");
    let issues = issues.join(", ");
    format!(
        r#"Based on the learning points and improvements discussed, generate a comprehension question to test the student's understanding.

Learning Points: {learning_points}
Code Issues: {issues}
Student Level: {level}

Generate a question that tests understanding of the key concepts discussed. The question should be appropriate for the student's level.

Format your response as JSON:
{{
    "question": "Your comprehension question here",
    "answer": "The correct answer",
    "explanation": "Detailed explanation of why this answer is correct"
}}

Make the question challenging but fair for the student's level."#
    )
}

pub fn code_fix_prompt(
    code: &str,
    issues: &[String],
    learning_points: &[String],
    level: StudentLevel,
) -> String {
    let issues = issues.join(", ");
    let learning_points = learning_points.join(", ");
    format!(
        r#"You are an expert programming tutor. Based on the analysis and learning points, provide an improved version of the student's code.

Original Code:
{code}

Issues Identified: {issues}
Learning Points: {learning_points}
Student Level: {level}

Provide an improved version of the code that addresses the issues while maintaining educational value. Include comments to explain the improvements.

Format your response as JSON:
{{
    "improved_code": "The improved code with comments",
    "fix_explanation": "Detailed explanation of what was changed and why"
}}

Focus on educational improvements that help the student understand better practices."#
    )
}

pub fn assessment_prompt(submission: &CodeSubmission) -> String {
    let language = submission.language.as_str();
    let code = &submission.code;
    let context = submission
        .assignment_context
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("General code review");
    let level = submission.student_level;
    let focus = submission.feedback_type.as_str();
    format!(
        r#"You are an expert programming instructor providing constructive feedback on student code.

**Student Code ({language}):**
```{language}
{code}
```

**Assignment Context:** {context}
**Student Level:** {level}
**Feedback Focus:** {focus}

Please provide comprehensive feedback in the following JSON format:
{{
    "overall_score": <score from 0-100>,
    "feedback_categories": {{
        "correctness": "<feedback on code correctness>",
        "style": "<feedback on code style and formatting>",
        "efficiency": "<feedback on algorithm efficiency>",
        "best_practices": "<feedback on programming best practices>",
        "debugging": "<debugging suggestions if applicable>"
    }},
    "specific_suggestions": [
        {{
            "line_number": <line number or null>,
            "issue_type": "<type of issue>",
            "description": "<description of issue>",
            "suggestion": "<suggested improvement>",
            "severity": "<low/medium/high>"
        }}
    ],
    "corrected_code": "<improved version of code if applicable>",
    "summary": "<brief summary of key points>",
    "strengths": ["<strength1>", "<strength2>"],
    "areas_for_improvement": ["<area1>", "<area2>"]
}}

Focus on being constructive, educational, and encouraging. Provide specific, actionable feedback."#
    )
}

/// Prompt half of a supervised training pair.
pub fn training_prompt(
    language: &str,
    code: &str,
    context: &str,
    level: StudentLevel,
    focus: &str,
) -> String {
    format!(
        r#"You are an expert programming instructor providing constructive feedback on student code.

**Student Code ({language}):**
```{language}
{code}
```

**Assignment Context:** {context}
**Student Level:** {level}
**Feedback Focus:** {focus}

Please provide comprehensive feedback in JSON format with the following structure:
- overall_score: score from 0-100
- feedback_categories: correctness, style, efficiency, best_practices, debugging
- specific_suggestions: array of specific improvement suggestions
- summary: brief summary of key points
- strengths: array of code strengths
- areas_for_improvement: array of improvement areas

Focus on being constructive, educational, and encouraging."#
    )
}
