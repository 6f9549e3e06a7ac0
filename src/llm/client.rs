use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check that the configured model can be reached before serving requests.
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        // Pick a canned reply based on which template produced the prompt
        if prompt.contains("Provide comprehensive educational feedback") {
            Ok(r#"{
    "strengths": ["The function has a single clear purpose", "The loop bounds avoid comparing an element with itself"],
    "weaknesses": ["The variable name x says nothing about its contents", "Duplicates are appended more than once"],
    "issues": ["Nested loops make the function O(n^2)", "Result can contain repeated values"],
    "step_by_step_improvement": [
        "Step 1: Rename x to duplicates",
        "Step 2: Track seen values in a set",
        "Step 3: Collect duplicates into a second set and return a list"
    ],
    "learning_points": [
        "Descriptive names make intent obvious",
        "Sets give constant-time membership checks",
        "Nested loops over the same list grow quadratically"
    ],
    "review_summary": "Working solution that can be made linear and clearer.",
    "learning_objectives": ["naming_conventions", "algorithms", "complexity"],
    "estimated_time_to_improve": "10-15 minutes"
}"#
            .to_string())
        } else if prompt.contains("generate a comprehension question") {
            Ok(r#"{
    "question": "Why is checking membership in a set faster than scanning a list?",
    "answer": "A set uses hashing, so a lookup takes constant time on average.",
    "explanation": "A list must be scanned element by element, which takes time proportional to its length."
}"#
            .to_string())
        } else if prompt.contains("provide an improved version of the student's code") {
            Ok(r#"{
    "improved_code": "def find_duplicates(numbers):\n    seen = set()\n    duplicates = set()\n    for number in numbers:\n        if number in seen:\n            duplicates.add(number)\n        seen.add(number)\n    return list(duplicates)",
    "fix_explanation": "A set of seen values replaces the inner loop, turning O(n^2) work into O(n)."
}"#
            .to_string())
        } else if prompt.contains("Please provide comprehensive feedback in the following JSON format") {
            Ok(r#"{
    "overall_score": 82,
    "feedback_categories": {
        "correctness": "The code produces the expected result for the sample input.",
        "style": "Names could be more descriptive.",
        "efficiency": "The nested loop is quadratic.",
        "best_practices": "Consider adding a docstring.",
        "debugging": null
    },
    "specific_suggestions": [
        {
            "line_number": 2,
            "issue_type": "style",
            "description": "Variable name x is not descriptive",
            "suggestion": "Rename x to duplicates",
            "severity": "low"
        }
    ],
    "corrected_code": null,
    "summary": "Correct but can be clearer and faster.",
    "strengths": ["Correct output"],
    "areas_for_improvement": ["Naming", "Complexity"]
}"#
            .to_string())
        } else if prompt.contains("Review the following student code") {
            Ok("1. No syntax errors found.\n2. The logic is correct.\n3. Use descriptive variable names.\n4. A set would avoid the nested loop.\n5. Sets offer constant-time membership tests.".to_string())
        } else if prompt.contains("helps the student learn") {
            Ok("You split the problem into a clear function, which is great. Next, try replacing the inner loop with a set so each value is checked only once.".to_string())
        } else {
            Ok("mock response".to_string())
        }
    }
}
