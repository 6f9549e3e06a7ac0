use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    Ruby,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::Java,
        Language::JavaScript,
        Language::Ruby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Ruby => "ruby",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "ruby" | "rb" => Ok(Language::Ruby),
            _ => bail!("Unknown language: {}", s),
        }
    }
}

const PYTHON_MARKERS: [&str; 4] = ["def ", "import ", "print(", "if __name__"];
const JAVA_MARKERS: [&str; 3] = ["public class", "public static void main", "System.out"];
const JAVASCRIPT_MARKERS: [&str; 4] = ["function ", "const ", "let ", "console.log"];

/// Guess the language of a code snippet from surface markers.
/// Python markers win over Java, Java over JavaScript; anything else is Python.
pub fn detect_language(code: &str) -> Language {
    if PYTHON_MARKERS.iter().any(|m| code.contains(m)) {
        return Language::Python;
    }
    if JAVA_MARKERS.iter().any(|m| code.contains(m)) {
        return Language::Java;
    }
    if JAVASCRIPT_MARKERS.iter().any(|m| code.contains(m)) {
        return Language::JavaScript;
    }
    Language::Python
}

/// First target language whose name is mentioned in `text` (case-insensitive).
pub fn detect_in_prompt(text: &str, targets: &[Language]) -> Option<Language> {
    let lowered = text.to_lowercase();
    targets
        .iter()
        .copied()
        .find(|lang| lowered.contains(lang.as_str()))
}
