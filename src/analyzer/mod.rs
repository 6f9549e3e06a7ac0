//! Static checks run next to the model so every assessment carries a few
//! deterministic findings and a score adjustment.

pub(crate) mod python;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::detector::Language;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low, // Cosmetic
    Medium, // Should fix
    High,   // Code will not run
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => bail!("Unknown severity: {} (expected low, medium or high)", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIssue {
    /// 1-based
    pub line_number: Option<usize>,
    pub description: String,
    pub suggestion: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub issues: Vec<StaticIssue>,
    pub score_adjustment: i32,
    pub language: Language,
}

impl AnalysisReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

pub struct StaticAnalyzer;

impl Default for StaticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, code: &str, language: Language) -> AnalysisReport {
        let (issues, score_adjustment) = match language {
            Language::Python => analyze_python(code),
            Language::Java => {
                let issues = analyze_java(code);
                let adjustment = -3 * issues.len() as i32;
                (issues, adjustment)
            }
            Language::JavaScript => {
                let issues = analyze_javascript(code);
                let adjustment = -2 * issues.len() as i32;
                (issues, adjustment)
            }
            Language::Ruby => (Vec::new(), 0),
        };

        AnalysisReport {
            issues,
            score_adjustment,
            language,
        }
    }

    pub fn print_issues(&self, report: &AnalysisReport) {
        if report.issues.is_empty() {
            println!("✅ No issues found in {} code!", report.language);
            return;
        }

        println!("\n📋 Static Analysis Results ({}):\n", report.language);

        for (severity, label) in [
            (Severity::High, "❌ High"),
            (Severity::Medium, "⚠️  Medium"),
            (Severity::Low, "ℹ️  Low"),
        ] {
            let matching: Vec<_> = report
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .collect();
            if matching.is_empty() {
                continue;
            }
            println!("{} ({}):", label, matching.len());
            for issue in matching {
                match issue.line_number {
                    Some(line) => println!("   • [line {}] {}", line, issue.description),
                    None => println!("   • {}", issue.description),
                }
                println!("     💡 {}", issue.suggestion);
            }
            println!();
        }

        println!(
            "Summary: {} high, {} medium, {} low (score adjustment {})",
            report.count(Severity::High),
            report.count(Severity::Medium),
            report.count(Severity::Low),
            report.score_adjustment
        );
    }
}

fn analyze_python(code: &str) -> (Vec<StaticIssue>, i32) {
    let mut issues = python::check_syntax(code);
    let syntax_ok = issues.is_empty();
    issues.extend(python::check_style(code));
    // Block structure is unreliable once the syntax check fails
    if syntax_ok {
        issues.extend(python::check_complexity(code));
    }

    let adjustment = issues
        .iter()
        .map(|i| match i.severity {
            Severity::High => -10,
            Severity::Medium => -5,
            Severity::Low => -2,
        })
        .sum();
    (issues, adjustment)
}

const JAVA_LINE_ENDINGS: [&str; 6] = [";", "{", "}", "//", "/*", "*/"];
const JAVA_STATEMENT_HINTS: [&str; 4] = ["int ", "String ", "return ", "System.out"];

fn analyze_java(code: &str) -> Vec<StaticIssue> {
    code.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !JAVA_LINE_ENDINGS.iter().any(|end| trimmed.ends_with(end))
                && JAVA_STATEMENT_HINTS.iter().any(|hint| line.contains(hint))
        })
        .map(|(idx, _)| StaticIssue {
            line_number: Some(idx + 1),
            description: "Possible missing semicolon".to_string(),
            suggestion: "Ensure statements end with semicolons".to_string(),
            severity: Severity::Medium,
        })
        .collect()
}

fn analyze_javascript(code: &str) -> Vec<StaticIssue> {
    let mut issues = Vec::new();
    for (idx, line) in code.lines().enumerate() {
        if line.contains("var ") {
            issues.push(StaticIssue {
                line_number: Some(idx + 1),
                description: "Use of 'var' keyword".to_string(),
                suggestion: "Consider using 'let' or 'const' instead of 'var'".to_string(),
                severity: Severity::Low,
            });
        }
        if line.contains("==") && !line.contains("===") {
            issues.push(StaticIssue {
                line_number: Some(idx + 1),
                description: "Use of loose equality (==)".to_string(),
                suggestion: "Consider using strict equality (===)".to_string(),
                severity: Severity::Medium,
            });
        }
    }
    issues
}
