use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Skill level of the student; selects prompt phrasing and fallback wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// How feedback is pitched for a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelProfile {
    pub description: &'static str,
    pub feedback_style: &'static str,
    pub include_basics: bool,
    pub complexity_threshold: &'static str,
}

impl StudentLevel {
    pub const ALL: [StudentLevel; 3] = [
        StudentLevel::Beginner,
        StudentLevel::Intermediate,
        StudentLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentLevel::Beginner => "beginner",
            StudentLevel::Intermediate => "intermediate",
            StudentLevel::Advanced => "advanced",
        }
    }

    pub fn profile(&self) -> LevelProfile {
        match self {
            StudentLevel::Beginner => LevelProfile {
                description: "Students new to programming",
                feedback_style: "explanatory",
                include_basics: true,
                complexity_threshold: "low",
            },
            StudentLevel::Intermediate => LevelProfile {
                description: "Students with basic programming knowledge",
                feedback_style: "balanced",
                include_basics: false,
                complexity_threshold: "medium",
            },
            StudentLevel::Advanced => LevelProfile {
                description: "Students with strong programming background",
                feedback_style: "technical",
                include_basics: false,
                complexity_threshold: "high",
            },
        }
    }
}

impl fmt::Display for StudentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(StudentLevel::Beginner),
            "intermediate" => Ok(StudentLevel::Intermediate),
            "advanced" => Ok(StudentLevel::Advanced),
            _ => bail!(
                "Unknown student level: {} (expected beginner, intermediate or advanced)",
                s
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(
            StudentLevel::from_str("Beginner").unwrap(),
            StudentLevel::Beginner
        );
        assert_eq!(
            StudentLevel::from_str(" advanced ").unwrap(),
            StudentLevel::Advanced
        );
        assert!(StudentLevel::from_str("expert").is_err());
    }

    #[test]
    fn test_default_is_beginner() {
        assert_eq!(StudentLevel::default(), StudentLevel::Beginner);
    }

    #[test]
    fn test_profiles() {
        assert!(StudentLevel::Beginner.profile().include_basics);
        assert_eq!(
            StudentLevel::Intermediate.profile().feedback_style,
            "balanced"
        );
        assert_eq!(
            StudentLevel::Advanced.profile().complexity_threshold,
            "high"
        );
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for level in StudentLevel::ALL {
            assert_eq!(StudentLevel::from_str(&level.to_string()).unwrap(), level);
        }
    }
}
