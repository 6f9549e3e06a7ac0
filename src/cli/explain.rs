use anyhow::Result;
use std::str::FromStr;

use crate::feedback::rules;
use crate::level::StudentLevel;

pub fn run(concept: &str, level: &str) -> Result<()> {
    let level = StudentLevel::from_str(level)?;
    println!("{}", rules::explain_concept(concept, level));
    Ok(())
}
