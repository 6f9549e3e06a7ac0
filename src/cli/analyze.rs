use anyhow::{bail, Result};
use std::str::FromStr;

use crate::analyzer::{Severity, StaticAnalyzer};
use crate::detector::{detect_language, Language};
use crate::util::read_source;

pub fn run(path: &str, language: Option<&str>) -> Result<()> {
    let code = read_source(path)?;
    let language = match language {
        Some(raw) => Language::from_str(raw)?,
        None => detect_language(&code),
    };

    let analyzer = StaticAnalyzer::new();
    let report = analyzer.analyze(&code, language);
    analyzer.print_issues(&report);

    let high = report.count(Severity::High);
    if high > 0 {
        bail!("{} high-severity issue(s) found", high);
    }

    Ok(())
}
