use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON value per line; blank lines are skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut items = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), idx + 1))?;
        items.push(item);
    }
    debug!("Read {} records from {}", items.len(), path.display());
    Ok(items)
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<usize> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(items.len())
}

/// Raw lines, newline-terminated, blank lines dropped.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("{}\n", l))
        .collect())
}

pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    fs::write(path, lines.concat())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Expand glob patterns; plain paths pass through. Each pattern must match.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("Failed to expand {}", pattern))?;
        if matches.is_empty() {
            bail!("No input files match: {}", pattern);
        }
        paths.extend(matches);
    }
    Ok(paths)
}

/// Concatenate files line by line; returns the number of lines written.
pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    let mut lines = Vec::new();
    for input in inputs {
        lines.extend(read_lines(input)?);
    }
    write_lines(output, &lines)?;
    Ok(lines.len())
}
