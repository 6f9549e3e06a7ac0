use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::dataset::{self, io, ChatExample, FeedbackRecord, SourceKind, DEFAULT_TRAIN_RATIO};
use crate::detector::Language;

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Keep chat examples that mention a target language
    Filter {
        input: PathBuf,
        output: PathBuf,
        /// Comma-separated target languages, in priority order
        #[arg(long, value_delimiter = ',', default_value = "python,ruby,java")]
        languages: Vec<String>,
        /// Write normalized feedback records instead of tagged chats
        #[arg(long)]
        standardize: bool,
    },
    /// Normalize code-review rows into feedback records
    StandardizeReview { input: PathBuf, output: PathBuf },
    /// Concatenate JSONL files (globs allowed)
    Merge {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Shuffle and split into train/validation files
    Split {
        input: PathBuf,
        #[arg(long, default_value = "train.jsonl")]
        train: PathBuf,
        #[arg(long, default_value = "val.jsonl")]
        val: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TRAIN_RATIO)]
        ratio: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Turn feedback records into prompt/response training pairs
    Pairs {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "codetutor")]
        source: String,
        /// feedback, instruction, problem or contest
        #[arg(long, default_value = "feedback")]
        kind: String,
    },
}

pub fn run(command: DatasetCommand) -> Result<()> {
    match command {
        DatasetCommand::Filter {
            input,
            output,
            languages,
            standardize,
        } => filter(&input, &output, &languages, standardize),
        DatasetCommand::StandardizeReview { input, output } => standardize_review(&input, &output),
        DatasetCommand::Merge { inputs, output } => {
            let paths = io::expand_inputs(&inputs)?;
            let count = io::merge(&paths, &output)?;
            info!("Merged {} file(s), {} lines -> {}", paths.len(), count, output.display());
            Ok(())
        }
        DatasetCommand::Split {
            input,
            train,
            val,
            ratio,
            seed,
        } => {
            let lines = io::read_lines(&input)?;
            let (train_lines, val_lines) = dataset::split(lines, ratio, seed)?;
            io::write_lines(&train, &train_lines)?;
            io::write_lines(&val, &val_lines)?;
            info!(
                "Split {} lines: {} train, {} validation",
                train_lines.len() + val_lines.len(),
                train_lines.len(),
                val_lines.len()
            );
            Ok(())
        }
        DatasetCommand::Pairs {
            input,
            output,
            source,
            kind,
        } => {
            let kind = SourceKind::from_str(&kind)?;
            let records: Vec<FeedbackRecord> = io::read_jsonl(&input)?;
            let pairs = records
                .iter()
                .map(|r| dataset::to_training_pair(r, kind, &source))
                .collect::<Result<Vec<_>>>()?;
            let written = io::write_jsonl(&output, &pairs)?;
            info!("Wrote {} {} training pairs to {}", written, kind, output.display());
            Ok(())
        }
    }
}

fn filter(input: &Path, output: &Path, languages: &[String], standardize: bool) -> Result<()> {
    let targets = languages
        .iter()
        .map(|l| Language::from_str(l))
        .collect::<Result<Vec<_>>>()?;
    if targets.is_empty() {
        bail!("At least one target language is required");
    }

    let examples: Vec<ChatExample> = io::read_jsonl(input)?;
    let total = examples.len();
    let tagged = dataset::filter_by_language(examples, &targets);

    let written = if standardize {
        let records: Vec<_> = tagged.iter().filter_map(dataset::standardize_chat).collect();
        io::write_jsonl(output, &records)?
    } else {
        io::write_jsonl(output, &tagged)?
    };
    info!("Kept {} of {} examples -> {}", written, total, output.display());
    Ok(())
}

fn standardize_review(input: &Path, output: &Path) -> Result<()> {
    let rows: Vec<Value> = io::read_jsonl(input)?;
    let records: Vec<_> = rows.iter().map(dataset::standardize_review_row).collect();
    let written = io::write_jsonl(output, &records)?;
    info!("Standardized {} rows -> {}", written, output.display());
    Ok(())
}
