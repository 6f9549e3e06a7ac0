use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use codetutor::cli;
use codetutor::cli::dataset::DatasetCommand;
use codetutor::cli::OutputFormat;

#[derive(Parser)]
#[command(name = "codetutor", version)]
#[command(about = "Educational feedback on student code", long_about = None)]
struct Cli {
    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analysis, comprehension question and improved code for one file
    Feedback {
        /// Source file, or "-" for stdin
        path: String,

        /// Student level: beginner, intermediate, advanced (default: from config)
        #[arg(long)]
        level: Option<String>,

        /// Canned feedback without calling a model
        #[arg(long)]
        demo: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,

        /// Path to config file (defaults to ./codetutor.toml or ~/.config/codetutor/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Override model (e.g., "codellama:7b")
        #[arg(long)]
        model: Option<String>,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },

    /// Code review and educational guidance, with rule-based fallback
    Review {
        /// Source file, or "-" for stdin
        path: String,

        #[arg(long)]
        level: Option<String>,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Scored assessment as JSON
    Assess {
        /// Source file, or "-" for stdin
        path: String,

        /// python, java, javascript, ruby. Auto-detected if not specified.
        #[arg(long)]
        language: Option<String>,

        /// Assignment description given to the model
        #[arg(long)]
        context: Option<String>,

        /// general, debugging, style, algorithm, best_practices
        #[arg(long, default_value = "general")]
        feedback_type: String,

        #[arg(long)]
        level: Option<String>,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Static analysis only; fails on high-severity issues
    Analyze {
        /// Source file, or "-" for stdin
        path: String,

        /// Auto-detected if not specified
        #[arg(long)]
        language: Option<String>,
    },

    /// Explain a programming concept at a given level
    Explain {
        concept: String,

        #[arg(long, default_value = "beginner")]
        level: String,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Serve canned feedback without calling a model
        #[arg(long)]
        demo: bool,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Prepare fine-tuning corpora
    Dataset {
        #[command(subcommand)]
        command: DatasetCommand,
    },

    /// Check configuration, API key and model reachability
    Doctor {
        #[arg(long)]
        config: Option<String>,
    },

    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Feedback {
            path,
            level,
            demo,
            format,
            config,
            model,
            dry_run,
        } => {
            cli::feedback::run(path, level, demo, format, config, model, dry_run).await?;
        }
        Commands::Review {
            path,
            level,
            config,
            model,
            dry_run,
        } => {
            cli::review::run(path, level, config, model, dry_run).await?;
        }
        Commands::Assess {
            path,
            language,
            context,
            feedback_type,
            level,
            config,
            model,
            dry_run,
        } => {
            cli::assess::run(
                path,
                language,
                context,
                feedback_type,
                level,
                config,
                model,
                dry_run,
            )
            .await?;
        }
        Commands::Analyze { path, language } => {
            cli::analyze::run(&path, language.as_deref())?;
        }
        Commands::Explain { concept, level } => {
            cli::explain::run(&concept, &level)?;
        }
        Commands::Serve {
            host,
            port,
            demo,
            config,
            model,
            dry_run,
        } => {
            cli::serve::run(host, port, demo, config, model, dry_run).await?;
        }
        Commands::Dataset { command } => {
            cli::dataset::run(command)?;
        }
        Commands::Doctor { config } => {
            cli::doctor::run(config).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "codetutor", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_feedback_defaults() {
        let cli = Cli::try_parse_from(["codetutor", "feedback", "main.py"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Feedback {
                path,
                level,
                demo,
                format,
                dry_run,
                ..
            } => {
                assert_eq!(path, "main.py");
                assert!(level.is_none());
                assert!(!demo);
                assert_eq!(format, OutputFormat::Markdown);
                assert!(!dry_run);
            }
            _ => panic!("expected feedback"),
        }
    }

    #[test]
    fn test_parse_feedback_with_all_args() {
        let cli = Cli::try_parse_from([
            "codetutor",
            "feedback",
            "-",
            "--level",
            "advanced",
            "--demo",
            "--format",
            "json",
            "--config",
            "/tmp/codetutor.toml",
            "--model",
            "tutor:latest",
            "--dry-run",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Feedback {
                path,
                level,
                demo,
                format,
                config,
                model,
                dry_run,
            } => {
                assert_eq!(path, "-");
                assert_eq!(level.as_deref(), Some("advanced"));
                assert!(demo);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(config.as_deref(), Some("/tmp/codetutor.toml"));
                assert_eq!(model.as_deref(), Some("tutor:latest"));
                assert!(dry_run);
            }
            _ => panic!("expected feedback"),
        }
    }

    #[test]
    fn test_parse_feedback_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["codetutor", "feedback", "a.py", "--format", "html"]).is_err());
    }

    #[test]
    fn test_parse_assess() {
        let cli = Cli::try_parse_from([
            "codetutor",
            "assess",
            "Main.java",
            "--language",
            "java",
            "--context",
            "Sum two numbers",
            "--feedback-type",
            "best-practices",
        ])
        .unwrap();
        match cli.command {
            Commands::Assess {
                language,
                context,
                feedback_type,
                ..
            } => {
                assert_eq!(language.as_deref(), Some("java"));
                assert_eq!(context.as_deref(), Some("Sum two numbers"));
                assert_eq!(feedback_type, "best-practices");
            }
            _ => panic!("expected assess"),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["codetutor", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
        assert!(Cli::try_parse_from(["codetutor", "serve", "--port", "99999"]).is_err());
    }

    #[test]
    fn test_parse_dataset_split() {
        let cli = Cli::try_parse_from(["codetutor", "dataset", "split", "all.jsonl", "--seed", "42"])
            .unwrap();
        match cli.command {
            Commands::Dataset {
                command:
                    DatasetCommand::Split {
                        input,
                        train,
                        val,
                        ratio,
                        seed,
                    },
            } => {
                assert_eq!(input.to_str(), Some("all.jsonl"));
                assert_eq!(train.to_str(), Some("train.jsonl"));
                assert_eq!(val.to_str(), Some("val.jsonl"));
                assert_eq!(ratio, 0.9);
                assert_eq!(seed, Some(42));
            }
            _ => panic!("expected dataset split"),
        }
    }

    #[test]
    fn test_parse_dataset_filter_languages() {
        let cli = Cli::try_parse_from([
            "codetutor",
            "dataset",
            "filter",
            "in.jsonl",
            "out.jsonl",
            "--languages",
            "java,ruby",
        ])
        .unwrap();
        match cli.command {
            Commands::Dataset {
                command: DatasetCommand::Filter { languages, .. },
            } => assert_eq!(languages, vec!["java", "ruby"]),
            _ => panic!("expected dataset filter"),
        }
    }

    #[test]
    fn test_parse_dataset_merge_requires_inputs() {
        assert!(Cli::try_parse_from(["codetutor", "dataset", "merge", "-o", "out.jsonl"]).is_err());
    }

    #[test]
    fn test_parse_explain_default_level() {
        let cli = Cli::try_parse_from(["codetutor", "explain", "loops"]).unwrap();
        match cli.command {
            Commands::Explain { concept, level } => {
                assert_eq!(concept, "loops");
                assert_eq!(level, "beginner");
            }
            _ => panic!("expected explain"),
        }
    }

    #[test]
    fn test_parse_completions() {
        assert!(Cli::try_parse_from(["codetutor", "completions", "bash"]).is_ok());
        assert!(Cli::try_parse_from(["codetutor", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["codetutor"]).is_err());
    }
}
