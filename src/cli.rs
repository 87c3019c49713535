use crate::env::evaluator::{CompilerEnv, EvalLimits};
use crate::profile::registry::ProfileRegistry;
use crate::toolchain;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one source submission and print the episode result as JSON
    Evaluate {
        /// Language tag (c, cpp, java, go, php, cs, cuda, systemverilog)
        #[arg(long)]
        language: String,
        /// Source code as a string
        #[arg(long, conflicts_with = "file")]
        code: Option<String>,
        /// Read source code from a file instead
        #[arg(long)]
        file: Option<PathBuf>,
        /// Compile phase wall-clock timeout in seconds (0 disables)
        #[arg(long, default_value_t = 30)]
        compile_timeout: u64,
        /// Run phase wall-clock timeout in seconds (0 disables)
        #[arg(long, default_value_t = 10)]
        run_timeout: u64,
    },
    /// List registered language profiles and their strictness ladders
    Languages,
    /// Check which language toolchains are installed
    CheckDeps {
        /// Verbose output showing resolved commands and versions
        #[arg(long)]
        verbose: bool,
    },
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let registry = ProfileRegistry::builtin();

    match cli.command {
        Commands::Evaluate {
            language,
            code,
            file,
            compile_timeout,
            run_timeout,
        } => {
            let source = match (code, file) {
                (Some(code), None) => code,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?,
                _ => return Err(anyhow!("provide exactly one of --code or --file")),
            };

            let env = CompilerEnv::for_language(&language, &registry)?.with_limits(EvalLimits {
                compile_timeout: seconds(compile_timeout),
                run_timeout: seconds(run_timeout),
            });

            let result = env.step(&source)?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.succeeded() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Languages => {
            for tag in registry.languages() {
                let profile = registry.get(tag)?;
                let ladder: Vec<String> = profile
                    .tiers
                    .iter()
                    .map(|tier| {
                        let flags = if tier.flags.is_empty() {
                            "(none)".to_string()
                        } else {
                            tier.flags.join(" ")
                        };
                        format!("{flags} => {}", tier.reward_on_failure)
                    })
                    .collect();
                println!("{tag}: {}", ladder.join(" | "));
            }
            Ok(())
        }
        Commands::CheckDeps { verbose } => {
            let statuses = toolchain::check_all(registry.languages());
            let mut missing = Vec::new();

            for status in &statuses {
                match &status.resolved {
                    Some(resolved) => {
                        if verbose {
                            println!(
                                "{} - OK ({} {})",
                                status.language,
                                resolved.command,
                                resolved.version.as_deref().unwrap_or("unknown version")
                            );
                        } else {
                            println!("{} - OK", status.language);
                        }
                    }
                    None => {
                        println!("{} - MISSING", status.language);
                        if verbose {
                            if let Some(advice) = &status.advice {
                                println!("  {advice}");
                            }
                        }
                        missing.push(status.language.clone());
                    }
                }
            }

            if missing.is_empty() {
                println!("all language toolchains are installed");
                Ok(())
            } else {
                println!("missing toolchains: {}", missing.join(", "));
                std::process::exit(1);
            }
        }
    }
}
