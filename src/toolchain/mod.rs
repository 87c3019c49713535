//! Toolchain resolution.
//!
//! Maps a language tag to a concrete command token by probing candidate
//! binaries in preference order (gcc before clang, mcs before csc), parsing
//! a version out of their banner, and emitting install guidance when nothing
//! satisfies the tag. The evaluator only ever consumes the resolved token.

use crate::config::types::{EnvError, Result};
use crate::profile::registry::normalize_language;
use regex::Regex;
use std::process::{Command, Stdio};

/// One probe target: binary name, banner invocation, version pattern.
#[derive(Clone, Copy, Debug)]
pub struct ToolchainCandidate {
    pub command: &'static str,
    pub version_args: &'static [&'static str],
    pub version_pattern: &'static str,
}

const SEMVER: &str = r"\d+\.\d+\.\d+";

const C_CANDIDATES: &[ToolchainCandidate] = &[
    ToolchainCandidate {
        command: "gcc",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
    ToolchainCandidate {
        command: "clang",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
];

const CPP_CANDIDATES: &[ToolchainCandidate] = &[
    ToolchainCandidate {
        command: "g++",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
    ToolchainCandidate {
        command: "clang++",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
];

const JAVA_CANDIDATES: &[ToolchainCandidate] = &[ToolchainCandidate {
    command: "javac",
    version_args: &["--version"],
    version_pattern: SEMVER,
}];

const GO_CANDIDATES: &[ToolchainCandidate] = &[ToolchainCandidate {
    command: "go",
    version_args: &["version"],
    version_pattern: r"go(\d+\.\d+(?:\.\d+)?)",
}];

const PHP_CANDIDATES: &[ToolchainCandidate] = &[ToolchainCandidate {
    command: "php",
    version_args: &["--version"],
    version_pattern: SEMVER,
}];

const CS_CANDIDATES: &[ToolchainCandidate] = &[
    ToolchainCandidate {
        command: "mcs",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
    ToolchainCandidate {
        command: "csc",
        version_args: &["--version"],
        version_pattern: SEMVER,
    },
];

const CUDA_CANDIDATES: &[ToolchainCandidate] = &[ToolchainCandidate {
    command: "nvcc",
    version_args: &["--version"],
    version_pattern: r"release (\d+\.\d+)",
}];

const SYSTEMVERILOG_CANDIDATES: &[ToolchainCandidate] = &[ToolchainCandidate {
    command: "iverilog",
    version_args: &["-V"],
    version_pattern: SEMVER,
}];

/// Candidate table for a canonical language tag.
pub fn candidates_for(language: &str) -> Option<&'static [ToolchainCandidate]> {
    match normalize_language(language).as_str() {
        "c" => Some(C_CANDIDATES),
        "cpp" => Some(CPP_CANDIDATES),
        "java" => Some(JAVA_CANDIDATES),
        "go" => Some(GO_CANDIDATES),
        "php" => Some(PHP_CANDIDATES),
        "cs" => Some(CS_CANDIDATES),
        "cuda" => Some(CUDA_CANDIDATES),
        "systemverilog" => Some(SYSTEMVERILOG_CANDIDATES),
        _ => None,
    }
}

/// Human-readable install guidance for a missing toolchain.
pub fn install_advice(language: &str) -> String {
    let tag = normalize_language(language);
    let (linux, macos) = match tag.as_str() {
        "c" => ("sudo apt install gcc", "brew install gcc"),
        "cpp" => ("sudo apt install g++", "brew install gcc"),
        "java" => ("sudo apt install default-jdk", "brew install openjdk"),
        "go" => ("sudo apt install golang", "brew install go"),
        "php" => ("sudo apt install php", "brew install php"),
        "cs" => ("sudo apt install mono-complete", "brew install mono"),
        "cuda" => (
            "install the CUDA Toolkit from NVIDIA's website",
            "install the CUDA Toolkit from NVIDIA's website",
        ),
        "systemverilog" => ("sudo apt install iverilog", "brew install icarus-verilog"),
        _ => return format!("no known toolchain for language '{tag}'"),
    };
    match std::env::consts::OS {
        "linux" => format!("no {tag} toolchain found; install one (e.g. '{linux}')"),
        "macos" => format!("no {tag} toolchain found; install one (e.g. '{macos}')"),
        other => format!("no {tag} toolchain found on '{other}'; install one manually"),
    }
}

/// Outcome of a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedToolchain {
    pub command: String,
    pub version: Option<String>,
}

/// Probe one candidate: present if its banner invocation spawns at all.
pub fn probe(candidate: &ToolchainCandidate) -> Option<ResolvedToolchain> {
    let output = Command::new(candidate.command)
        .args(candidate.version_args)
        .stdin(Stdio::null())
        .output()
        .ok()?;

    let banner = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let version = Regex::new(candidate.version_pattern)
        .ok()
        .and_then(|re| re.captures(&banner))
        .map(|caps| match caps.get(1) {
            Some(group) => group.as_str().to_string(),
            None => caps[0].to_string(),
        });

    Some(ResolvedToolchain {
        command: candidate.command.to_string(),
        version,
    })
}

/// First present candidate from a table, in declared preference order.
pub fn resolve_from(candidates: &[ToolchainCandidate]) -> Option<ResolvedToolchain> {
    candidates.iter().find_map(probe)
}

/// Resolve a language tag to a concrete command token.
pub fn resolve(language: &str) -> Result<ResolvedToolchain> {
    let candidates = candidates_for(language).ok_or_else(|| {
        EnvError::Toolchain(format!("no toolchain candidates for language '{language}'"))
    })?;

    match resolve_from(candidates) {
        Some(resolved) => {
            log::info!(
                "resolved {} toolchain: {} ({})",
                normalize_language(language),
                resolved.command,
                resolved.version.as_deref().unwrap_or("unknown version")
            );
            Ok(resolved)
        }
        None => Err(EnvError::Toolchain(install_advice(language))),
    }
}

/// Per-language presence report for the `check-deps` command.
#[derive(Clone, Debug)]
pub struct ToolchainStatus {
    pub language: String,
    pub resolved: Option<ResolvedToolchain>,
    pub advice: Option<String>,
}

/// Probe every language in the given list.
pub fn check_all<'a>(languages: impl IntoIterator<Item = &'a str>) -> Vec<ToolchainStatus> {
    languages
        .into_iter()
        .map(|language| {
            let resolved = candidates_for(language).and_then(resolve_from);
            let advice = match resolved {
                Some(_) => None,
                None => Some(install_advice(language)),
            };
            ToolchainStatus {
                language: normalize_language(language),
                resolved,
                advice,
            }
        })
        .collect()
}
