//! Builtin language profiles.
//!
//! Each builder takes the resolved toolchain command so the table stays
//! independent of which concrete binary (gcc vs clang, mcs vs csc) satisfied
//! the language tag on this host.

use crate::profile::types::{LanguageProfile, StrictnessTier};

const NO_FLAGS: [&str; 0] = [];

/// C: four-rung warning escalation, compiled binary executed directly.
pub fn c_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "c".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![
            StrictnessTier::new(NO_FLAGS, -4),
            StrictnessTier::new(["-Werror"], -3),
            StrictnessTier::new(["-Werror", "-Wall"], -2),
            StrictnessTier::new(["-Werror", "-Wall", "-Wextra"], -1),
        ],
        pre_flags: vec![],
        post_flags: vec![],
        source_filename: "solution.c".to_string(),
        io_flag: Some("-o".to_string()),
        artifact_filename: Some("solution".to_string()),
        post_artifact_flags: vec![],
        run_template: vec!["./{artifact}".to_string()],
        execute_after_compile: true,
    }
}

/// C++: same ladder as C, g++/clang++ front end.
pub fn cpp_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "cpp".to_string(),
        source_filename: "solution.cpp".to_string(),
        ..c_profile(toolchain)
    }
}

/// Java: javac has no -Werror-only rung; lint-all is the strict tier.
/// Compilation drops Main.class into the workspace, run by class name.
pub fn java_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "java".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![
            StrictnessTier::new(NO_FLAGS, -4),
            StrictnessTier::new(["-Xlint:all", "-Werror"], -3),
        ],
        pre_flags: vec![],
        post_flags: vec![],
        source_filename: "Main.java".to_string(),
        io_flag: None,
        artifact_filename: None,
        post_artifact_flags: vec![],
        run_template: vec!["java".to_string(), "Main".to_string()],
        execute_after_compile: true,
    }
}

/// Go: `go build` is the single tier; execution re-runs the source unit.
pub fn go_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "go".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![StrictnessTier::new(["build"], -1)],
        pre_flags: vec![],
        post_flags: vec![],
        source_filename: "solution.go".to_string(),
        io_flag: None,
        artifact_filename: None,
        post_artifact_flags: vec![],
        run_template: vec!["go".to_string(), "run".to_string(), "{source}".to_string()],
        execute_after_compile: true,
    }
}

/// PHP: single syntax-check tier (`php -l`), no execution stage.
pub fn php_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "php".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![StrictnessTier::new(NO_FLAGS, -1)],
        pre_flags: vec!["-l".to_string()],
        post_flags: vec![],
        source_filename: "solution.php".to_string(),
        io_flag: None,
        artifact_filename: None,
        post_artifact_flags: vec![],
        run_template: vec![],
        execute_after_compile: false,
    }
}

/// C#: Mono mcs (or csc) with the output path carried in the -out flag.
pub fn cs_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "cs".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![StrictnessTier::new(NO_FLAGS, -1)],
        pre_flags: vec![],
        post_flags: vec!["-out:solution.exe".to_string()],
        source_filename: "MainClass.cs".to_string(),
        io_flag: None,
        artifact_filename: None,
        post_artifact_flags: vec![],
        run_template: vec!["mono".to_string(), "solution.exe".to_string()],
        execute_after_compile: true,
    }
}

/// CUDA: nvcc, single permissive tier, binary executed directly.
pub fn cuda_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "cuda".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![StrictnessTier::new(NO_FLAGS, -4)],
        pre_flags: vec![],
        post_flags: vec![],
        source_filename: "solution.cu".to_string(),
        io_flag: Some("-o".to_string()),
        artifact_filename: Some("solution".to_string()),
        post_artifact_flags: vec![],
        run_template: vec!["./{artifact}".to_string()],
        execute_after_compile: true,
    }
}

/// SystemVerilog: Icarus Verilog elaboration, simulated with vvp.
pub fn systemverilog_profile(toolchain: &str) -> LanguageProfile {
    LanguageProfile {
        language: "systemverilog".to_string(),
        toolchain_command: toolchain.to_string(),
        tiers: vec![StrictnessTier::new(NO_FLAGS, -1)],
        pre_flags: vec![],
        post_flags: vec![],
        source_filename: "solution.sv".to_string(),
        io_flag: Some("-o".to_string()),
        artifact_filename: Some("solution.vvp".to_string()),
        post_artifact_flags: vec![],
        run_template: vec!["vvp".to_string(), "{artifact}".to_string()],
        execute_after_compile: true,
    }
}
