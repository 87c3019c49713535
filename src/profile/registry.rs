use crate::config::types::{EnvError, Result};
use crate::profile::presets;
use crate::profile::types::LanguageProfile;
use std::collections::HashMap;

/// Explicit mapping from language tag to profile.
///
/// Constructed once and handed to evaluators; there is no process-wide
/// singleton, so tests can substitute fake profiles freely.
pub struct ProfileRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

/// Collapse common aliases onto the canonical language tags.
pub fn normalize_language(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "c++" | "cxx" | "cc" => "cpp".to_string(),
        "c#" | "csharp" => "cs".to_string(),
        "sv" | "verilog" => "systemverilog".to_string(),
        "golang" => "go".to_string(),
        other => other.to_string(),
    }
}

impl ProfileRegistry {
    /// Empty registry for callers assembling their own table.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Registry pre-populated with the builtin language table.
    ///
    /// Profiles carry their default toolchain token; binding the resolved
    /// command for this host happens at evaluator construction.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(presets::c_profile("gcc"));
        registry.register(presets::cpp_profile("g++"));
        registry.register(presets::java_profile("javac"));
        registry.register(presets::go_profile("go"));
        registry.register(presets::php_profile("php"));
        registry.register(presets::cs_profile("mcs"));
        registry.register(presets::cuda_profile("nvcc"));
        registry.register(presets::systemverilog_profile("iverilog"));
        registry
    }

    /// Insert or replace a profile, keyed by its language tag.
    pub fn register(&mut self, profile: LanguageProfile) {
        self.profiles.insert(profile.language.clone(), profile);
    }

    /// Look up a profile by tag or alias.
    pub fn get(&self, language: &str) -> Result<&LanguageProfile> {
        let tag = normalize_language(language);
        self.profiles.get(&tag).ok_or_else(|| {
            EnvError::Config(format!("unsupported language profile: {language}"))
        })
    }

    /// Canonical tags currently registered, sorted for stable output.
    pub fn languages(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
