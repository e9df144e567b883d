use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::confidence::{ConfidenceLevel, SimilarityKey};
use crate::qa::FailurePolicy;

pub const CONFIG_FILE_ENV: &str = "ST_QA_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = ".st-qa.json";

/// Limits used by the hand-written rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub max_function_lines: usize,
    pub critical_function_lines: usize,
    pub max_nesting_depth: usize,
    pub max_complexity: usize,
    pub max_parameters: usize,
    pub max_name_length: usize,
    pub global_warning_count: usize,
    pub global_max_count: usize,
    pub lines_per_comment: usize,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            max_function_lines: 50,
            critical_function_lines: 100,
            max_nesting_depth: 3,
            max_complexity: 15,
            max_parameters: 5,
            max_name_length: 50,
            global_warning_count: 10,
            global_max_count: 20,
            lines_per_comment: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub failure_policy: FailurePolicy,
    pub continue_on_error: bool,
    pub parallel: bool,
    pub min_confidence: ConfidenceLevel,
    pub similarity: SimilarityKey,
    pub disabled_rules: Vec<String>,
    /// rule id -> severity name
    pub severity_overrides: BTreeMap<String, String>,
    pub ignore_globs: Option<GlobSet>,
    pub thresholds: RuleThresholds,
    /// Treat every local as needing an explicit initialisation before use.
    pub strict_initialization: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::SkipAndContinue,
            continue_on_error: true,
            parallel: true,
            min_confidence: ConfidenceLevel::Low,
            similarity: SimilarityKey::RuleAndCategory,
            disabled_rules: Vec::new(),
            severity_overrides: BTreeMap::new(),
            // None means: do not ignore anything
            ignore_globs: None,
            thresholds: RuleThresholds::default(),
            strict_initialization: false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_policy(value: &str) -> Option<FailurePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "skip" | "continue" => Some(FailurePolicy::SkipAndContinue),
        "abort" => Some(FailurePolicy::Abort),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_globs<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        match Glob::new(pat) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!(pattern = pat, error = %e, "ignoring invalid glob"),
        }
    }
    builder.build().ok()
}

/// Defaults, then `ST_QA_*` environment variables, then the JSON file.
pub fn load_config() -> Config {
    let mut cfg = Config::default();
    apply_env(&mut cfg);

    // Optional JSON config file: path from ST_QA_CONFIG_FILE or .st-qa.json in CWD
    let explicit = std::env::var(CONFIG_FILE_ENV).ok();
    let cfg_path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    if Path::new(&cfg_path).exists() {
        if let Err(e) = apply_json_file(&mut cfg, Path::new(&cfg_path)) {
            warn!(path = %cfg_path, error = %e, "config file not applied");
        }
    } else if explicit.is_some() {
        warn!(path = %cfg_path, "configured config file does not exist");
    }

    cfg
}

pub fn apply_env(cfg: &mut Config) {
    if let Some(policy) = std::env::var("ST_QA_FAILURE_POLICY").ok().as_deref().and_then(parse_policy) {
        cfg.failure_policy = policy;
    }
    if let Some(v) = std::env::var("ST_QA_CONTINUE_ON_ERROR").ok().as_deref().and_then(parse_bool) {
        cfg.continue_on_error = v;
    }
    if let Some(v) = std::env::var("ST_QA_PARALLEL").ok().as_deref().and_then(parse_bool) {
        cfg.parallel = v;
    }
    if let Some(level) = std::env::var("ST_QA_MIN_CONFIDENCE").ok().as_deref().and_then(ConfidenceLevel::parse) {
        cfg.min_confidence = level;
    }
    if let Ok(val) = std::env::var("ST_QA_DISABLED_RULES") {
        let list = split_list(&val);
        if !list.is_empty() {
            cfg.disabled_rules = list;
        }
    }
    if let Ok(val) = std::env::var("ST_QA_IGNORE_GLOBS") {
        let list = split_list(&val);
        if !list.is_empty() {
            cfg.ignore_globs = build_globs(list.iter().map(String::as_str));
        }
    }
}

/// Overlay the keys present in a JSON config file.
pub fn apply_json_file(cfg: &mut Config, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))?;

    if let Some(policy) = json.get("failure_policy").and_then(|v| v.as_str()).and_then(parse_policy) {
        cfg.failure_policy = policy;
    }
    if let Some(v) = json.get("continue_on_error").and_then(|v| v.as_bool()) {
        cfg.continue_on_error = v;
    }
    if let Some(v) = json.get("parallel").and_then(|v| v.as_bool()) {
        cfg.parallel = v;
    }
    if let Some(v) = json.get("strict_initialization").and_then(|v| v.as_bool()) {
        cfg.strict_initialization = v;
    }
    if let Some(level) = json.get("min_confidence").and_then(|v| v.as_str()).and_then(ConfidenceLevel::parse) {
        cfg.min_confidence = level;
    }
    if let Some(key) = json.get("similarity").and_then(|v| v.as_str()).and_then(SimilarityKey::parse) {
        cfg.similarity = key;
    }
    if let Some(list) = json.get("disabled_rules").and_then(|v| v.as_array()) {
        cfg.disabled_rules = list.iter().filter_map(|it| it.as_str()).map(str::to_string).collect();
    }
    if let Some(map) = json.get("severity_overrides").and_then(|v| v.as_object()) {
        for (rule, value) in map {
            if let Some(s) = value.as_str() {
                cfg.severity_overrides.insert(rule.clone(), s.to_string());
            }
        }
    }
    if let Some(globs) = json.get("ignore_globs").and_then(|v| v.as_array()) {
        cfg.ignore_globs = build_globs(globs.iter().filter_map(|it| it.as_str()));
    }
    if let Some(thresholds) = json.get("thresholds") {
        cfg.thresholds = serde_json::from_value(thresholds.clone())
            .with_context(|| format!("invalid thresholds in {}", path.display()))?;
    }
    Ok(())
}

pub fn should_ignore_path(cfg: &Config, path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let p = Path::new(path);
    cfg.ignore_globs
        .as_ref()
        .map(|set| set.is_match(p))
        .unwrap_or(false)
}
