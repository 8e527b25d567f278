//! Gate configuration and build expansions.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{GateError, GateResult};
use crate::thresholds::DEFAULT_THRESHOLDS_FILE;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "benchgate.yaml";

/// Default Cedar output path.
pub const DEFAULT_CEDAR_REPORT_FILE: &str = "cedar_report.json";

/// Requester identity of merge-queue builds.
pub const MERGE_QUEUE_REQUESTER: &str = "github_merge_queue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Whether the suite is expected to evaluate at least one threshold.
    #[serde(default)]
    pub check_result: bool,
    #[serde(default = "default_thresholds_file")]
    pub thresholds_file: PathBuf,
    #[serde(default = "default_cedar_report_file")]
    pub cedar_report_file: PathBuf,
    /// Optional legacy combined report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perf_report_file: Option<PathBuf>,
    #[serde(default, rename = "override")]
    pub override_settings: OverrideSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSettings {
    /// GitHub logins allowed to approve a threshold override.
    #[serde(default)]
    pub approvers: Vec<String>,
}

fn default_thresholds_file() -> PathBuf {
    PathBuf::from(DEFAULT_THRESHOLDS_FILE)
}

fn default_cedar_report_file() -> PathBuf {
    PathBuf::from(DEFAULT_CEDAR_REPORT_FILE)
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            check_result: false,
            thresholds_file: default_thresholds_file(),
            cedar_report_file: default_cedar_report_file(),
            perf_report_file: None,
            override_settings: OverrideSettings::default(),
        }
    }
}

impl GateConfig {
    pub fn load(path: &Path) -> GateResult<Self> {
        let config_err = |message: String| GateError::Config {
            path: path.to_path_buf(),
            message,
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| config_err(format!("failed to read config: {}", e)))?;
        // An empty file is a valid "all defaults" config.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|e| config_err(format!("failed to parse YAML: {}", e)))
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> GateResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_check_result(mut self, check_result: bool) -> Self {
        self.check_result = check_result;
        self
    }

    pub fn with_thresholds_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.thresholds_file = path.into();
        self
    }

    pub fn with_cedar_report_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cedar_report_file = path.into();
        self
    }

    pub fn with_perf_report_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_report_file = Some(path.into());
        self
    }

    pub fn with_approvers<I, S>(mut self, approvers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.override_settings.approvers = approvers.into_iter().map(Into::into).collect();
        self
    }
}

/// Build context provided by the CI system.
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct Expansions {
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub build_variant: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string_or_number")]
    pub github_pr_number: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
}

impl fmt::Debug for Expansions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expansions")
            .field("requester", &self.requester)
            .field("build_variant", &self.build_variant)
            .field("github_pr_number", &self.github_pr_number)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl Expansions {
    /// Load an expansions YAML file. Unknown keys are ignored.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let config_err = |message: String| GateError::Config {
            path: path.to_path_buf(),
            message,
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| config_err(format!("failed to read expansions: {}", e)))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw)
            .map_err(|e| config_err(format!("failed to parse expansions: {}", e)))
    }

    /// Read expansions from `BENCHGATE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read expansions through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            requester: get("BENCHGATE_REQUESTER"),
            build_variant: get("BENCHGATE_BUILD_VARIANT"),
            github_pr_number: get("BENCHGATE_PR_NUMBER"),
            github_token: get("BENCHGATE_GITHUB_TOKEN"),
        }
    }

    /// Fill fields from `other` where it has a value.
    pub fn overlay(mut self, other: Expansions) -> Self {
        if other.requester.is_some() {
            self.requester = other.requester;
        }
        if other.build_variant.is_some() {
            self.build_variant = other.build_variant;
        }
        if other.github_pr_number.is_some() {
            self.github_pr_number = other.github_pr_number;
        }
        if other.github_token.is_some() {
            self.github_token = other.github_token;
        }
        self
    }

    pub fn is_merge_queue(&self) -> bool {
        self.requester.as_deref() == Some(MERGE_QUEUE_REQUESTER)
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_build_variant(mut self, variant: impl Into<String>) -> Self {
        self.build_variant = Some(variant.into());
        self
    }

    pub fn with_pr_number(mut self, pr: impl Into<String>) -> Self {
        self.github_pr_number = Some(pr.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let cfg: GateConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, GateConfig::default());
        assert_eq!(
            cfg.thresholds_file,
            PathBuf::from("etc/performance_thresholds.yml")
        );
        assert!(!cfg.check_result);
    }

    #[test]
    fn test_config_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchgate.yaml");
        std::fs::write(
            &path,
            "check_result: true\nperf_report_file: out/perf.json\noverride:\n  approvers: [alice]\n",
        )
        .unwrap();
        let cfg = GateConfig::load(&path).unwrap();
        assert!(cfg.check_result);
        assert_eq!(cfg.perf_report_file, Some(PathBuf::from("out/perf.json")));
        assert_eq!(cfg.override_settings.approvers, vec!["alice"]);
    }

    #[test]
    fn test_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchgate.yaml");
        std::fs::write(&path, "check_result: [").unwrap();
        let err = GateConfig::load(&path).unwrap_err();
        assert!(matches!(err, GateError::Config { .. }));
        assert!(GateConfig::load_or_default(&dir.path().join("absent.yaml")).is_ok());
    }

    #[test]
    fn test_expansions_file_accepts_numeric_pr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expansions.yml");
        std::fs::write(
            &path,
            "requester: github_merge_queue\nbuild_variant: linux\ngithub_pr_number: 4242\nrevision: abc\n",
        )
        .unwrap();
        let exp = Expansions::from_file(&path).unwrap();
        assert!(exp.is_merge_queue());
        assert_eq!(exp.github_pr_number.as_deref(), Some("4242"));
        assert_eq!(exp.github_token, None);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BENCHGATE_BUILD_VARIANT", "macos"),
            ("BENCHGATE_GITHUB_TOKEN", "t0ken"),
            ("BENCHGATE_REQUESTER", ""),
        ]);
        let from_env = Expansions::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        let merged = Expansions::default()
            .with_requester("patch_request")
            .with_build_variant("linux")
            .overlay(from_env);
        assert_eq!(merged.requester.as_deref(), Some("patch_request"));
        assert_eq!(merged.build_variant.as_deref(), Some("macos"));
        assert!(!merged.is_merge_queue());
        assert!(!format!("{merged:?}").contains("t0ken"));
    }
}
