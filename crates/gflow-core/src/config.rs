//! Branch naming configuration and tool settings.
//!
//! [`FlowConfig`] is the branch model (production/integration names and topic
//! prefixes). It is recorded in the repository's git config under the same
//! keys other git-flow tools use. [`Settings`] holds gflow's own behaviour
//! and lives in `.git/gflow/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use gflow_git::GitOps;
use serde::{Deserialize, Serialize};

use crate::engine::{ProductionFailurePolicy, TopicKind};
use crate::error::{Error, Result};
use crate::extension::FailStrategy;
use crate::naming::BranchName;

const KEY_PRODUCTION: &str = "gitflow.branch.master";
const KEY_INTEGRATION: &str = "gitflow.branch.develop";
const KEY_FEATURE: &str = "gitflow.prefix.feature";
const KEY_RELEASE: &str = "gitflow.prefix.release";
const KEY_HOTFIX: &str = "gitflow.prefix.hotfix";
const KEY_TAG: &str = "gitflow.prefix.versiontag";

const ALL_KEYS: [&str; 6] = [
    KEY_PRODUCTION,
    KEY_INTEGRATION,
    KEY_FEATURE,
    KEY_RELEASE,
    KEY_HOTFIX,
    KEY_TAG,
];

/// Branch names and prefixes of the git-flow model.
///
/// Immutable once built; [`FlowConfigBuilder::build`] guarantees the
/// production and integration branches differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    production: String,
    integration: String,
    feature_prefix: String,
    release_prefix: String,
    hotfix_prefix: String,
    tag_prefix: String,
}

impl FlowConfig {
    /// Start from the conventional defaults.
    #[must_use]
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::default()
    }

    /// Production branch, e.g. `master`.
    #[must_use]
    pub fn production(&self) -> &str {
        &self.production
    }

    /// Integration branch, e.g. `develop`.
    #[must_use]
    pub fn integration(&self) -> &str {
        &self.integration
    }

    /// Prefix for a topic kind, e.g. `feature/`.
    #[must_use]
    pub fn prefix(&self, kind: TopicKind) -> &str {
        match kind {
            TopicKind::Feature => &self.feature_prefix,
            TopicKind::Release => &self.release_prefix,
            TopicKind::Hotfix => &self.hotfix_prefix,
        }
    }

    /// Prefix prepended to release and hotfix tags.
    #[must_use]
    pub fn tag_prefix(&self) -> &str {
        &self.tag_prefix
    }

    /// Whether every key of the model is present in the repository config.
    ///
    /// # Errors
    /// Returns error if the config cannot be read.
    pub fn is_recorded<G: GitOps + ?Sized>(repo: &G) -> Result<bool> {
        for key in ALL_KEYS {
            if repo.config_value(key)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Load the model recorded in the repository config.
    ///
    /// # Errors
    /// Returns `NotInitialized` if any key is missing, or the build errors
    /// if the recorded values are invalid.
    pub fn load<G: GitOps + ?Sized>(repo: &G) -> Result<Self> {
        let read = |key: &str| repo.config_value(key)?.ok_or(Error::NotInitialized);

        Self::builder()
            .production(read(KEY_PRODUCTION)?)
            .integration(read(KEY_INTEGRATION)?)
            .feature_prefix(read(KEY_FEATURE)?)
            .release_prefix(read(KEY_RELEASE)?)
            .hotfix_prefix(read(KEY_HOTFIX)?)
            .tag_prefix(read(KEY_TAG)?)
            .build()
    }

    /// Record the model in the repository-local config.
    ///
    /// # Errors
    /// Returns error if the config cannot be written.
    pub fn record<G: GitOps + ?Sized>(&self, repo: &G) -> Result<()> {
        let values = [
            (KEY_PRODUCTION, &self.production),
            (KEY_INTEGRATION, &self.integration),
            (KEY_FEATURE, &self.feature_prefix),
            (KEY_RELEASE, &self.release_prefix),
            (KEY_HOTFIX, &self.hotfix_prefix),
            (KEY_TAG, &self.tag_prefix),
        ];
        for (key, value) in values {
            repo.set_config_value(key, value)?;
        }
        Ok(())
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        let b = FlowConfigBuilder::default();
        Self {
            production: b.production,
            integration: b.integration,
            feature_prefix: b.feature_prefix,
            release_prefix: b.release_prefix,
            hotfix_prefix: b.hotfix_prefix,
            tag_prefix: b.tag_prefix,
        }
    }
}

/// Builder for [`FlowConfig`].
#[derive(Debug, Clone)]
pub struct FlowConfigBuilder {
    production: String,
    integration: String,
    feature_prefix: String,
    release_prefix: String,
    hotfix_prefix: String,
    tag_prefix: String,
}

impl Default for FlowConfigBuilder {
    fn default() -> Self {
        Self {
            production: "master".into(),
            integration: "develop".into(),
            feature_prefix: "feature/".into(),
            release_prefix: "release/".into(),
            hotfix_prefix: "hotfix/".into(),
            tag_prefix: String::new(),
        }
    }
}

impl FlowConfigBuilder {
    #[must_use]
    pub fn production(mut self, name: impl Into<String>) -> Self {
        self.production = name.into();
        self
    }

    #[must_use]
    pub fn integration(mut self, name: impl Into<String>) -> Self {
        self.integration = name.into();
        self
    }

    #[must_use]
    pub fn feature_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.feature_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn release_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.release_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn hotfix_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hotfix_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    /// Returns `SameBranchConfigured` if production equals integration, or
    /// `InvalidBranchName` for names git would reject.
    pub fn build(self) -> Result<FlowConfig> {
        BranchName::new(self.production.as_str())?;
        BranchName::new(self.integration.as_str())?;
        if self.production == self.integration {
            return Err(Error::SameBranchConfigured(self.production));
        }
        for prefix in [&self.feature_prefix, &self.release_prefix, &self.hotfix_prefix] {
            // a prefix must form a valid name once something is appended
            BranchName::new(format!("{prefix}x"))?;
        }

        Ok(FlowConfig {
            production: self.production,
            integration: self.integration,
            feature_prefix: self.feature_prefix,
            release_prefix: self.release_prefix,
            hotfix_prefix: self.hotfix_prefix,
            tag_prefix: self.tag_prefix,
        })
    }
}

/// gflow settings loaded from `.git/gflow/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// General settings.
    #[serde(default)]
    pub general: GeneralSettings,

    /// Finish-operation policies.
    #[serde(default)]
    pub finish: FinishSettings,

    /// Extension dispatch settings.
    #[serde(default)]
    pub extensions: ExtensionSettings,

    /// Trace log settings.
    #[serde(default)]
    pub trace: TraceSettings,
}

impl Settings {
    const DIR: &'static str = "gflow";
    const FILE: &'static str = "config.toml";

    /// Location of the settings file inside a `.git` directory.
    #[must_use]
    pub fn path_in(git_dir: &Path) -> PathBuf {
        git_dir.join(Self::DIR).join(Self::FILE)
    }

    /// Load settings from a TOML file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::SettingsParse {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save settings to a TOML file, creating the parent directory.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Remote used for fetch, push and tracking-branch recovery.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Fetch before start/finish unless overridden on the command line.
    #[serde(default)]
    pub fetch: bool,

    /// Push after start/finish unless overridden on the command line.
    #[serde(default)]
    pub push: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            fetch: false,
            push: false,
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

/// Finish-operation policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishSettings {
    /// What to do with the integration merge after a failed production merge.
    #[serde(default)]
    pub production_failure: ProductionFailurePolicy,

    /// Merge hotfixes into an open release branch instead of integration.
    #[serde(default = "default_true")]
    pub hotfix_into_release: bool,
}

impl Default for FinishSettings {
    fn default() -> Self {
        Self {
            production_failure: ProductionFailurePolicy::default(),
            hotfix_into_release: true,
        }
    }
}

/// Extension dispatch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionSettings {
    /// Strategy for hooks registered without one.
    #[serde(default)]
    pub fail_strategy: FailStrategy,
}

/// Trace log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Write each operation's trace to `.git/gflow/trace.log`.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl TraceSettings {
    /// Where the trace log lives inside a `.git` directory.
    #[must_use]
    pub fn log_path_in(git_dir: &Path) -> PathBuf {
        git_dir.join(Settings::DIR).join("trace.log")
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::MockGitOps;
    use tempfile::TempDir;

    #[test]
    fn test_default_model() {
        let config = FlowConfig::default();
        assert_eq!(config.production(), "master");
        assert_eq!(config.integration(), "develop");
        assert_eq!(config.prefix(TopicKind::Feature), "feature/");
        assert_eq!(config.prefix(TopicKind::Release), "release/");
        assert_eq!(config.prefix(TopicKind::Hotfix), "hotfix/");
        assert_eq!(config.tag_prefix(), "");
        assert_eq!(FlowConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn test_same_branch_rejected() {
        let err = FlowConfig::builder()
            .production("main")
            .integration("main")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SameBranchConfigured(ref b) if b == "main"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let err = FlowConfig::builder()
            .feature_prefix("feat ure/")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBranchName { .. }));
    }

    #[test]
    fn test_record_and_load() {
        let repo = MockGitOps::new();
        assert!(!FlowConfig::is_recorded(&repo).unwrap());
        assert!(matches!(
            FlowConfig::load(&repo).unwrap_err(),
            Error::NotInitialized
        ));

        let config = FlowConfig::builder()
            .production("main")
            .integration("dev")
            .tag_prefix("v")
            .build()
            .unwrap();
        config.record(&repo).unwrap();

        assert!(FlowConfig::is_recorded(&repo).unwrap());
        assert_eq!(FlowConfig::load(&repo).unwrap(), config);
        assert_eq!(
            repo.config.borrow().get("gitflow.branch.master").map(String::as_str),
            Some("main")
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.general.remote, "origin");
        assert!(!settings.general.fetch);
        assert!(!settings.general.push);
        assert_eq!(
            settings.finish.production_failure,
            ProductionFailurePolicy::Halt
        );
        assert!(settings.finish.hotfix_into_release);
        assert_eq!(settings.extensions.fail_strategy, FailStrategy::Error);
        assert!(settings.trace.enabled);
    }

    #[test]
    fn test_settings_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = Settings::path_in(temp.path());

        let mut settings = Settings::default();
        settings.general.remote = "upstream".into();
        settings.general.push = true;
        settings.finish.production_failure = ProductionFailurePolicy::Continue;
        settings.extensions.fail_strategy = FailStrategy::Warn;

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();

        assert_eq!(loaded.general.remote, "upstream");
        assert!(loaded.general.push);
        assert_eq!(
            loaded.finish.production_failure,
            ProductionFailurePolicy::Continue
        );
        assert_eq!(loaded.extensions.fail_strategy, FailStrategy::Warn);
    }

    #[test]
    fn test_partial_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[finish]\nproduction_failure = \"continue\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.finish.production_failure,
            ProductionFailurePolicy::Continue
        );
        assert!(settings.finish.hotfix_into_release);
        assert_eq!(settings.general.remote, "origin");
    }

    #[test]
    fn test_bad_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[finish]\nproduction_failure = \"sometimes\"\n").unwrap();

        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            Error::SettingsParse { .. }
        ));
    }

    #[test]
    fn test_missing_settings_returns_default() {
        let settings = Settings::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(settings.general.remote, "origin");
    }
}
