//! Validated ref names for branches and tags.
//!
//! Topic names arrive from users (and from build tooling computing version
//! strings), so every name is checked against git's ref-name rules and a
//! set of shell metacharacters before it reaches the repository layer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A validated git branch name, e.g. `release/1.0`.
///
/// # Examples
///
/// ```
/// use gflow_core::BranchName;
///
/// assert!(BranchName::new("feature/login").is_ok());
/// assert!(BranchName::new("release/1.0").is_ok());
/// assert!(BranchName::new("feature/../etc").is_err());
/// assert!(BranchName::new("hotfix/1.0;rm -rf").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

/// A validated git tag name, e.g. `v1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName(String);

macro_rules! ref_name_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Validate and wrap a name.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidBranchName`] if the name violates git's
            /// ref naming rules or contains shell metacharacters.
            pub fn new(name: impl Into<String>) -> Result<Self, Error> {
                let name = name.into();
                if let Err(reason) = check_ref_name(&name) {
                    return Err(Error::InvalidBranchName { name, reason });
                }
                Ok(Self(name))
            }

            /// Get the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $ty {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

ref_name_newtype!(BranchName);
ref_name_newtype!(TagName);

const GIT_FORBIDDEN: [char; 7] = [' ', '~', '^', ':', '?', '*', '['];
const SHELL_META: [char; 15] = [
    '$', ';', '|', '&', '>', '<', '`', '\\', '"', '\'', '(', ')', '{', '}', '!',
];

/// Check a full ref name (prefix included), returning the reason on failure.
fn check_ref_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name == "@" {
        return Err("name cannot be '@'".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("name cannot start or end with '/'".into());
    }
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    if name.ends_with(".lock") {
        return Err("name cannot end with '.lock'".into());
    }
    if name.ends_with('.') {
        return Err("name cannot end with '.'".into());
    }

    for sequence in ["..", "//", "@{"] {
        if name.contains(sequence) {
            return Err(format!("name cannot contain '{sequence}'"));
        }
    }

    if let Some(c) = name.chars().find(char::is_ascii_control) {
        return Err(format!("name cannot contain control character {c:?}"));
    }
    if let Some(c) = name.chars().find(|c| GIT_FORBIDDEN.contains(c)) {
        return Err(format!("name cannot contain '{c}'"));
    }
    if let Some(c) = name.chars().find(|c| SHELL_META.contains(c)) {
        return Err(format!("name cannot contain shell metacharacter '{c}'"));
    }

    // every path component is checked, not just the whole name
    if name.split('/').any(|component| component.starts_with('.')) {
        return Err("name component cannot start with '.'".into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reason(name: &str) -> String {
        match BranchName::new(name).unwrap_err() {
            Error::InvalidBranchName { reason, .. } => reason,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_topic_names() {
        for name in [
            "master",
            "develop",
            "feature/auth",
            "feature/user/login",
            "release/1.0",
            "release/2024.01-rc1",
            "hotfix/1.0.1",
            "feature/user@home",
        ] {
            assert!(BranchName::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_valid_tag_names() {
        assert!(TagName::new("v1.0").is_ok());
        assert!(TagName::new("1.0.1").is_ok());
        assert!(TagName::new("release-1.0").is_ok());
    }

    #[test]
    fn test_structural_rules() {
        assert!(reason("").contains("empty"));
        assert!(reason("@").contains('@'));
        assert!(reason("/feature").contains('/'));
        assert!(reason("feature/").contains('/'));
        assert!(reason("release/1.0.lock").contains(".lock"));
        assert!(reason("release/1.").contains("end with '.'"));
        assert!(reason("feature/../etc").contains(".."));
        assert!(reason("feature//x").contains("//"));
        assert!(reason("feature@{1}").contains("@{"));
        assert!(reason(".hidden").contains("component"));
        assert!(reason("feature/.hidden").contains("component"));
    }

    #[test]
    fn test_git_forbidden_characters() {
        for c in GIT_FORBIDDEN {
            let name = format!("feature/a{c}b");
            assert!(BranchName::new(&name).is_err(), "char: {c:?}");
        }
    }

    #[test]
    fn test_shell_metacharacters() {
        for c in SHELL_META {
            let name = format!("release/1.0{c}x");
            assert!(reason(&name).contains("shell"), "char: {c:?}");
        }
    }

    #[test]
    fn test_control_characters() {
        assert!(reason("feature/a\tb").contains("control"));
        assert!(reason("feature/a\nb").contains("control"));
    }

    #[test]
    fn test_tag_uses_same_rules() {
        assert!(matches!(
            TagName::new("v1.0 final").unwrap_err(),
            Error::InvalidBranchName { .. }
        ));
    }

    #[test]
    fn test_display_and_deref() {
        let name = BranchName::new("release/1.0").unwrap();
        assert_eq!(format!("{name}"), "release/1.0");
        assert_eq!(&*name, "release/1.0");
        assert_eq!(name, "release/1.0");
    }

    #[test]
    fn test_serde() {
        let name = BranchName::new("feature/auth").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"feature/auth\"");

        let parsed: BranchName = serde_json::from_str("\"hotfix/1.0.1\"").unwrap();
        assert_eq!(parsed.as_str(), "hotfix/1.0.1");

        assert!(serde_json::from_str::<TagName>("\"..bad\"").is_err());
    }
}
