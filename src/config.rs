//! git-tf configuration, read through `git config`.
//!
//! All keys live under the `tf.` section of the repository's git config.
//! Missing keys fall back to defaults; only the author-email domain is
//! mandatory, and only for commands that create commits.

use std::sync::LazyLock;

use gittf_tools::Git;
use regex::Regex;

use crate::error::BridgeError;

/// Notes ref holding the changeset number of each mirror commit.
pub const CORRELATION_NOTES: &str = "tf";

/// Notes ref holding work items associated with a commit.
pub const WORK_ITEM_NOTES: &str = "tf.wi";

/// Default name of the branch that mirrors server history.
pub const DEFAULT_MIRROR_BRANCH: &str = "tfs";

/// Default name of the user-facing branch.
pub const DEFAULT_WORK_BRANCH: &str = "master";

static EMAIL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$"));

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Typed view of the `tf.*` config keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// `tf.cmd`: how to invoke the server client.
    pub tf_command: String,
    /// `tf.paramPrefix`: `-` or `/`.
    pub param_prefix: String,
    /// `tf.domain`, or the domain part of `user.email`.
    pub domain: Option<String>,
    /// `tf.clone.autocrlf`: value written to `core.autocrlf` by clone.
    pub clone_autocrlf: String,
    /// `tf.mirrorBranch`.
    pub mirror_branch: String,
    /// `tf.workBranch`.
    pub work_branch: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tf_command: "tf".to_owned(),
            param_prefix: default_param_prefix().to_owned(),
            domain: None,
            clone_autocrlf: "true".to_owned(),
            mirror_branch: DEFAULT_MIRROR_BRANCH.to_owned(),
            work_branch: DEFAULT_WORK_BRANCH.to_owned(),
        }
    }
}

impl BridgeConfig {
    /// Read every key through `git`. Works outside a repository too (global
    /// config only), which clone relies on.
    ///
    /// # Errors
    /// Fails when git cannot be run, or `tf.paramPrefix` is not `-` or `/`.
    pub fn load(git: &Git) -> Result<Self, BridgeError> {
        let defaults = Self::default();
        let get = |key: &str| git.config_get(key);

        let param_prefix = get("tf.paramPrefix")?.unwrap_or(defaults.param_prefix);
        if param_prefix != "-" && param_prefix != "/" {
            return Err(BridgeError::config(
                "tf.paramPrefix",
                format!("expected '-' or '/', got {param_prefix:?}"),
            ));
        }

        let domain = match get("tf.domain")? {
            Some(domain) => Some(domain),
            None => get("user.email")?.as_deref().and_then(email_domain).map(str::to_owned),
        };

        Ok(Self {
            tf_command: get("tf.cmd")?.unwrap_or(defaults.tf_command),
            param_prefix,
            domain,
            clone_autocrlf: get("tf.clone.autocrlf")?.unwrap_or(defaults.clone_autocrlf),
            mirror_branch: get("tf.mirrorBranch")?.unwrap_or(defaults.mirror_branch),
            work_branch: get("tf.workBranch")?.unwrap_or(defaults.work_branch),
        })
    }

    /// The author-email domain.
    ///
    /// # Errors
    /// [`BridgeError::Config`] when neither `tf.domain` nor a usable
    /// `user.email` is configured.
    pub fn require_domain(&self) -> Result<&str, BridgeError> {
        self.domain.as_deref().ok_or_else(|| {
            BridgeError::config(
                "user.email",
                "cannot determine the email domain for commit authors; set user.email or tf.domain",
            )
        })
    }
}

const fn default_param_prefix() -> &'static str {
    if cfg!(windows) { "/" } else { "-" }
}

/// `true` for a plausible `local@host.tld` address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_ok_and(|pattern| pattern.is_match(email.trim()))
}

/// The part after `@`, if the address is valid.
#[must_use]
pub fn email_domain(email: &str) -> Option<&str> {
    let email = email.trim();
    if !is_valid_email(email) {
        return None;
    }
    email.split_once('@').map(|(_, domain)| domain)
}

/// The part before `@`, used as `user.name` on clone.
#[must_use]
pub fn email_user(email: &str) -> &str {
    email.trim().split_once('@').map_or(email, |(user, _)| user)
}
