//! Masking of secrets in log output.
//!
//! API request and response bodies are logged at debug level. Before they are
//! written, a [`Redactor`] replaces the values of sensitive JSON fields
//! (tokens, passwords, session ids) with a masked form so operators never see
//! raw credentials in diagnostics. Values handed back to callers are never
//! passed through the redactor.

use regex::{Captures, Regex};

use crate::error::{ProtocolError, Result};

/// Mask substituted for the hidden part of a secret.
pub const HIDING_MASK: &str = "********";

/// Default number of characters left visible on each side of a masked value.
pub const DEFAULT_VISIBLE: usize = 4;

const ALNUM_VALUE: &str = "[A-Za-z0-9]+";
const PASSWORD_VALUE: &str = r#"[^'"]+"#;
const RESULT_EXCLUDE: &str = r"^(?:zabbix_export|[0-9.]{5})";

/// Replace the middle of `secret` with [`HIDING_MASK`].
///
/// Returns the mask alone when `visible` is zero or the secret is too short to
/// keep `visible` characters on both sides without revealing all of it.
///
/// The threshold is `2 * visible` characters and does not add the mask length.
/// A secret of 9 to 16 characters therefore keeps its ends with the default
/// `visible`, e.g. `abcdefghijklmnop` becomes `abcd********mnop`; counting the
/// mask would hide it entirely.
pub fn mask_secret(secret: &str, visible: usize) -> String {
    let len = secret.chars().count();
    if visible == 0 || len <= visible * 2 {
        return HIDING_MASK.to_string();
    }

    let prefix: String = secret.chars().take(visible).collect();
    let suffix: String = secret.chars().skip(len - visible).collect();
    format!("{prefix}{HIDING_MASK}{suffix}")
}

/// Truncate `text` to at most `max_len` characters, appending `...` when cut.
pub fn shorten(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_len).collect();
    cut.push_str("...");
    cut
}

/// One sensitive field and the shape of the values to hide.
#[derive(Debug, Clone)]
pub struct RedactRule {
    field: String,
    matcher: Regex,
    exclude: Option<Regex>,
}

impl RedactRule {
    /// Hide values of `field` matching `value_pattern`.
    ///
    /// # Errors
    /// Returns `ProtocolError::ConfigError` if the pattern does not compile.
    pub fn new(field: &str, value_pattern: &str) -> Result<Self> {
        let pattern = format!(r#""{}":\s*"({})"#, regex::escape(field), value_pattern);
        let matcher = Regex::new(&pattern)
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid redaction pattern for '{field}': {e}")))?;

        Ok(Self {
            field: field.to_string(),
            matcher,
            exclude: None,
        })
    }

    /// Leave values alone when the text at the value position matches `pattern`.
    ///
    /// The pattern is tested against the message from the start of the value,
    /// so anchor it with `^`.
    pub fn excluding(mut self, pattern: &str) -> Result<Self> {
        let exclude = Regex::new(pattern).map_err(|e| {
            ProtocolError::ConfigError(format!("Invalid exclusion pattern for '{}': {e}", self.field))
        })?;
        self.exclude = Some(exclude);
        Ok(self)
    }

    /// Field name this rule applies to.
    pub fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, message: &str, visible: usize) -> String {
        self.matcher
            .replace_all(message, |caps: &Captures<'_>| {
                let (whole, value) = match (caps.get(0), caps.get(1)) {
                    (Some(whole), Some(value)) => (whole, value),
                    _ => return caps.get(0).map_or(String::new(), |m| m.as_str().to_string()),
                };

                let skip = self
                    .exclude
                    .as_ref()
                    .is_some_and(|exclude| exclude.is_match(&message[value.start()..]));
                if skip {
                    return whole.as_str().to_string();
                }

                let prefix = &message[whole.start()..value.start()];
                format!("{prefix}{}", mask_secret(value.as_str(), visible))
            })
            .into_owned()
    }
}

/// Ordered set of [`RedactRule`]s applied to log messages.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactRule>,
    visible: usize,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            visible: DEFAULT_VISIBLE,
        }
    }
}

impl Redactor {
    /// Redactor using only the given rules.
    pub fn new(rules: Vec<RedactRule>) -> Self {
        Self {
            rules,
            visible: DEFAULT_VISIBLE,
        }
    }

    /// Add a rule, replacing any existing rule for the same field.
    pub fn with_rule(mut self, rule: RedactRule) -> Self {
        self.rules.retain(|r| r.field != rule.field);
        self.rules.push(rule);
        self
    }

    /// Number of characters kept visible on each side of a masked value.
    pub fn with_visible(mut self, visible: usize) -> Self {
        self.visible = visible;
        self
    }

    pub fn rules(&self) -> &[RedactRule] {
        &self.rules
    }

    /// Mask every sensitive `"<field>": "<value>"` occurrence in `message`.
    pub fn redact(&self, message: &str) -> String {
        self.rules
            .iter()
            .fold(message.to_string(), |acc, rule| rule.apply(&acc, self.visible))
    }
}

fn default_rules() -> Vec<RedactRule> {
    let build = |field: &str, pattern: &str| {
        RedactRule::new(field, pattern).expect("valid regex pattern")
    };

    vec![
        build("token", ALNUM_VALUE),
        build("auth", ALNUM_VALUE),
        build("sessionid", ALNUM_VALUE),
        build("password", PASSWORD_VALUE),
        build("result", ALNUM_VALUE)
            .excluding(RESULT_EXCLUDE)
            .expect("valid regex pattern"),
    ]
}
