//! Log text hygiene: colour stripping and secret concealment.

use regex::Regex;
use std::sync::OnceLock;

/// Replacement written in place of a concealed secret.
pub const CONCEALMENT: &str = "******";

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI pattern"))
}

/// Removes ANSI escape sequences (colours, cursor movement) from a message.
#[must_use]
pub fn strip_ansi(message: &str) -> String {
    ansi_pattern().replace_all(message, "").into_owned()
}

/// Replaces every occurrence of each secret with [`CONCEALMENT`].
///
/// Empty secrets are ignored.
#[must_use]
pub fn conceal(message: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(message.to_string(), |acc, secret| acc.replace(secret.as_str(), CONCEALMENT))
}

/// Strips colours and conceals secrets.
#[must_use]
pub fn sanitize(message: &str, secrets: &[String]) -> String {
    conceal(&strip_ansi(message), secrets)
}
