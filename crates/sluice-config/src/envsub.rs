// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `%ENV[NAME]` substitution over raw configuration text.
//!
//! The scan is a single left-to-right pass. Substituted values are written
//! straight to the output and never rescanned, so a value that itself
//! contains `%ENV[...]` stays literal.

use std::path::Path;

use sluice_core::SluiceError;
use tracing::debug;

const OPENER: &str = "%ENV[";
const INVALID_NAME_CHARS: &[char] = &['\n', '\r', '\t', ' '];

/// Substitute `%ENV[NAME]` occurrences from the process environment.
///
/// Unset (or non-unicode) variables substitute as the empty string.
pub fn env_sub(text: &str) -> Result<String, SluiceError> {
    env_sub_with(text, |name| std::env::var(name).ok())
}

/// Substitute `%ENV[NAME]` occurrences using `lookup`.
pub fn env_sub_with<F>(text: &str, lookup: F) -> Result<String, SluiceError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        // Too short to hold "ENV[": everything left is literal.
        if after.len() < 4 {
            out.push('%');
            out.push_str(after);
            return Ok(out);
        }

        let Some(tail) = after.strip_prefix("ENV[") else {
            out.push('%');
            rest = after;
            continue;
        };

        let Some(close) = tail.find(']') else {
            return Err(SluiceError::MissingDelimiter);
        };
        let name = &tail[..close];
        if name.contains(INVALID_NAME_CHARS) || name.contains(OPENER) {
            return Err(SluiceError::InvalidVariableName);
        }

        if let Some(value) = lookup(name) {
            out.push_str(&value);
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Read a configuration file and substitute environment references.
pub fn replace_envs_file(path: &Path) -> Result<String, SluiceError> {
    let text = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), "preprocessing configuration");
    env_sub(&text)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    fn sub(text: &str) -> Result<String, SluiceError> {
        let vars: HashMap<&str, &str> = [("HOME_DIR", "/home/x"), ("NESTED", "%ENV[HOME_DIR]")]
            .into_iter()
            .collect();
        env_sub_with(text, |name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn substitutes_known_variable() {
        assert_eq!(sub("path = \"%ENV[HOME_DIR]/log\"").unwrap(), "path = \"/home/x/log\"");
    }

    #[test]
    fn unset_variable_becomes_empty() {
        assert_eq!(sub("a%ENV[MISSING]b").unwrap(), "ab");
    }

    #[test]
    fn lone_percent_is_literal() {
        assert_eq!(sub("100% sure").unwrap(), "100% sure");
        assert_eq!(sub("50%").unwrap(), "50%");
        assert_eq!(sub("%EN").unwrap(), "%EN");
        assert_eq!(sub("%ENV").unwrap(), "%ENV");
    }

    #[test]
    fn double_percent_before_opener() {
        assert_eq!(sub("%%ENV[HOME_DIR]").unwrap(), "%/home/x");
    }

    #[test]
    fn values_are_not_rescanned() {
        assert_eq!(sub("%ENV[NESTED]").unwrap(), "%ENV[HOME_DIR]");
    }

    #[test]
    fn unterminated_opener_is_missing_delimiter() {
        assert!(matches!(sub("x = %ENV[HOME_DIR"), Err(SluiceError::MissingDelimiter)));
        assert!(matches!(sub("%ENV["), Err(SluiceError::MissingDelimiter)));
    }

    #[test]
    fn whitespace_in_name_is_invalid() {
        for bad in ["%ENV[A B]", "%ENV[A\tB]", "%ENV[A\nB]", "%ENV[A\rB]"] {
            assert!(
                matches!(sub(bad), Err(SluiceError::InvalidVariableName)),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn nested_opener_in_name_is_invalid() {
        assert!(matches!(
            sub("%ENV[A%ENV[B]"),
            Err(SluiceError::InvalidVariableName)
        ));
    }

    #[test]
    fn replace_envs_file_reads_and_substitutes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sluice.toml");
        std::fs::write(&path, "plain = \"100%\"\n").unwrap();
        assert_eq!(replace_envs_file(&path).unwrap(), "plain = \"100%\"\n");
    }

    #[test]
    fn replace_envs_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = replace_envs_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SluiceError::Io(_)));
    }

    proptest! {
        #[test]
        fn text_without_percent_is_unchanged(text in "[^%]*") {
            prop_assert_eq!(sub(&text).unwrap(), text);
        }

        #[test]
        fn valid_reference_substitutes_value(
            prefix in "[^%]*",
            name in "[A-Z_]{1,12}",
            value in "[^%]*",
            suffix in "[^%]*",
        ) {
            let input = format!("{prefix}%ENV[{name}]{suffix}");
            let got = env_sub_with(&input, |_| Some(value.clone())).unwrap();
            prop_assert_eq!(got, format!("{prefix}{value}{suffix}"));
        }
    }
}
