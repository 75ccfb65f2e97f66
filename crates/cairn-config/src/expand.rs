//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Strings without `${` are returned unchanged, so bare `$` in paths and URLs
/// survives.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Variable that was referenced without a default but is not set.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("CAIRN_TEST_OUT", "public");
        }
        let result = expand_env("${CAIRN_TEST_OUT}", "site.dest").unwrap();
        assert_eq!(result, "public");
        unsafe {
            std::env::remove_var("CAIRN_TEST_OUT");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CAIRN_TEST_UNSET");
        }
        let result = expand_env("${CAIRN_TEST_UNSET:-_site}", "site.dest").unwrap();
        assert_eq!(result, "_site");
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("CAIRN_TEST_HOST", "example.com");
        }
        let result = expand_env("https://${CAIRN_TEST_HOST}/", "site.location").unwrap();
        assert_eq!(result, "https://example.com/");
        unsafe {
            std::env::remove_var("CAIRN_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CAIRN_TEST_MISSING");
        }
        let err = expand_env("${CAIRN_TEST_MISSING}", "site.location").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("CAIRN_TEST_MISSING"));
        assert!(err.to_string().contains("site.location"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let result = expand_env("assets/$hash", "site.dest").unwrap();
        assert_eq!(result, "assets/$hash");
    }
}
