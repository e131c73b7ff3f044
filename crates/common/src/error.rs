//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating gateway configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a validation failure on a named config field.
    pub fn invalid(field: &str, reason: impl std::fmt::Display) -> Self {
        Error::Config(format!("{field}: {reason}"))
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names_the_field() {
        let err = Error::invalid("provider.client_id", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: provider.client_id: must not be empty"
        );
    }

    #[test]
    fn io_and_toml_errors_convert() {
        let io_err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file").into();
        assert!(io_err.to_string().starts_with("I/O error:"), "got: {io_err}");

        let toml_err: Error = toml::from_str::<toml::Table>("= broken").unwrap_err().into();
        assert!(
            toml_err.to_string().starts_with("TOML parse error:"),
            "got: {toml_err}"
        );
    }
}
