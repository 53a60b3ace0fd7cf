//! Domain errors raised by the acquisition and installation pipeline.
//!
//! These travel inside `anyhow::Error`; callers that need to react to a
//! specific failure use `err.downcast_ref::<PackageError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    /// DNS failure, refused connection, TLS failure, broken stream.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Server responded with status code {code}")]
    HttpStatus { code: u16 },

    #[error("Too many redirects (limit is {limit})")]
    RedirectLoop { limit: usize },

    #[error("Failed to extract archive: {message}")]
    Extract { message: String },

    /// `found` is 0 when no bundle exists and 2 or more when several do.
    #[error("{}", ambiguous_message(*found))]
    AmbiguousBundle { found: usize },

    #[error("Package {name} is already installed")]
    AlreadyInstalled { name: String },

    #[error("Invalid package name: '{name}'")]
    InvalidName { name: String },

    #[error("Package {name} is not installed")]
    NotInstalled { name: String },

    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    #[error("Registry error: {message}")]
    Registry { message: String },
}

fn ambiguous_message(found: usize) -> String {
    if found == 0 {
        "Unable to locate .bbpackage folder in archive".to_string()
    } else {
        format!("Found {} .bbpackage folders in archive, expected exactly one", found)
    }
}

impl PackageError {
    pub fn registry(message: impl Into<String>) -> Self {
        PackageError::Registry {
            message: message.into(),
        }
    }

    /// Flattens an I/O failure (with its context chain) into a domain error.
    pub fn filesystem(err: &anyhow::Error) -> Self {
        PackageError::Filesystem {
            message: format!("{:#}", err),
        }
    }

    pub fn extract(message: impl Into<String>) -> Self {
        PackageError::Extract {
            message: message.into(),
        }
    }
}

/// Checks whether an error chain bottoms out in an I/O error of `kind`.
pub(crate) fn has_io_kind(err: &anyhow::Error, kind: std::io::ErrorKind) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io_err| io_err.kind() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_ambiguous_bundle_messages() {
        let none = PackageError::AmbiguousBundle { found: 0 };
        assert!(none.to_string().contains("Unable to locate"));

        let many = PackageError::AmbiguousBundle { found: 3 };
        assert!(many.to_string().contains("Found 3"));
    }

    #[test]
    fn test_package_error_survives_context() {
        let err = anyhow::Error::from(PackageError::NotInstalled {
            name: "jshint".into(),
        })
        .context("Uninstall failed");

        match err.downcast_ref::<PackageError>() {
            Some(PackageError::NotInstalled { name }) => assert_eq!(name, "jshint"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_has_io_kind() {
        let err: anyhow::Error = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "exists",
        ))
        .context("Failed to move")
        .unwrap_err();

        assert!(has_io_kind(&err, std::io::ErrorKind::AlreadyExists));
        assert!(!has_io_kind(&err, std::io::ErrorKind::NotFound));
        assert!(!has_io_kind(&anyhow::anyhow!("plain"), std::io::ErrorKind::NotFound));
    }
}
