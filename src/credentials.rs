//! Credentials file loading
//!
//! The credentials file holds the principal on its first line and the secret
//! on its second. Both are passed to the remote client unchanged.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file {path} has no principal on its first line")]
    MissingPrincipal { path: PathBuf },

    #[error("Credentials file {path} has no secret on its second line")]
    MissingSecret { path: PathBuf },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    principal: String,
    secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        debug!("Reading credentials from: {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, CredentialsError> {
        let mut lines = content.lines().map(str::trim);

        let principal = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| CredentialsError::MissingPrincipal { path: path.to_path_buf() })?;
        let secret = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| CredentialsError::MissingSecret { path: path.to_path_buf() })?;

        Ok(Self::new(principal, secret))
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_two_lines() {
        let file = NamedTempFile::new().unwrap();
        fs::write(&file, "octocat\n  s3cr3t-token  \n").unwrap();

        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.principal(), "octocat");
        assert_eq!(creds.secret(), "s3cr3t-token");
    }

    #[test]
    fn test_missing_secret() {
        let file = NamedTempFile::new().unwrap();
        fs::write(&file, "octocat\n").unwrap();

        let err = Credentials::load(file.path()).unwrap_err();
        assert!(matches!(err, CredentialsError::MissingSecret { .. }));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = Credentials::load(file.path()).unwrap_err();
        assert!(matches!(err, CredentialsError::MissingPrincipal { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Credentials::load(Path::new("/nonexistent/credentials")).unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("octocat", "s3cr3t");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("octocat"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
