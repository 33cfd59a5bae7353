use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::DEFAULT_TOKEN_TTL_MINUTES;
use crate::error::{Error, Result};

pub const SECRET_KEY_FILE: &str = ".secret_key";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime of access tokens issued at login.
    pub token_ttl_minutes: i64,
    /// Token signing secret. When unset, the key file in `data_dir` is used.
    pub secret_key: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("classroll.db")
    }

    #[must_use]
    pub fn secret_key_path(&self) -> PathBuf {
        self.data_dir.join(SECRET_KEY_FILE)
    }

    /// Resolves the signing secret, preferring an explicit key over the key file.
    pub fn load_secret(&self) -> Result<Vec<u8>> {
        if let Some(key) = self.secret_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().as_bytes().to_vec());
        }

        let path = self.secret_key_path();
        let contents = fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("cannot read secret key at {}: {e}", path.display()))
        })?;

        let key = contents.trim();
        if key.is_empty() {
            return Err(Error::Config(format!(
                "secret key file {} is empty",
                path.display()
            )));
        }
        Ok(key.as_bytes().to_vec())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: PathBuf::from("./data"),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            secret_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_secret_wins() {
        let config = ServerConfig {
            secret_key: Some("from-env".to_string()),
            ..Default::default()
        };

        assert_eq!(config.load_secret().unwrap(), b"from-env".to_vec());
    }

    #[test]
    fn test_secret_read_from_data_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SECRET_KEY_FILE), "abc123\n").unwrap();

        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        assert_eq!(config.load_secret().unwrap(), b"abc123".to_vec());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            secret_key: Some("  ".to_string()),
            ..Default::default()
        };

        assert!(matches!(config.load_secret(), Err(Error::Config(_))));
    }

    #[test]
    fn test_paths_and_addr() {
        let config = ServerConfig::default();

        assert_eq!(config.db_path(), PathBuf::from("./data/classroll.db"));
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }
}
