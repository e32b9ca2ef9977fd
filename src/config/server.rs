// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration loaded from the environment

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::vision::decision::ANEMIA_THRESHOLD;
use crate::vision::model_manager::DEFAULT_MODEL_PATH;

/// Default request body limit (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Errors raised while validating configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),

    #[error("Threshold must be within (0, 1), got {0}")]
    InvalidThreshold(f32),

    #[error("Maximum upload size must be greater than 0")]
    ZeroUploadLimit,
}

/// Configuration for the prediction server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Path to the ONNX classifier
    pub model_path: String,
    /// Directory where uploads are staged while being classified
    pub upload_dir: PathBuf,
    /// Probability above which an image is reported as anemic
    pub threshold: f32,
    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to the defaults. Unparsable ones do too,
    /// with a warning naming the rejected value.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port),
            model_path: env::var("MODEL_PATH").unwrap_or(defaults.model_path),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            threshold: parse_env("ANEMIA_THRESHOLD", defaults.threshold),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }

    /// Socket address built from host and port
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: DEFAULT_MODEL_PATH.to_string(),
            upload_dir: env::temp_dir(),
            threshold: ANEMIA_THRESHOLD,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Read and parse an environment variable, keeping `default` when it is
/// unset or malformed
fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Ignoring {}={:?} ({}); using default {}",
                    key, raw, e, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
