// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// Anemia Detector Node
///
/// Serves POST /predict for palm image anemia screening.
/// Flags override the matching environment variables.
#[derive(Parser, Debug, Default)]
#[command(name = "anemia-detector-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Palm image anemia classifier over HTTP", long_about = None)]
pub struct Cli {
    /// Interface to bind (env: HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (env: PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the ONNX classifier (env: MODEL_PATH)
    #[arg(short, long)]
    pub model_path: Option<String>,

    /// Directory for staged uploads (env: UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Probability cutoff for an anemic result (env: ANEMIA_THRESHOLD)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Maximum request body in bytes (env: MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl Cli {
    /// Overlay command line flags on a base configuration
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model_path) = self.model_path {
            config.model_path = model_path;
        }
        if let Some(upload_dir) = self.upload_dir {
            config.upload_dir = upload_dir;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(max_upload_bytes) = self.max_upload_bytes {
            config.max_upload_bytes = max_upload_bytes;
        }
        config
    }
}
