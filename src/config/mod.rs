// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod server;

pub use server::{ConfigError, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
