// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anemia_detector_node::{
    api::{start_server, AppState},
    cli::Cli,
    config::ServerConfig,
    version,
    vision::{ClassifierConfig, ClassifierModelManager},
};
use anyhow::Result;
use clap::Parser;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.apply(ServerConfig::from_env());
    config.validate()?;

    println!("🚀 Starting {}...", version::get_version_string());
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!();

    // Load the classifier once; failure degrades to "Model not loaded"
    println!("🧠 Loading anemia classifier...");
    let manager = ClassifierModelManager::new(ClassifierConfig {
        model_path: Some(config.model_path.clone()),
    });

    if manager.has_classifier() {
        println!("✅ Classifier loaded from {}", config.model_path);
    } else {
        println!("⚠️  Classifier not available at {}", config.model_path);
        println!("   POST /predict will return 500 \"Model not loaded\"");
    }

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("🎉 Anemia Detector Node is running");
    println!("{}", separator);
    println!("Listen:         {}:{}", config.host, config.port);
    println!("Upload dir:     {}", config.upload_dir.display());
    println!("Threshold:      {}", config.threshold);
    println!("\nAPI Endpoints:");
    println!("  Health:       http://{}:{}/health", config.host, config.port);
    println!("  Predict:      POST http://{}:{}/predict", config.host, config.port);
    println!("\nTest with curl:");
    println!(
        "  curl -X POST http://{}:{}/predict -F image=@palm.jpg",
        config.host, config.port
    );
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    let state = AppState::new(&config, manager);
    start_server(&config, state).await?;

    println!("👋 Goodbye!");
    Ok(())
}
