use clap::Parser;
use indicatif::ProgressBar;
use object_detective::{analyzer, cli, config, error, scanner, server, vision};
use analyzer::Recognizer;
use cli::{Cli, Commands};
use config::Config;
use error::{DetectiveError, Result};
use std::sync::Arc;
use std::time::Duration;
use vision::GeminiClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ログは stderr（stdout は結果JSON用）
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Recognize { path, base64, output } => {
            let images = scanner::collect_images(&path)?;
            if images.is_empty() {
                return Err(DetectiveError::NoImagesFound(path.display().to_string()));
            }
            eprintln!("🔍 {}枚の写真を認識します", images.len());

            let recognizer = Recognizer::new(Arc::new(GeminiClient::from_config(&config)?));

            let mut responses = Vec::with_capacity(images.len());
            for image in &images {
                let spinner = ProgressBar::new_spinner();
                spinner.enable_steady_tick(Duration::from_millis(120));
                spinner.set_message(format!("{} を解析中...", image.file_name));

                let response = recognizer.recognize_file(&image.path, base64).await;
                spinner.finish_and_clear();

                if response.success {
                    eprintln!("✔ {}", image.file_name);
                } else {
                    eprintln!("✘ {}: {}", image.file_name, response.error.as_deref().unwrap_or(""));
                }
                responses.push(response);
            }

            // 単一ファイルならオブジェクト、フォルダなら配列
            let json = if path.is_file() {
                serde_json::to_string_pretty(&responses[0])?
            } else {
                serde_json::to_string_pretty(&responses)?
            };

            match output {
                Some(output) => {
                    std::fs::write(&output, json)?;
                    eprintln!("✔ 結果を保存: {}", output.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);

            let recognizer = Recognizer::new(Arc::new(GeminiClient::from_config(&config)?));
            server::serve(&host, port, server::AppState::new(recognizer)).await?;
        }

        Commands::Config { set_project, set_location, set_model, set_api_key, show } => {
            let mut config = config;
            let changed = set_project.is_some()
                || set_location.is_some()
                || set_model.is_some()
                || set_api_key.is_some();

            if let Some(project) = set_project {
                config.project = Some(project);
            }
            if let Some(location) = set_location {
                config.location = location;
            }
            if let Some(model) = set_model {
                config.model = model;
            }
            if let Some(key) = set_api_key {
                config.api_key = Some(key);
            }

            if changed {
                config.validate()?;
                config.save_to(&config_path)?;
                println!("✔ 設定を保存しました: {}", config_path.display());
            }

            if show || !changed {
                println!("設定 ({}):", config_path.display());
                println!("  プロジェクト: {}", config.project().unwrap_or_else(|| "未設定".into()));
                println!("  ロケーション: {}", config.location);
                println!("  モデル: {}", config.model);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  待ち受け: {}:{}", config.host, config.port);
                println!("  APIキー: {}", if config.api_key().is_some() { "設定済み" } else { "未設定" });
                println!("  アクセストークン: {}", if config.access_token().is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
