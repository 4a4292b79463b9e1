use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use scanlytix_core::config::ScanlytixConfig;
use scanlytix_core::sink::LogSinkFactory;
use scanlytix_daemon::cli::DaemonCli;
use scanlytix_daemon::{logging, runner};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드 (파일 + 환경변수), CLI 인자가 최우선
    let mut config = ScanlytixConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    scanlytix_core::metrics::describe_all();
    tracing::info!(config = %cli.config.display(), "scanlytix-daemon starting");

    // 종료 시그널 → 진행 중인 스윕 취소
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let report = runner::run_sweeps(&config, &LogSinkFactory, cli.once, cancel).await?;

    tracing::info!(
        sweeps = report.sweeps_completed,
        failed = report.sweeps_failed,
        "scanlytix-daemon shut down"
    );
    Ok(())
}
