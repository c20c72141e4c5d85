//! # labsight-app
//!
//! labsight 바이너리 진입점.
//! 설정 로드, DI 와이어링, 분석 스케줄러와 라이프사이클 관리.

mod lifecycle;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use labsight_core::config::AppConfig;
use labsight_core::config_manager::ConfigManager;
use labsight_insights::InsightEngine;
use labsight_network::summarizer::RemoteSummarizer;
use labsight_storage::sqlite::SqliteStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::scheduler::AnalysisScheduler;

/// labsight — 홈랩 예측 분석 엔진
///
/// 수집된 메트릭에서 이상, 용량 고갈, 디스크 고장 위험, 성능 추세, 비용 절감 기회를 찾는다.
#[derive(Parser, Debug)]
#[command(name = "labsight")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// SQLite 파일 경로 (설정 파일 값보다 우선)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error) — RUST_LOG가 없을 때만 적용
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 분석 주기 (초, 설정 파일 값보다 우선)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// 분석 1회 실행 후 인사이트 보고서를 JSON으로 출력하고 종료
    #[arg(long)]
    once: bool,
}

/// 크레이트별 로그 필터
fn log_filter(level: &str) -> String {
    [
        "labsight",
        "labsight_app",
        "labsight_core",
        "labsight_insights",
        "labsight_storage",
        "labsight_network",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",")
}

/// 데이터베이스 경로 결정 (CLI → 설정 파일 → 플랫폼 데이터 디렉토리)
///
/// # 플랫폼별 기본 경로:
/// - Linux: `~/.local/share/labsight/labsight.db`
/// - macOS: `~/Library/Application Support/dev.labsight.labsight/labsight.db`
/// - Windows: `%APPDATA%\labsight\labsight\data\labsight.db`
fn resolve_db_path(cli: Option<&Path>, config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = cli.or(config.storage.db_path.as_deref()) {
        return Ok(path.to_path_buf());
    }
    Ok(ConfigManager::data_dir()?.join("labsight.db"))
}

fn load_config(args: &Args) -> Result<ConfigManager> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", manager.config_path().display());
    Ok(manager)
}

/// 엔진 생성 (요약기는 설정에서 켠 경우만)
fn build_engine(config: &AppConfig, storage: Arc<SqliteStorage>) -> InsightEngine {
    let engine = InsightEngine::new(config.analytics.clone(), storage.clone(), storage);

    if !config.summarizer.enabled {
        return engine;
    }
    match RemoteSummarizer::new(&config.summarizer) {
        Ok(summarizer) => {
            info!(
                endpoint = %config.summarizer.endpoint,
                model = %config.summarizer.model,
                "요약기 활성화"
            );
            engine.with_summarizer(Arc::new(summarizer), config.summarizer.timeout())
        }
        Err(e) => {
            warn!("요약기 초기화 실패, 기본 요약 사용: {e}");
            engine
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(&args.log_level))),
        )
        .init();

    let config_manager = load_config(&args)?;
    let mut config = config_manager.get();
    if let Some(secs) = args.interval_secs {
        config.scheduler.interval_secs = secs;
    }

    // ── 어댑터 생성 (DI 와이어링) ──

    let db_path = resolve_db_path(args.db_path.as_deref(), &config)?;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("데이터 디렉토리 생성 실패: {}", parent.display()))?;
    }
    let storage = Arc::new(SqliteStorage::open(&db_path, config.storage.retention_days)?);

    let engine = Arc::new(build_engine(&config, storage.clone()));
    let scheduler = Arc::new(AnalysisScheduler::new(
        engine,
        storage,
        &config.scheduler,
    ));

    if args.once {
        let report = scheduler.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let lifecycle = LifecycleManager::new();
    let shutdown_rx = lifecycle.subscribe();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run(shutdown_rx).await }
    });

    info!(
        db = %db_path.display(),
        interval_secs = config.scheduler.interval_secs,
        "labsight 실행 중 (Ctrl+C로 종료)"
    );

    lifecycle.wait_for_signal().await?;
    handle.await?;

    info!(cycles = scheduler.completed_cycles(), "labsight 종료");
    Ok(())
}
