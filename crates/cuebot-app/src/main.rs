//! # cuebot-app
//!
//! CUEBOT 바이너리 진입점.
//! 설정 로드, 어댑터 생성(DI 와이어링), 오케스트레이터 실행, 시그널 처리.

mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cuebot_automation::input_driver::create_platform_input_driver;
use cuebot_automation::orchestrator::{Orchestrator, OrchestratorDeps};
use cuebot_core::config_manager::ConfigManager;
use cuebot_core::ports::conversation::ConversationBackend;
use cuebot_core::ports::input_driver::InputDriver;
use cuebot_network::dify_client::DifyClient;
use cuebot_vision::capture::XcapScreenCapturer;
use cuebot_vision::matcher::PrunedScan;
use cuebot_vision::templates::TemplateSet;

use crate::lifecycle::{ControlSignal, LifecycleManager};

/// CUEBOT 고객 상담 자동화 에이전트
///
/// 화면의 새 메시지를 감지해 AI 응답을 입력하고, 필요 시 상담원에게 전환한다.
#[derive(Parser, Debug)]
#[command(name = "cuebot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼별 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 실제 입력 없이 실행 (NoOp 입력 드라이버)
    #[arg(long)]
    dry_run: bool,

    /// 한 사이클만 실행 후 종료
    #[arg(long)]
    once: bool,

    /// 대화 백엔드 연결 확인 후 종료
    #[arg(long)]
    check_api: bool,
}

/// 설정 파일 경로 결정 (CLI 인자 또는 플랫폼별 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/com.cuebot.cuebot/config.json`
/// - Windows: `%APPDATA%\cuebot\cuebot\config\config.json`
/// - Linux: `~/.config/cuebot/config.json`
fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| {
        ProjectDirs::from("com", "cuebot", "cuebot").map(|p| p.config_dir().join("config.json"))
    })
    .unwrap_or_else(|| PathBuf::from("./config.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = [
        "cuebot",
        "cuebot_core",
        "cuebot_vision",
        "cuebot_network",
        "cuebot_automation",
    ]
    .iter()
    .map(|target| format!("{target}={}", args.log_level))
    .collect::<Vec<_>>()
    .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("CUEBOT 시작");

    // 설정 로드
    let config_path = resolve_config_path(args.config);
    let config_manager = ConfigManager::with_path(&config_path)
        .with_context(|| format!("설정 로드 실패: {}", config_path.display()))?;
    info!("설정 파일: {}", config_path.display());
    let config = config_manager.snapshot();

    // ── 어댑터 생성 (DI 와이어링) ──

    // 1. 대화 백엔드
    let backend: Arc<dyn ConversationBackend> =
        Arc::new(DifyClient::new(&config.backend).context("대화 백엔드 생성 실패")?);

    if args.check_api {
        if backend.check_connectivity().await {
            info!("대화 백엔드 연결 정상");
            return Ok(());
        }
        bail!("대화 백엔드 연결 실패: {}", config.backend.chat_api_url);
    }

    // 2. 템플릿 (누락 시 시작 불가)
    let templates = Arc::new(TemplateSet::load(&config.templates).context("템플릿 로드 실패")?);
    info!("템플릿 로드 완료");

    // 3. 입력 드라이버
    let input: Arc<dyn InputDriver> = Arc::from(create_platform_input_driver(args.dry_run));
    if args.dry_run {
        warn!("드라이런 모드: 실제 입력을 보내지 않음");
    }
    info!(platform = input.platform(), "입력 드라이버 준비");

    // 4. 오케스트레이터
    let orchestrator = Orchestrator::new(OrchestratorDeps {
        config: config_manager.clone(),
        capturer: Arc::new(XcapScreenCapturer::new()),
        templates,
        strategy: Arc::new(PrunedScan),
        input,
        backend,
    });

    if args.once {
        let detected = orchestrator.manual_check().await?;
        info!(detected, "단일 사이클 완료");
        return Ok(());
    }

    // ── 실행 ──
    let mut lifecycle = LifecycleManager::new().context("시그널 핸들러 등록 실패")?;
    orchestrator.start().await?;
    info!("CUEBOT 실행 중 (Ctrl+C로 종료, SIGHUP으로 설정 리로드)");

    loop {
        match lifecycle.wait_for_signal().await {
            Ok(ControlSignal::Reload) => match config_manager.reload() {
                Ok(snapshot) => info!(
                    check_interval = snapshot.settings.check_interval,
                    confidence_threshold = snapshot.settings.confidence_threshold,
                    "설정 리로드 완료"
                ),
                Err(e) => warn!("설정 리로드 실패, 기존 설정 유지: {e}"),
            },
            Ok(ControlSignal::Shutdown) => break,
            Err(e) => {
                error!("시그널 대기 실패: {e}");
                break;
            }
        }
    }

    orchestrator.stop().await;
    let status = orchestrator.status();
    info!(poll_count = status.poll_count, "CUEBOT 종료");
    Ok(())
}
