//! 상담 오케스트레이터.
//!
//! 화면의 새 메시지 큐를 폴링하고, 고객이 감지되면 한 세션을 순차 처리하는
//! 상태 머신이다.
//!
//! ```text
//! IDLE → POLLING → CUSTOMER_DETECTED → CAPTURING → ANALYZING → REPLYING
//!      → HANDOFF_CHECK → CLOSING → POLLING
//! (모든 상태) → ERROR → (error_retry_interval 대기) → POLLING
//! stop() → 진행 중 세션 완료 후 STOPPED
//! ```
//!
//! 한 사이클(폴링 + 세션)은 `cycle_lock`으로 직렬화되므로 루프와
//! `manual_check()`가 동시에 화면을 조작하지 않는다.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cuebot_core::config::{AppConfig, Settings};
use cuebot_core::config_manager::ConfigManager;
use cuebot_core::error::CoreError;
use cuebot_core::models::automation::MouseButton;
use cuebot_core::models::cue::CueLabel;
use cuebot_core::models::geometry::{Point, Region};
use cuebot_core::models::session::Session;
use cuebot_core::ports::conversation::ConversationBackend;
use cuebot_core::ports::input_driver::InputDriver;
use cuebot_vision::capture::{crop_to_region, ScreenCapturer};
use cuebot_vision::locator::CueLocator;
use cuebot_vision::matcher::{MatchOptions, MatchStrategy, TemplateMatcher};
use cuebot_vision::screenshot_store::{ScreenshotArtifact, ScreenshotStore};
use cuebot_vision::templates::TemplateSet;

use crate::input_driver::clear_input;

/// 응답 전송 실패 시 사용하는 전송 키
const ACCEPT_KEY: &str = "enter";

// ============================================================
// 상태 / 상태 스냅샷
// ============================================================

/// 오케스트레이터 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    Idle,
    Polling,
    CustomerDetected,
    Capturing,
    Analyzing,
    Replying,
    HandoffCheck,
    Closing,
    Error,
    Stopped,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BotState::Idle => "IDLE",
            BotState::Polling => "POLLING",
            BotState::CustomerDetected => "CUSTOMER_DETECTED",
            BotState::Capturing => "CAPTURING",
            BotState::Analyzing => "ANALYZING",
            BotState::Replying => "REPLYING",
            BotState::HandoffCheck => "HANDOFF_CHECK",
            BotState::Closing => "CLOSING",
            BotState::Error => "ERROR",
            BotState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// 외부 조회용 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BotStatus {
    pub is_running: bool,
    pub poll_count: u64,
    pub state: BotState,
}

/// 한 사이클의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 새 메시지 없음
    NoCustomer,
    /// 세션을 CLOSING까지 진행
    SessionCompleted,
    /// 캡처/분석 단계에서 세션 중단
    SessionAborted,
}

impl CycleOutcome {
    pub fn customer_detected(&self) -> bool {
        !matches!(self, CycleOutcome::NoCustomer)
    }
}

// ============================================================
// Orchestrator
// ============================================================

/// 오케스트레이터 의존성
pub struct OrchestratorDeps {
    pub config: ConfigManager,
    pub capturer: Arc<dyn ScreenCapturer>,
    pub templates: Arc<TemplateSet>,
    pub strategy: Arc<dyn MatchStrategy>,
    pub input: Arc<dyn InputDriver>,
    pub backend: Arc<dyn ConversationBackend>,
}

/// 상담 오케스트레이터: 프로세스 제어 표면
pub struct Orchestrator {
    shared: Arc<Shared>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    config: ConfigManager,
    capturer: Arc<dyn ScreenCapturer>,
    templates: Arc<TemplateSet>,
    strategy: Arc<dyn MatchStrategy>,
    input: Arc<dyn InputDriver>,
    backend: Arc<dyn ConversationBackend>,
    state_tx: watch::Sender<BotState>,
    shutdown_tx: watch::Sender<bool>,
    running: AtomicBool,
    poll_count: AtomicU64,
    cycle_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        let (state_tx, _) = watch::channel(BotState::Idle);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config: deps.config,
                capturer: deps.capturer,
                templates: deps.templates,
                strategy: deps.strategy,
                input: deps.input,
                backend: deps.backend,
                state_tx,
                shutdown_tx,
                running: AtomicBool::new(false),
                poll_count: AtomicU64::new(0),
                cycle_lock: Mutex::new(()),
            }),
            task: parking_lot::Mutex::new(None),
        }
    }

    /// 폴링 루프 시작.
    ///
    /// 백엔드 연결 확인(실패해도 경고만), 오래된 스크린샷 정리 후 루프를 띄운다.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Internal("이미 실행 중".to_string()));
        }

        info!(backend = self.shared.backend.name(), "오케스트레이터 시작");
        self.shared.shutdown_tx.send_replace(false);

        if !self.shared.backend.check_connectivity().await {
            warn!("대화 백엔드 연결 실패: 계속 진행");
        }

        let config = self.shared.config.snapshot();
        if config.settings.cleanup_screenshots {
            self.shared.cleanup_screenshots(&config).await;
        }

        self.shared.transition(BotState::Polling);
        let shutdown_rx = self.shared.shutdown_tx.subscribe();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared), shutdown_rx));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// 중지 요청 후 루프 종료까지 대기.
    ///
    /// 진행 중인 세션은 끝까지 처리된다. 실행 중이 아니면 아무 일도 하지 않는다.
    pub async fn stop(&self) {
        if !self.shared.running.load(Ordering::SeqCst) {
            return;
        }

        info!("오케스트레이터 중지 요청");
        self.shared.shutdown_tx.send_replace(true);

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("폴링 루프 조인 실패: {e}");
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.transition(BotState::Stopped);
            }
        }
    }

    /// 현재 상태
    pub fn status(&self) -> BotStatus {
        BotStatus {
            is_running: self.shared.running.load(Ordering::SeqCst),
            poll_count: self.shared.poll_count.load(Ordering::SeqCst),
            state: *self.shared.state_tx.borrow(),
        }
    }

    /// 상태 전이 구독
    pub fn subscribe_state(&self) -> watch::Receiver<BotState> {
        self.shared.state_tx.subscribe()
    }

    /// 주기와 무관하게 한 사이클 즉시 실행.
    ///
    /// 고객이 감지되었으면 `true`.
    ///
    /// 루프가 돌고 있으면 상태는 루프 소유이므로 실패해도 POLLING으로 되돌린다.
    /// 정지 상태에서는 실패 시 ERROR, 성공 시 이전 정지 상태(IDLE/STOPPED)로 복귀한다.
    pub async fn manual_check(&self) -> Result<bool, CoreError> {
        info!("수동 사이클 실행");
        let previous = *self.shared.state_tx.borrow();
        let config = self.shared.config.snapshot();
        let result = self.shared.run_cycle(&config, false).await;

        let running = self.shared.running.load(Ordering::SeqCst);
        match &result {
            // 성공한 사이클은 이미 POLLING으로 끝난다
            Ok(_) if running => {}
            Err(e) if running => {
                error!("수동 사이클 실패: {e}");
                self.shared.transition(BotState::Polling);
            }
            Err(e) => {
                error!("수동 사이클 실패: {e}");
                self.shared.transition(BotState::Error);
            }
            Ok(_) if previous == BotState::Stopped => self.shared.transition(BotState::Stopped),
            Ok(_) => self.shared.transition(BotState::Idle),
        }

        result.map(|outcome| outcome.customer_detected())
    }
}

/// 폴링 루프: 종료 신호는 사이클 사이 대기 중에도 즉시 관찰된다
async fn run_loop(shared: Arc<Shared>, mut shutdown_rx: watch::Receiver<bool>) {
    info!("폴링 루프 시작");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let config = shared.config.snapshot();
        let wait = match shared.run_cycle(&config, true).await {
            Ok(_) => config.settings.check_interval(),
            Err(e) => {
                error!("사이클 실패, {}ms 후 재시도: {e}", config.settings.error_retry_interval);
                shared.transition(BotState::Error);
                config.settings.error_retry_interval()
            }
        };

        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_rx.changed() => {
                debug!("대기 중 종료 신호 수신");
            }
        }
    }

    shared.running.store(false, Ordering::SeqCst);
    shared.transition(BotState::Stopped);
    info!("폴링 루프 종료");
}

impl Shared {
    fn transition(&self, next: BotState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "상태 전이");
        }
    }

    fn locator(&self, config: &AppConfig) -> CueLocator {
        let options = MatchOptions {
            stride: config.settings.match_stride,
            pixel_tolerance: config.settings.pixel_tolerance,
        };
        CueLocator::new(
            Arc::clone(&self.capturer),
            Arc::clone(&self.templates),
            TemplateMatcher::new(Arc::clone(&self.strategy), options),
        )
    }

    async fn cleanup_screenshots(&self, config: &AppConfig) {
        let store = ScreenshotStore::new(&config.settings.screenshots_dir);
        if let Err(e) = store
            .cleanup_older_than(config.settings.cleanup_after_days)
            .await
        {
            warn!("스크린샷 정리 실패: {e}");
        }
    }

    /// 폴링 카운트가 주기에 도달하면 정리 작업을 백그라운드로 실행
    fn schedule_housekeeping(&self, poll_count: u64, config: &AppConfig) {
        let settings = &config.settings;
        if !settings.cleanup_screenshots
            || settings.housekeeping_every == 0
            || poll_count % settings.housekeeping_every != 0
        {
            return;
        }

        debug!(poll_count, "주기적 스크린샷 정리 예약");
        let store = ScreenshotStore::new(&settings.screenshots_dir);
        let days = settings.cleanup_after_days;
        tokio::spawn(async move {
            if let Err(e) = store.cleanup_older_than(days).await {
                warn!("주기적 스크린샷 정리 실패: {e}");
            }
        });
    }

    /// 한 사이클: 새 메시지 큐 탐색 → (발견 시) 세션 처리
    async fn run_cycle(&self, config: &AppConfig, counted: bool) -> Result<CycleOutcome, CoreError> {
        let _cycle = self.cycle_lock.lock().await;
        let locator = self.locator(config);

        self.transition(BotState::Polling);
        if counted {
            let count = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
            self.schedule_housekeeping(count, config);
        }

        let hit = locator
            .find(CueLabel::NewMessage, config.settings.confidence_threshold)
            .await?;
        let Some(cue) = hit.hit_location() else {
            return Ok(CycleOutcome::NoCustomer);
        };

        let outcome = self.handle_session(config, &locator, cue).await?;
        self.transition(BotState::Polling);
        Ok(outcome)
    }

    /// 고객 한 명의 세션을 처리한다.
    ///
    /// 새 메시지 클릭 실패만 에러로 전파하고, 이후 단계의 실패는 로그 후
    /// 중단하거나 다음 단계로 진행한다.
    async fn handle_session(
        &self,
        config: &AppConfig,
        locator: &CueLocator,
        cue: Point,
    ) -> Result<CycleOutcome, CoreError> {
        let settings = &config.settings;
        let session = Session::begin();
        let sid = session.customer_id.as_str();

        // CUSTOMER_DETECTED
        self.transition(BotState::CustomerDetected);
        info!(session = %sid, location = %cue, "새 고객 감지");
        self.click(cue, settings).await?;
        tokio::time::sleep(settings.settle_delay()).await;

        // CAPTURING
        self.transition(BotState::Capturing);
        let artifact = match self.capture_chat(config, locator, sid).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                info!(session = %sid, "스크린샷 비활성화: 세션 건너뜀");
                return Ok(CycleOutcome::SessionAborted);
            }
            Err(e) => {
                warn!(session = %sid, "채팅 영역 캡처 실패, 세션 중단: {e}");
                return Ok(CycleOutcome::SessionAborted);
            }
        };

        // ANALYZING
        self.transition(BotState::Analyzing);
        let extracted = self.backend.analyze_image(artifact.path(), sid).await;
        drop(artifact);

        let text = match extracted {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(session = %sid, "추출된 텍스트 없음, 세션 중단");
                return Ok(CycleOutcome::SessionAborted);
            }
            Err(e) => {
                warn!(session = %sid, "이미지 분석 실패, 세션 중단: {e}");
                return Ok(CycleOutcome::SessionAborted);
            }
        };
        info!(session = %sid, message = %text, "고객 메시지");

        let reply = self.backend.chat(sid, &text).await;

        // REPLYING
        self.transition(BotState::Replying);
        if reply.has_reply() {
            match self.send_reply(config, locator, &reply.reply).await {
                Ok(true) => info!(session = %sid, reply = %reply.reply, "응답 전송"),
                Ok(false) => warn!(session = %sid, "입력창을 찾지 못해 응답 생략"),
                Err(e) => warn!(session = %sid, "응답 전송 실패: {e}"),
            }
        } else {
            warn!(session = %sid, "빈 응답: 전송 생략");
        }

        // HANDOFF_CHECK
        self.transition(BotState::HandoffCheck);
        if reply.need_human {
            info!(session = %sid, "상담원 전환 필요");
            match self.click_cue(locator, CueLabel::TransferButton, settings).await {
                Ok(true) => info!(session = %sid, "상담원에게 전환 완료"),
                Ok(false) => warn!(session = %sid, "전환 버튼 미발견"),
                Err(e) => warn!(session = %sid, "상담원 전환 실패: {e}"),
            }
        }

        // CLOSING
        self.transition(BotState::Closing);
        match self.click_cue(locator, CueLabel::CloseChat, settings).await {
            Ok(true) => debug!(session = %sid, "채팅 닫기 완료"),
            Ok(false) => debug!(session = %sid, "닫기 버튼 미발견"),
            Err(e) => warn!(session = %sid, "채팅 닫기 실패: {e}"),
        }

        info!(session = %sid, elapsed_ms = session.elapsed_ms(), "세션 종료");
        Ok(CycleOutcome::SessionCompleted)
    }

    /// 채팅 영역 캡처 후 스크린샷 저장. 스크린샷이 꺼져 있으면 `None`.
    async fn capture_chat(
        &self,
        config: &AppConfig,
        locator: &CueLocator,
        customer_id: &str,
    ) -> Result<Option<ScreenshotArtifact>, CoreError> {
        let settings = &config.settings;
        if !settings.use_screenshot {
            return Ok(None);
        }

        tokio::time::sleep(settings.screenshot_delay()).await;

        let image = if settings.locate_chat_window {
            let screen = Arc::new(self.capturer.capture(None).await?);
            let anchor = locator
                .find_in(
                    Arc::clone(&screen),
                    CueLabel::ChatWindow,
                    settings.confidence_threshold,
                )
                .await?;
            let region = chat_region(settings, anchor.region.filter(|_| anchor.found));
            debug!(?region, anchored = anchor.found, "채팅 영역 결정");
            crop_to_region(&screen, region)?
        } else {
            self.capturer.capture(Some(settings.chat_region)).await?
        };

        let store = ScreenshotStore::new(&settings.screenshots_dir);
        Ok(Some(store.save(image, customer_id).await?))
    }

    /// 입력창 클릭 → 비우기 → 입력 → 전송. 입력창이 없으면 `false`.
    async fn send_reply(
        &self,
        config: &AppConfig,
        locator: &CueLocator,
        text: &str,
    ) -> Result<bool, CoreError> {
        let settings = &config.settings;
        let input_box = locator
            .wait_for(
                CueLabel::InputBox,
                settings.confidence_threshold,
                settings.cue_wait_timeout(),
                settings.wait_poll_interval(),
                None,
            )
            .await?;
        let Some(point) = input_box.hit_location() else {
            return Ok(false);
        };

        self.click(point, settings).await?;
        tokio::time::sleep(settings.click_delay()).await;
        clear_input(self.input.as_ref()).await?;
        self.input.type_text(text).await?;
        tokio::time::sleep(settings.click_delay()).await;

        if !self.click_cue(locator, CueLabel::SendButton, settings).await? {
            debug!("전송 버튼 미발견: {ACCEPT_KEY} 키로 전송");
            self.input.press_key(ACCEPT_KEY).await?;
        }
        Ok(true)
    }

    /// 큐를 찾아 클릭. 못 찾으면 `false`.
    async fn click_cue(
        &self,
        locator: &CueLocator,
        label: CueLabel,
        settings: &Settings,
    ) -> Result<bool, CoreError> {
        let hit = locator.find(label, settings.confidence_threshold).await?;
        match hit.hit_location() {
            Some(point) => {
                self.click(point, settings).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 이동 → click_delay → 왼쪽 클릭
    async fn click(&self, point: Point, settings: &Settings) -> Result<(), CoreError> {
        self.input.mouse_move(point.x, point.y).await?;
        tokio::time::sleep(settings.click_delay()).await;
        self.input.mouse_click(MouseButton::Left, point.x, point.y).await
    }
}

/// 채팅 캡처 영역: chat_window 큐가 있으면 그 좌상단에 고정 크기를 붙이고,
/// 없으면 설정된 고정 영역
fn chat_region(settings: &Settings, anchor: Option<Region>) -> Region {
    let fixed = settings.chat_region;
    match anchor {
        Some(anchor) => Region::new(anchor.x, anchor.y, fixed.width, fixed.height),
        None => fixed,
    }
}
