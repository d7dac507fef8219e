//! 애플리케이션 설정 구조체.
//!
//! 대화 백엔드 자격증명/URL, 폴링/재시도 주기, 매칭 임계값, 템플릿 경로 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.
//!
//! 모든 주기/지연 값의 단위는 밀리초다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::conversation::DEFAULT_HANDOFF_MARKERS;
use crate::models::cue::CueLabel;
use crate::models::geometry::Region;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 대화 백엔드 (Dify) 설정
    #[serde(alias = "dify")]
    pub backend: BackendConfig,
    /// 실행 설정
    pub settings: Settings,
    /// 큐 라벨별 템플릿 이미지 경로
    pub templates: TemplatePaths,
}

// ============================================================
// 대화 백엔드 설정
// ============================================================

/// 대화 백엔드 설정: Bearer 자격증명 + 엔드포인트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 비전 워크플로 실행 URL
    pub vision_api_url: String,
    /// 채팅 메시지 URL
    pub chat_api_url: String,
    /// 파일 업로드 URL
    pub file_upload_url: String,
    /// 채팅 API 키
    pub api_key: String,
    /// 비전/업로드 API 키
    pub vision_api_key: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
    /// 연결 확인 요청 타임아웃 (초)
    #[serde(default = "default_connectivity_timeout_secs")]
    pub connectivity_timeout_secs: u64,
    /// 상담원 전환 마커 문자열
    #[serde(default = "default_handoff_markers")]
    pub handoff_markers: Vec<String>,
}

impl BackendConfig {
    /// 백엔드 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 연결 확인 타임아웃
    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }
}

// ============================================================
// 실행 설정
// ============================================================

/// 실행 설정 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// 새 메시지 폴링 주기
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// ERROR 상태 후 재시도 대기
    #[serde(default = "default_error_retry_interval")]
    pub error_retry_interval: u64,
    /// 매칭 신뢰도 임계값 (0, 1]
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// 마우스 이동 후 클릭 전 지연
    #[serde(default = "default_click_delay")]
    pub click_delay: u64,
    /// 채팅 영역 캡처 전 지연
    #[serde(default = "default_screenshot_delay")]
    pub screenshot_delay: u64,
    /// 채팅 영역 스크린샷 사용 여부
    #[serde(default = "default_true")]
    pub use_screenshot: bool,
    /// 오래된 스크린샷 정리 여부
    #[serde(default = "default_true")]
    pub cleanup_screenshots: bool,
    /// 스크린샷 보존 기간 (일)
    #[serde(default = "default_cleanup_after_days")]
    pub cleanup_after_days: u32,
    /// 슬라이딩 윈도우 간격 (1 = 전수 탐색)
    #[serde(default = "default_match_stride")]
    pub match_stride: u32,
    /// 픽셀 일치 허용 오차 (채널별 절대 차이 합)
    #[serde(default = "default_pixel_tolerance")]
    pub pixel_tolerance: u32,
    /// 새 메시지 클릭 후 채팅창 로딩 대기
    #[serde(default = "default_settle_delay")]
    pub settle_delay: u64,
    /// `wait_for` 폴링 간격
    #[serde(default = "default_wait_poll_interval")]
    pub wait_poll_interval: u64,
    /// 입력창 큐 대기 타임아웃
    #[serde(default = "default_cue_wait_timeout")]
    pub cue_wait_timeout: u64,
    /// 하우스키핑 실행 주기 (폴링 횟수)
    #[serde(default = "default_housekeeping_every")]
    pub housekeeping_every: u64,
    /// 고정 채팅 캡처 영역 (chat_window 큐 발견 시 크기만 사용)
    #[serde(default = "default_chat_region")]
    pub chat_region: Region,
    /// chat_window 큐로 캡처 영역 위치를 동적으로 결정할지 여부
    #[serde(default = "default_true")]
    pub locate_chat_window: bool,
    /// 스크린샷 저장 디렉토리
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            error_retry_interval: default_error_retry_interval(),
            confidence_threshold: default_confidence_threshold(),
            click_delay: default_click_delay(),
            screenshot_delay: default_screenshot_delay(),
            use_screenshot: true,
            cleanup_screenshots: true,
            cleanup_after_days: default_cleanup_after_days(),
            match_stride: default_match_stride(),
            pixel_tolerance: default_pixel_tolerance(),
            settle_delay: default_settle_delay(),
            wait_poll_interval: default_wait_poll_interval(),
            cue_wait_timeout: default_cue_wait_timeout(),
            housekeeping_every: default_housekeeping_every(),
            chat_region: default_chat_region(),
            locate_chat_window: true,
            screenshots_dir: default_screenshots_dir(),
        }
    }
}

impl Settings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval)
    }

    pub fn error_retry_interval(&self) -> Duration {
        Duration::from_millis(self.error_retry_interval)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay)
    }

    pub fn screenshot_delay(&self) -> Duration {
        Duration::from_millis(self.screenshot_delay)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval)
    }

    pub fn cue_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.cue_wait_timeout)
    }
}

// ============================================================
// 템플릿 경로
// ============================================================

/// 큐 라벨별 템플릿 이미지 경로
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePaths {
    pub new_message: PathBuf,
    pub input_box: PathBuf,
    pub send_button: PathBuf,
    pub transfer_button: PathBuf,
    pub close_chat: PathBuf,
    pub chat_window: PathBuf,
}

impl TemplatePaths {
    /// 라벨 → 경로 (닫힌 집합이므로 누락 불가)
    pub fn path_for(&self, label: CueLabel) -> &PathBuf {
        match label {
            CueLabel::NewMessage => &self.new_message,
            CueLabel::InputBox => &self.input_box,
            CueLabel::SendButton => &self.send_button,
            CueLabel::TransferButton => &self.transfer_button,
            CueLabel::CloseChat => &self.close_chat,
            CueLabel::ChatWindow => &self.chat_window,
        }
    }

    /// `<dir>/<label>.png` 규칙으로 전체 경로 생성
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let file = |label: CueLabel| dir.join(format!("{}.png", label.as_str()));
        Self {
            new_message: file(CueLabel::NewMessage),
            input_box: file(CueLabel::InputBox),
            send_button: file(CueLabel::SendButton),
            transfer_button: file(CueLabel::TransferButton),
            close_chat: file(CueLabel::CloseChat),
            chat_window: file(CueLabel::ChatWindow),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

/// 미설정 값 표시 (기본 설정 파일의 자리표시자)
const PLACEHOLDER_MARK: &str = "your-";

impl AppConfig {
    /// 기본 설정값 반환.
    ///
    /// 백엔드 자격증명은 자리표시자이므로 그대로는 `validate()`를 통과하지 못한다.
    pub fn default_config() -> Self {
        Self {
            backend: BackendConfig {
                vision_api_url: "https://your-dify-instance.com/v1/workflows/run".to_string(),
                chat_api_url: "https://your-dify-instance.com/v1/chat-messages".to_string(),
                file_upload_url: "https://your-dify-instance.com/v1/files/upload".to_string(),
                api_key: "your-chat-api-key".to_string(),
                vision_api_key: "your-vision-api-key".to_string(),
                timeout_secs: default_backend_timeout_secs(),
                connectivity_timeout_secs: default_connectivity_timeout_secs(),
                handoff_markers: default_handoff_markers(),
            },
            settings: Settings::default(),
            templates: TemplatePaths::in_dir("templates"),
        }
    }

    /// 설정 유효성 검증.
    ///
    /// 자격증명/URL 미설정, 임계값 범위 위반, 0 간격 등은 시작을 막는다.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("backend.vision_api_url", &self.backend.vision_api_url),
            ("backend.chat_api_url", &self.backend.chat_api_url),
            ("backend.file_upload_url", &self.backend.file_upload_url),
            ("backend.api_key", &self.backend.api_key),
            ("backend.vision_api_key", &self.backend.vision_api_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() || value.contains(PLACEHOLDER_MARK) {
                return Err(CoreError::validation(field, "올바른 값을 설정해야 함"));
            }
        }

        let threshold = self.settings.confidence_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(CoreError::validation(
                "settings.confidence_threshold",
                format!("(0, 1] 범위여야 함: {threshold}"),
            ));
        }
        if self.settings.match_stride == 0 {
            return Err(CoreError::validation(
                "settings.match_stride",
                "1 이상이어야 함",
            ));
        }
        if self.settings.check_interval == 0 {
            return Err(CoreError::validation(
                "settings.check_interval",
                "1 이상이어야 함",
            ));
        }
        if self.settings.wait_poll_interval == 0 {
            return Err(CoreError::validation(
                "settings.wait_poll_interval",
                "1 이상이어야 함",
            ));
        }
        if self.settings.chat_region.is_empty() {
            return Err(CoreError::validation(
                "settings.chat_region",
                "width/height는 0보다 커야 함",
            ));
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_backend_timeout_secs() -> u64 {
    30
}
fn default_connectivity_timeout_secs() -> u64 {
    10
}
fn default_handoff_markers() -> Vec<String> {
    DEFAULT_HANDOFF_MARKERS
        .iter()
        .map(|m| m.to_string())
        .collect()
}
fn default_check_interval() -> u64 {
    5_000
}
fn default_error_retry_interval() -> u64 {
    10_000
}
fn default_confidence_threshold() -> f64 {
    0.8
}
fn default_click_delay() -> u64 {
    100
}
fn default_screenshot_delay() -> u64 {
    500
}
fn default_cleanup_after_days() -> u32 {
    7
}
fn default_match_stride() -> u32 {
    2
}
fn default_pixel_tolerance() -> u32 {
    20
}
fn default_settle_delay() -> u64 {
    2_000
}
fn default_wait_poll_interval() -> u64 {
    500
}
fn default_cue_wait_timeout() -> u64 {
    3_000
}
fn default_housekeeping_every() -> u64 {
    10
}
fn default_chat_region() -> Region {
    Region::new(400, 200, 800, 600)
}
fn default_screenshots_dir() -> PathBuf {
    PathBuf::from("screenshots")
}
