//! 입력 드라이버 구현.
//!
//! - `EnigoInputDriver`: 실제 마우스/키보드 입력 (`enigo` feature)
//! - `NoOpInputDriver`: 로깅만 수행 (드라이런)
//! - `RecordingInputDriver`: 모든 동작을 `AutomationAction`으로 기록

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use cuebot_core::error::CoreError;
use cuebot_core::models::automation::{AutomationAction, MouseButton, ScrollDirection};
use cuebot_core::models::geometry::Point;
use cuebot_core::ports::input_driver::{select_all_keys, InputDriver};

/// 입력창 비우기: 전체 선택 후 삭제
pub async fn clear_input(driver: &dyn InputDriver) -> Result<(), CoreError> {
    driver.hotkey(&select_all_keys()).await?;
    driver.press_key("delete").await
}

// ============================================================
// NoOpInputDriver: 드라이런용
// ============================================================

/// No-Op 입력 드라이버: 모든 입력을 로깅만 하고 실행하지 않음
pub struct NoOpInputDriver;

#[async_trait]
impl InputDriver for NoOpInputDriver {
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError> {
        debug!(x, y, "[NoOp] 마우스 이동");
        Ok(())
    }

    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError> {
        debug!(?button, x, y, "[NoOp] 마우스 클릭");
        Ok(())
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), CoreError> {
        debug!(x, y, "[NoOp] 더블 클릭");
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), CoreError> {
        debug!(%from, %to, "[NoOp] 드래그");
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), CoreError> {
        debug!(text_len = text.chars().count(), "[NoOp] 텍스트 입력");
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), CoreError> {
        debug!(key, "[NoOp] 키 입력");
        Ok(())
    }

    async fn hotkey(&self, keys: &[String]) -> Result<(), CoreError> {
        debug!(?keys, "[NoOp] 단축키 실행");
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, count: u32) -> Result<(), CoreError> {
        debug!(?direction, count, "[NoOp] 스크롤");
        Ok(())
    }

    fn platform(&self) -> &str {
        "noop"
    }
}

// ============================================================
// RecordingInputDriver: 동작 기록
// ============================================================

/// 동작 기록 드라이버.
///
/// 실제 입력 없이 호출 순서대로 `AutomationAction`을 쌓는다.
/// `fail_clicks`가 켜지면 클릭 계열 동작이 `CoreError::Input`을 반환한다.
#[derive(Debug, Default)]
pub struct RecordingInputDriver {
    actions: Mutex<Vec<AutomationAction>>,
    fail_clicks: AtomicBool,
}

impl RecordingInputDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 클릭을 실패시킬지 설정
    pub fn set_fail_clicks(&self, fail: bool) {
        self.fail_clicks.store(fail, Ordering::SeqCst);
    }

    /// 기록된 동작 (복제본)
    pub fn actions(&self) -> Vec<AutomationAction> {
        self.actions.lock().clone()
    }

    /// 기록된 클릭 좌표 (왼쪽 버튼)
    pub fn clicks(&self) -> Vec<Point> {
        self.actions
            .lock()
            .iter()
            .filter_map(|action| match action {
                AutomationAction::MouseClick {
                    button: MouseButton::Left,
                    x,
                    y,
                } => Some(Point::new(*x, *y)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: AutomationAction) {
        debug!(?action, "[Recording] 동작 기록");
        self.actions.lock().push(action);
    }

    fn check_click(&self) -> Result<(), CoreError> {
        if self.fail_clicks.load(Ordering::SeqCst) {
            return Err(CoreError::Input("클릭 실패 (주입됨)".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InputDriver for RecordingInputDriver {
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError> {
        self.record(AutomationAction::MouseMove { x, y });
        Ok(())
    }

    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError> {
        self.check_click()?;
        self.record(AutomationAction::MouseClick { button, x, y });
        Ok(())
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), CoreError> {
        self.check_click()?;
        self.record(AutomationAction::DoubleClick { x, y });
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), CoreError> {
        self.record(AutomationAction::Drag {
            from_x: from.x,
            from_y: from.y,
            to_x: to.x,
            to_y: to.y,
        });
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), CoreError> {
        self.record(AutomationAction::KeyType {
            text: text.to_string(),
        });
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), CoreError> {
        self.record(AutomationAction::KeyPress {
            key: key.to_string(),
        });
        Ok(())
    }

    async fn hotkey(&self, keys: &[String]) -> Result<(), CoreError> {
        self.record(AutomationAction::Hotkey {
            keys: keys.to_vec(),
        });
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, count: u32) -> Result<(), CoreError> {
        self.record(AutomationAction::Scroll { direction, count });
        Ok(())
    }

    fn platform(&self) -> &str {
        "recording"
    }
}

// ============================================================
// EnigoInputDriver: 실제 마우스/키보드 입력
// ============================================================

/// 실제 마우스/키보드 입력 드라이버 (enigo 기반)
///
/// macOS: Accessibility 권한 필요
/// Windows: 대상 앱과 같은 권한 수준 필요
/// Linux: X11 또는 Wayland + uinput 권한 필요
#[cfg(feature = "enigo")]
pub struct EnigoInputDriver {
    /// enigo 인스턴스 (Send지만 !Sync → tokio::sync::Mutex 사용)
    enigo: tokio::sync::Mutex<enigo::Enigo>,
}

#[cfg(feature = "enigo")]
impl EnigoInputDriver {
    /// 새 EnigoInputDriver 생성
    pub fn new() -> Result<Self, CoreError> {
        let settings = enigo::Settings::default();
        let enigo = enigo::Enigo::new(&settings)
            .map_err(|e| CoreError::Input(format!("입력 드라이버 초기화 실패: {e}")))?;
        Ok(Self {
            enigo: tokio::sync::Mutex::new(enigo),
        })
    }

    /// 문자열 → enigo 키 매핑. 알 수 없는 이름은 에러.
    fn parse_key(key: &str) -> Result<enigo::Key, CoreError> {
        let key = match key.to_lowercase().as_str() {
            "enter" | "return" => enigo::Key::Return,
            "tab" => enigo::Key::Tab,
            "escape" | "esc" => enigo::Key::Escape,
            "backspace" => enigo::Key::Backspace,
            "delete" | "del" => enigo::Key::Delete,
            "space" => enigo::Key::Space,
            "home" => enigo::Key::Home,
            "end" => enigo::Key::End,
            "pageup" => enigo::Key::PageUp,
            "pagedown" => enigo::Key::PageDown,
            "up" => enigo::Key::UpArrow,
            "down" => enigo::Key::DownArrow,
            "left" => enigo::Key::LeftArrow,
            "right" => enigo::Key::RightArrow,
            "ctrl" | "control" => enigo::Key::Control,
            "shift" => enigo::Key::Shift,
            "alt" | "option" => enigo::Key::Alt,
            "cmd" | "command" | "meta" | "win" => enigo::Key::Meta,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => enigo::Key::Unicode(ch),
                    _ => return Err(CoreError::Input(format!("알 수 없는 키: {other}"))),
                }
            }
        };
        Ok(key)
    }

    fn map_button(button: MouseButton) -> enigo::Button {
        match button {
            MouseButton::Left => enigo::Button::Left,
            MouseButton::Right => enigo::Button::Right,
            MouseButton::Middle => enigo::Button::Middle,
        }
    }
}

#[cfg(feature = "enigo")]
#[async_trait]
impl InputDriver for EnigoInputDriver {
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(x, y, "[Enigo] 마우스 이동");
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Input(format!("마우스 이동 실패: {e}")))
    }

    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(?button, x, y, "[Enigo] 마우스 클릭");
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Input(format!("마우스 이동 실패: {e}")))?;
        enigo
            .button(Self::map_button(button), enigo::Direction::Click)
            .map_err(|e| CoreError::Input(format!("마우스 클릭 실패: {e}")))
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(x, y, "[Enigo] 더블 클릭");
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Input(format!("마우스 이동 실패: {e}")))?;
        for _ in 0..2 {
            enigo
                .button(enigo::Button::Left, enigo::Direction::Click)
                .map_err(|e| CoreError::Input(format!("더블 클릭 실패: {e}")))?;
        }
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(%from, %to, "[Enigo] 드래그");
        let mut enigo = self.enigo.lock().await;
        let err = |e: enigo::InputError| CoreError::Input(format!("드래그 실패: {e}"));
        enigo
            .move_mouse(from.x, from.y, enigo::Coordinate::Abs)
            .map_err(err)?;
        enigo
            .button(enigo::Button::Left, enigo::Direction::Press)
            .map_err(err)?;
        enigo
            .move_mouse(to.x, to.y, enigo::Coordinate::Abs)
            .map_err(err)?;
        enigo
            .button(enigo::Button::Left, enigo::Direction::Release)
            .map_err(err)
    }

    async fn type_text(&self, text: &str) -> Result<(), CoreError> {
        use enigo::Keyboard;
        debug!(text_len = text.chars().count(), "[Enigo] 텍스트 입력");
        let mut enigo = self.enigo.lock().await;
        enigo
            .text(text)
            .map_err(|e| CoreError::Input(format!("텍스트 입력 실패: {e}")))
    }

    async fn press_key(&self, key: &str) -> Result<(), CoreError> {
        use enigo::Keyboard;
        debug!(key, "[Enigo] 키 입력");
        let parsed = Self::parse_key(key)?;
        let mut enigo = self.enigo.lock().await;
        enigo
            .key(parsed, enigo::Direction::Click)
            .map_err(|e| CoreError::Input(format!("키 입력 실패: {e}")))
    }

    async fn hotkey(&self, keys: &[String]) -> Result<(), CoreError> {
        use enigo::Keyboard;
        debug!(?keys, "[Enigo] 단축키 실행");
        let parsed = keys
            .iter()
            .map(|k| Self::parse_key(k))
            .collect::<Result<Vec<_>, _>>()?;
        let mut enigo = self.enigo.lock().await;
        // 모든 키 순서대로 Press → 역순 Release
        for key in &parsed {
            enigo
                .key(*key, enigo::Direction::Press)
                .map_err(|e| CoreError::Input(format!("단축키 Press 실패: {e}")))?;
        }
        for key in parsed.iter().rev() {
            enigo
                .key(*key, enigo::Direction::Release)
                .map_err(|e| CoreError::Input(format!("단축키 Release 실패: {e}")))?;
        }
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, count: u32) -> Result<(), CoreError> {
        use enigo::Mouse;
        debug!(?direction, count, "[Enigo] 스크롤");
        let mut enigo = self.enigo.lock().await;
        // enigo: 양수 = 아래
        for _ in 0..count {
            enigo
                .scroll(direction.wheel_delta(), enigo::Axis::Vertical)
                .map_err(|e| CoreError::Input(format!("스크롤 실패: {e}")))?;
        }
        Ok(())
    }

    fn platform(&self) -> &str {
        #[cfg(target_os = "macos")]
        {
            "macos"
        }
        #[cfg(target_os = "windows")]
        {
            "windows"
        }
        #[cfg(target_os = "linux")]
        {
            "linux"
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            "unknown"
        }
    }
}

/// 플랫폼별 입력 드라이버 생성 팩토리
///
/// `dry_run`이거나 `enigo` feature가 꺼져 있으면 NoOp 드라이버,
/// 그 외에는 실제 입력 드라이버 (초기화 실패 시 NoOp 폴백).
pub fn create_platform_input_driver(dry_run: bool) -> Box<dyn InputDriver> {
    if dry_run {
        tracing::info!("드라이런 모드: 입력을 실행하지 않음");
        return Box::new(NoOpInputDriver);
    }

    #[cfg(feature = "enigo")]
    {
        match EnigoInputDriver::new() {
            Ok(driver) => {
                tracing::info!("실제 입력 드라이버 (enigo) 초기화 완료");
                return Box::new(driver);
            }
            Err(e) => {
                tracing::warn!("enigo 초기화 실패, NoOp 폴백: {e}");
            }
        }
    }

    #[cfg(not(feature = "enigo"))]
    tracing::warn!("enigo feature 비활성화: NoOp 입력 드라이버 사용");

    Box::new(NoOpInputDriver)
}

// ============================================================
// 테스트
// ============================================================
