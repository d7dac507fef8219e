//! 입력 드라이버 포트.
//!
//! 마우스/키보드 조작을 위한 크로스 플랫폼 인터페이스를 정의한다.
//! 모든 동작은 best-effort이며 실패는 `Err`로만 전달된다 (panic 금지).

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::automation::{MouseButton, ScrollDirection};
use crate::models::geometry::Point;

/// 입력 드라이버: 마우스/키보드 시뮬레이션 인터페이스
///
/// 구현체: `EnigoInputDriver` (실제 입력), `NoOpInputDriver`, `RecordingInputDriver`
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// 마우스 이동
    async fn mouse_move(&self, x: i32, y: i32) -> Result<(), CoreError>;

    /// 마우스 클릭 (해당 좌표로 이동 후 클릭)
    async fn mouse_click(&self, button: MouseButton, x: i32, y: i32) -> Result<(), CoreError>;

    /// 왼쪽 버튼 더블 클릭
    async fn double_click(&self, x: i32, y: i32) -> Result<(), CoreError>;

    /// 왼쪽 버튼 드래그
    async fn drag(&self, from: Point, to: Point) -> Result<(), CoreError>;

    /// 텍스트 입력
    async fn type_text(&self, text: &str) -> Result<(), CoreError>;

    /// 단일 키 누름 + 놓음
    async fn press_key(&self, key: &str) -> Result<(), CoreError>;

    /// 단축키 (순서대로 누르고 역순으로 놓음)
    async fn hotkey(&self, keys: &[String]) -> Result<(), CoreError>;

    /// 휠 스크롤 (`count` 노치)
    async fn scroll(&self, direction: ScrollDirection, count: u32) -> Result<(), CoreError>;

    /// 플랫폼 이름 (예: "macos", "windows", "linux", "noop")
    fn platform(&self) -> &str;
}

/// 플랫폼별 "전체 선택" 단축키 구성
pub fn select_all_keys() -> Vec<String> {
    let modifier = if cfg!(target_os = "macos") {
        "cmd"
    } else {
        "ctrl"
    };
    vec![modifier.to_string(), "a".to_string()]
}
