//! 입력 자동화 액션 모델.
//!
//! 입력 드라이버 포트가 수행하는 동작을 값으로 표현한다.
//! 기록 드라이버(테스트/드라이런)가 이 타입으로 동작 이력을 남긴다.

use serde::{Deserialize, Serialize};

/// 마우스 버튼 유형
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// 스크롤 방향
///
/// `Up`은 콘텐츠를 위쪽(문서 시작 방향)으로 스크롤한다.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// 1회 스크롤당 휠 델타 (양수 = 아래)
    pub fn wheel_delta(&self) -> i32 {
        match self {
            ScrollDirection::Up => -1,
            ScrollDirection::Down => 1,
        }
    }
}

/// 자동화 액션 유형
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomationAction {
    /// 마우스 이동
    MouseMove { x: i32, y: i32 },
    /// 마우스 클릭
    MouseClick { button: MouseButton, x: i32, y: i32 },
    /// 더블 클릭
    DoubleClick { x: i32, y: i32 },
    /// 드래그 (왼쪽 버튼)
    Drag {
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    },
    /// 텍스트 입력
    KeyType { text: String },
    /// 단일 키 누름 + 놓음
    KeyPress { key: String },
    /// 단축키 (복합 키)
    Hotkey { keys: Vec<String> },
    /// 휠 스크롤
    Scroll {
        direction: ScrollDirection,
        count: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_action_serde_roundtrip() {
        let action = AutomationAction::MouseClick {
            button: MouseButton::Left,
            x: 100,
            y: 200,
        };
        let json = serde_json::to_string(&action).unwrap();
        let deser: AutomationAction = serde_json::from_str(&json).unwrap();
        assert_eq!(deser, action);
    }

    #[test]
    fn scroll_direction_convention() {
        assert_eq!(ScrollDirection::Up.wheel_delta(), -1);
        assert_eq!(ScrollDirection::Down.wheel_delta(), 1);
    }

    #[test]
    fn mouse_button_serde_lowercase() {
        let json = serde_json::to_string(&MouseButton::Right).unwrap();
        assert_eq!(json, "\"right\"");
    }
}
