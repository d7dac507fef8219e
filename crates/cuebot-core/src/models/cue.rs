//! UI 큐(cue) 라벨.
//!
//! 오케스트레이터가 화면에서 찾는 UI 요소의 닫힌 집합.
//! 각 라벨은 시작 시 정확히 하나의 템플릿 이미지로 해석된다.

use serde::{Deserialize, Serialize};

/// 시각적으로 인식 가능한 UI 요소 라벨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueLabel {
    /// 새 메시지 알림
    NewMessage,
    /// 메시지 입력창
    InputBox,
    /// 전송 버튼
    SendButton,
    /// 상담원 전환 버튼
    TransferButton,
    /// 채팅 닫기 버튼
    CloseChat,
    /// 채팅 창 (캡처 영역 기준점)
    ChatWindow,
}

impl CueLabel {
    /// 모든 라벨 (로드 시 전수 검증용)
    pub const ALL: [CueLabel; 6] = [
        CueLabel::NewMessage,
        CueLabel::InputBox,
        CueLabel::SendButton,
        CueLabel::TransferButton,
        CueLabel::CloseChat,
        CueLabel::ChatWindow,
    ];

    /// 설정 파일 키와 동일한 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            CueLabel::NewMessage => "new_message",
            CueLabel::InputBox => "input_box",
            CueLabel::SendButton => "send_button",
            CueLabel::TransferButton => "transfer_button",
            CueLabel::CloseChat => "close_chat",
            CueLabel::ChatWindow => "chat_window",
        }
    }
}

impl std::fmt::Display for CueLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
