//! 대화 백엔드 응답 모델 + 상담원 전환 감지 정책.

use serde::{Deserialize, Serialize};

/// 백엔드 장애 시 고객에게 보낼 안전한 기본 응답
pub const FALLBACK_REPLY: &str = "抱歉，系统暂时无法回答您的问题。";

/// 기본 상담원 전환 마커 (긴 마커가 먼저 제거되도록 정렬)
pub const DEFAULT_HANDOFF_MARKERS: [&str; 2] = ["需要转人工", "转人工"];

/// 대화 백엔드의 채팅 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// 고객에게 보낼 응답 (마커 제거됨)
    pub reply: String,
    /// 상담원 전환 필요 여부
    pub need_human: bool,
}

impl ChatReply {
    /// 백엔드 장애 시 응답: 항상 상담원 전환을 요청한다
    pub fn fallback() -> Self {
        Self {
            reply: FALLBACK_REPLY.to_string(),
            need_human: true,
        }
    }

    /// 백엔드 원문 응답에서 전환 마커를 감지/제거하여 `ChatReply` 생성.
    ///
    /// 마커가 하나라도 있으면 모든 마커 출현을 제거하고 앞뒤 공백을 정리한다.
    /// 마커가 없으면 원문을 그대로 유지한다.
    pub fn from_answer<S: AsRef<str>>(answer: &str, markers: &[S]) -> Self {
        let need_human = markers
            .iter()
            .map(AsRef::as_ref)
            .any(|m| !m.is_empty() && answer.contains(m));

        if !need_human {
            return Self {
                reply: answer.to_string(),
                need_human: false,
            };
        }

        // 긴 마커부터 제거해야 "需要转人工"이 "需要"를 남기지 않는다
        let mut ordered: Vec<&str> = markers
            .iter()
            .map(AsRef::as_ref)
            .filter(|m| !m.is_empty())
            .collect();
        ordered.sort_by_key(|m| std::cmp::Reverse(m.chars().count()));

        let stripped = ordered
            .into_iter()
            .fold(answer.to_string(), |acc, marker| acc.replace(marker, ""));

        Self {
            reply: stripped.trim().to_string(),
            need_human: true,
        }
    }

    /// 전송할 응답이 있는지 여부
    pub fn has_reply(&self) -> bool {
        !self.reply.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markers_and_flags_handoff() {
        let reply = ChatReply::from_answer("抱歉，需要转人工处理", &DEFAULT_HANDOFF_MARKERS);
        assert_eq!(reply.reply, "抱歉，处理");
        assert!(reply.need_human);
    }

    #[test]
    fn no_marker_leaves_reply_unchanged() {
        let reply = ChatReply::from_answer("您好，请问有什么可以帮您", &DEFAULT_HANDOFF_MARKERS);
        assert_eq!(reply.reply, "您好，请问有什么可以帮您");
        assert!(!reply.need_human);
    }

    #[test]
    fn marker_order_in_config_does_not_matter() {
        let markers = ["转人工", "需要转人工"];
        let reply = ChatReply::from_answer("需要转人工", &markers);
        assert_eq!(reply.reply, "");
        assert!(reply.need_human);
        assert!(!reply.has_reply());
    }

    #[test]
    fn repeated_markers_all_removed() {
        let reply = ChatReply::from_answer(" 转人工 好的 转人工 ", &DEFAULT_HANDOFF_MARKERS);
        assert_eq!(reply.reply, "好的");
        assert!(reply.need_human);
    }

    #[test]
    fn empty_markers_are_ignored() {
        let markers = [""];
        let reply = ChatReply::from_answer("您好", &markers);
        assert!(!reply.need_human);
        assert_eq!(reply.reply, "您好");
    }

    #[test]
    fn fallback_requests_human() {
        let reply = ChatReply::fallback();
        assert!(reply.need_human);
        assert!(reply.has_reply());
    }
}
