//! CUEBOT 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 에러 타입을 그대로 반환하거나 `#[from]`으로 래핑한다.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::cue::CueLabel;

/// 코어 레이어 에러.
/// 설정, 캡처, 입력, 네트워크 등 도메인 공통 에러를 정의한다.
///
/// "큐를 찾지 못함"은 에러가 아니다: `MatchResult::not_found()`로 표현한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 템플릿 이미지 누락 또는 디코딩 실패 (시작 시 치명적)
    #[error("템플릿 이미지 로드 실패: {label}: {path} ({reason})")]
    TemplateMissing {
        /// 큐 라벨
        label: CueLabel,
        /// 설정된 파일 경로
        path: PathBuf,
        /// 실패 사유
        reason: String,
    },

    /// 이미지 인코딩/디코딩 실패
    #[error("이미지 에러: {0}")]
    Image(String),

    /// 스크린 캡처 실패 ("미발견"과 구분되는 실패)
    #[error("캡처 에러: {0}")]
    Capture(String),

    /// 마우스/키보드 입력 실패
    #[error("입력 에러: {0}")]
    Input(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 대화 백엔드가 비정상 응답을 반환함
    #[error("백엔드 에러 ({status}): {message}")]
    Backend {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 요약
        message: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 종료 신호로 대기 취소됨
    #[error("작업 취소됨")]
    Cancelled,

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 필드 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_contains_field() {
        let err = CoreError::validation("settings.match_stride", "0은 허용되지 않음");
        let msg = err.to_string();
        assert!(msg.contains("settings.match_stride"));
        assert!(msg.contains("0은 허용되지 않음"));
    }

    #[test]
    fn template_missing_names_label_and_path() {
        let err = CoreError::TemplateMissing {
            label: CueLabel::SendButton,
            path: PathBuf::from("templates/send_button.png"),
            reason: "파일 없음".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("send_button"));
        assert!(msg.contains("templates/send_button.png"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
