//! 대화 백엔드 포트.
//!
//! 스크린샷 업로드, 이미지 텍스트 추출(비전 워크플로), 채팅 응답 생성을 추상화한다.
//! 오케스트레이터는 각 호출의 완료를 기다린 뒤 다음 상태로 진행한다.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::conversation::ChatReply;

/// 대화 백엔드: 외부 AI 워크플로 API
///
/// 구현체: `DifyClient` (HTTP)
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// 이미지 파일 업로드 → 파일 ID
    async fn upload_image(&self, path: &Path, user_id: &str) -> Result<String, CoreError>;

    /// 업로드된 이미지에서 텍스트 추출
    async fn extract_text(&self, file_id: &str, user_id: &str) -> Result<String, CoreError>;

    /// 채팅 응답 생성.
    ///
    /// 실패하지 않는다: 네트워크/API 에러 시 `ChatReply::fallback()`을 반환한다.
    async fn chat(&self, user_id: &str, text: &str) -> ChatReply;

    /// 백엔드 연결 가능 여부
    async fn check_connectivity(&self) -> bool;

    /// 업로드 후 텍스트 추출
    async fn analyze_image(&self, path: &Path, user_id: &str) -> Result<String, CoreError> {
        let file_id = self.upload_image(path, user_id).await?;
        self.extract_text(&file_id, user_id).await
    }

    /// 백엔드 이름 (로그용)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// analyze_image 기본 구현 검증용 Mock
    struct MockBackend {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationBackend for MockBackend {
        async fn upload_image(&self, path: &Path, user_id: &str) -> Result<String, CoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upload:{}:{user_id}", path.display()));
            Ok("file_42".to_string())
        }

        async fn extract_text(&self, file_id: &str, user_id: &str) -> Result<String, CoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("extract:{file_id}:{user_id}"));
            Ok("您好".to_string())
        }

        async fn chat(&self, _user_id: &str, _text: &str) -> ChatReply {
            ChatReply::fallback()
        }

        async fn check_connectivity(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct FailingUpload;

    #[async_trait]
    impl ConversationBackend for FailingUpload {
        async fn upload_image(&self, _path: &Path, _user_id: &str) -> Result<String, CoreError> {
            Err(CoreError::Network("업로드 실패".to_string()))
        }

        async fn extract_text(&self, _file_id: &str, _user_id: &str) -> Result<String, CoreError> {
            unreachable!("업로드 실패 시 추출을 호출하면 안 됨")
        }

        async fn chat(&self, _user_id: &str, _text: &str) -> ChatReply {
            ChatReply::fallback()
        }

        async fn check_connectivity(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn analyze_image_uploads_then_extracts() {
        let backend = MockBackend {
            calls: Mutex::new(Vec::new()),
        };
        let text = backend
            .analyze_image(Path::new("shot.png"), "customer_1")
            .await
            .unwrap();
        assert_eq!(text, "您好");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0], "upload:shot.png:customer_1");
        assert_eq!(calls[1], "extract:file_42:customer_1");
    }

    #[tokio::test]
    async fn analyze_image_stops_on_upload_failure() {
        let result = FailingUpload
            .analyze_image(Path::new("shot.png"), "customer_1")
            .await;
        assert!(matches!(result, Err(CoreError::Network(_))));
    }
}
