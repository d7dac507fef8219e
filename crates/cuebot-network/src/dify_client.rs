//! Dify 대화 백엔드 클라이언트.
//!
//! Dify 워크플로/채팅 API를 호출한다.
//! - 파일 업로드: `POST file_upload_url` (multipart: `file`, `user`)
//! - 비전 워크플로: `POST vision_api_url` (blocking 모드)
//! - 채팅: `POST chat_api_url` (blocking 모드)
//!
//! 업로드/비전 호출은 `vision_api_key`, 채팅 호출은 `api_key`를 Bearer로 사용한다.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use cuebot_core::config::BackendConfig;
use cuebot_core::error::CoreError;
use cuebot_core::models::conversation::ChatReply;
use cuebot_core::ports::conversation::ConversationBackend;

/// 연결 확인용 질의
const CONNECTIVITY_QUERY: &str = "测试连接";

/// 연결 확인용 사용자
const CONNECTIVITY_USER: &str = "test_user";

/// 에러 응답 본문 로그 최대 길이
const ERROR_BODY_LIMIT: usize = 200;

/// 파일 업로드 응답
#[derive(Debug, Deserialize)]
struct FileUploadResponse {
    #[serde(default)]
    id: Option<String>,
}

/// 채팅 응답 (필요한 필드만)
#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    answer: Option<String>,
}

// ============================================================
// DifyClient
// ============================================================

/// Dify HTTP 클라이언트
#[derive(Debug)]
pub struct DifyClient {
    /// HTTP 클라이언트
    http_client: reqwest::Client,
    vision_api_url: String,
    chat_api_url: String,
    file_upload_url: String,
    /// 채팅 API 키 (메모리에만 유지)
    api_key: String,
    /// 비전/업로드 API 키
    vision_api_key: String,
    /// 상담원 전환 마커
    handoff_markers: Vec<String>,
    /// 연결 확인 타임아웃
    connectivity_timeout: Duration,
}

impl DifyClient {
    /// 새 DifyClient 생성
    pub fn new(config: &BackendConfig) -> Result<Self, CoreError> {
        if config.api_key.is_empty() || config.vision_api_key.is_empty() {
            return Err(CoreError::Config("Dify API 키 미설정".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        debug!(
            chat_url = %config.chat_api_url,
            vision_url = %config.vision_api_url,
            timeout = config.timeout_secs,
            "DifyClient 초기화"
        );

        Ok(Self {
            http_client,
            vision_api_url: config.vision_api_url.clone(),
            chat_api_url: config.chat_api_url.clone(),
            file_upload_url: config.file_upload_url.clone(),
            api_key: config.api_key.clone(),
            vision_api_key: config.vision_api_key.clone(),
            handoff_markers: config.handoff_markers.clone(),
            connectivity_timeout: config.connectivity_timeout(),
        })
    }

    /// 채팅 요청 본문
    fn chat_payload(user_id: &str, query: &str) -> Value {
        json!({
            "inputs": {},
            "query": query,
            "user": user_id,
            "response_mode": "blocking",
        })
    }

    /// 채팅 API 호출 → 원문 `answer`
    async fn request_answer(&self, user_id: &str, text: &str) -> Result<String, CoreError> {
        let response = self
            .http_client
            .post(&self.chat_api_url)
            .bearer_auth(&self.api_key)
            .json(&Self::chat_payload(user_id, text))
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("채팅 요청 실패: {}", e)))?;

        let body: ChatMessageResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Network(format!("채팅 응답 파싱 실패: {}", e)))?;

        Ok(body.answer.unwrap_or_default())
    }
}

/// 비정상 상태 코드를 `CoreError::Backend`로 변환
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CoreError::Backend {
        status: status.as_u16(),
        message: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}

/// 비전 워크플로 응답에서 텍스트 추출.
///
/// `data.outputs`가 문자열이면 그대로, 객체면 `text` 필드 또는 첫 문자열 필드,
/// 없으면 최상위 `answer`.
fn extract_output_text(body: &Value) -> Option<String> {
    let from_outputs = body
        .get("data")
        .and_then(|d| d.get("outputs"))
        .and_then(|outputs| match outputs {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| map.values().find_map(Value::as_str))
                .map(str::to_string),
            _ => None,
        })
        .filter(|s| !s.is_empty());

    from_outputs.or_else(|| {
        body.get("answer")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

#[async_trait]
impl ConversationBackend for DifyClient {
    async fn upload_image(&self, path: &Path, user_id: &str) -> Result<String, CoreError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("screenshot.png")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| CoreError::Internal(format!("multipart 구성 실패: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("user", user_id.to_string());

        let response = self
            .http_client
            .post(&self.file_upload_url)
            .bearer_auth(&self.vision_api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("파일 업로드 실패: {}", e)))?;

        let body: FileUploadResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Network(format!("업로드 응답 파싱 실패: {}", e)))?;

        match body.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                info!(file_id = %id, "파일 업로드 성공");
                Ok(id)
            }
            None => Err(CoreError::Backend {
                status: 200,
                message: "업로드 응답에 파일 ID 없음".to_string(),
            }),
        }
    }

    async fn extract_text(&self, file_id: &str, user_id: &str) -> Result<String, CoreError> {
        let payload = json!({
            "inputs": {
                "input": {
                    "transfer_method": "local_file",
                    "upload_file_id": file_id,
                    "type": "image",
                }
            },
            "response_mode": "blocking",
            "user": user_id,
        });

        let response = self
            .http_client
            .post(&self.vision_api_url)
            .bearer_auth(&self.vision_api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("비전 워크플로 요청 실패: {}", e)))?;

        let body: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Network(format!("비전 응답 파싱 실패: {}", e)))?;

        let text = extract_output_text(&body).unwrap_or_default();
        debug!(chars = text.chars().count(), "이미지 텍스트 추출 완료");
        Ok(text)
    }

    async fn chat(&self, user_id: &str, text: &str) -> ChatReply {
        match self.request_answer(user_id, text).await {
            Ok(answer) => {
                let reply = ChatReply::from_answer(&answer, &self.handoff_markers);
                debug!(need_human = reply.need_human, "채팅 응답 수신");
                reply
            }
            Err(e) => {
                warn!("채팅 API 호출 실패, 기본 응답 사용: {}", e);
                ChatReply::fallback()
            }
        }
    }

    async fn check_connectivity(&self) -> bool {
        let result = self
            .http_client
            .post(&self.chat_api_url)
            .bearer_auth(&self.api_key)
            .timeout(self.connectivity_timeout)
            .json(&Self::chat_payload(CONNECTIVITY_USER, CONNECTIVITY_QUERY))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Dify API 연결 정상");
                true
            }
            Ok(response) => {
                warn!("Dify API 연결 실패: HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Dify API 연결 실패: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "dify"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebot_core::models::conversation::FALLBACK_REPLY;
    use mockito::Matcher;

    fn config_for(server: &mockito::ServerGuard) -> BackendConfig {
        BackendConfig {
            vision_api_url: format!("{}/v1/workflows/run", server.url()),
            chat_api_url: format!("{}/v1/chat-messages", server.url()),
            file_upload_url: format!("{}/v1/files/upload", server.url()),
            api_key: "app-chat".to_string(),
            vision_api_key: "app-vision".to_string(),
            timeout_secs: 5,
            connectivity_timeout_secs: 2,
            handoff_markers: vec!["需要转人工".to_string(), "转人工".to_string()],
        }
    }

    #[test]
    fn empty_key_rejected() {
        let mut config = BackendConfig {
            vision_api_url: "http://localhost/run".to_string(),
            chat_api_url: "http://localhost/chat".to_string(),
            file_upload_url: "http://localhost/upload".to_string(),
            api_key: String::new(),
            vision_api_key: "v".to_string(),
            timeout_secs: 5,
            connectivity_timeout_secs: 2,
            handoff_markers: Vec::new(),
        };
        assert!(matches!(DifyClient::new(&config), Err(CoreError::Config(_))));
        config.api_key = "k".to_string();
        assert!(DifyClient::new(&config).is_ok());
    }

    #[test]
    fn output_text_variants() {
        let plain = json!({"data": {"outputs": "你好"}});
        assert_eq!(extract_output_text(&plain).as_deref(), Some("你好"));

        let with_text = json!({"data": {"outputs": {"other": "x", "text": "在吗"}}});
        assert_eq!(extract_output_text(&with_text).as_deref(), Some("在吗"));

        let first_string = json!({"data": {"outputs": {"count": 3, "result": "发货了吗"}}});
        assert_eq!(extract_output_text(&first_string).as_deref(), Some("发货了吗"));

        let answer_only = json!({"answer": "您好"});
        assert_eq!(extract_output_text(&answer_only).as_deref(), Some("您好"));

        assert_eq!(extract_output_text(&json!({})), None);
    }

    #[tokio::test]
    async fn upload_image_sends_multipart_with_vision_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/files/upload")
            .match_header("authorization", "Bearer app-vision")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(Matcher::Regex("customer_1".to_string()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"file-123","name":"shot.png"}"#)
            .create_async()
            .await;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("shot.png");
        std::fs::write(&path, b"fake png bytes").unwrap();

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let file_id = client.upload_image(&path, "customer_1").await.unwrap();
        assert_eq!(file_id, "file-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_missing_file_is_io_error() {
        let server = mockito::Server::new_async().await;
        let client = DifyClient::new(&config_for(&server)).unwrap();
        let err = client
            .upload_image(Path::new("/nonexistent/shot.png"), "c")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[tokio::test]
    async fn upload_without_id_is_backend_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/files/upload")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("shot.png");
        std::fs::write(&path, b"png").unwrap();

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let err = client.upload_image(&path, "c").await.unwrap_err();
        assert!(matches!(err, CoreError::Backend { .. }));
    }

    #[tokio::test]
    async fn extract_text_posts_workflow_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflows/run")
            .match_header("authorization", "Bearer app-vision")
            .match_body(Matcher::PartialJson(json!({
                "inputs": {"input": {
                    "transfer_method": "local_file",
                    "upload_file_id": "file-123",
                    "type": "image"
                }},
                "response_mode": "blocking",
                "user": "customer_1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"outputs":{"text":"您好"}}}"#)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let text = client.extract_text("file-123", "customer_1").await.unwrap();
        assert_eq!(text, "您好");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn extract_text_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/workflows/run")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let err = client.extract_text("f", "c").await.unwrap_err();
        assert!(matches!(err, CoreError::Backend { status: 500, .. }));
    }

    #[tokio::test]
    async fn chat_detects_handoff() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat-messages")
            .match_header("authorization", "Bearer app-chat")
            .match_body(Matcher::PartialJson(json!({
                "inputs": {},
                "query": "退货",
                "user": "customer_1",
                "response_mode": "blocking"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"抱歉，需要转人工处理"}"#)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let reply = client.chat("customer_1", "退货").await;
        assert_eq!(reply.reply, "抱歉，处理");
        assert!(reply.need_human);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chat_plain_answer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat-messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"您好，请问有什么可以帮您"}"#)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let reply = client.chat("customer_1", "您好").await;
        assert_eq!(reply.reply, "您好，请问有什么可以帮您");
        assert!(!reply.need_human);
    }

    #[tokio::test]
    async fn chat_failure_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat-messages")
            .with_status(503)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        let reply = client.chat("customer_1", "在吗").await;
        assert_eq!(reply.reply, FALLBACK_REPLY);
        assert!(reply.need_human);
    }

    #[tokio::test]
    async fn connectivity_uses_test_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat-messages")
            .match_body(Matcher::PartialJson(json!({
                "query": "测试连接",
                "user": "test_user"
            })))
            .with_status(200)
            .with_body(r#"{"answer":"ok"}"#)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        assert!(client.check_connectivity().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connectivity_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat-messages")
            .with_status(401)
            .create_async()
            .await;

        let client = DifyClient::new(&config_for(&server)).unwrap();
        assert!(!client.check_connectivity().await);
    }
}
