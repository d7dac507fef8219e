//! 고객 세션 모델.
//!
//! 새 메시지 큐가 감지될 때 생성되고 채팅이 닫히면 폐기되는 일회성 컨텍스트.
//! 프로세스 재시작 간에 영속되지 않는다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 고객 1명과의 상호작용 세션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 세션(고객) 고유 ID: 대화 백엔드의 `user` 값으로도 쓰인다
    pub customer_id: String,
    /// 세션 시작 시각
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// 새 세션 생성 (ID 자동 발급)
    pub fn begin() -> Self {
        Self {
            customer_id: generate_customer_id(),
            started_at: Utc::now(),
        }
    }

    /// 세션 경과 시간 (밀리초)
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

/// 고객 ID 생성: 밀리초 타임스탬프 + 랜덤 접미사
///
/// 형식: `customer_<unix_ms>_<9자리 hex>`
pub fn generate_customer_id() -> String {
    let ts = Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("customer_{ts}_{}", &suffix[..9])
}
