//! CUEBOT 도메인 모델.
//!
//! 매칭 엔진과 오케스트레이터가 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod automation;
pub mod conversation;
pub mod cue;
pub mod geometry;
pub mod matching;
pub mod session;
