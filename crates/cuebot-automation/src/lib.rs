//! # cuebot-automation
//!
//! 입력 드라이버 어댑터와 상담 오케스트레이터 상태 머신.
//!
//! - [`input_driver`]: enigo 기반 입력 드라이버, NoOp/기록 드라이버
//! - [`orchestrator`]: 폴링 루프, 세션 처리, start/stop/manual_check

pub mod input_driver;
pub mod orchestrator;
