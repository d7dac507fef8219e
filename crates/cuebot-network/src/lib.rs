//! # cuebot-network
//!
//! 대화 백엔드 어댑터. [`dify_client::DifyClient`]가
//! `ConversationBackend` 포트를 HTTP로 구현한다.

pub mod dify_client;
