//! # cuebot-vision
//!
//! 화면에서 UI 큐를 찾는 비전 레이어.
//!
//! - [`matcher`]: 슬라이딩 윈도우 템플릿 매칭 (전략 교체 가능)
//! - [`templates`]: 큐 라벨별 템플릿 이미지 집합
//! - [`capture`]: 스크린 캡처 포트 + xcap 어댑터
//! - [`locator`]: 캡처 + 매칭을 묶은 큐 탐색 (`find` / `wait_for`)
//! - [`screenshot_store`]: 채팅 영역 스크린샷 저장/정리

pub mod capture;
pub mod locator;
pub mod matcher;
pub mod screenshot_store;
pub mod templates;
