//! 큐 탐색.
//!
//! 캡처 포트, 템플릿 집합, 매처를 묶어 "라벨 → 화면 위치"를 제공한다.
//! 매칭은 CPU 집약적이므로 `spawn_blocking`에서 실행한다.

use std::sync::Arc;
use std::time::Duration;

use cuebot_core::error::CoreError;
use cuebot_core::models::cue::CueLabel;
use cuebot_core::models::matching::MatchResult;
use image::RgbaImage;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::capture::ScreenCapturer;
use crate::matcher::TemplateMatcher;
use crate::templates::TemplateSet;

/// 큐 탐색기
#[derive(Clone)]
pub struct CueLocator {
    capturer: Arc<dyn ScreenCapturer>,
    templates: Arc<TemplateSet>,
    matcher: TemplateMatcher,
}

impl CueLocator {
    pub fn new(
        capturer: Arc<dyn ScreenCapturer>,
        templates: Arc<TemplateSet>,
        matcher: TemplateMatcher,
    ) -> Self {
        Self {
            capturer,
            templates,
            matcher,
        }
    }

    /// 새 전체 화면 캡처에서 큐를 찾는다.
    ///
    /// 캡처 실패는 에러, 미발견은 `found: false`.
    pub async fn find(&self, label: CueLabel, threshold: f64) -> Result<MatchResult, CoreError> {
        let screen = self.capturer.capture(None).await?;
        self.find_in(Arc::new(screen), label, threshold).await
    }

    /// 이미 캡처한 화면에서 큐를 찾는다.
    pub async fn find_in(
        &self,
        screen: Arc<RgbaImage>,
        label: CueLabel,
        threshold: f64,
    ) -> Result<MatchResult, CoreError> {
        let template = Arc::clone(self.templates.get(label));
        let matcher = self.matcher.clone();

        let result =
            tokio::task::spawn_blocking(move || matcher.locate(&screen, &template, threshold))
                .await
                .map_err(|e| CoreError::Internal(format!("매칭 작업 조인 실패: {e}")))?;

        if result.found {
            debug!(label = %label, confidence = ?result.confidence, "큐 발견");
        } else {
            debug!(label = %label, "큐 미발견");
        }
        Ok(result)
    }

    /// 큐가 나타날 때까지 `poll_interval` 간격으로 재탐색한다.
    ///
    /// 타임아웃이 지나면 `found: false`. 대기 시간은 남은 시간으로 잘리므로
    /// 총 소요 시간은 `timeout + poll_interval`을 넘지 않는다.
    /// `cancel`이 `true`로 바뀌면 `CoreError::Cancelled`.
    pub async fn wait_for(
        &self,
        label: CueLabel,
        threshold: f64,
        timeout: Duration,
        poll_interval: Duration,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<MatchResult, CoreError> {
        let deadline = Instant::now() + timeout;

        loop {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                return Err(CoreError::Cancelled);
            }

            let result = self.find(label, threshold).await?;
            if result.found {
                return Ok(result);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(label = %label, timeout_ms = timeout.as_millis() as u64, "큐 대기 타임아웃");
                return Ok(MatchResult::not_found());
            }
            let wake = now + poll_interval.min(deadline - now);

            // 취소 채널 변경은 대기를 끝내지 않는다: `true`일 때만 중단
            while let Some(rx) = cancel.as_mut() {
                let signal = tokio::select! {
                    _ = tokio::time::sleep_until(wake) => None,
                    changed = rx.changed() => Some(changed.is_ok()),
                };
                match signal {
                    None => break,
                    Some(true) if *rx.borrow() => return Err(CoreError::Cancelled),
                    Some(true) => {}
                    // 송신측이 사라지면 더 이상 취소될 수 없음
                    Some(false) => cancel = None,
                }
            }
            tokio::time::sleep_until(wake).await;
        }
    }
}
