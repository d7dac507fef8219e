//! 스크린 캡처.
//!
//! [`ScreenCapturer`] 포트와 xcap 기반 주 모니터 캡처 어댑터.
//! 캡처 실패는 `CoreError::Capture`로 보고되며 "미발견"과 구분된다.

use std::collections::VecDeque;

use async_trait::async_trait;
use cuebot_core::error::CoreError;
use cuebot_core::models::geometry::Region;
use image::{imageops, RgbaImage};
use parking_lot::Mutex;
use tracing::debug;
use xcap::Monitor;

/// 스크린 캡처 포트
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    /// 전체 화면(`None`) 또는 지정 영역 캡처.
    ///
    /// 영역은 화면 경계로 잘리며, 잘린 결과가 비면 에러.
    async fn capture(&self, region: Option<Region>) -> Result<RgbaImage, CoreError>;

    /// 구현체 이름
    fn name(&self) -> &str;
}

/// 화면 이미지에서 영역을 잘라낸다 (화면 경계로 클리핑)
pub fn crop_to_region(screen: &RgbaImage, region: Region) -> Result<RgbaImage, CoreError> {
    let clipped = region
        .clip_to(screen.width(), screen.height())
        .ok_or_else(|| {
            CoreError::Capture(format!(
                "캡처 영역이 화면 밖: {:?} (화면 {}x{})",
                region,
                screen.width(),
                screen.height()
            ))
        })?;

    Ok(
        imageops::crop_imm(screen, clipped.x, clipped.y, clipped.width, clipped.height)
            .to_image(),
    )
}

// ============================================================
// xcap 어댑터
// ============================================================

/// 주 모니터 캡처: xcap 기반
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapScreenCapturer;

impl XcapScreenCapturer {
    pub fn new() -> Self {
        Self
    }

    fn capture_primary() -> Result<RgbaImage, CoreError> {
        let monitors = Monitor::all()
            .map_err(|e| CoreError::Capture(format!("모니터 목록 조회 실패: {e}")))?;

        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| CoreError::Capture("모니터를 찾을 수 없음".to_string()))?;

        let image = monitor
            .capture_image()
            .map_err(|e| CoreError::Capture(format!("스크린 캡처 실패: {e}")))?;

        debug!("스크린 캡처 완료: {}x{}", image.width(), image.height());
        Ok(image)
    }
}

#[async_trait]
impl ScreenCapturer for XcapScreenCapturer {
    async fn capture(&self, region: Option<Region>) -> Result<RgbaImage, CoreError> {
        tokio::task::spawn_blocking(move || {
            let screen = Self::capture_primary()?;
            match region {
                Some(region) => crop_to_region(&screen, region),
                None => Ok(screen),
            }
        })
        .await
        .map_err(|e| CoreError::Internal(format!("캡처 작업 조인 실패: {e}")))?
    }

    fn name(&self) -> &str {
        "xcap"
    }
}

// ============================================================
// 스크립트 캡처 (테스트/시연용)
// ============================================================

/// 미리 준비한 화면을 순서대로 돌려주는 캡처기.
///
/// 큐가 비면 마지막 화면을 계속 반환한다. 화면이 하나도 없으면 캡처 실패.
#[derive(Debug, Default)]
pub struct ScriptedScreenCapturer {
    frames: Mutex<VecDeque<RgbaImage>>,
    last: Mutex<Option<RgbaImage>>,
    captures: Mutex<Vec<Option<Region>>>,
}

impl ScriptedScreenCapturer {
    pub fn new(frames: impl IntoIterator<Item = RgbaImage>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
            last: Mutex::new(None),
            captures: Mutex::new(Vec::new()),
        }
    }

    /// 항상 같은 화면을 반환
    pub fn fixed(screen: RgbaImage) -> Self {
        Self::new([screen])
    }

    /// 다음 캡처부터 사용할 화면 추가
    pub fn push_frame(&self, frame: RgbaImage) {
        self.frames.lock().push_back(frame);
    }

    /// 지금까지 요청된 캡처 영역 기록
    pub fn captured_regions(&self) -> Vec<Option<Region>> {
        self.captures.lock().clone()
    }

    fn next_frame(&self) -> Option<RgbaImage> {
        let mut last = self.last.lock();
        if let Some(frame) = self.frames.lock().pop_front() {
            *last = Some(frame);
        }
        last.clone()
    }
}

#[async_trait]
impl ScreenCapturer for ScriptedScreenCapturer {
    async fn capture(&self, region: Option<Region>) -> Result<RgbaImage, CoreError> {
        self.captures.lock().push(region);
        let screen = self
            .next_frame()
            .ok_or_else(|| CoreError::Capture("준비된 화면 없음".to_string()))?;
        match region {
            Some(region) => crop_to_region(&screen, region),
            None => Ok(screen),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
