//! 템플릿 매칭.
//!
//! 스크린 이미지 위에서 템플릿을 슬라이딩하며 일치 픽셀 비율(신뢰도)이
//! 가장 높은 오프셋을 찾는다.
//!
//! - 픽셀 일치: RGB 채널별 절대 차이의 합 ≤ `pixel_tolerance` (알파 무시)
//! - 신뢰도: 일치 픽셀 수 / 템플릿 전체 픽셀 수
//! - 탐색 순서: 행 우선 (위→아래, 왼→오), `stride` 간격
//! - 동점: 먼저 발견된 오프셋 유지 (엄격히 클 때만 교체)
//!
//! 탐색 알고리즘은 [`MatchStrategy`]로 교체할 수 있으며, 모든 전략은
//! [`ExhaustiveScan`]과 동일한 결과를 내야 한다.

use std::sync::Arc;

use cuebot_core::models::geometry::Region;
use cuebot_core::models::matching::MatchResult;
use image::RgbaImage;
use tracing::trace;

/// 매칭 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// 오프셋 간격 (1 = 전수 탐색, 0은 1로 취급)
    pub stride: u32,
    /// 픽셀 일치 허용 오차
    pub pixel_tolerance: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            stride: 2,
            pixel_tolerance: 20,
        }
    }
}

impl MatchOptions {
    fn step(&self) -> usize {
        self.stride.max(1) as usize
    }
}

/// 최고 점수 오프셋
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestOffset {
    pub x: u32,
    pub y: u32,
    /// 일치 픽셀 수
    pub matching: u64,
}

/// 탐색 전략.
///
/// 호출자는 템플릿이 비어있지 않고 스크린 안에 들어간다는 것을 보장한다.
pub trait MatchStrategy: Send + Sync {
    /// 행 우선 순서에서 일치 픽셀 수가 가장 큰 첫 오프셋
    fn best_offset(
        &self,
        screen: &RgbaImage,
        template: &RgbaImage,
        options: &MatchOptions,
    ) -> Option<BestOffset>;

    /// 전략 이름 (로깅용)
    fn name(&self) -> &str;
}

// ============================================================
// 공통 픽셀 비교
// ============================================================

#[inline]
fn pixel_matches(a: &[u8], b: &[u8], tolerance: u32) -> bool {
    let diff = (a[0] as i32 - b[0] as i32).unsigned_abs()
        + (a[1] as i32 - b[1] as i32).unsigned_abs()
        + (a[2] as i32 - b[2] as i32).unsigned_abs();
    diff <= tolerance
}

/// 오프셋 (ox, oy)에서 템플릿을 비교한다.
///
/// 불일치 수가 `max_mismatches`를 넘으면 즉시 `None`을 반환한다.
fn count_matching(
    screen: &RgbaImage,
    template: &RgbaImage,
    ox: u32,
    oy: u32,
    tolerance: u32,
    max_mismatches: Option<u64>,
) -> Option<u64> {
    let screen_raw = screen.as_raw();
    let template_raw = template.as_raw();
    let screen_stride = screen.width() as usize * 4;
    let row_len = template.width() as usize * 4;

    let mut matching = 0u64;
    let mut mismatches = 0u64;

    for ty in 0..template.height() as usize {
        let s_start = (oy as usize + ty) * screen_stride + ox as usize * 4;
        let t_start = ty * row_len;
        let s_row = &screen_raw[s_start..s_start + row_len];
        let t_row = &template_raw[t_start..t_start + row_len];

        for (s_px, t_px) in s_row.chunks_exact(4).zip(t_row.chunks_exact(4)) {
            if pixel_matches(s_px, t_px, tolerance) {
                matching += 1;
            } else {
                mismatches += 1;
                if let Some(limit) = max_mismatches {
                    if mismatches > limit {
                        return None;
                    }
                }
            }
        }
    }

    Some(matching)
}

/// 행 우선 순서로 오프셋 나열
fn offsets(
    screen: &RgbaImage,
    template: &RgbaImage,
    options: &MatchOptions,
) -> impl Iterator<Item = (u32, u32)> {
    let max_x = screen.width() - template.width();
    let max_y = screen.height() - template.height();
    let step = options.step();
    (0..=max_y)
        .step_by(step)
        .flat_map(move |y| (0..=max_x).step_by(step).map(move |x| (x, y)))
}

// ============================================================
// 전략 구현
// ============================================================

/// 기준 전수 탐색.
///
/// 모든 오프셋에서 템플릿 전체를 비교한다.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExhaustiveScan;

impl MatchStrategy for ExhaustiveScan {
    fn best_offset(
        &self,
        screen: &RgbaImage,
        template: &RgbaImage,
        options: &MatchOptions,
    ) -> Option<BestOffset> {
        let mut best: Option<BestOffset> = None;

        for (x, y) in offsets(screen, template, options) {
            let Some(matching) =
                count_matching(screen, template, x, y, options.pixel_tolerance, None)
            else {
                continue;
            };
            if best.map_or(true, |b| matching > b.matching) {
                best = Some(BestOffset { x, y, matching });
            }
        }

        best
    }

    fn name(&self) -> &str {
        "exhaustive"
    }
}

/// 가지치기 탐색.
///
/// 현재 최고 점수를 엄격히 넘을 수 없다고 확정된 오프셋은 비교를 중단한다.
/// 완전 일치가 나오면 더 이상 교체될 수 없으므로 탐색을 끝낸다.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrunedScan;

impl MatchStrategy for PrunedScan {
    fn best_offset(
        &self,
        screen: &RgbaImage,
        template: &RgbaImage,
        options: &MatchOptions,
    ) -> Option<BestOffset> {
        let total = u64::from(template.width()) * u64::from(template.height());
        let mut best: Option<BestOffset> = None;

        for (x, y) in offsets(screen, template, options) {
            // matching > best 이려면 mismatches < total - best
            let limit = best.map(|b| (total - b.matching).saturating_sub(1));
            if let Some(matching) =
                count_matching(screen, template, x, y, options.pixel_tolerance, limit)
            {
                if best.map_or(true, |b| matching > b.matching) {
                    best = Some(BestOffset { x, y, matching });
                    if matching == total {
                        break;
                    }
                }
            }
        }

        best
    }

    fn name(&self) -> &str {
        "pruned"
    }
}

// ============================================================
// TemplateMatcher
// ============================================================

/// 점수가 매겨진 최고 후보 (임계값 적용 전)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub region: Region,
    pub confidence: f64,
}

/// 템플릿 매처: 전략 + 파라미터
#[derive(Clone)]
pub struct TemplateMatcher {
    strategy: Arc<dyn MatchStrategy>,
    options: MatchOptions,
}

impl TemplateMatcher {
    pub fn new(strategy: Arc<dyn MatchStrategy>, options: MatchOptions) -> Self {
        Self { strategy, options }
    }

    /// 기본 전략 ([`PrunedScan`])
    pub fn pruned(options: MatchOptions) -> Self {
        Self::new(Arc::new(PrunedScan), options)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// 임계값과 무관하게 최고 후보를 계산한다.
    ///
    /// 템플릿이 비었거나 스크린보다 크면 `None`.
    pub fn best_candidate(
        &self,
        screen: &RgbaImage,
        template: &RgbaImage,
    ) -> Option<ScoredCandidate> {
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > screen.width() || th > screen.height() {
            return None;
        }

        let best = self.strategy.best_offset(screen, template, &self.options)?;
        let total = u64::from(tw) * u64::from(th);

        Some(ScoredCandidate {
            region: Region::new(best.x, best.y, tw, th),
            confidence: best.matching as f64 / total as f64,
        })
    }

    /// 스크린에서 템플릿 위치를 찾는다.
    ///
    /// 최고 신뢰도가 `threshold` 이상일 때만 `found: true`.
    pub fn locate(&self, screen: &RgbaImage, template: &RgbaImage, threshold: f64) -> MatchResult {
        match self.best_candidate(screen, template) {
            Some(candidate) if candidate.confidence >= threshold => {
                trace!(
                    strategy = self.strategy.name(),
                    x = candidate.region.x,
                    y = candidate.region.y,
                    confidence = candidate.confidence,
                    "템플릿 매칭 성공"
                );
                MatchResult::hit(candidate.region, candidate.confidence)
            }
            _ => MatchResult::not_found(),
        }
    }
}

impl std::fmt::Debug for TemplateMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateMatcher")
            .field("strategy", &self.strategy.name())
            .field("options", &self.options)
            .finish()
    }
}
