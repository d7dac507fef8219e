//! 템플릿 매칭 결과 모델.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Region};

/// 템플릿 매칭 결과
///
/// `found = true`일 때만 나머지 필드가 채워진다.
/// `location`은 항상 `region`의 중심점이다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 임계값 이상으로 매칭되었는지 여부
    pub found: bool,
    /// 매칭 영역 중심 (클릭 지점)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Point>,
    /// 매칭 영역 (템플릿 크기)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    /// 일치 픽셀 비율 (0.0 ~ 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl MatchResult {
    /// 미발견 결과
    pub fn not_found() -> Self {
        Self {
            found: false,
            location: None,
            region: None,
            confidence: None,
        }
    }

    /// 발견 결과: `location`은 영역 중심으로 계산
    pub fn hit(region: Region, confidence: f64) -> Self {
        Self {
            found: true,
            location: Some(region.center()),
            region: Some(region),
            confidence: Some(confidence),
        }
    }

    /// 발견된 경우 클릭 지점 반환
    pub fn hit_location(&self) -> Option<Point> {
        if self.found {
            self.location
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_location_is_region_center() {
        let result = MatchResult::hit(Region::new(100, 100, 40, 20), 1.0);
        assert_eq!(result.hit_location(), Some(Point::new(120, 110)));
    }

    #[test]
    fn not_found_has_no_location() {
        let result = MatchResult::not_found();
        assert!(!result.found);
        assert!(result.hit_location().is_none());
    }

    #[test]
    fn not_found_serializes_compactly() {
        let json = serde_json::to_string(&MatchResult::not_found()).unwrap();
        assert_eq!(json, r#"{"found":false}"#);
    }
}
