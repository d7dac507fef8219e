//! 화면 좌표 모델.

use serde::{Deserialize, Serialize};

/// 화면 좌표 (좌상단 원점)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 이미지 내부의 직사각형 영역 (좌상단 원점)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 영역 중심점 (홀수 크기는 내림)
    pub fn center(&self) -> Point {
        Point {
            x: (self.x + self.width / 2) as i32,
            y: (self.y + self.height / 2) as i32,
        }
    }

    /// 빈 영역 여부 (width 또는 height가 0)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `bounds_w x bounds_h` 이미지 안에 완전히 포함되는지 여부
    pub fn fits_within(&self, bounds_w: u32, bounds_h: u32) -> bool {
        !self.is_empty()
            && u64::from(self.x) + u64::from(self.width) <= u64::from(bounds_w)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds_h)
    }

    /// `bounds_w x bounds_h` 이미지 경계로 잘라낸 영역.
    ///
    /// 교집합이 없으면 `None`.
    pub fn clip_to(&self, bounds_w: u32, bounds_h: u32) -> Option<Region> {
        if self.x >= bounds_w || self.y >= bounds_h {
            return None;
        }
        let width = self.width.min(bounds_w - self.x);
        let height = self.height.min(bounds_h - self.y);
        let clipped = Region::new(self.x, self.y, width, height);
        (!clipped.is_empty()).then_some(clipped)
    }
}
