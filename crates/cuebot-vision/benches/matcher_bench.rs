//! cuebot-vision 매칭 벤치마크
//!
//! 실행: cargo bench -p cuebot-vision
//!
//! 벤치마크 대상:
//! - 전수 탐색 (ExhaustiveScan)
//! - 가지치기 탐색 (PrunedScan)

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cuebot_vision::matcher::{ExhaustiveScan, MatchOptions, PrunedScan, TemplateMatcher};
use image::{Rgba, RgbaImage};

/// 테스트용 패턴 이미지 생성
fn create_test_image(width: u32, height: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x as u8).wrapping_add(seed).wrapping_mul(17);
        let g = (y as u8).wrapping_add(seed).wrapping_mul(31);
        let b = (x as u8).wrapping_add(y as u8).wrapping_add(seed);
        Rgba([r, g, b, 255])
    })
}

/// 템플릿을 화면 우하단 근처에 붙여넣은 화면 생성
fn create_screen_with_template(width: u32, height: u32, template: &RgbaImage) -> RgbaImage {
    let mut screen = create_test_image(width, height, 7);
    let x0 = ((width - template.width()) * 3 / 4) & !1;
    let y0 = ((height - template.height()) * 3 / 4) & !1;
    for (x, y, px) in template.enumerate_pixels() {
        screen.put_pixel(x0 + x, y0 + y, *px);
    }
    screen
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_matching");
    group.sample_size(10);

    let template = create_test_image(40, 20, 99);
    let resolutions = [(320, 240), (640, 480)];
    let options = MatchOptions {
        stride: 2,
        pixel_tolerance: 20,
    };

    for (width, height) in resolutions {
        let screen = create_screen_with_template(width, height, &template);
        group.throughput(Throughput::Elements(u64::from(width * height)));

        let matchers = [
            TemplateMatcher::new(Arc::new(ExhaustiveScan), options),
            TemplateMatcher::new(Arc::new(PrunedScan), options),
        ];

        for matcher in matchers {
            group.bench_with_input(
                BenchmarkId::new(matcher.strategy_name().to_string(), format!("{width}x{height}")),
                &(&screen, &template),
                |b, (screen, template)| {
                    b.iter(|| black_box(matcher.locate(screen, template, 0.8)));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
