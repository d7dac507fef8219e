//! 채팅 영역 스크린샷 저장소.
//!
//! 캡처한 채팅 영역을 PNG로 저장하고, 사용이 끝나면 삭제한다.
//! [`ScreenshotArtifact`]는 drop 시 파일을 지우므로 에러 경로에서도 남지 않는다.
//! 비정상 종료로 남은 파일은 [`ScreenshotStore::cleanup_older_than`]이 정리한다.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Local;
use cuebot_core::error::CoreError;
use image::RgbaImage;
use tokio::fs;
use tracing::{debug, info, warn};

/// 스크린샷 디렉토리 관리자
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 이미지를 `<dir>/<customer_id>_<YYYYmmdd_HHMMSS>.png`로 저장
    pub async fn save(
        &self,
        image: RgbaImage,
        customer_id: &str,
    ) -> Result<ScreenshotArtifact, CoreError> {
        fs::create_dir_all(&self.dir).await?;

        let file_name = format!(
            "{}_{}.png",
            customer_id,
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(file_name);

        let target = path.clone();
        tokio::task::spawn_blocking(move || image.save(&target))
            .await
            .map_err(|e| CoreError::Internal(format!("스크린샷 저장 작업 조인 실패: {e}")))?
            .map_err(|e| CoreError::Image(format!("스크린샷 저장 실패: {e}")))?;

        debug!("스크린샷 저장: {}", path.display());
        Ok(ScreenshotArtifact { path })
    }

    /// 수정 시각이 `days`일보다 오래된 PNG 삭제. 삭제한 파일 수 반환.
    pub async fn cleanup_older_than(&self, days: u32) -> Result<usize, CoreError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let max_age = Duration::from_secs(u64::from(days) * 24 * 60 * 60);
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut deleted = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("스크린샷 메타데이터 조회 실패: {}: {e}", path.display());
                    continue;
                }
            };

            if modified < cutoff {
                match fs::remove_file(&path).await {
                    Ok(()) => deleted += 1,
                    Err(e) => warn!("오래된 스크린샷 삭제 실패: {}: {e}", path.display()),
                }
            }
        }

        if deleted > 0 {
            info!(deleted, days, "오래된 스크린샷 정리 완료");
        }
        Ok(deleted)
    }
}

/// 저장된 스크린샷: drop 시 파일 삭제
#[derive(Debug)]
pub struct ScreenshotArtifact {
    path: PathBuf,
}

impl ScreenshotArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScreenshotArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("스크린샷 삭제: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("스크린샷 삭제 실패: {}: {e}", self.path.display()),
        }
    }
}
