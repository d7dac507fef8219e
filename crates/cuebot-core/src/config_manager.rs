//! 설정 파일 관리.
//!
//! JSON 설정 파일을 로드/검증하고, 실행 중에는 불변 스냅샷(`Arc<AppConfig>`)을
//! 제공한다. 리로드는 새 스냅샷을 검증한 뒤 통째로 교체하므로
//! 진행 중인 세션은 시작 시점의 스냅샷을 끝까지 사용한다.

use crate::config::AppConfig;
use crate::error::CoreError;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 설정 관리자
///
/// 검증된 설정 스냅샷을 보관하며 여러 태스크에서 공유된다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 스냅샷
    current: Arc<RwLock<Arc<AppConfig>>>,
    /// 설정 파일 경로 (메모리 전용이면 None)
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 지정된 경로에서 설정 로드
    ///
    /// 파일이 없으면 기본 설정 파일을 생성한다. 기본 설정은 자격증명이
    /// 자리표시자이므로 검증에 실패하며, 사용자가 채운 뒤 다시 시작해야 한다.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let config_path = config_path.into();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| {
                        CoreError::Config(format!(
                            "설정 디렉토리 생성 실패: {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            Self::save_to_file(&config_path, &AppConfig::default_config())?;
            warn!(
                "설정 파일이 없어 기본 설정 생성: {}: 백엔드 자격증명을 입력한 뒤 다시 실행하세요",
                config_path.display()
            );
        }

        let config = Self::load_from_file(&config_path)?;
        config.validate()?;
        info!("설정 로드 완료: {}", config_path.display());

        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
            config_path: Some(config_path),
        })
    }

    /// 파일 없이 메모리 설정으로 생성 (테스트/임베딩용)
    pub fn in_memory(config: AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
            config_path: None,
        })
    }

    /// 현재 설정 스냅샷
    pub fn snapshot(&self) -> Arc<AppConfig> {
        Arc::clone(&self.current.read())
    }

    /// 설정 파일 경로
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 설정 다시 로드
    ///
    /// 파싱/검증에 실패하면 기존 스냅샷을 유지하고 에러를 반환한다.
    pub fn reload(&self) -> Result<Arc<AppConfig>, CoreError> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| CoreError::Config("메모리 설정은 리로드할 수 없음".to_string()))?;

        let config = Self::load_from_file(path)?;
        config.validate()?;

        let snapshot = Arc::new(config);
        *self.current.write() = Arc::clone(&snapshot);
        info!("설정 다시 로드 완료");
        Ok(snapshot)
    }

    /// 파일에서 설정 로드
    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            warn!("설정 파일 파싱 실패: {}: {e}", path.display());
            CoreError::from(e)
        })?;

        debug!("설정 파일 파싱 완료: {}", path.display());
        Ok(config)
    }

    /// 파일에 설정 저장
    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default_config();
        config.backend.vision_api_url = "https://dify.example.com/v1/workflows/run".to_string();
        config.backend.chat_api_url = "https://dify.example.com/v1/chat-messages".to_string();
        config.backend.file_upload_url = "https://dify.example.com/v1/files/upload".to_string();
        config.backend.api_key = "app-chat".to_string();
        config.backend.vision_api_key = "app-vision".to_string();
        config
    }

    fn write_config(path: &Path, config: &AppConfig) {
        fs::write(path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    }

    #[test]
    fn missing_file_writes_default_and_fails_validation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let result = ConfigManager::with_path(&config_path);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert!(config_path.exists());

        // 생성된 파일은 기본 설정으로 파싱 가능
        let written: AppConfig =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(written, AppConfig::default_config());
    }

    #[test]
    fn load_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        write_config(&config_path, &valid_config());

        let manager = ConfigManager::with_path(&config_path).unwrap();
        assert_eq!(manager.snapshot().settings.check_interval, 5_000);
        assert_eq!(manager.config_path(), Some(config_path.as_path()));
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let result = ConfigManager::with_path(&config_path);
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }

    #[test]
    fn reload_swaps_snapshot_without_touching_old_one() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        write_config(&config_path, &valid_config());

        let manager = ConfigManager::with_path(&config_path).unwrap();
        let before = manager.snapshot();

        let mut changed = valid_config();
        changed.settings.check_interval = 1_234;
        write_config(&config_path, &changed);

        let after = manager.reload().unwrap();
        assert_eq!(after.settings.check_interval, 1_234);
        assert_eq!(manager.snapshot().settings.check_interval, 1_234);
        // 이전 스냅샷은 그대로
        assert_eq!(before.settings.check_interval, 5_000);
    }

    #[test]
    fn reload_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        write_config(&config_path, &valid_config());

        let manager = ConfigManager::with_path(&config_path).unwrap();
        let first = manager.reload().unwrap();
        let second = manager.reload().unwrap();
        assert_eq!(*first, *second);
    }

    #[test]
    fn invalid_reload_keeps_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        write_config(&config_path, &valid_config());

        let manager = ConfigManager::with_path(&config_path).unwrap();

        let mut broken = valid_config();
        broken.settings.match_stride = 0;
        write_config(&config_path, &broken);

        assert!(manager.reload().is_err());
        assert_eq!(manager.snapshot().settings.match_stride, 2);
    }

    #[test]
    fn in_memory_cannot_reload() {
        let manager = ConfigManager::in_memory(valid_config()).unwrap();
        assert!(manager.config_path().is_none());
        assert!(matches!(manager.reload(), Err(CoreError::Config(_))));
    }
}
