//! 설정 및 DI 와이어링 통합 테스트.
//!
//! 설정 파일 → ConfigManager → 어댑터 생성 검증.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use cuebot_core::config::{AppConfig, TemplatePaths};
use cuebot_core::config_manager::ConfigManager;
use cuebot_core::error::CoreError;
use cuebot_core::models::cue::CueLabel;
use cuebot_network::dify_client::DifyClient;
use cuebot_vision::matcher::TemplateMatcher;
use cuebot_vision::templates::TemplateSet;

fn valid_config(templates_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default_config();
    config.backend.vision_api_url = "https://dify.example.com/v1/workflows/run".to_string();
    config.backend.chat_api_url = "https://dify.example.com/v1/chat-messages".to_string();
    config.backend.file_upload_url = "https://dify.example.com/v1/files/upload".to_string();
    config.backend.api_key = "app-chat".to_string();
    config.backend.vision_api_key = "app-vision".to_string();
    config.templates = TemplatePaths::in_dir(templates_dir);
    config
}

fn write_templates(dir: &std::path::Path) {
    std::fs::create_dir_all(dir).unwrap();
    for (i, label) in CueLabel::ALL.iter().enumerate() {
        let image = RgbaImage::from_pixel(8, 6, Rgba([i as u8 * 30, 10, 20, 255]));
        image
            .save(dir.join(format!("{}.png", label.as_str())))
            .unwrap();
    }
}

fn write_config(path: &std::path::Path, config: &AppConfig) {
    std::fs::write(path, serde_json::to_string_pretty(config).unwrap()).unwrap();
}

#[test]
fn first_run_writes_placeholder_config_and_refuses_to_start() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let err = ConfigManager::with_path(&path).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(path.exists());

    let written: AppConfig =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, AppConfig::default_config());
}

#[test]
fn all_adapters_instantiate_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let templates_dir = temp_dir.path().join("templates");
    write_templates(&templates_dir);

    let path = temp_dir.path().join("config.json");
    write_config(&path, &valid_config(&templates_dir));

    let manager = ConfigManager::with_path(&path).unwrap();
    let config = manager.snapshot();

    let _backend = DifyClient::new(&config.backend).unwrap();

    let templates = TemplateSet::load(&config.templates).unwrap();
    for label in CueLabel::ALL {
        assert_eq!(templates.get(label).dimensions(), (8, 6));
    }

    let matcher = TemplateMatcher::pruned(Default::default());
    assert_eq!(matcher.strategy_name(), "pruned");
}

#[test]
fn missing_template_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let templates_dir = temp_dir.path().join("templates");
    write_templates(&templates_dir);
    std::fs::remove_file(templates_dir.join("close_chat.png")).unwrap();

    let config = valid_config(&templates_dir);
    match TemplateSet::load(&config.templates) {
        Err(CoreError::TemplateMissing { label, .. }) => assert_eq!(label, CueLabel::CloseChat),
        other => panic!("TemplateMissing 기대, 실제: {:?}", other.map(|_| ())),
    }
}

#[test]
fn legacy_dify_section_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut json = serde_json::to_value(valid_config(temp_dir.path())).unwrap();
    let backend = json.as_object_mut().unwrap().remove("backend").unwrap();
    json.as_object_mut()
        .unwrap()
        .insert("dify".to_string(), backend);
    std::fs::write(&path, json.to_string()).unwrap();

    let manager = ConfigManager::with_path(&path).unwrap();
    assert_eq!(manager.snapshot().backend.api_key, "app-chat");
}

#[test]
fn reload_picks_up_new_settings_without_touching_old_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let mut config = valid_config(temp_dir.path());
    write_config(&path, &config);

    let manager = ConfigManager::with_path(&path).unwrap();
    let before = manager.snapshot();

    config.settings.check_interval = 1_500;
    config.settings.confidence_threshold = 0.9;
    write_config(&path, &config);

    let after = manager.reload().unwrap();
    assert_eq!(after.settings.check_interval, 1_500);
    assert_eq!(before.settings.check_interval, 5_000);
    assert!(Arc::ptr_eq(&after, &manager.snapshot()));

    // 같은 파일로 다시 리로드해도 동작상 동일
    let again = manager.reload().unwrap();
    assert_eq!(*again, *after);
}
