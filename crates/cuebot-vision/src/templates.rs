//! 템플릿 이미지 집합.
//!
//! 큐 라벨마다 정확히 하나의 RGBA 이미지를 보관한다. 시작 시 한 번 로드되고
//! 프로세스 수명 동안 읽기 전용이다.

use std::path::Path;
use std::sync::Arc;

use cuebot_core::config::TemplatePaths;
use cuebot_core::error::CoreError;
use cuebot_core::models::cue::CueLabel;
use image::RgbaImage;
use tracing::{debug, info};

/// 라벨별 템플릿 이미지
#[derive(Debug, Clone)]
pub struct TemplateSet {
    new_message: Arc<RgbaImage>,
    input_box: Arc<RgbaImage>,
    send_button: Arc<RgbaImage>,
    transfer_button: Arc<RgbaImage>,
    close_chat: Arc<RgbaImage>,
    chat_window: Arc<RgbaImage>,
}

impl TemplateSet {
    /// 설정된 경로에서 모든 라벨의 템플릿을 로드한다.
    ///
    /// 하나라도 없거나 디코딩에 실패하면 `CoreError::TemplateMissing`.
    pub fn load(paths: &TemplatePaths) -> Result<Self, CoreError> {
        let set = Self::try_from_fn(|label| load_template(label, paths.path_for(label)))?;
        info!("템플릿 {}개 로드 완료", CueLabel::ALL.len());
        Ok(set)
    }

    /// 라벨별 이미지 생성 함수로 구성
    pub fn from_fn(mut build: impl FnMut(CueLabel) -> RgbaImage) -> Self {
        Self {
            new_message: Arc::new(build(CueLabel::NewMessage)),
            input_box: Arc::new(build(CueLabel::InputBox)),
            send_button: Arc::new(build(CueLabel::SendButton)),
            transfer_button: Arc::new(build(CueLabel::TransferButton)),
            close_chat: Arc::new(build(CueLabel::CloseChat)),
            chat_window: Arc::new(build(CueLabel::ChatWindow)),
        }
    }

    fn try_from_fn(
        mut build: impl FnMut(CueLabel) -> Result<RgbaImage, CoreError>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            new_message: Arc::new(build(CueLabel::NewMessage)?),
            input_box: Arc::new(build(CueLabel::InputBox)?),
            send_button: Arc::new(build(CueLabel::SendButton)?),
            transfer_button: Arc::new(build(CueLabel::TransferButton)?),
            close_chat: Arc::new(build(CueLabel::CloseChat)?),
            chat_window: Arc::new(build(CueLabel::ChatWindow)?),
        })
    }

    /// 라벨의 템플릿 (닫힌 집합이므로 항상 존재)
    pub fn get(&self, label: CueLabel) -> &Arc<RgbaImage> {
        match label {
            CueLabel::NewMessage => &self.new_message,
            CueLabel::InputBox => &self.input_box,
            CueLabel::SendButton => &self.send_button,
            CueLabel::TransferButton => &self.transfer_button,
            CueLabel::CloseChat => &self.close_chat,
            CueLabel::ChatWindow => &self.chat_window,
        }
    }
}

fn load_template(label: CueLabel, path: &Path) -> Result<RgbaImage, CoreError> {
    let missing = |reason: String| CoreError::TemplateMissing {
        label,
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(missing("파일 없음".to_string()));
    }

    let image = image::open(path).map_err(|e| missing(e.to_string()))?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(missing("빈 이미지".to_string()));
    }

    debug!(
        label = %label,
        width = image.width(),
        height = image.height(),
        "템플릿 로드"
    );
    Ok(image)
}
