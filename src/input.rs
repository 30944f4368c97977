// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/input.rs - 视频/图像输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;
use url::Url;

use crate::{FromUrl, config::CameraConfig, frame::RgbFrame};

/// 帧来源
///
/// - `Ok(Some(frame))`：读到一帧
/// - `Ok(None)`：流已结束
/// - `Err(_)`：本次读取失败，调用方可以稍后重试
pub trait FrameSource {
  type Error: std::error::Error + Send + Sync + 'static;

  fn read_frame(&mut self) -> Result<Option<RgbFrame>, Self::Error>;

  /// 帧尺寸，未知时返回 `None`
  fn dimensions(&self) -> Option<(u32, u32)>;
}

#[cfg(feature = "image_sequence_input")]
mod image_sequence;
#[cfg(feature = "image_sequence_input")]
pub use self::image_sequence::{ImageSequenceInput, ImageSequenceInputError};

#[cfg(feature = "gstreamer_input")]
mod gstreamer_input;
#[cfg(feature = "gstreamer_input")]
pub use self::gstreamer_input::{
  GStreamerInput, GStreamerInputError, GStreamerInputPipelineBuilder,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "image_sequence_input")]
  #[error("Image sequence input error: {0}")]
  ImageSequenceInputError(#[from] ImageSequenceInputError),
  #[cfg(feature = "gstreamer_input")]
  #[error("GStreamer input error: {0}")]
  GStreamerInputError(#[from] GStreamerInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("URL parse error: {0}")]
  UrlError(#[from] url::ParseError),
}

pub enum InputWrapper {
  #[cfg(feature = "gstreamer_input")]
  GStreamerInput(GStreamerInput),
  #[cfg(feature = "image_sequence_input")]
  ImageSequence(ImageSequenceInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "gstreamer_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == GStreamerInputPipelineBuilder::SCHEME {
        let input = GStreamerInputPipelineBuilder::from_url(url)?.build()?;
        return Ok(InputWrapper::GStreamerInput(input));
      }
    }
    #[cfg(feature = "image_sequence_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageSequenceInput::SCHEME {
        let input = ImageSequenceInput::from_url(url)?;
        return Ok(InputWrapper::ImageSequence(input));
      }
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl FrameSource for InputWrapper {
  type Error = InputError;

  fn read_frame(&mut self) -> Result<Option<RgbFrame>, Self::Error> {
    match self {
      #[cfg(feature = "gstreamer_input")]
      InputWrapper::GStreamerInput(input) => input.read_frame().map_err(InputError::from),
      #[cfg(feature = "image_sequence_input")]
      InputWrapper::ImageSequence(input) => input.read_frame().map_err(InputError::from),
    }
  }

  fn dimensions(&self) -> Option<(u32, u32)> {
    match self {
      #[cfg(feature = "gstreamer_input")]
      InputWrapper::GStreamerInput(input) => input.dimensions(),
      #[cfg(feature = "image_sequence_input")]
      InputWrapper::ImageSequence(input) => input.dimensions(),
    }
  }
}

/// 根据摄像头配置生成输入 URL
///
/// 配置了 `source` 时直接使用，否则打开 `/dev/video{index}`。
pub fn camera_url(camera: &CameraConfig) -> Result<Url, InputError> {
  if let Some(source) = &camera.source {
    return Ok(source.clone());
  }

  let url = Url::parse(&format!(
    "gst://camera/dev/video{}?width={}&height={}&fps={}",
    camera.index, camera.width, camera.height, camera.fps
  ))?;
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn camera_url_from_index() {
    let camera = CameraConfig {
      index: 2,
      width: 640,
      height: 480,
      fps: 15,
      source: None,
    };
    let url = camera_url(&camera).unwrap();
    assert_eq!(url.scheme(), "gst");
    assert_eq!(url.host_str(), Some("camera"));
    assert_eq!(url.path(), "/dev/video2");
    assert!(url.query_pairs().any(|(k, v)| k == "fps" && v == "15"));
  }

  #[test]
  fn explicit_source_wins() {
    let source = Url::parse("seq:///tmp/frames").unwrap();
    let camera = CameraConfig {
      source: Some(source.clone()),
      ..CameraConfig::default()
    };
    assert_eq!(camera_url(&camera).unwrap(), source);
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("ftp://example.com/video").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch(s)) if s == "ftp"
    ));
  }
}
