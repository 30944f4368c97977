// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/config.rs - YAML 配置
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

//! 所有字段都有默认值，配置文件只需写出需要覆盖的部分。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
  freeze::{FreezeConfig, FreezeConfigError},
  motion::MotionConfig,
  roi::Roi,
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("配置文件不存在: {}", .0.display())]
  NotFound(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("YAML 解析错误: {0}")]
  YamlError(#[from] serde_yaml::Error),
  #[error("状态机参数错误: {0}")]
  Freeze(#[from] FreezeConfigError),
  #[error("blur_kernel_size 必须为正奇数, 实际为 {0}")]
  BlurKernelSize(u32),
  #[error("motion_threshold 不能为负数, 实际为 {0}")]
  MotionThreshold(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
  pub index: u32,
  pub width: u32,
  pub height: u32,
  pub fps: u32,
  /// 显式的输入 URL，设置后忽略 index/width/height/fps
  pub source: Option<Url>,
}

impl Default for CameraConfig {
  fn default() -> Self {
    Self {
      index: 0,
      width: 1280,
      height: 720,
      fps: 20,
      source: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
  pub freeze_seconds: f64,
  pub recover_seconds: f64,
  pub motion_threshold: f64,
  pub blur_kernel_size: u32,
  pub min_pixel_threshold: u8,
  pub erode_iterations: u32,
  pub dilate_iterations: u32,
  pub roi: Option<Roi>,
  pub show_mask_overlay: bool,
  pub evidence_on_freeze: bool,
}

impl Default for DetectionConfig {
  fn default() -> Self {
    Self {
      freeze_seconds: 30.0,
      recover_seconds: 2.0,
      motion_threshold: 0.015,
      blur_kernel_size: 11,
      min_pixel_threshold: 25,
      erode_iterations: 1,
      dilate_iterations: 2,
      roi: None,
      show_mask_overlay: true,
      evidence_on_freeze: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
  pub cooldown_seconds: f64,
  pub enabled_methods: Vec<String>,
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      cooldown_seconds: 300.0,
      enabled_methods: vec!["email".to_string(), "pushover".to_string()],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub camera: CameraConfig,
  pub detection: DetectionConfig,
  pub alerts: AlertConfig,
  pub log_file: PathBuf,
  pub evidence_dir: PathBuf,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      camera: CameraConfig::default(),
      detection: DetectionConfig::default(),
      alerts: AlertConfig::default(),
      log_file: PathBuf::from("logs/monitor.log"),
      evidence_dir: PathBuf::from("evidence"),
    }
  }
}

impl AppConfig {
  /// 读取并校验配置文件
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
    // 空文件等价于全部默认值
    let config: AppConfig = if content.trim().is_empty() {
      AppConfig::default()
    } else {
      serde_yaml::from_str(content)?
    };
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.freeze_config().validate()?;

    let kernel = self.detection.blur_kernel_size;
    if kernel == 0 || kernel % 2 == 0 {
      return Err(ConfigError::BlurKernelSize(kernel));
    }

    let threshold = self.detection.motion_threshold;
    if !(threshold.is_finite() && threshold >= 0.0) {
      return Err(ConfigError::MotionThreshold(threshold));
    }

    Ok(())
  }

  pub fn motion_config(&self) -> MotionConfig {
    MotionConfig {
      blur_kernel_size: self.detection.blur_kernel_size,
      min_pixel_threshold: self.detection.min_pixel_threshold,
      erode_iterations: self.detection.erode_iterations,
      dilate_iterations: self.detection.dilate_iterations,
    }
  }

  pub fn freeze_config(&self) -> FreezeConfig {
    FreezeConfig {
      freeze_seconds: self.detection.freeze_seconds,
      recover_seconds: self.detection.recover_seconds,
      cooldown_seconds: self.alerts.cooldown_seconds,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_file_keeps_defaults() {
    let config = AppConfig::from_yaml("camera:\n  index: 2\n").unwrap();
    assert_eq!(config.camera.index, 2);
    assert_eq!(config.camera.width, 1280);
    assert_eq!(config.detection.freeze_seconds, 30.0);
    assert_eq!(config.alerts.enabled_methods, vec!["email", "pushover"]);
    assert_eq!(config.log_file, PathBuf::from("logs/monitor.log"));
  }

  #[test]
  fn empty_file_is_all_defaults() {
    assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
  }

  #[test]
  fn full_detection_section() {
    let yaml = r#"
detection:
  freeze_seconds: 5
  recover_seconds: 0.5
  motion_threshold: 0.02
  blur_kernel_size: 7
  roi: [10, 20, 300, 200]
alerts:
  cooldown_seconds: 60
  enabled_methods: [pushover]
camera:
  source: "seq:///tmp/frames"
"#;
    let config = AppConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.detection.roi, Some(Roi::new(10, 20, 300, 200)));
    assert_eq!(config.detection.dilate_iterations, 2);
    assert_eq!(config.motion_config().blur_kernel_size, 7);

    let freeze = config.freeze_config();
    assert_eq!(freeze.freeze_seconds, 5.0);
    assert_eq!(freeze.recover_seconds, 0.5);
    assert_eq!(freeze.cooldown_seconds, 60.0);
    assert_eq!(
      config.camera.source.as_ref().map(Url::scheme),
      Some("seq")
    );
  }

  #[test]
  fn rejects_invalid_values() {
    assert!(matches!(
      AppConfig::from_yaml("detection:\n  freeze_seconds: 0\n"),
      Err(ConfigError::Freeze(FreezeConfigError::FreezeSeconds(_)))
    ));
    assert!(matches!(
      AppConfig::from_yaml("alerts:\n  cooldown_seconds: -1\n"),
      Err(ConfigError::Freeze(FreezeConfigError::CooldownSeconds(_)))
    ));
    assert!(matches!(
      AppConfig::from_yaml("detection:\n  blur_kernel_size: 4\n"),
      Err(ConfigError::BlurKernelSize(4))
    ));
    assert!(matches!(
      AppConfig::from_yaml("detection:\n  motion_threshold: -0.1\n"),
      Err(ConfigError::MotionThreshold(_))
    ));
    assert!(matches!(
      AppConfig::from_yaml("detection: [1, 2]\n"),
      Err(ConfigError::YamlError(_))
    ));
  }

  #[test]
  fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.yaml");
    assert!(matches!(AppConfig::load(&path), Err(ConfigError::NotFound(_))));

    std::fs::write(&path, "log_file: custom.log\n").unwrap();
    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.log_file, PathBuf::from("custom.log"));
  }
}
