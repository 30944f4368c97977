// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/output/evidence.rs - 冻结证据保存
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

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::{freeze::Status, output::FrameReport, roi::Roi};

#[derive(Error, Debug)]
pub enum EvidenceError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 与证据图片一同写入的告警记录
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
  pub captured_at: String,
  pub timestamp: f64,
  pub status: Status,
  pub score: f64,
  pub roi: Roi,
  pub freeze_seconds: f64,
}

impl AlertRecord {
  pub fn from_report(report: &FrameReport<'_>, freeze_seconds: f64) -> Self {
    Self {
      captured_at: Local::now().to_rfc3339(),
      timestamp: report.timestamp,
      status: report.decision.status,
      score: report.motion.score,
      roi: report.roi,
      freeze_seconds,
    }
  }
}

/// 冻结证据目录
///
/// 每次告警写入 `freeze_YYYYmmdd_HHMMSS.jpg` 和同名 `.json`，
/// 同一秒内的多次告警追加序号，不覆盖已有文件。
#[derive(Debug, Clone)]
pub struct EvidenceSink {
  directory: PathBuf,
}

impl EvidenceSink {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn save(&self, image: &RgbImage, record: &AlertRecord) -> Result<PathBuf, EvidenceError> {
    self.save_at(image, record, Local::now())
  }

  pub fn save_at(
    &self,
    image: &RgbImage,
    record: &AlertRecord,
    at: DateTime<Local>,
  ) -> Result<PathBuf, EvidenceError> {
    std::fs::create_dir_all(&self.directory)?;

    let path = self.unique_path(&format!("freeze_{}", at.format("%Y%m%d_%H%M%S")));
    image.save(&path)?;

    // 图片已保存，记录写入失败不影响证据路径
    if let Err(e) = write_record(&path.with_extension("json"), record) {
      warn!("告警记录写入失败: {}", e);
    }

    Ok(path)
  }

  fn unique_path(&self, stem: &str) -> PathBuf {
    let mut path = self.directory.join(format!("{}.jpg", stem));
    let mut n = 1;
    while path.exists() {
      path = self.directory.join(format!("{}_{}.jpg", stem, n));
      n += 1;
    }
    path
  }
}

fn write_record(path: &Path, record: &AlertRecord) -> Result<(), EvidenceError> {
  let mut writer = BufWriter::new(File::create(path)?);
  serde_json::to_writer_pretty(&mut writer, record)?;
  writer.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn record() -> AlertRecord {
    AlertRecord {
      captured_at: "2026-01-01T00:00:00+00:00".to_string(),
      timestamp: 42.5,
      status: Status::Frozen,
      score: 0.001,
      roi: Roi::new(1, 2, 3, 4),
      freeze_seconds: 30.0,
    }
  }

  #[test]
  fn saves_image_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let sink = EvidenceSink::new(dir.path().join("evidence"));
    let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

    let path = sink.save_at(&RgbImage::new(16, 16), &record(), at).unwrap();
    assert_eq!(path.file_name().unwrap(), "freeze_20260304_050607.jpg");
    assert!(path.exists());

    let json: serde_json::Value =
      serde_json::from_reader(File::open(path.with_extension("json")).unwrap()).unwrap();
    assert_eq!(json["status"], "FROZEN");
    assert_eq!(json["roi"], serde_json::json!([1, 2, 3, 4]));
    assert_eq!(json["timestamp"], 42.5);
  }

  #[test]
  fn same_second_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let sink = EvidenceSink::new(dir.path());
    let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

    let first = sink.save_at(&RgbImage::new(8, 8), &record(), at).unwrap();
    let second = sink.save_at(&RgbImage::new(8, 8), &record(), at).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.file_name().unwrap(), "freeze_20260304_050607_1.jpg");
  }

  #[test]
  fn unwritable_record_keeps_image_path() {
    let dir = tempfile::tempdir().unwrap();
    let sink = EvidenceSink::new(dir.path());
    let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
    // 占用记录文件名，使其无法创建
    std::fs::create_dir(dir.path().join("freeze_20260304_050607.json")).unwrap();

    let path = sink.save_at(&RgbImage::new(8, 8), &record(), at).unwrap();
    assert_eq!(path.file_name().unwrap(), "freeze_20260304_050607.jpg");
    assert!(path.is_file());
  }
}
