// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{DateTime, Datelike, Local};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  output::{FrameReport, Render, draw::annotate},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 将标注后的帧按日期分目录保存
///
/// `folder:///path/to/dir` 记录每一帧；加上 `?alerts` 后只记录触发告警的帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  alerts_only: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let directory = urlencoding::decode(uri.path())
      .map_err(|e| DirectoryRecordOutputError::PathEncoding(e.to_string()))?;
    let alerts_only = uri.query_pairs().any(|(k, _)| k == "alerts");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(directory.as_ref()),
      frame_counter: AtomicU16::new(0),
      alerts_only,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn alerts_only(&self) -> bool {
    self.alerts_only
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: DateTime<Local>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl<'a> Render<RgbFrame, FrameReport<'a>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &FrameReport<'a>) -> Result<(), Self::Error> {
    if self.alerts_only && !result.decision.should_alert {
      return Ok(());
    }

    let path = self.frame_path(Local::now())?;
    annotate(frame, result).save(&path)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    freeze::{Decision, Status},
    motion::{MotionConfig, MotionScorer},
    roi::Roi,
  };

  fn folder_url(dir: &Path, query: Option<&str>) -> Url {
    let mut url = Url::parse(&format!("folder://{}", dir.display())).unwrap();
    url.set_query(query);
    url
  }

  fn count_png(dir: &Path) -> usize {
    let mut count = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == "png") {
          count += 1;
        }
      }
    }
    count
  }

  #[test]
  fn parses_url() {
    let url = Url::parse("folder:///var/lib/armwatch/record?alerts").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.directory(), Path::new("/var/lib/armwatch/record"));
    assert!(output.alerts_only());

    let url = Url::parse("seq:///tmp").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&url),
      Err(DirectoryRecordOutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn alerts_only_skips_regular_frames() {
    let dir = tempfile::tempdir().unwrap();
    let all = DirectoryRecordOutput::from_url(&folder_url(dir.path(), None)).unwrap();
    let alerts_dir = dir.path().join("alerts");
    let alerts =
      DirectoryRecordOutput::from_url(&folder_url(&alerts_dir, Some("alerts"))).unwrap();

    let frame = RgbFrame::filled(16, 16, [10, 10, 10]);
    let roi = Roi::new(2, 2, 8, 8);
    let motion = MotionScorer::new(MotionConfig::default()).compute(&frame, roi);
    let mut report = FrameReport {
      roi,
      motion: &motion,
      decision: Decision {
        status: Status::Moving,
        should_alert: false,
      },
      timestamp: 0.0,
      show_mask: false,
    };

    all.render_result(&frame, &report).unwrap();
    alerts.render_result(&frame, &report).unwrap();
    assert!(!alerts_dir.exists());

    report.decision = Decision {
      status: Status::Frozen,
      should_alert: true,
    };
    alerts.render_result(&frame, &report).unwrap();
    assert_eq!(count_png(&alerts_dir), 1);
  }

  #[test]
  fn frame_ids_increase() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::from_url(&folder_url(dir.path(), None)).unwrap();
    let now = Local::now();
    let first = output.frame_path(now).unwrap();
    let second = output.frame_path(now).unwrap();
    assert!(first.to_string_lossy().ends_with("-0001.png"));
    assert!(second.to_string_lossy().ends_with("-0002.png"));
    assert!(first.starts_with(dir.path().join(now.year().to_string())));
  }
}
