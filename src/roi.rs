// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/roi.rs - 监测区域（ROI）
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoiParseError {
  #[error("ROI 需要 4 个字段 (x,y,w,h), 实际 {0} 个")]
  FieldCount(usize),
  #[error("ROI 字段无效: {0}")]
  InvalidField(String),
  #[error("ROI 宽度和高度必须大于 0")]
  EmptyArea,
}

/// 帧像素坐标系下的轴对齐矩形
///
/// 在配置文件中以 `[x, y, w, h]` 形式出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct Roi {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl Roi {
  pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn area(&self) -> u64 {
    self.width as u64 * self.height as u64
  }

  /// 将 ROI 限制在帧范围内，结果至少为 1x1
  pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Roi {
    let max_x = frame_width.saturating_sub(1);
    let max_y = frame_height.saturating_sub(1);
    let x = self.x.min(max_x);
    let y = self.y.min(max_y);
    let width = self.width.min(frame_width.saturating_sub(x)).max(1);
    let height = self.height.min(frame_height.saturating_sub(y)).max(1);
    Roi::new(x, y, width, height)
  }

  pub fn fits_in(&self, frame_width: u32, frame_height: u32) -> bool {
    self.width >= 1
      && self.height >= 1
      && self.x as u64 + self.width as u64 <= frame_width as u64
      && self.y as u64 + self.height as u64 <= frame_height as u64
  }
}

impl fmt::Display for Roi {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
  }
}

impl FromStr for Roi {
  type Err = RoiParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let fields = s.split(',').map(str::trim).collect::<Vec<_>>();
    if fields.len() != 4 {
      return Err(RoiParseError::FieldCount(fields.len()));
    }

    let mut values = [0u32; 4];
    for (value, field) in values.iter_mut().zip(fields) {
      *value = field
        .parse()
        .map_err(|_| RoiParseError::InvalidField(field.to_string()))?;
    }

    Roi::try_from(values)
  }
}

impl TryFrom<[u32; 4]> for Roi {
  type Error = RoiParseError;

  fn try_from([x, y, width, height]: [u32; 4]) -> Result<Self, Self::Error> {
    if width == 0 || height == 0 {
      return Err(RoiParseError::EmptyArea);
    }
    Ok(Roi::new(x, y, width, height))
  }
}

impl From<Roi> for [u32; 4] {
  fn from(roi: Roi) -> Self {
    [roi.x, roi.y, roi.width, roi.height]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clamp_keeps_inside_roi() {
    let roi = Roi::new(10, 20, 100, 50);
    assert_eq!(roi.clamp_to(640, 480), roi);
  }

  #[test]
  fn clamp_trims_overflowing_edges() {
    let roi = Roi::new(600, 400, 100, 100).clamp_to(640, 480);
    assert_eq!(roi, Roi::new(600, 400, 40, 80));
    assert!(roi.fits_in(640, 480));
  }

  #[test]
  fn clamp_moves_origin_into_frame() {
    let roi = Roi::new(1000, 1000, 10, 10).clamp_to(640, 480);
    assert_eq!(roi, Roi::new(639, 479, 1, 1));
    assert!(roi.fits_in(640, 480));
  }

  #[test]
  fn parse_from_cli_string() {
    assert_eq!("1, 2,3 ,4".parse::<Roi>(), Ok(Roi::new(1, 2, 3, 4)));
    assert_eq!("1,2,3".parse::<Roi>(), Err(RoiParseError::FieldCount(3)));
    assert_eq!(
      "1,2,x,4".parse::<Roi>(),
      Err(RoiParseError::InvalidField("x".to_string()))
    );
    assert_eq!("1,2,0,4".parse::<Roi>(), Err(RoiParseError::EmptyArea));
  }

  #[test]
  fn yaml_sequence_form() {
    let roi: Roi = serde_yaml::from_str("[5, 6, 7, 8]").unwrap();
    assert_eq!(roi, Roi::new(5, 6, 7, 8));
    assert!(serde_yaml::from_str::<Roi>("[5, 6, 0, 8]").is_err());
  }
}
