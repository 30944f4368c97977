// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/frame.rs - RGB 帧定义
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

use image::{Rgb, RgbImage};

const RGB_CHANNELS: usize = 3;

/// HWC 排列的 RGB 帧，尺寸在运行时确定
#[derive(Debug, Clone)]
pub struct RgbFrame {
  image: RgbImage,
}

impl RgbFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    Self {
      image: RgbImage::new(width as u32, height as u32),
    }
  }

  /// 从 HWC 字节构造帧，长度不足时返回 `None`
  pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
    RgbImage::from_raw(width, height, data).map(|image| Self { image })
  }

  /// 用同一颜色填充整帧
  pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
    Self {
      image: RgbImage::from_pixel(width, height, Rgb(color)),
    }
  }

  pub fn height(&self) -> usize {
    self.image.height() as usize
  }

  pub fn width(&self) -> usize {
    self.image.width() as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }

  pub fn as_image(&self) -> &RgbImage {
    &self.image
  }

  pub fn as_image_mut(&mut self) -> &mut RgbImage {
    &mut self.image
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    Self { image }
  }
}

impl AsRef<[u8]> for RgbFrame {
  fn as_ref(&self) -> &[u8] {
    self.image.as_raw()
  }
}

impl AsMut<[u8]> for RgbFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.image
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn with_shape_is_black() {
    let frame = RgbFrame::with_shape(4, 6);
    assert_eq!(frame.width(), 6);
    assert_eq!(frame.height(), 4);
    assert_eq!(frame.as_ref().len(), 4 * 6 * frame.channels());
    assert!(frame.as_ref().iter().all(|&v| v == 0));
  }

  #[test]
  fn from_raw_rejects_short_buffer() {
    assert!(RgbFrame::from_raw(2, 2, vec![0; 11]).is_none());
    assert!(RgbFrame::from_raw(2, 2, vec![0; 12]).is_some());
  }
}
