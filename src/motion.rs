// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/motion.rs - 帧差运动评分
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

//! # 运动评分
//!
//! 对 ROI 内相邻两帧做差分：灰度化、高斯模糊、逐像素绝对差、二值化，
//! 再做一次开运算（先腐蚀后膨胀）去除散点噪声。评分为掩码中非零像素占
//! ROI 面积的比例。
//!
//! ```no_run
//! use armwatch::{frame::RgbFrame, motion::{MotionConfig, MotionScorer}, roi::Roi};
//!
//! let mut scorer = MotionScorer::new(MotionConfig::default());
//! let roi = Roi::new(0, 0, 64, 64);
//! let frame = RgbFrame::filled(128, 128, [0, 0, 0]);
//! let result = scorer.compute(&frame, roi);
//! assert!(result.is_motion(0.015));
//! ```

use image::{GrayImage, Luma, imageops};
use imageproc::{
  distance_transform::Norm,
  filter::separable_filter_equal,
  morphology::{dilate, erode},
};
use serde::Serialize;

use crate::{frame::RgbFrame, roi::Roi};

const MASK_ON: u8 = 255;

/// 首帧的约定评分
pub const FIRST_FRAME_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
  /// 高斯核边长（奇数）
  pub blur_kernel_size: u32,
  /// 像素差大于该值才视为变化
  pub min_pixel_threshold: u8,
  pub erode_iterations: u32,
  pub dilate_iterations: u32,
}

impl Default for MotionConfig {
  fn default() -> Self {
    Self {
      blur_kernel_size: 11,
      min_pixel_threshold: 25,
      erode_iterations: 1,
      dilate_iterations: 2,
    }
  }
}

impl MotionConfig {
  // 由方形核边长推导高斯 sigma
  fn blur_sigma(&self) -> f32 {
    let k = self.blur_kernel_size.max(1) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
  }

  /// 宽度为 `blur_kernel_size` 的归一化一维高斯核
  fn blur_kernel(&self) -> Vec<f32> {
    let radius = (self.blur_kernel_size.max(1) / 2) as i32;
    let sigma = self.blur_sigma();
    let weights = (-radius..=radius)
      .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
      .collect::<Vec<_>>();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
  }
}

/// 单次评分对运动的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSignal {
  /// 尚无上一帧，无法比较
  InsufficientHistory,
  Motion,
  Still,
}

#[derive(Debug, Clone)]
pub struct MotionResult {
  /// 变化像素占比，范围 [0, 1]
  pub score: f64,
  /// 与 ROI 同尺寸的二值掩码（0 或 255）
  pub mask: GrayImage,
  history: bool,
}

impl MotionResult {
  pub fn signal_for(&self, threshold: f64) -> MotionSignal {
    if !self.history {
      MotionSignal::InsufficientHistory
    } else if self.score >= threshold {
      MotionSignal::Motion
    } else {
      MotionSignal::Still
    }
  }

  /// 缺少历史帧时总是视为有运动，与阈值无关
  pub fn is_motion(&self, threshold: f64) -> bool {
    !matches!(self.signal_for(threshold), MotionSignal::Still)
  }

  pub fn has_history(&self) -> bool {
    self.history
  }
}

/// 帧差运动评分器
///
/// 内部只保留上一帧模糊后的灰度 ROI。同一个评分器只能按时间顺序处理
/// 单一视频流。
#[derive(Debug)]
pub struct MotionScorer {
  config: MotionConfig,
  previous: Option<GrayImage>,
}

impl MotionScorer {
  pub fn new(config: MotionConfig) -> Self {
    Self {
      config,
      previous: None,
    }
  }

  pub fn config(&self) -> &MotionConfig {
    &self.config
  }

  /// 丢弃保留的上一帧，下一次调用按首帧处理
  pub fn reset(&mut self) {
    self.previous = None;
  }

  pub fn compute(&mut self, frame: &RgbFrame, roi: Roi) -> MotionResult {
    let current = self.preprocess(frame, roi);

    let result = match self.previous.as_ref() {
      None => MotionResult {
        score: FIRST_FRAME_SCORE,
        mask: GrayImage::new(roi.width, roi.height),
        history: false,
      },
      Some(previous) => {
        let mask = self.change_mask(previous, &current);
        let changed = mask.pixels().filter(|p| p[0] != 0).count() as f64;
        let total = roi.area().max(1) as f64;
        MotionResult {
          score: (changed / total).clamp(0.0, 1.0),
          mask,
          history: true,
        }
      }
    };

    self.previous = Some(current);
    result
  }

  fn change_mask(&self, previous: &GrayImage, current: &GrayImage) -> GrayImage {
    let mut mask = threshold_diff(previous, current, self.config.min_pixel_threshold);
    for _ in 0..self.config.erode_iterations {
      mask = erode(&mask, Norm::LInf, 1);
    }
    for _ in 0..self.config.dilate_iterations {
      mask = dilate(&mask, Norm::LInf, 1);
    }
    mask
  }

  fn preprocess(&self, frame: &RgbFrame, roi: Roi) -> GrayImage {
    let cropped =
      imageops::crop_imm(frame.as_image(), roi.x, roi.y, roi.width, roi.height).to_image();
    let gray: GrayImage = imageops::grayscale(&cropped);
    if self.config.blur_kernel_size <= 1 {
      return gray;
    }
    separable_filter_equal(&gray, &self.config.blur_kernel())
  }
}

fn threshold_diff(previous: &GrayImage, current: &GrayImage, threshold: u8) -> GrayImage {
  let (width, height) = current.dimensions();
  GrayImage::from_fn(width, height, |x, y| {
    let diff = previous
      .get_pixel_checked(x, y)
      .map(|p| p[0].abs_diff(current.get_pixel(x, y)[0]))
      .unwrap_or(0);
    if diff > threshold {
      Luma([MASK_ON])
    } else {
      Luma([0])
    }
  })
}
