// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/output/draw.rs - 监测结果可视化
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
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{freeze::Status, frame::RgbFrame, output::FrameReport, roi::Roi};

const MOVING_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const FROZEN_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BORDER_THICKNESS: u32 = 2;
// 掩码叠加权重（原图 / 掩码）
const FRAME_WEIGHT: f32 = 0.65;
const MASK_WEIGHT: f32 = 0.35;

pub fn status_color(status: Status) -> Rgb<u8> {
  match status {
    Status::Moving => Rgb(MOVING_COLOR),
    Status::Frozen => Rgb(FROZEN_COLOR),
  }
}

/// 在帧上绘制 ROI 边框，并按需叠加运动掩码
pub fn annotate(frame: &RgbFrame, report: &FrameReport<'_>) -> RgbImage {
  let mut image = frame.as_image().clone();
  let roi = report
    .roi
    .clamp_to(image.width().max(1), image.height().max(1));

  if report.show_mask && report.motion.has_history() {
    blend_mask(&mut image, roi, &report.motion.mask);
  }
  draw_roi(&mut image, roi, status_color(report.decision.status));

  image
}

fn blend_mask(image: &mut RgbImage, roi: Roi, mask: &image::GrayImage) {
  let width = roi.width.min(mask.width());
  let height = roi.height.min(mask.height());

  for y in 0..height {
    for x in 0..width {
      let (px, py) = (roi.x + x, roi.y + y);
      if px >= image.width() || py >= image.height() {
        continue;
      }
      let m = mask.get_pixel(x, y)[0] as f32 * MASK_WEIGHT;
      let pixel = image.get_pixel_mut(px, py);
      for c in pixel.0.iter_mut() {
        *c = (*c as f32 * FRAME_WEIGHT + m).round().clamp(0.0, 255.0) as u8;
      }
    }
  }
}

fn draw_roi(image: &mut RgbImage, roi: Roi, color: Rgb<u8>) {
  for inset in 0..BORDER_THICKNESS {
    let width = roi.width.saturating_sub(2 * inset);
    let height = roi.height.saturating_sub(2 * inset);
    if width == 0 || height == 0 {
      break;
    }
    let rect = Rect::at((roi.x + inset) as i32, (roi.y + inset) as i32).of_size(width, height);
    draw_hollow_rect_mut(image, rect, color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    freeze::Decision,
    motion::{MotionConfig, MotionScorer},
  };

  fn report<'a>(motion: &'a crate::motion::MotionResult, status: Status, roi: Roi) -> FrameReport<'a> {
    FrameReport {
      roi,
      motion,
      decision: Decision {
        status,
        should_alert: false,
      },
      timestamp: 0.0,
      show_mask: true,
    }
  }

  #[test]
  fn border_color_follows_status() {
    let frame = RgbFrame::filled(40, 30, [0, 0, 0]);
    let roi = Roi::new(5, 5, 20, 10);
    let mut scorer = MotionScorer::new(MotionConfig::default());
    let motion = scorer.compute(&frame, roi);

    let moving = annotate(&frame, &report(&motion, Status::Moving, roi));
    assert_eq!(*moving.get_pixel(5, 5), Rgb(MOVING_COLOR));
    assert_eq!(*moving.get_pixel(6, 6), Rgb(MOVING_COLOR));
    assert_eq!(*moving.get_pixel(10, 10), Rgb([0, 0, 0]));
    assert_eq!(*moving.get_pixel(0, 0), Rgb([0, 0, 0]));

    let frozen = annotate(&frame, &report(&motion, Status::Frozen, roi));
    assert_eq!(*frozen.get_pixel(24, 14), Rgb(FROZEN_COLOR));
  }

  #[test]
  fn mask_is_blended_inside_roi() {
    let config = MotionConfig {
      blur_kernel_size: 1,
      erode_iterations: 0,
      dilate_iterations: 0,
      ..MotionConfig::default()
    };
    let mut scorer = MotionScorer::new(config);
    let roi = Roi::new(0, 0, 20, 20);
    scorer.compute(&RgbFrame::filled(20, 20, [100, 100, 100]), roi);
    let frame = RgbFrame::filled(20, 20, [200, 200, 200]);
    let motion = scorer.compute(&frame, roi);

    let image = annotate(&frame, &report(&motion, Status::Moving, roi));
    // 200 * 0.65 + 255 * 0.35 = 219.25
    assert_eq!(*image.get_pixel(10, 10), Rgb([219, 219, 219]));
  }
}
