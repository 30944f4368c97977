// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use armwatch::roi::Roi;

/// 机械臂冻结监控
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// YAML 配置文件路径
  #[arg(long, value_name = "FILE", default_value = "configs/settings.yaml")]
  pub config: PathBuf,

  /// 输入来源，覆盖配置中的摄像头
  /// 支持格式:
  /// - 图像序列: seq:///path/to/frames
  /// - 摄像头: gst://camera/dev/video0?width=1280&height=720&fps=20
  /// - 视频文件: gst://file/path/to/video.mp4
  #[arg(long, value_name = "SOURCE")]
  pub input: Option<Url>,

  /// 监控区域 x,y,w,h，覆盖配置中的 detection.roi
  #[arg(long, value_name = "X,Y,W,H")]
  pub roi: Option<Roi>,

  /// 标注帧记录目录，例如 folder:///var/lib/armwatch/record?alerts
  #[arg(long, value_name = "OUTPUT")]
  pub record: Option<Url>,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_frames: usize,

  /// 输出调试日志
  #[arg(long, short)]
  pub verbose: bool,
}
