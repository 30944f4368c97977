// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::{thread, time::Duration};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};

use armwatch::{
  FromUrl,
  config::AppConfig,
  freeze::FreezeStateMachine,
  input::{FrameSource, InputWrapper, camera_url},
  logging,
  motion::MotionScorer,
  notify::build_notifiers,
  output::{EvidenceSink, OutputWrapper},
  task::{SystemClock, WatchTask},
};

fn main() -> Result<()> {
  let args = args::Args::parse();

  let mut config = AppConfig::load(&args.config)
    .with_context(|| format!("加载配置文件 {} 失败", args.config.display()))?;
  if let Some(input) = args.input {
    config.camera.source = Some(input);
  }
  if let Some(roi) = args.roi {
    config.detection.roi = Some(roi);
  }

  let logging = logging::init(&config.log_file, args.verbose)?;
  info!(
    "日志输出到 {} (级别 {})",
    logging.log_file().display(),
    logging.level()
  );

  let roi = config
    .detection
    .roi
    .ok_or_else(|| anyhow!("未设置监控区域: 请在配置文件中设置 detection.roi 或使用 --roi"))?;

  let url = camera_url(&config.camera)?;
  info!("打开输入: {}", url);
  let source = InputWrapper::from_url(&url)?;
  let roi = match source.dimensions() {
    Some((width, height)) => roi.clamp_to(width, height),
    None => roi,
  };

  let scorer = MotionScorer::new(config.motion_config());
  let machine = FreezeStateMachine::new(config.freeze_config())?;
  let notifiers = build_notifiers(&config.alerts.enabled_methods, |key| {
    std::env::var(key).ok()
  });
  if notifiers.is_empty() {
    warn!("没有可用的通知通道，告警只写入日志");
  }

  let record = args
    .record
    .as_ref()
    .map(OutputWrapper::from_url)
    .transpose()?;
  let evidence = config
    .detection
    .evidence_on_freeze
    .then(|| EvidenceSink::new(&config.evidence_dir));

  let task = WatchTask::new(roi, config.detection.motion_threshold)
    .with_show_mask(config.detection.show_mask_overlay)
    .with_evidence(evidence)
    .with_record(record)
    .with_max_frames((args.max_frames > 0).then_some(args.max_frames));

  let stop = task.stop_flag();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    stop.store(true, std::sync::atomic::Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  info!("臂守已启动");
  let summary = task.run(source, scorer, machine, &notifiers, SystemClock)?;
  info!(
    "臂守已停止: 共 {} 帧, {} 次告警",
    summary.frames, summary.alerts
  );

  Ok(())
}
