// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/task.rs - 监控任务主循环
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
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::{debug, error, info, warn};

use crate::{
  freeze::{FreezeStateMachine, Status},
  frame::RgbFrame,
  input::FrameSource,
  motion::MotionScorer,
  notify::{Notifier, notify_all},
  output::{AlertRecord, EvidenceSink, FrameReport, OutputWrapper, Render, draw::annotate},
  roi::Roi,
};

pub const ALERT_TITLE: &str = "Arm freeze detected";
pub const READ_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// 时间来源，返回秒
pub trait Clock {
  fn now(&self) -> f64;
}

/// 系统时间（UNIX 秒）
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> f64 {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs_f64())
      .unwrap_or_default()
  }
}

/// 手动推进的时钟，用于离线回放与测试
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<f64>>,
}

impl ManualClock {
  pub fn new(start: f64) -> Self {
    Self {
      now: Arc::new(Mutex::new(start)),
    }
  }

  pub fn set(&self, now: f64) {
    if let Ok(mut guard) = self.now.lock() {
      *guard = now;
    }
  }

  pub fn advance(&self, seconds: f64) {
    if let Ok(mut guard) = self.now.lock() {
      *guard += seconds;
    }
  }
}

impl Clock for ManualClock {
  fn now(&self) -> f64 {
    self.now.lock().map(|guard| *guard).unwrap_or_default()
  }
}

/// 闭包时钟，每帧调用一次
impl<F: Fn() -> f64> Clock for F {
  fn now(&self) -> f64 {
    self()
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
  pub frames: usize,
  pub alerts: usize,
  pub read_failures: usize,
}

pub fn alert_message(freeze_seconds: f64) -> String {
  format!(
    "Arm watcher detected no motion for {:.0}s. Status: {}.",
    freeze_seconds,
    Status::Frozen
  )
}

/// 监控任务
///
/// 按帧读取、评分、更新状态机，在冻结告警时保存证据并发送通知。
/// 读取失败会退避后重试；流结束、达到 `max_frames` 或收到停止信号时返回。
pub struct WatchTask {
  roi: Roi,
  motion_threshold: f64,
  show_mask: bool,
  evidence: Option<EvidenceSink>,
  record: Option<OutputWrapper>,
  max_frames: Option<usize>,
  stop: Arc<AtomicBool>,
  read_backoff: Duration,
}

impl WatchTask {
  pub fn new(roi: Roi, motion_threshold: f64) -> Self {
    Self {
      roi,
      motion_threshold,
      show_mask: false,
      evidence: None,
      record: None,
      max_frames: None,
      stop: Arc::new(AtomicBool::new(false)),
      read_backoff: READ_RETRY_BACKOFF,
    }
  }

  pub fn with_show_mask(mut self, show_mask: bool) -> Self {
    self.show_mask = show_mask;
    self
  }

  pub fn with_evidence(mut self, evidence: Option<EvidenceSink>) -> Self {
    self.evidence = evidence;
    self
  }

  pub fn with_record(mut self, record: Option<OutputWrapper>) -> Self {
    self.record = record;
    self
  }

  pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
    self.max_frames = max_frames;
    self
  }

  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = stop;
    self
  }

  pub fn with_read_backoff(mut self, backoff: Duration) -> Self {
    self.read_backoff = backoff;
    self
  }

  pub fn stop_flag(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  pub fn roi(&self) -> Roi {
    self.roi
  }

  pub fn run<S, N, C>(
    &self,
    mut source: S,
    mut scorer: MotionScorer,
    mut machine: FreezeStateMachine,
    notifiers: &[N],
    clock: C,
  ) -> anyhow::Result<WatchSummary>
  where
    S: FrameSource,
    N: Notifier,
    C: Clock,
  {
    let mut summary = WatchSummary::default();
    let freeze_seconds = machine.config().freeze_seconds;
    let mut last_status = machine.status();
    let mut last_roi: Option<Roi> = None;

    info!("开始监控, ROI: {}", self.roi);

    loop {
      if self.stop.load(Ordering::SeqCst) {
        warn!("收到停止信号，退出监控循环");
        break;
      }
      if self.max_frames.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出监控循环", summary.frames);
        break;
      }

      let frame = match source.read_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
          info!("输入流结束");
          break;
        }
        Err(e) => {
          summary.read_failures += 1;
          warn!("读取帧失败: {}", e);
          thread::sleep(self.read_backoff);
          continue;
        }
      };
      summary.frames += 1;

      let (width, height) = frame.dimensions();
      let roi = self.roi.clamp_to(width, height);
      if last_roi != Some(roi) {
        if roi != self.roi {
          warn!("ROI {} 超出画面 {}x{}, 已裁剪为 {}", self.roi, width, height, roi);
        }
        if last_roi.is_some() {
          // 尺寸变化后上一帧不可比
          scorer.reset();
        }
        last_roi = Some(roi);
      }

      let now = clock.now();
      let motion = scorer.compute(&frame, roi);
      let decision = machine.update(motion.is_motion(self.motion_threshold), now);
      debug!(
        "帧 {}: score={:.4} status={}",
        summary.frames, motion.score, decision.status
      );

      if decision.status != last_status {
        info!("状态变化: {} -> {}", last_status, decision.status);
        last_status = decision.status;
      }

      let report = FrameReport {
        roi,
        motion: &motion,
        decision,
        timestamp: now,
        show_mask: self.show_mask,
      };

      if decision.should_alert {
        summary.alerts += 1;
        self.alert(&frame, &report, freeze_seconds, notifiers);
      }

      if let Some(record) = &self.record
        && let Err(e) = record.render_result(&frame, &report)
      {
        error!("记录帧失败: {}", e);
      }
    }

    info!(
      "监控结束: {} 帧, {} 次告警, {} 次读取失败",
      summary.frames, summary.alerts, summary.read_failures
    );
    Ok(summary)
  }

  fn alert<N: Notifier>(
    &self,
    frame: &RgbFrame,
    report: &FrameReport<'_>,
    freeze_seconds: f64,
    notifiers: &[N],
  ) {
    let mut message = alert_message(freeze_seconds);
    warn!("{}", message);

    if let Some(evidence) = &self.evidence {
      let image = annotate(frame, report);
      let record = AlertRecord::from_report(report, freeze_seconds);
      match evidence.save(&image, &record) {
        Ok(path) => {
          warn!("证据已保存: {}", path.display());
          message.push_str(&format!(" Evidence: {}", path.display()));
        }
        Err(e) => error!("保存证据失败: {}", e),
      }
    }

    notify_all(notifiers, ALERT_TITLE, &message);
  }
}
