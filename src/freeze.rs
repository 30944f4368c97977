// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/freeze.rs - 冻结/恢复状态机
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

//! # 冻结状态机
//!
//! 输入为每帧的“是否有运动”与调用方提供的时间戳（秒），输出当前状态以及
//! 是否需要告警。
//!
//! - 连续无运动达到 `freeze_seconds` 后进入 `FROZEN`
//! - 冻结后需连续运动 `recover_seconds` 才回到 `MOVING`
//! - 两次告警之间至少间隔 `cooldown_seconds`
//!
//! 所有超时都只是时间差比较，没有定时回调，因此可以直接用合成时钟测试。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FreezeConfigError {
  #[error("freeze_seconds 必须大于 0, 实际为 {0}")]
  FreezeSeconds(f64),
  #[error("recover_seconds 不能为负数, 实际为 {0}")]
  RecoverSeconds(f64),
  #[error("cooldown_seconds 不能为负数, 实际为 {0}")]
  CooldownSeconds(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  Moving,
  Frozen,
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Status::Moving => f.write_str("MOVING"),
      Status::Frozen => f.write_str("FROZEN"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeConfig {
  pub freeze_seconds: f64,
  pub recover_seconds: f64,
  pub cooldown_seconds: f64,
}

impl Default for FreezeConfig {
  fn default() -> Self {
    Self {
      freeze_seconds: 30.0,
      recover_seconds: 2.0,
      cooldown_seconds: 300.0,
    }
  }
}

impl FreezeConfig {
  pub fn validate(&self) -> Result<(), FreezeConfigError> {
    // NaN 不满足任何比较，直接落入错误分支
    if !(self.freeze_seconds.is_finite() && self.freeze_seconds > 0.0) {
      return Err(FreezeConfigError::FreezeSeconds(self.freeze_seconds));
    }
    if !(self.recover_seconds.is_finite() && self.recover_seconds >= 0.0) {
      return Err(FreezeConfigError::RecoverSeconds(self.recover_seconds));
    }
    if !(self.cooldown_seconds.is_finite() && self.cooldown_seconds >= 0.0) {
      return Err(FreezeConfigError::CooldownSeconds(self.cooldown_seconds));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeState {
  pub status: Status,
  /// 最近一次观测到运动的时间，或无运动计时的起点
  pub last_motion_at: Option<f64>,
  /// 最近一次实际发出告警的时间
  pub freeze_alert_sent_at: Option<f64>,
  /// 冻结期间连续运动开始的时间，仅在 `FROZEN` 时有意义
  pub recover_started_at: Option<f64>,
}

impl Default for FreezeState {
  fn default() -> Self {
    Self {
      status: Status::Moving,
      last_motion_at: None,
      freeze_alert_sent_at: None,
      recover_started_at: None,
    }
  }
}

/// 单次 `update` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
  pub status: Status,
  pub should_alert: bool,
}

#[derive(Debug, Clone)]
pub struct FreezeStateMachine {
  config: FreezeConfig,
  state: FreezeState,
}

impl FreezeStateMachine {
  pub fn new(config: FreezeConfig) -> Result<Self, FreezeConfigError> {
    config.validate()?;
    Ok(Self {
      config,
      state: FreezeState::default(),
    })
  }

  pub fn config(&self) -> &FreezeConfig {
    &self.config
  }

  pub fn state(&self) -> &FreezeState {
    &self.state
  }

  pub fn status(&self) -> Status {
    self.state.status
  }

  /// 调用方需保证 `now` 单调不减；时间倒退不会 panic，但结果不作保证
  pub fn update(&mut self, motion_present: bool, now: f64) -> Decision {
    if motion_present {
      self.on_motion(now);
      return self.decision(false);
    }

    let should_alert = self.on_still(now);
    self.decision(should_alert)
  }

  fn on_motion(&mut self, now: f64) {
    let state = &mut self.state;
    state.last_motion_at = Some(now);

    match state.status {
      Status::Frozen => match state.recover_started_at {
        None => state.recover_started_at = Some(now),
        Some(started) if now - started >= self.config.recover_seconds => {
          state.status = Status::Moving;
          state.recover_started_at = None;
        }
        Some(_) => {}
      },
      Status::Moving => state.recover_started_at = None,
    }
  }

  fn on_still(&mut self, now: f64) -> bool {
    let state = &mut self.state;
    let last_motion_at = *state.last_motion_at.get_or_insert(now);
    let no_motion_duration = now - last_motion_at;

    let mut should_alert = false;
    if state.status != Status::Frozen && no_motion_duration >= self.config.freeze_seconds {
      let cooled_down = state
        .freeze_alert_sent_at
        .is_none_or(|sent| now - sent >= self.config.cooldown_seconds);
      if cooled_down {
        should_alert = true;
        state.freeze_alert_sent_at = Some(now);
      }
      state.status = Status::Frozen;
    }

    // 任何一次无运动都会打断正在累积的恢复窗口
    state.recover_started_at = None;
    should_alert
  }

  fn decision(&self, should_alert: bool) -> Decision {
    Decision {
      status: self.state.status,
      should_alert,
    }
  }
}
