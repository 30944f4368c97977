// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/logging.rs - 日志初始化
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
  fs::{File, OpenOptions},
  path::{Path, PathBuf},
  sync::Mutex,
};

use thiserror::Error;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("无法打开日志文件 {}: {source}", .path.display())]
  OpenLogFile {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("日志系统已初始化: {0}")]
  AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// 已安装的日志系统
///
/// 由 `main` 在启动时创建一次；同时输出到终端和日志文件。
#[derive(Debug)]
pub struct LoggingHandle {
  log_file: PathBuf,
  level: LevelFilter,
}

impl LoggingHandle {
  pub fn log_file(&self) -> &Path {
    &self.log_file
  }

  pub fn level(&self) -> LevelFilter {
    self.level
  }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
  let open = || -> std::io::Result<File> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
  };

  open().map_err(|source| LoggingError::OpenLogFile {
    path: path.to_path_buf(),
    source,
  })
}

pub fn init(log_file: impl AsRef<Path>, verbose: bool) -> Result<LoggingHandle, LoggingError> {
  let log_file = log_file.as_ref();
  let file = open_log_file(log_file)?;
  let level = if verbose {
    LevelFilter::DEBUG
  } else {
    LevelFilter::INFO
  };

  tracing_subscriber::registry()
    .with(level)
    .with(fmt::layer())
    .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    .try_init()?;

  Ok(LoggingHandle {
    log_file: log_file.to_path_buf(),
    level,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_file_parent_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/logs/monitor.log");
    open_log_file(&path).unwrap();
    assert!(path.exists());
  }
}
