// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/notify.rs - 告警通知
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

use thiserror::Error;
use tracing::{error, info, warn};

#[cfg(feature = "email_notifier")]
mod email;
#[cfg(feature = "email_notifier")]
pub use self::email::EmailNotifier;

#[cfg(feature = "pushover_notifier")]
mod pushover;
#[cfg(feature = "pushover_notifier")]
pub use self::pushover::PushoverNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
  #[cfg(feature = "email_notifier")]
  #[error("邮件地址无效: {0}")]
  Address(#[from] lettre::address::AddressError),
  #[cfg(feature = "email_notifier")]
  #[error("邮件构造失败: {0}")]
  Message(#[from] lettre::error::Error),
  #[cfg(feature = "email_notifier")]
  #[error("SMTP 错误: {0}")]
  Smtp(#[from] lettre::transport::smtp::Error),
  #[cfg(feature = "pushover_notifier")]
  #[error("HTTP 错误: {0}")]
  Http(#[from] Box<ureq::Error>),
  #[error("通知发送失败: {0}")]
  Other(String),
}

/// 通知通道
///
/// 每个实现只负责一种传输方式，由调用方组装成列表后注入监控循环。
pub trait Notifier: Send {
  /// 用于日志的通道名
  fn name(&self) -> &str;

  fn send(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
  fn name(&self) -> &str {
    (**self).name()
  }

  fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
    (**self).send(title, message)
  }
}

pub const EMAIL_VARIABLES: [&str; 6] = [
  "SMTP_HOST",
  "SMTP_PORT",
  "SMTP_USERNAME",
  "SMTP_PASSWORD",
  "ALERT_EMAIL_FROM",
  "ALERT_EMAIL_TO",
];

pub const PUSHOVER_VARIABLES: [&str; 2] = ["PUSHOVER_APP_TOKEN", "PUSHOVER_USER_KEY"];

/// 按配置的方式名（不区分大小写）创建通知通道
///
/// `lookup` 用于读取凭据，通常为环境变量。缺少凭据的通道只记录警告并跳过。
pub fn build_notifiers<F>(methods: &[String], lookup: F) -> Vec<Box<dyn Notifier>>
where
  F: Fn(&str) -> Option<String>,
{
  let methods = methods
    .iter()
    .map(|m| m.trim().to_ascii_lowercase())
    .collect::<Vec<_>>();
  let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
  let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

  if methods.iter().any(|m| m == "email") {
    match email_from(&lookup) {
      Some(notifier) => notifiers.push(notifier),
      None => warn!("邮件通知未启用: 缺少环境变量 {:?}", EMAIL_VARIABLES),
    }
  }

  if methods.iter().any(|m| m == "pushover") {
    match pushover_from(&lookup) {
      Some(notifier) => notifiers.push(notifier),
      None => warn!("Pushover 通知未启用: 缺少 PUSHOVER_APP_TOKEN 或 PUSHOVER_USER_KEY"),
    }
  }

  for method in methods
    .iter()
    .filter(|m| m.as_str() != "email" && m.as_str() != "pushover")
  {
    warn!("未知的通知方式: {}", method);
  }

  notifiers
}

#[cfg(feature = "email_notifier")]
fn email_from(lookup: &dyn Fn(&str) -> Option<String>) -> Option<Box<dyn Notifier>> {
  let [host, port, username, password, sender, recipient] = EMAIL_VARIABLES.map(lookup);
  let port = match port?.parse::<u16>() {
    Ok(port) => port,
    Err(e) => {
      warn!("SMTP_PORT 无效: {}", e);
      return None;
    }
  };
  Some(Box::new(EmailNotifier::new(
    host?, port, username?, password?, sender?, recipient?,
  )))
}

#[cfg(not(feature = "email_notifier"))]
fn email_from(_lookup: &dyn Fn(&str) -> Option<String>) -> Option<Box<dyn Notifier>> {
  warn!("编译时未启用 email_notifier 特性");
  None
}

#[cfg(feature = "pushover_notifier")]
fn pushover_from(lookup: &dyn Fn(&str) -> Option<String>) -> Option<Box<dyn Notifier>> {
  let [token, user] = PUSHOVER_VARIABLES.map(lookup);
  Some(Box::new(PushoverNotifier::new(token?, user?)))
}

#[cfg(not(feature = "pushover_notifier"))]
fn pushover_from(_lookup: &dyn Fn(&str) -> Option<String>) -> Option<Box<dyn Notifier>> {
  warn!("编译时未启用 pushover_notifier 特性");
  None
}

/// 依次通过每个通道发送，单个通道失败不影响其他通道
///
/// 返回发送成功的通道数。
pub fn notify_all<N: Notifier>(notifiers: &[N], title: &str, message: &str) -> usize {
  let mut delivered = 0;
  for notifier in notifiers {
    match notifier.send(title, message) {
      Ok(()) => {
        info!("告警已通过 {} 发送", notifier.name());
        delivered += 1;
      }
      Err(e) => error!("通过 {} 发送告警失败: {}", notifier.name(), e),
    }
  }
  delivered
}
