// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/notify/pushover.rs - Pushover 推送通知
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

use std::time::Duration;

use tracing::debug;

use crate::notify::{Notifier, NotifyError};

const PUSHOVER_API: &str = "https://api.pushover.net/1/messages.json";
const PUSHOVER_TIMEOUT: Duration = Duration::from_secs(20);

pub struct PushoverNotifier {
  app_token: String,
  user_key: String,
  endpoint: String,
}

impl PushoverNotifier {
  pub fn new(app_token: String, user_key: String) -> Self {
    Self {
      app_token,
      user_key,
      endpoint: PUSHOVER_API.to_string(),
    }
  }

  /// 替换 API 地址，用于自建的兼容服务
  pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into();
    self
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }
}

impl Notifier for PushoverNotifier {
  fn name(&self) -> &str {
    "pushover"
  }

  fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
    // 非 2xx 响应由 ureq 转为 Error::Status
    let response = ureq::post(&self.endpoint)
      .timeout(PUSHOVER_TIMEOUT)
      .send_form(&[
        ("token", self.app_token.as_str()),
        ("user", self.user_key.as_str()),
        ("title", title),
        ("message", message),
      ])
      .map_err(Box::new)?;
    debug!("Pushover 响应状态: {}", response.status());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_endpoint_is_pushover_api() {
    let notifier = PushoverNotifier::new("token".to_string(), "user".to_string());
    assert_eq!(notifier.endpoint(), PUSHOVER_API);
    assert_eq!(notifier.name(), "pushover");
  }

  #[test]
  fn http_status_maps_to_notify_error() {
    let response = ureq::Response::new(400, "Bad Request", "{\"status\":0}").unwrap();
    let error = NotifyError::from(Box::new(ureq::Error::Status(400, response)));
    assert!(matches!(&error, NotifyError::Http(e) if matches!(**e, ureq::Error::Status(400, _))));
    assert!(error.to_string().starts_with("HTTP 错误"));
  }

  #[test]
  #[ignore = "需要本机网络"]
  fn unreachable_endpoint_is_reported() {
    let notifier = PushoverNotifier::new("token".to_string(), "user".to_string())
      .with_endpoint("http://127.0.0.1:9/1/messages.json");
    assert!(matches!(
      notifier.send("t", "m"),
      Err(NotifyError::Http(_))
    ));
  }
}
