// 该文件是 ArmWatch （臂守） 项目的一部分。
// src/notify/email.rs - SMTP 邮件通知
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

use lettre::{
  Message, SmtpTransport, Transport,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use tracing::debug;

use crate::notify::{Notifier, NotifyError};

const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// 通过 STARTTLS + 登录认证发送纯文本邮件
pub struct EmailNotifier {
  smtp_host: String,
  smtp_port: u16,
  username: String,
  password: String,
  sender: String,
  recipient: String,
}

impl EmailNotifier {
  pub fn new(
    smtp_host: String,
    smtp_port: u16,
    username: String,
    password: String,
    sender: String,
    recipient: String,
  ) -> Self {
    Self {
      smtp_host,
      smtp_port,
      username,
      password,
      sender,
      recipient,
    }
  }

  fn build_message(&self, title: &str, message: &str) -> Result<Message, NotifyError> {
    let email = Message::builder()
      .from(self.sender.parse::<Mailbox>()?)
      .to(self.recipient.parse::<Mailbox>()?)
      .subject(title)
      .header(ContentType::TEXT_PLAIN)
      .body(message.to_string())?;
    Ok(email)
  }
}

impl Notifier for EmailNotifier {
  fn name(&self) -> &str {
    "email"
  }

  fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
    let email = self.build_message(title, message)?;

    let mailer = SmtpTransport::starttls_relay(&self.smtp_host)?
      .port(self.smtp_port)
      .credentials(Credentials::new(
        self.username.clone(),
        self.password.clone(),
      ))
      .timeout(Some(SMTP_TIMEOUT))
      .build();

    let response = mailer.send(&email)?;
    debug!("SMTP 响应: {:?}", response.code());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn notifier(sender: &str) -> EmailNotifier {
    EmailNotifier::new(
      "smtp.example.com".to_string(),
      587,
      "user".to_string(),
      "secret".to_string(),
      sender.to_string(),
      "ops@example.com".to_string(),
    )
  }

  #[test]
  fn builds_plain_text_message() {
    let email = notifier("watcher@example.com")
      .build_message("Arm freeze detected", "no motion for 30s")
      .unwrap();
    let raw = String::from_utf8(email.formatted()).unwrap();
    assert!(raw.contains("Subject: Arm freeze detected"));
    assert!(raw.contains("To: ops@example.com"));
    assert!(raw.contains("no motion for 30s"));
  }

  #[test]
  fn invalid_sender_is_an_error() {
    assert!(matches!(
      notifier("not an address").build_message("t", "m"),
      Err(NotifyError::Address(_))
    ));
  }
}
