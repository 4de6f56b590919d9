mod mail;
mod sink;

pub use mail::{LogMailer, Mail, MailError, Mailer, MemoryMailer, SmtpMailer};
pub use sink::{MemoryNotificationSink, NotificationSink, NotifyError};
