use std::sync::Arc;

use tracing::warn;

use crate::chatbot::Chatbot;
use crate::config::Config;
use crate::engine::coordinator::{Collaborators, Coordinator};
use crate::error::AppError;
use crate::notify::{LogMailer, Mailer, MemoryNotificationSink, NotificationSink, SmtpMailer};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub coordinator: Coordinator,
    pub notifications: Arc<dyn NotificationSink>,
    pub mailer: Arc<dyn Mailer>,
    pub chatbot: Chatbot,
    pub metrics: Arc<Metrics>,
    pub support_email: String,
    pub static_dir: String,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.mail_from)?),
            None => {
                warn!("SMTP_HOST not set; outgoing mail is only logged");
                Arc::new(LogMailer::new(config.mail_from.clone()))
            }
        };
        Ok(Self::with_mailer(config, mailer))
    }

    pub fn with_mailer(config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        let notifications: Arc<dyn NotificationSink> =
            Arc::new(MemoryNotificationSink::new(config.event_buffer_size));
        let metrics = Arc::new(Metrics::new());

        let coordinator = Coordinator::new(
            Collaborators::in_memory(notifications.clone(), mailer.clone()),
            metrics.clone(),
            config.ngo_contact_email.clone(),
        );

        Self {
            coordinator,
            notifications,
            mailer,
            chatbot: Chatbot::new(),
            metrics,
            support_email: config.support_email.clone(),
            static_dir: config.static_dir.clone(),
        }
    }
}
