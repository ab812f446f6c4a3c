// Copyright (c) 2026 SOLARE S.R.O.
//
// This file is part of HelioGuard.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! SMTP alert transport

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::traits::AlertTransport;
use helioguard_types::EmailSettings;

/// Delivers alert emails over SMTP with STARTTLS
pub struct SmtpAlertTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl std::fmt::Debug for SmtpAlertTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAlertTransport")
            .field("from", &self.from)
            .field("recipients", &self.recipients.len())
            .finish_non_exhaustive()
    }
}

impl SmtpAlertTransport {
    pub fn from_settings(settings: &EmailSettings) -> Result<Self> {
        if settings.smtp_username.is_empty() || settings.smtp_password.is_empty() {
            return Err(EngineError::Config(
                "SMTP credentials missing; set email.smtp_username and HELIOGUARD_SMTP_PASSWORD"
                    .to_owned(),
            ));
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .map_err(|e| EngineError::Config(format!("Bad SMTP relay {}: {e}", settings.smtp_host)))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.smtp_username.clone(),
                settings.smtp_password.clone(),
            ))
            .build();

        let from = settings
            .from_address
            .parse()
            .map_err(|e| EngineError::Config(format!("Bad from address: {e}")))?;
        let recipients = settings
            .recipients
            .iter()
            .map(|r| {
                r.parse()
                    .map_err(|e| EngineError::Config(format!("Bad recipient '{r}': {e}")))
            })
            .collect::<Result<Vec<Mailbox>>>()?;

        Ok(Self {
            transport,
            from,
            recipients,
        })
    }

    fn build_message(&self, subject: &str, html_body: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(html_body.to_owned())
            .map_err(|e| EngineError::Delivery(format!("Failed to build message: {e}")))
    }
}

#[async_trait]
impl AlertTransport for SmtpAlertTransport {
    async fn deliver(&self, subject: &str, html_body: &str) -> Result<bool> {
        let message = self.build_message(subject, html_body)?;
        match self.transport.send(message).await {
            Ok(response) => Ok(response.is_positive()),
            Err(e) => {
                // transient SMTP failure is a normal rejection, retried after
                // the next matching cycle
                warn!("SMTP send failed: {e}");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
