use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use slotdesk_core::errors::BookingResult;
use slotdesk_core::models::chat::OutgoingMail;
use slotdesk_core::ports::Mailer;
use tracing::info;

use super::auth::TokenManager;
use crate::config::GraphConfig;
use crate::{check_status, request_failed};

const SERVICE: &str = "Microsoft Graph mail";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub message: Message,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub subject: String,
    pub body: MessageBody,
    pub to_recipients: Vec<Recipient>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Serialize)]
pub struct EmailAddress {
    pub address: String,
}

impl From<&OutgoingMail> for SendMailRequest {
    fn from(mail: &OutgoingMail) -> Self {
        Self {
            message: Message {
                subject: mail.subject.clone(),
                body: MessageBody {
                    content_type: "HTML".to_string(),
                    content: mail.html_body.clone(),
                },
                to_recipients: mail
                    .to
                    .iter()
                    .map(|address| Recipient {
                        email_address: EmailAddress {
                            address: address.clone(),
                        },
                    })
                    .collect(),
            },
            save_to_sent_items: true,
        }
    }
}

/// Sends mail through the sender mailbox with `sendMail`.
pub struct GraphMailer {
    config: GraphConfig,
    http: Client,
    tokens: Arc<TokenManager>,
}

impl GraphMailer {
    pub fn new(config: GraphConfig, http: Client, tokens: Arc<TokenManager>) -> Self {
        Self {
            config,
            http,
            tokens,
        }
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, mail: &OutgoingMail) -> BookingResult<()> {
        let access_token = self.tokens.access_token().await?;
        let url = format!(
            "{}{}/sendMail",
            self.config.graph_base_url,
            self.config.sender_path()
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&access_token)
            .json(&SendMailRequest::from(mail))
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        check_status(SERVICE, response).await?;

        info!("Sent mail '{}' to {} recipient(s)", mail.subject, mail.to.len());
        Ok(())
    }
}
