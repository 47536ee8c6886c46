// SPDX-License-Identifier: MIT

use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

static SEND_EMAIL_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "subject": {
                "type": "string",
                "description": "Subject line"
            },
            "body": {
                "type": "string",
                "description": "Plain text body"
            }
        },
        "required": ["subject", "body"]
    })
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

/// Email stub: nothing leaves the process, messages land in an outbox
#[derive(Clone, Default)]
pub struct SendEmailTool {
    outbox: Arc<Mutex<Vec<Email>>>,
}

impl SendEmailTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails sent so far, oldest first
    pub async fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email with the given subject and body. Do not use attachments."
    }

    fn schema(&self) -> &Value {
        &SEND_EMAIL_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let email: Email = serde_json::from_value(input)?;
        log::info!("Sending email '{}' with body: {}", email.subject, email.body);
        self.outbox.lock().await.push(email);
        Ok(json!({"status": "sent"}))
    }
}
