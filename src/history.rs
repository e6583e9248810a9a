//! Backend call-history client.
//!
//! The decline endpoint is the one piece of backend traffic the call
//! subsystem owns: it informs the caller side that a ring was declined even
//! when this device's signaling socket took no part in the decision. The
//! endpoint is idempotent, so the live path and the mailbox replay path may
//! both fire without coordination.

use anyhow::Result;
use async_trait::async_trait;

/// Seam for the `POST /api/call-history/decline` endpoint.
#[async_trait]
pub trait CallHistoryApi: Send + Sync {
    /// Report that the call from `caller_id` was declined on this device.
    async fn report_decline(&self, caller_id: &str) -> Result<()>;
}

/// HTTP implementation using `ureq`. Since `ureq` is blocking, requests are
/// wrapped in `tokio::task::spawn_blocking`.
pub struct UreqCallHistoryApi {
    base_url: String,
    auth_token: Option<String>,
}

impl UreqCallHistoryApi {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            auth_token,
        }
    }

    fn decline_url(&self) -> String {
        format!("{}/api/call-history/decline", self.base_url)
    }
}

#[async_trait]
impl CallHistoryApi for UreqCallHistoryApi {
    async fn report_decline(&self, caller_id: &str) -> Result<()> {
        let url = self.decline_url();
        let token = self.auth_token.clone();
        let body = serde_json::to_vec(&serde_json::json!({ "callerId": caller_id }))?;

        tokio::task::spawn_blocking(move || {
            let mut req = ureq::post(&url).header("Content-Type", "application/json");
            if let Some(token) = &token {
                req = req.header("Authorization", &format!("Bearer {token}"));
            }
            let response = req.send(&body[..])?;
            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                return Err(anyhow::anyhow!("decline endpoint returned {status}"));
            }
            Ok(())
        })
        .await?
    }
}
