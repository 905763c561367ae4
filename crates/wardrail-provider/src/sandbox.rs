use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use wardrail_core::{ProviderId, WardrailError};

use crate::adapter::{ExecCtx, ExecuteOutcome, ExecuteRequest, ExecuteStatus, PrepareOutcome, PrepareRequest, ProviderAdapter};

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct SandboxProviderConfig {
    pub auth_base: String,
    pub payments_base: String,
    pub client_id: String,
    pub client_secret: String,
    pub live: bool,
}

/// HTTP provider adapter: OAuth client-credentials token fetch (cached,
/// refreshed a minute before expiry) plus a JSON payments POST carrying
/// the idempotency key as a header. `live: true` constructs a working
/// adapter for the live environment, but the executor only ever reaches
/// it through a `ProviderRegistry` that keeps `live` unreachable unless
/// the caller explicitly enabled it — this struct has no opinion of its
/// own about whether it's allowed to run.
pub struct SandboxProvider {
    id: ProviderId,
    config: SandboxProviderConfig,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl SandboxProvider {
    pub fn new(config: SandboxProviderConfig) -> Self {
        let id = ProviderId::new(if config.live { "live" } else { "sandbox" });
        Self {
            id,
            config,
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<String, WardrailError> {
        {
            let cached = self.token.lock().expect("token cache mutex poisoned");
            if let Some(t) = cached.as_ref() {
                if t.expires_at - Utc::now() > chrono::Duration::seconds(60) {
                    return Ok(t.access_token.clone());
                }
            }
        }

        let resp = self
            .http
            .post(format!("{}/connect/token", self.config.auth_base))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WardrailError::OAuthFailure(e.to_string()))?;

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WardrailError::OAuthFailure(e.to_string()))?;

        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| WardrailError::OAuthFailure("missing access_token".into()))?
            .to_string();
        let expires_in = body["expires_in"].as_i64().unwrap_or(300);

        let mut cached = self.token.lock().expect("token cache mutex poisoned");
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        });
        Ok(access_token)
    }

    async fn post_payment(
        &self,
        idempotency_key: &str,
        payee_id: &str,
        amount_minor: u64,
        currency: &str,
    ) -> Result<serde_json::Value, WardrailError> {
        let token = self.fetch_token().await?;
        let resp = self
            .http
            .post(format!("{}/payments", self.config.payments_base))
            .bearer_auth(token)
            .header("Idempotency-Key", idempotency_key)
            .json(&serde_json::json!({
                "payee_id": payee_id,
                "amount_minor": amount_minor,
                "currency": currency,
            }))
            .send()
            .await
            .map_err(|e| WardrailError::ProviderAdapterError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WardrailError::ProviderAdapterError(format!(
                "payments endpoint returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| WardrailError::ProviderAdapterError(e.to_string()))
    }
}

fn map_status(status: &str) -> Result<ExecuteStatus, WardrailError> {
    match status {
        "executed" | "settled" => Ok(ExecuteStatus::Settled),
        "pending" | "authorised" | "authorized" => Ok(ExecuteStatus::Settled),
        "failed" | "rejected" => Ok(ExecuteStatus::Failed),
        other => Err(WardrailError::ProviderUnknownStatus(other.to_string())),
    }
}

#[async_trait]
impl ProviderAdapter for SandboxProvider {
    fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    async fn prepare(&self, _ctx: &ExecCtx, _req: &PrepareRequest) -> Result<PrepareOutcome, WardrailError> {
        self.fetch_token().await?;
        Ok(PrepareOutcome {
            accepted: true,
            detail: None,
        })
    }

    async fn execute(&self, ctx: &ExecCtx, req: &ExecuteRequest) -> Result<ExecuteOutcome, WardrailError> {
        let body = self
            .post_payment(
                &ctx.idempotency_key.to_hex(),
                req.payee_id.as_str(),
                req.amount_minor,
                req.currency.as_str(),
            )
            .await?;

        let status_str = body["status"]
            .as_str()
            .ok_or_else(|| WardrailError::ProviderAdapterError("missing status".into()))?;
        let status = map_status(status_str)?;
        let provider_reference = body["payment_id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        Ok(ExecuteOutcome {
            real_money_moved: status == ExecuteStatus::Settled,
            status,
            provider_reference,
        })
    }

    async fn abort(&self, _ctx: &ExecCtx) -> Result<(), WardrailError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_documented_values() {
        assert_eq!(map_status("executed").unwrap(), ExecuteStatus::Settled);
        assert_eq!(map_status("failed").unwrap(), ExecuteStatus::Failed);
        assert!(map_status("something-else").is_err());
    }
}
