//! HTTP implementation of the `Registry` capability interface.
//!
//! A thin reqwest wrapper over the registry's REST API: list-and-scan
//! finds for event types and rules, a by-name lookup with 404 mapped to
//! `None` for triggers, and bare POSTs for relation links. No retry or
//! timeout policy lives here; that belongs to the transport configuration.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChainMeta, EventTypeRecord, NewRule, NewTrigger, Registry, RuleRecord, TriggerRecord};
use crate::config::ResolvedConfig;

/// Registry client over HTTP
pub struct HttpRegistry {
    /// Base API URL, without a trailing slash
    base_url: String,
    /// Optional bearer token
    token: Option<String>,
    /// Shared HTTP client
    client: reqwest::Client,
}

/// Response to any create call
#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct EventTypeDto {
    event_type_id: String,
    event_type: String,
}

#[derive(Debug, Serialize)]
struct EventTypeCreate<'a> {
    event_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct RuleDto {
    rule_id: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct TriggerDto {
    trigger_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct EventTypeTriggerDto {
    trigger_id: String,
}

#[derive(Debug, Deserialize)]
struct TriggerRuleDto {
    rule_id: String,
}

#[derive(Debug, Deserialize)]
struct TriggerChildDto {
    trigger_child_id: String,
}

impl HttpRegistry {
    /// Create a new registry client.
    ///
    /// `base_url` is normalized to not end with a slash; the token, when
    /// given, is sent as `Authorization: Bearer <token>` on every call.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(config.base_url.clone(), config.token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let started = Instant::now();

        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;

        let status = response.status();
        debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "registry GET"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Registry error ({}) on GET {}: {}", status, path, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from GET {}", path))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let started = Instant::now();

        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?;

        let status = response.status();
        debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "registry POST"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Registry error ({}) on POST {}: {}", status, path, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from POST {}", path))
    }

    /// POST where only the status matters (relation links)
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let started = Instant::now();

        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?;

        let status = response.status();
        debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "registry POST"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Registry error ({}) on POST {}: {}", status, path, body.trim());
        }

        Ok(())
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn find_event_type(&self, name: &str) -> Result<Option<EventTypeRecord>> {
        let listing: Vec<EventTypeDto> = self.get_json("/event-types").await?;

        Ok(listing
            .into_iter()
            .find(|dto| dto.event_type == name)
            .map(|dto| EventTypeRecord {
                id: dto.event_type_id,
                name: dto.event_type,
            }))
    }

    async fn create_event_type(&self, name: &str) -> Result<String> {
        let created: CreatedResponse = self
            .post_json("/event-types", &EventTypeCreate { event_type: name })
            .await?;
        Ok(created.id)
    }

    async fn find_rule(&self, signature: &str) -> Result<Option<RuleRecord>> {
        let listing: Vec<RuleDto> = self.get_json("/rules").await?;

        Ok(listing
            .into_iter()
            .find(|dto| dto.signature == signature)
            .map(|dto| RuleRecord {
                id: dto.rule_id,
                signature: dto.signature,
            }))
    }

    async fn create_rule(&self, rule: &NewRule<'_>) -> Result<String> {
        let created: CreatedResponse = self.post_json("/rules", rule).await?;
        Ok(created.id)
    }

    async fn find_trigger(&self, name: &str) -> Result<Option<TriggerRecord>> {
        let path = format!("/triggers/{}", name);
        let started = Instant::now();

        let response = self
            .authorize(self.client.get(self.url(&path)))
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;

        let status = response.status();
        debug!(
            path = %path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "registry GET"
        );

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Registry error ({}) on GET {}: {}", status, path, body.trim());
        }

        let dto: TriggerDto = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from GET {}", path))?;

        Ok(Some(TriggerRecord {
            id: dto.trigger_id,
            name: dto.name,
        }))
    }

    async fn create_trigger(&self, trigger: &NewTrigger<'_>) -> Result<String> {
        let created: CreatedResponse = self.post_json("/triggers", trigger).await?;
        Ok(created.id)
    }

    async fn list_triggers_for_event_type(&self, event_type_id: &str) -> Result<Vec<String>> {
        let path = format!("/event-types/{}/triggers", event_type_id);
        let listing: Vec<EventTypeTriggerDto> = self.get_json(&path).await?;
        Ok(listing.into_iter().map(|dto| dto.trigger_id).collect())
    }

    async fn link_trigger_to_event_type(
        &self,
        event_type_id: &str,
        trigger_id: &str,
    ) -> Result<()> {
        let path = format!("/event-types/{}/triggers/{}", event_type_id, trigger_id);
        self.post_unit(&path, &serde_json::json!({})).await
    }

    async fn list_rules_for_trigger(&self, trigger_id: &str) -> Result<Vec<String>> {
        let path = format!("/triggers/{}/rules", trigger_id);
        let listing: Vec<TriggerRuleDto> = self.get_json(&path).await?;
        Ok(listing.into_iter().map(|dto| dto.rule_id).collect())
    }

    async fn link_rule_to_trigger(&self, trigger_id: &str, rule_id: &str) -> Result<()> {
        let path = format!("/triggers/{}/rules/{}", trigger_id, rule_id);
        self.post_unit(&path, &serde_json::json!({})).await
    }

    async fn list_trigger_children(&self, parent_id: &str) -> Result<Vec<String>> {
        let path = format!("/triggers/{}/children", parent_id);
        let listing: Vec<TriggerChildDto> = self.get_json(&path).await?;
        Ok(listing.into_iter().map(|dto| dto.trigger_child_id).collect())
    }

    async fn link_trigger_child(
        &self,
        parent_id: &str,
        child_id: &str,
        meta: Option<&ChainMeta>,
    ) -> Result<()> {
        let path = format!("/triggers/{}/children/{}", parent_id, child_id);
        match meta {
            Some(meta) => self.post_unit(&path, meta).await,
            None => self.post_unit(&path, &serde_json::json!({})).await,
        }
    }
}
