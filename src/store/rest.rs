//! PostgREST-backed [`EngagementStore`] (Supabase-compatible).
//!
//! Rows use the same snake_case columns as the SQLite table, with
//! `artifacts` as a JSON column:
//!
//! - list: `GET /{table}?select=*&order=created_at.desc`
//! - get: `GET /{table}?select=*&id=eq.{id}`
//! - upsert: `POST /{table}` with `Prefer: resolution=merge-duplicates`
//! - delete: `DELETE /{table}?id=eq.{id}` with `Prefer: return=representation`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use super::{sort_newest_first, EngagementStore};
use crate::error::{truncate_for_diagnostics, AppError};
use crate::models::EngagementRecord;

pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
}

impl RestStore {
    /// `base_url` is the PostgREST root, e.g. `https://x.supabase.co/rest/v1`.
    pub fn new(base_url: &str, table: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), table),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport(e: reqwest::Error) -> AppError {
    AppError::Persistence(e.to_string())
}

/// Fail on non-2xx, keeping a truncated body for the message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Persistence(format!(
        "store returned {}: {}",
        status,
        truncate_for_diagnostics(&body)
    )))
}

async fn rows(response: reqwest::Response) -> Result<Vec<EngagementRecord>, AppError> {
    check(response)
        .await?
        .json::<Vec<EngagementRecord>>()
        .await
        .map_err(transport)
}

#[async_trait]
impl EngagementStore for RestStore {
    async fn list(&self) -> Result<Vec<EngagementRecord>, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(transport)?;
        let mut records = rows(response).await?;
        // Server order is authoritative but ties are unspecified.
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<EngagementRecord>, AppError> {
        let filter = format!("eq.{}", id);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("id", filter.as_str())])
            .send()
            .await
            .map_err(transport)?;
        Ok(rows(response).await?.into_iter().next())
    }

    async fn upsert(&self, record: &EngagementRecord) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "resolution=merge-duplicates")
            .json(record)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let filter = format!("eq.{}", id);
        let response = self
            .client
            .delete(&self.endpoint)
            .header("Prefer", "return=representation")
            .query(&[("id", filter.as_str())])
            .send()
            .await
            .map_err(transport)?;
        Ok(!rows(response).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_table() {
        let store = RestStore::new("https://x.supabase.co/rest/v1/", "engagements", "k").unwrap();
        assert_eq!(store.endpoint(), "https://x.supabase.co/rest/v1/engagements");
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(RestStore::new("http://localhost", "t", "bad\nkey").is_err());
    }

    mod fake_postgrest {
        use std::collections::HashMap;
        use std::sync::Arc;

        use axum::extract::{Query, State};
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::get;
        use axum::{Json, Router};
        use tokio::sync::Mutex;

        use crate::models::EngagementRecord;

        type Rows = Arc<Mutex<Vec<EngagementRecord>>>;

        fn authorized(headers: &HeaderMap) -> bool {
            headers.get("apikey").is_some_and(|v| v == "secret")
                && headers
                    .get("authorization")
                    .is_some_and(|v| v == "Bearer secret")
        }

        fn id_filter(params: &HashMap<String, String>) -> Option<String> {
            params
                .get("id")
                .and_then(|f| f.strip_prefix("eq."))
                .map(str::to_string)
        }

        async fn select(
            State(rows): State<Rows>,
            headers: HeaderMap,
            Query(params): Query<HashMap<String, String>>,
        ) -> Result<Json<Vec<EngagementRecord>>, StatusCode> {
            if !authorized(&headers) {
                return Err(StatusCode::UNAUTHORIZED);
            }
            let rows = rows.lock().await;
            let mut out: Vec<_> = match id_filter(&params) {
                Some(id) => rows.iter().filter(|r| r.id == id).cloned().collect(),
                None => rows.clone(),
            };
            if params.get("order").map(String::as_str) == Some("created_at.desc") {
                out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            Ok(Json(out))
        }

        async fn upsert(
            State(rows): State<Rows>,
            headers: HeaderMap,
            Json(record): Json<EngagementRecord>,
        ) -> StatusCode {
            if !headers
                .get("prefer")
                .is_some_and(|v| v == "resolution=merge-duplicates")
            {
                return StatusCode::CONFLICT;
            }
            let mut rows = rows.lock().await;
            rows.retain(|r| r.id != record.id);
            rows.push(record);
            StatusCode::CREATED
        }

        async fn remove(
            State(rows): State<Rows>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<Vec<EngagementRecord>> {
            let id = id_filter(&params).unwrap_or_default();
            let mut rows = rows.lock().await;
            let (removed, kept): (Vec<_>, Vec<_>) = rows.drain(..).partition(|r| r.id == id);
            *rows = kept;
            Json(removed)
        }

        pub async fn spawn() -> String {
            let rows: Rows = Arc::new(Mutex::new(Vec::new()));
            let app = Router::new()
                .route("/rest/v1/engagements", get(select).post(upsert).delete(remove))
                .with_state(rows);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}/rest/v1", addr)
        }
    }

    #[tokio::test]
    async fn crud_against_postgrest_endpoint() {
        use crate::models::DiscoveryRecord;
        use chrono::{TimeZone, Utc};

        let base = fake_postgrest::spawn().await;
        let store = RestStore::new(&base, "engagements", "secret").unwrap();

        let record = |id: &str, hour: u32| {
            EngagementRecord::from_discovery(
                id.to_string(),
                Utc.with_ymd_and_hms(2025, 5, 1, hour, 0, 0).unwrap(),
                &DiscoveryRecord {
                    company_name: format!("Company {id}"),
                    ..Default::default()
                },
                None,
            )
        };

        store.upsert(&record("a", 8)).await.unwrap();
        store.upsert(&record("b", 9)).await.unwrap();
        store.upsert(&record("a", 10)).await.unwrap();

        let ids: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(
            store.get("b").await.unwrap().unwrap().company_name,
            "Company b"
        );
        assert!(store.delete("b").await.unwrap());
        assert!(!store.delete("b").await.unwrap());
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_key_is_a_persistence_error() {
        let base = fake_postgrest::spawn().await;
        let store = RestStore::new(&base, "engagements", "wrong").unwrap();
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(ref m) if m.contains("401")));
    }
}
