// src/storage/supabase.rs
//! PostgREST adapter for the hosted relational backend.
//!
//! Every [`Store`] operation maps onto one or two REST calls against the
//! hosted API (`/rest/v1/<table>` with `col=eq.value` filters). The service
//! key travels in both the `apikey` header and as a bearer token, which is
//! what the hosted backend expects for server-side access.
//!
//! Filter values are always attached as percent-encoded query pairs, never
//! spliced into the URL by hand: scan codes and tokens arrive from clients
//! and may carry `&`/`=`/`+`, and RFC 3339 offsets would otherwise decode
//! into spaces server-side.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{Store, StoreError};
use crate::models::attendance::AttendanceRecord;
use crate::models::student::Student;
use crate::models::trainer::Trainer;

/// Thin client over the hosted PostgREST API.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CredentialRow {
    student_id: String,
}

/// Timestamps on the wire: UTC with a `Z` suffix, so filter values never
/// contain a `+` for the query string to mangle.
fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SupabaseStore {
    /// Builds a store client for the given project URL and service key.
    ///
    /// # Arguments
    /// * `base_url` - Project URL without trailing slash (e.g. `https://xyz.supabase.co`)
    /// * `service_key` - Service-role API key, held server-side only
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(service_key)
            .map_err(|_| StoreError::Unexpected("service key is not a valid header".into()))?;
        headers.insert("apikey", key_value);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .map_err(|_| StoreError::Unexpected("service key is not a valid header".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(SupabaseStore {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// REST URL for a table with the given filter pairs, percent-encoding
    /// every value. Repeated keys are allowed (PostgREST range filters).
    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url, StoreError> {
        Url::parse_with_params(&format!("{}/rest/v1/{}", self.base_url, table), params)
            .map_err(|e| StoreError::Unexpected(format!("bad store url: {}", e)))
    }

    /// Runs a filtered select and deserializes the resulting row set.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, params)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Unexpected(format!(
                "select from {} returned {}",
                table,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Inserts a row and returns the stored representation.
    async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: serde_json::Value,
    ) -> Result<T, StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let response = self
            .http
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Unexpected(format!(
                "insert into {} returned {}",
                table,
                response.status()
            )));
        }
        let mut rows: Vec<T> = response.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Unexpected(format!("insert into {} returned no row", table)))
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let id_filter = format!("eq.{}", id);
        let mut rows: Vec<Student> = self
            .select(
                "students",
                &[("id", id_filter.as_str()), ("select", "*"), ("limit", "1")],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn find_student_by_credential_code(
        &self,
        code: &str,
    ) -> Result<Option<Student>, StoreError> {
        let code_filter = format!("eq.{}", code);
        let mut rows: Vec<CredentialRow> = self
            .select(
                "credentials",
                &[
                    ("code", code_filter.as_str()),
                    ("is_active", "eq.true"),
                    ("select", "student_id"),
                    ("limit", "1"),
                ],
            )
            .await?;
        match rows.pop() {
            Some(row) => self.find_student(&row.student_id).await,
            None => Ok(None),
        }
    }

    async fn find_trainer_by_token(&self, token: &str) -> Result<Option<Trainer>, StoreError> {
        let token_filter = format!("eq.{}", token);
        let mut rows: Vec<Trainer> = self
            .select(
                "trainers",
                &[
                    ("token", token_filter.as_str()),
                    ("select", "*"),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows.pop())
    }

    async fn insert_attendance(
        &self,
        student_id: &str,
        at: DateTime<Utc>,
        source: Option<&str>,
    ) -> Result<AttendanceRecord, StoreError> {
        self.insert(
            "attendance",
            json!({
                "student_id": student_id,
                "created_at": rfc3339(at),
                "source": source,
            }),
        )
        .await
    }

    async fn query_attendance(
        &self,
        student_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let id_filter = format!("eq.{}", student_id);
        let from_filter = format!("gte.{}", rfc3339(from));
        let to_filter = format!("lte.{}", rfc3339(to));
        self.select(
            "attendance",
            &[
                ("student_id", id_filter.as_str()),
                ("created_at", from_filter.as_str()),
                ("created_at", to_filter.as_str()),
                ("select", "student_id,created_at,source"),
            ],
        )
        .await
    }

    async fn list_active_students(&self) -> Result<Vec<Student>, StoreError> {
        self.select(
            "students",
            &[
                ("is_active", "eq.true"),
                ("select", "*"),
                ("order", "full_name"),
            ],
        )
        .await
    }

    async fn attendance_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let since_filter = format!("gte.{}", rfc3339(since));
        self.select(
            "attendance",
            &[
                ("created_at", since_filter.as_str()),
                ("select", "student_id,created_at,source"),
            ],
        )
        .await
    }

    async fn insert_credential(&self, student_id: &str, code: &str) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/credentials", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "student_id": student_id,
                "code": code,
                "type": "qr",
                "is_active": true,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Unexpected(format!(
                "insert into credentials returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> SupabaseStore {
        SupabaseStore::new("https://example.supabase.co", "service-key").unwrap()
    }

    #[test]
    fn test_timestamp_filters_carry_no_plus_sign() {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        let filter = format!("gte.{}", rfc3339(at));
        assert!(filter.ends_with('Z'));

        let url = store()
            .table_url(
                "attendance",
                &[("student_id", "eq.abc-123"), ("created_at", filter.as_str())],
            )
            .unwrap();
        assert!(!url.query().unwrap().contains('+'));
    }

    #[test]
    fn test_offset_timestamp_value_is_percent_encoded() {
        let url = store()
            .table_url(
                "attendance",
                &[("created_at", "gte.2026-04-01T10:00:00+00:00")],
            )
            .unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("%2B"));
        assert!(!query.contains('+'));
    }

    #[test]
    fn test_scan_code_with_metacharacters_stays_one_filter() {
        let code_filter = format!("eq.{}", "STU-X&is_active=eq.false");
        let url = store()
            .table_url(
                "credentials",
                &[
                    ("code", code_filter.as_str()),
                    ("is_active", "eq.true"),
                    ("select", "student_id"),
                    ("limit", "1"),
                ],
            )
            .unwrap();

        assert_eq!(url.query_pairs().count(), 4);
        for (key, value) in url.query_pairs() {
            if key == "is_active" {
                assert_eq!(value, "eq.true");
            }
            if key == "code" {
                assert_eq!(value, "eq.STU-X&is_active=eq.false");
            }
        }
    }

    #[test]
    fn test_range_filter_repeats_the_column_key() {
        let url = store()
            .table_url(
                "attendance",
                &[
                    ("created_at", "gte.2026-04-01T00:00:00.000000Z"),
                    ("created_at", "lte.2026-04-02T00:00:00.000000Z"),
                ],
            )
            .unwrap();
        let created = url
            .query_pairs()
            .filter(|(k, _)| k == "created_at")
            .count();
        assert_eq!(created, 2);
    }
}
