use desk_core::error::DeskError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Request timeout for datastore calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A member row, as exposed by the datastore.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRow {
    /// Internal primary key, referenced by bookings.
    pub id: i64,
    /// Public member id, the one members quote at the desk.
    pub member_id: String,
}

/// A class row.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassRow {
    pub id: i64,
    pub class_name: String,
    pub class_date: String,
    pub spots_available: Option<i64>,
}

/// A booking row.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRow {
    /// Internal primary key.
    pub id: i64,
    /// Public confirmation id quoted back to the member.
    pub booking_id: ConfirmationId,
}

/// Public confirmation id — the datastore may expose it as a number or a
/// string depending on the column type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfirmationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// REST client for the bookings datastore (PostgREST-style API: table
/// endpoints under /rest/v1 with `eq.` filters). The store owns all booking
/// lifecycle state; this client only issues requests.
pub struct BookingStore {
    client: reqwest::Client,
    base_url: String,
}

impl BookingStore {
    pub fn new(base_url: &str, service_role_key: &str) -> Result<Self, DeskError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(service_role_key)
            .map_err(|e| DeskError::Config(format!("Invalid service role key: {}", e)))?;
        headers.insert("apikey", key_value);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_role_key))
            .map_err(|e| DeskError::Config(format!("Invalid service role key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("gym-desk/0.1")
            .default_headers(headers)
            .build()
            .map_err(|e| DeskError::Store(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, DeskError> {
        let response = self
            .client
            .get(self.endpoint(table))
            .query(filters)
            .query(&[("select", "*")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| DeskError::Store(format!("Query on '{}' failed: {}", table, e)))?;
        Ok(response.json().await?)
    }

    /// Look up a member by their public member id.
    pub async fn find_member(&self, member_id: &str) -> Result<Option<MemberRow>, DeskError> {
        let rows: Vec<MemberRow> = self
            .select("members", &[("member_id", format!("eq.{}", member_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Look up a class by name (first match).
    pub async fn find_class(&self, class_name: &str) -> Result<Option<ClassRow>, DeskError> {
        let rows: Vec<ClassRow> = self
            .select("classes", &[("class_name", format!("eq.{}", class_name))])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Look up a class by name on a specific date.
    pub async fn find_class_on(
        &self,
        class_name: &str,
        date: &str,
    ) -> Result<Option<ClassRow>, DeskError> {
        let rows: Vec<ClassRow> = self
            .select(
                "classes",
                &[
                    ("class_name", format!("eq.{}", class_name)),
                    ("class_date", format!("eq.{}", date)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// All classes scheduled on a date.
    pub async fn classes_on(&self, date: &str) -> Result<Vec<ClassRow>, DeskError> {
        self.select("classes", &[("class_date", format!("eq.{}", date))])
            .await
    }

    /// Insert a booking and return the created row (with its confirmation id).
    pub async fn insert_booking(
        &self,
        member_pk: i64,
        class_pk: i64,
    ) -> Result<BookingRow, DeskError> {
        let response = self
            .client
            .post(self.endpoint("class_bookings"))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "member_id": member_pk,
                "class_id": class_pk,
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| DeskError::Store(format!("Booking insert failed: {}", e)))?;

        let rows: Vec<BookingRow> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DeskError::Store("Booking insert returned no row".into()))
    }

    /// Find a booking by its public confirmation id, scoped to a member.
    pub async fn find_booking(
        &self,
        booking_id: &str,
        member_pk: i64,
    ) -> Result<Option<BookingRow>, DeskError> {
        let rows: Vec<BookingRow> = self
            .select(
                "class_bookings",
                &[
                    ("booking_id", format!("eq.{}", booking_id)),
                    ("member_id", format!("eq.{}", member_pk)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Delete a booking by its internal row id.
    pub async fn delete_booking(&self, row_id: i64) -> Result<(), DeskError> {
        self.client
            .delete(self.endpoint("class_bookings"))
            .query(&[("id", format!("eq.{}", row_id))])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| DeskError::Store(format!("Booking delete failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let store = BookingStore::new("https://db.example.com/", "key").unwrap();
        assert_eq!(
            store.endpoint("members"),
            "https://db.example.com/rest/v1/members"
        );
    }

    #[test]
    fn test_confirmation_id_accepts_number_or_text() {
        let row: BookingRow = serde_json::from_str(r#"{"id": 3, "booking_id": 17}"#).unwrap();
        assert_eq!(row.booking_id.to_string(), "17");

        let row: BookingRow =
            serde_json::from_str(r#"{"id": 3, "booking_id": "BK-17"}"#).unwrap();
        assert_eq!(row.booking_id.to_string(), "BK-17");
    }

    #[test]
    fn test_class_row_tolerates_missing_spots() {
        let row: ClassRow = serde_json::from_str(
            r#"{"id": 1, "class_name": "yoga", "class_date": "2026-08-07"}"#,
        )
        .unwrap();
        assert!(row.spots_available.is_none());
    }
}
