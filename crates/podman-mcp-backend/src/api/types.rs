//! Records decoded from list responses.
//!
//! Only the fields the text tables need are kept. Both libpod and
//! docker-compatible key spellings are accepted, and `null` reads as empty.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::BackendError;

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Words {
    One(String),
    Many(Vec<String>),
}

fn words<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Words>::deserialize(deserializer)? {
        Some(Words::One(s)) if s.is_empty() => Vec::new(),
        Some(Words::One(s)) => vec![s],
        Some(Words::Many(v)) => v,
        None => Vec::new(),
    })
}

/// Creation time as unix seconds or RFC 3339 text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp(pub Option<DateTime<Utc>>);

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        let time = match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .filter(|secs| *secs > 0)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|t| t.with_timezone(&Utc))
                .filter(|t| t.timestamp() > 0),
            _ => None,
        };
        Ok(Self(time))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PortMapping {
    #[serde(default, alias = "PublicPort", deserialize_with = "nullable")]
    pub host_port: u16,
    #[serde(default, alias = "PrivatePort", deserialize_with = "nullable")]
    pub container_port: u16,
    #[serde(default, alias = "Type", deserialize_with = "nullable")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerSummary {
    #[serde(default, rename = "Id", alias = "ID", alias = "id", deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, rename = "Image", alias = "image", deserialize_with = "nullable")]
    pub image: String,
    #[serde(default, rename = "Command", alias = "command", deserialize_with = "words")]
    pub command: Vec<String>,
    #[serde(default, rename = "Created", alias = "created")]
    pub created: Timestamp,
    #[serde(default, rename = "State", alias = "state", deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, rename = "Status", alias = "status", deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, rename = "Ports", alias = "ports", deserialize_with = "nullable")]
    pub ports: Vec<PortMapping>,
    #[serde(default, rename = "Names", alias = "names", deserialize_with = "words")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSummary {
    #[serde(default, rename = "Id", alias = "ID", alias = "id", deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, rename = "RepoTags", deserialize_with = "nullable")]
    pub repo_tags: Vec<String>,
    #[serde(default, rename = "Names", deserialize_with = "nullable")]
    pub names: Vec<String>,
    #[serde(default, rename = "Digest", deserialize_with = "nullable")]
    pub digest: String,
    #[serde(default, rename = "Created")]
    pub created: Timestamp,
    #[serde(default, rename = "Size", deserialize_with = "nullable")]
    pub size: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkSummary {
    #[serde(default, alias = "Id", alias = "ID", deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, alias = "Name", deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, alias = "Driver", deserialize_with = "nullable")]
    pub driver: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeSummary {
    #[serde(default, rename = "Name", alias = "name", deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, rename = "Driver", alias = "driver", deserialize_with = "nullable")]
    pub driver: String,
}

/// Reduce a volume list response to its array of volumes.
///
/// libpod answers with a bare array, the compatible API with
/// `{"Volumes": [...]}`.
pub fn volume_entries(value: Value) -> Value {
    match value {
        Value::Object(mut map) => map
            .remove("Volumes")
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    }
}

/// Decode a JSON array into records; `null` is an empty list.
pub fn records<T: serde::de::DeserializeOwned>(value: Value) -> Result<Vec<T>, serde_json::Error> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
}

/// `POST /libpod/containers/create` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateResponse {
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
}

/// One entry of a container removal response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RemoveReport {
    #[serde(default, rename = "Err", deserialize_with = "nullable")]
    pub err: String,
}

/// `DELETE /libpod/images/remove` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ImageRemoveReport {
    #[serde(default, rename = "Deleted", deserialize_with = "nullable")]
    pub deleted: Vec<String>,
    #[serde(default, rename = "Errors", deserialize_with = "nullable")]
    pub errors: Vec<String>,
}

/// Decode a remove report; an empty body means nothing to report.
pub(crate) fn report<T>(body: &[u8]) -> Result<T, BackendError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}
