use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, Utc};
use anyhow::{bail, Context, Result};
use std::fmt;

pub const BRAND_STATE_PREFIX: &str = "BRAND_";
pub const BRAND_FILE_STORE_DIR: &str = "brand";


/// A registered agency: where to reach it and the secret shared with it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Brand {
    pub bid: String,
    pub secret: String,
    pub name: String,
    pub end_point_url: String,
    pub enabled: bool,
    #[serde(deserialize_with = "timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp_or_now")]
    pub updated_at: DateTime<Utc>,
    #[serde(deserialize_with = "optional_timestamp")]
    pub enabled_at: Option<DateTime<Utc>>,
}

// null and "" mean "not set" in stored brand records
fn optional_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw
            .parse::<DateTime<Utc>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn timestamp_or_now<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    Ok(optional_timestamp(deserializer)?.unwrap_or_else(Utc::now))
}

impl Default for Brand {
    fn default() -> Self {
        let now = Utc::now();
        Brand {
            bid: String::new(),
            secret: String::new(),
            name: String::new(),
            end_point_url: String::new(),
            enabled: false,
            created_at: now,
            updated_at: now,
            enabled_at: None,
        }
    }
}

impl Brand {
    pub fn new(bid: String, secret: String, name: String, end_point_url: String) -> Self {
        Brand {
            bid,
            secret,
            name,
            end_point_url,
            ..Brand::default()
        }
    }

    pub fn state_key(&self) -> String {
        brand_state_key(&self.bid)
    }

    pub fn file_path(&self) -> String {
        brand_file_path(&self.bid)
    }

    pub fn enable(&mut self, now: DateTime<Utc>) {
        self.enabled = true;
        self.enabled_at = Some(now);
        self.updated_at = now;
    }

    pub fn disable(&mut self, now: DateTime<Utc>) {
        self.enabled = false;
        self.enabled_at = None;
        self.updated_at = now;
    }
}

pub fn brand_state_key(bid: &str) -> String {
    format!("{}{}", BRAND_STATE_PREFIX, bid)
}

pub fn brand_file_path(bid: &str) -> String {
    format!("{}/{}.json", BRAND_FILE_STORE_DIR, bid)
}


#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationRuntimeInfo {
    pub console_id: String,
    pub project_name: String,
    pub workspace: String,
}

impl ApplicationRuntimeInfo {
    /// Accepts the parameter either as a JSON-encoded string or as an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let info = match value {
            Value::String(raw) => serde_json::from_str(raw)
                .context("APPLICATION_RUNTIME_INFO is not valid JSON")?,
            Value::Object(_) => serde_json::from_value(value.clone())
                .context("APPLICATION_RUNTIME_INFO has an unexpected shape")?,
            other => bail!("APPLICATION_RUNTIME_INFO must be a JSON object, got {}", other),
        };
        Ok(info)
    }

    pub fn from_params(params: &Map<String, Value>) -> Result<Option<Self>> {
        match params.get("APPLICATION_RUNTIME_INFO") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) if raw.is_empty() => Ok(None),
            Some(value) => Self::from_value(value).map(Some),
        }
    }
}


#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S2sCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Comma-separated scope list, as IMS expects it.
    pub scopes: String,
    pub org_id: String,
}

impl fmt::Debug for S2sCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S2sCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<hidden>")
            .field("scopes", &self.scopes)
            .field("org_id", &self.org_id)
            .finish()
    }
}

impl S2sCredentials {
    pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
        let required = ["S2S_CLIENT_ID", "S2S_CLIENT_SECRET", "S2S_SCOPES", "ORG_ID"];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| match params.get(*key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            })
            .collect();
        if !missing.is_empty() {
            bail!("missing S2S credential parameters: {}", missing.join(", "));
        }

        let credentials = S2sCredentials {
            client_id: string_param(params, "S2S_CLIENT_ID"),
            client_secret: string_param(params, "S2S_CLIENT_SECRET"),
            scopes: join_scopes(params.get("S2S_SCOPES").unwrap_or(&Value::Null))?,
            org_id: string_param(params, "ORG_ID"),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty()
            || self.client_secret.is_empty()
            || self.scopes.is_empty()
            || self.org_id.is_empty()
        {
            bail!("S2S credentials incomplete: clientId, clientSecret, scopes and orgId are all required");
        }
        Ok(())
    }
}

fn string_param(params: &Map<String, Value>, key: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

// Scopes arrive like `["AdobeID","openid","read_organizations"]`.
fn join_scopes(value: &Value) -> Result<String> {
    let list = match value {
        Value::Array(items) => items.clone(),
        Value::String(raw) if raw.trim_start().starts_with('[') => {
            serde_json::from_str::<Vec<Value>>(raw).context("S2S_SCOPES is not a valid JSON array")?
        }
        Value::String(raw) => return Ok(raw.trim().to_string()),
        other => bail!("S2S_SCOPES must be a list of scopes, got {}", other),
    };

    let scopes: Vec<String> = list
        .iter()
        .map(|scope| match scope {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Ok(scopes.join(","))
}
