//! Events the bridge publishes to the Adobe I/O Event Hub.
//!
//! Every event carries a fixed `type` string, a JSON `data` payload and the
//! rules for which payload fields must be present before it may be sent.

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use anyhow::{anyhow, bail, Result};

use crate::types::{ApplicationRuntimeInfo, Brand};

pub const CLOUD_EVENTS_SPEC_VERSION: &str = "1.0";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEventKind {
    RegistrationReceived,
    RegistrationEnabled,
    RegistrationDisabled,
    AssetSyncNew,
    AssetSyncUpdated,
    AssetSyncDeleted,
}

/// Which I/O Events provider an event is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventProvider {
    Registration,
    AssetSync,
}

const BRAND_FIELDS: &[&str] = &["bid", "brandId", "secret", "name", "endPointUrl"];
const ASSET_FIELDS: &[&str] = &["asset_id", "asset_path", "metadata"];
const ASSET_DELETE_FIELDS: &[&str] = &["asset_id", "asset_path"];

impl IoEventKind {
    pub const ALL: [IoEventKind; 6] = [
        IoEventKind::RegistrationReceived,
        IoEventKind::RegistrationEnabled,
        IoEventKind::RegistrationDisabled,
        IoEventKind::AssetSyncNew,
        IoEventKind::AssetSyncUpdated,
        IoEventKind::AssetSyncDeleted,
    ];

    pub fn event_type(&self) -> &'static str {
        match self {
            IoEventKind::RegistrationReceived => "com.adobe.a2b.registration.received",
            IoEventKind::RegistrationEnabled => "com.adobe.a2b.registration.enabled",
            IoEventKind::RegistrationDisabled => "com.adobe.a2b.registration.disabled",
            IoEventKind::AssetSyncNew => "com.adobe.a2b.assetsync.new",
            IoEventKind::AssetSyncUpdated => "com.adobe.a2b.assetsync.updated",
            IoEventKind::AssetSyncDeleted => "com.adobe.a2b.assetsync.deleted",
        }
    }

    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_type() == event_type)
    }

    pub fn provider(&self) -> EventProvider {
        match self {
            IoEventKind::RegistrationReceived
            | IoEventKind::RegistrationEnabled
            | IoEventKind::RegistrationDisabled => EventProvider::Registration,
            IoEventKind::AssetSyncNew
            | IoEventKind::AssetSyncUpdated
            | IoEventKind::AssetSyncDeleted => EventProvider::AssetSync,
        }
    }

    pub fn is_asset_sync(&self) -> bool {
        self.provider() == EventProvider::AssetSync
    }

    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            IoEventKind::AssetSyncNew | IoEventKind::AssetSyncUpdated => ASSET_FIELDS,
            IoEventKind::AssetSyncDeleted => ASSET_DELETE_FIELDS,
            _ => BRAND_FIELDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IoEvent {
    pub kind: IoEventKind,
    pub id: Option<String>,
    pub source: Option<String>,
    pub brand_id: Option<String>,
    pub data: Value,
}

/// The CloudEvents 1.0 envelope sent to the ingress.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    pub r#type: String,
    pub datacontenttype: String,
    pub data: Value,
}

impl IoEvent {
    fn new(kind: IoEventKind, data: Value) -> Self {
        let brand_id = data
            .get("brandId")
            .and_then(Value::as_str)
            .map(str::to_string);
        IoEvent { kind, id: None, source: None, brand_id, data }
    }

    /// Builds one of the three asset-sync events from an agency payload.
    pub fn asset_sync(kind: IoEventKind, data: Value) -> Result<Self> {
        if !kind.is_asset_sync() {
            bail!("{} is not an asset sync event type", kind.event_type());
        }
        Ok(Self::new(kind, data))
    }

    pub fn new_brand_registration(brand: &Brand) -> Result<Self> {
        Self::registration(IoEventKind::RegistrationReceived, brand)
    }

    pub fn brand_enabled(brand: &Brand) -> Result<Self> {
        Self::registration(IoEventKind::RegistrationEnabled, brand)
    }

    pub fn brand_disabled(brand: &Brand) -> Result<Self> {
        Self::registration(IoEventKind::RegistrationDisabled, brand)
    }

    fn registration(kind: IoEventKind, brand: &Brand) -> Result<Self> {
        let mut data = serde_json::to_value(brand)?;
        if let Value::Object(ref mut fields) = data {
            fields.insert("brandId".to_string(), Value::String(brand.bid.clone()));
        }
        Ok(Self::new(kind, data))
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    pub fn set_source(&mut self, provider_id: &str) {
        self.source = Some(format!("urn:uuid:{}", provider_id));
    }

    /// Adds `app_runtime_info` to the payload unless the sender already set one.
    pub fn attach_runtime_info(&mut self, info: &ApplicationRuntimeInfo) -> Result<()> {
        if let Value::Object(ref mut fields) = self.data {
            if !fields.contains_key("app_runtime_info") {
                fields.insert("app_runtime_info".to_string(), serde_json::to_value(info)?);
            }
        }
        Ok(())
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let Some(fields) = self.data.as_object() else {
            return self.kind.required_fields().to_vec();
        };
        let mut missing: Vec<&'static str> = self
            .kind
            .required_fields()
            .iter()
            .copied()
            .filter(|field| !self.has_field(fields, field))
            .collect();
        if self.kind.provider() == EventProvider::Registration
            && !matches!(fields.get("enabled"), Some(Value::Bool(_)))
        {
            missing.push("enabled");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} event is missing required data: {}",
                self.event_type(),
                missing.join(", ")
            ))
        }
    }

    // `brandId` counts as present when the event carries one, since to_json injects it.
    fn has_field(&self, fields: &Map<String, Value>, field: &str) -> bool {
        fields.contains_key(field) || (field == "brandId" && self.brand_id.is_some())
    }

    fn payload(&self) -> Value {
        let mut data = self.data.clone();
        if let (Some(brand_id), Value::Object(fields)) = (&self.brand_id, &mut data) {
            fields.insert("brandId".to_string(), Value::String(brand_id.clone()));
        }
        data
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "source": self.source,
            "type": self.event_type(),
            "datacontenttype": JSON_CONTENT_TYPE,
            "id": self.id,
            "data": self.payload(),
        })
    }

    pub fn to_cloud_event(&self) -> Result<CloudEvent> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| anyhow!("{} event has no id", self.event_type()))?;
        let source = self
            .source
            .clone()
            .ok_or_else(|| anyhow!("{} event has no source", self.event_type()))?;
        Ok(CloudEvent {
            specversion: CLOUD_EVENTS_SPEC_VERSION.to_string(),
            id,
            source,
            r#type: self.event_type().to_string(),
            datacontenttype: JSON_CONTENT_TYPE.to_string(),
            data: self.payload(),
        })
    }
}
