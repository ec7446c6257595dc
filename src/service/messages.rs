use crate::error::{ExportError, Result};
use crate::export::HistoryEntry;
use crate::mapping::{ExportData, FieldMapping};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXPORT_PROFILE: &str = "EXPORT_PROFILE";
pub const EXPORT_SEARCH_RESULTS: &str = "EXPORT_SEARCH_RESULTS";
pub const GET_STATUS: &str = "GET_STATUS";
pub const UPDATE_FIELD_MAPPING: &str = "UPDATE_FIELD_MAPPING";
pub const SET_PRO_STATUS: &str = "SET_PRO_STATUS";

/// Message envelope: `type` names the operation, `payload` carries its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type", default)]
    pub request_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Request {
    pub fn new<S: Into<String>>(request_type: S, payload: Option<Value>) -> Self {
        Self {
            request_type: request_type.into(),
            payload,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ExportError::InvalidRequest {
            message: format!("request is not a valid message: {}", e),
        })
    }

    /// Decodes the payload; an absent payload decodes as JSON `null`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self.payload.clone().unwrap_or(Value::Null);
        serde_json::from_value(payload).map_err(|e| ExportError::InvalidRequest {
            message: format!("invalid payload for {}: {}", self.request_type, e),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExportData>,
}

impl Ack {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: ExportData) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub export_count: u32,
    /// `-1` when the user is not limited.
    pub export_limit: i64,
    pub is_pro_user: bool,
    pub export_history: Vec<HistoryEntry>,
    pub field_mapping: FieldMapping,
}

impl StatusReport {
    /// Exports left this month, `None` when unlimited.
    pub fn remaining_exports(&self) -> Option<u32> {
        u32::try_from(self.export_limit)
            .ok()
            .map(|limit| limit.saturating_sub(self.export_count))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status(StatusReport),
    Ack(Ack),
}

impl Response {
    pub fn is_success(&self) -> bool {
        match self {
            Response::Status(_) => true,
            Response::Ack(ack) => ack.success,
        }
    }
}

impl From<Ack> for Response {
    fn from(ack: Ack) -> Self {
        Response::Ack(ack)
    }
}

impl From<StatusReport> for Response {
    fn from(report: StatusReport) -> Self {
        Response::Status(report)
    }
}
