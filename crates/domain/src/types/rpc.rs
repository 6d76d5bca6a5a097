//! RPC envelope types
//!
//! Foreground surfaces send `{ action, data? }` and always receive exactly
//! one response of the shape `{ success: true, ...payload }` or
//! `{ success: false, error }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, VidSumError};
use crate::impl_wire_name_conversions;

/// Closed set of actions the background process answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    Register,
    Logout,
    GetSession,
    RefreshSession,
    GetCurrentUser,
    StartAnalysis,
    GetTaskStatus,
    AnalyzeVideo,
    CancelAnalysis,
    GetHistory,
    ClearHistory,
    GetSummary,
    GetUsage,
}

impl_wire_name_conversions!(Action {
    Login => "login",
    Register => "register",
    Logout => "logout",
    GetSession => "getSession",
    RefreshSession => "refreshSession",
    GetCurrentUser => "getCurrentUser",
    StartAnalysis => "startAnalysis",
    GetTaskStatus => "getTaskStatus",
    AnalyzeVideo => "analyzeVideo",
    CancelAnalysis => "cancelAnalysis",
    GetHistory => "getHistory",
    ClearHistory => "clearHistory",
    GetSummary => "getSummary",
    GetUsage => "getUsage",
});

impl Action {
    pub const ALL: [Self; 14] = [
        Self::Login,
        Self::Register,
        Self::Logout,
        Self::GetSession,
        Self::RefreshSession,
        Self::GetCurrentUser,
        Self::StartAnalysis,
        Self::GetTaskStatus,
        Self::AnalyzeVideo,
        Self::CancelAnalysis,
        Self::GetHistory,
        Self::ClearHistory,
        Self::GetSummary,
        Self::GetUsage,
    ];
}

/// Inbound envelope
///
/// `action` stays a plain string so that unknown names can be answered
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl RpcRequest {
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), data: None }
    }

    /// Attach one `data` field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.get_or_insert_with(Map::new).insert(key.to_string(), value.into());
        self
    }

    /// Resolve the action name against the closed set.
    ///
    /// # Errors
    /// Returns `VidSumError::UnknownAction` for names outside the set.
    pub fn parsed_action(&self) -> Result<Action> {
        self.action.parse().map_err(|_| VidSumError::UnknownAction(self.action.clone()))
    }

    /// Required non-empty string field of `data`.
    ///
    /// # Errors
    /// Returns `VidSumError::InvalidInput` when the field is missing, not a
    /// string, or blank.
    pub fn required_str(&self, key: &str) -> Result<String> {
        match self.optional_str(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(VidSumError::InvalidInput(format!("'{key}' is required"))),
        }
    }

    /// Optional string field of `data`.
    #[must_use]
    pub fn optional_str(&self, key: &str) -> Option<String> {
        self.data.as_ref()?.get(key)?.as_str().map(str::to_string)
    }
}

/// Outbound envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RpcResponse {
    /// Successful response with an empty payload.
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true, error: None, payload: Map::new() }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), payload: Map::new() }
    }

    /// Add one payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Payload field lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl From<&VidSumError> for RpcResponse {
    fn from(err: &VidSumError) -> Self {
        Self::failure(err.to_string())
    }
}
