//! Stripe API response types
//!
//! Only the envelope is modelled; event documents stay untyped so they can be
//! mirrored verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /v1/events` response
///
/// See: https://stripe.com/docs/api/events/list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListResponse {
    /// Event documents on this page
    #[serde(default)]
    pub data: Vec<Value>,

    /// Whether more events follow this page
    #[serde(default)]
    pub has_more: bool,

    /// Overall count, present when `include[]=total_count` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    /// Resource path of the listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Error envelope returned with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,
}
