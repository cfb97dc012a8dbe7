// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tolerant decoding of Kea Control Agent responses.
//!
//! The control agent answers in several shapes depending on version and on
//! whether the command was forwarded to a daemon:
//!
//! 1. a bare array of response objects (`[{"result": 0, ...}]`)
//! 2. the same, but with `arguments` that are not an object
//! 3. an object wrapping the array (`{"responses": [...]}`)
//! 4. a single bare response object
//!
//! Shapes are tried in that order and only the first response object of an
//! array is considered; later entries (other daemons) never affect it. That
//! object is decoded strictly first, then laxly, keeping only `result` and
//! `text`. Every response object must carry a `result`.

use super::types::KeaResponse;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
struct StrictResponse {
    result: i64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct LaxResponse {
    result: i64,
    #[serde(default)]
    text: Option<String>,
}

impl From<StrictResponse> for KeaResponse {
    fn from(r: StrictResponse) -> Self {
        Self {
            result: r.result,
            text: r.text.unwrap_or_default(),
            arguments: r.arguments.map(Value::Object),
        }
    }
}

impl From<LaxResponse> for KeaResponse {
    fn from(r: LaxResponse) -> Self {
        Self {
            result: r.result,
            text: r.text.unwrap_or_default(),
            arguments: None,
        }
    }
}

/// Payload that matched none of the known response shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    raw: Vec<u8>,
}

impl DecodeFailure {
    /// The payload as indented JSON when it parses, otherwise as lossy UTF-8.
    #[must_use]
    pub fn pretty_payload(&self) -> String {
        serde_json::from_slice::<Value>(&self.raw)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| String::from_utf8_lossy(&self.raw).into_owned())
    }
}

fn decode_object(value: &Value) -> Option<KeaResponse> {
    StrictResponse::deserialize(value)
        .map(KeaResponse::from)
        .or_else(|_| LaxResponse::deserialize(value).map(KeaResponse::from))
        .ok()
}

fn decode_first(items: &[Value]) -> Option<KeaResponse> {
    items.first().and_then(decode_object)
}

/// Decode a raw control-agent payload.
///
/// # Errors
///
/// Returns `DecodeFailure` carrying the raw payload when no shape matches.
pub fn decode_response(body: &[u8]) -> Result<KeaResponse, DecodeFailure> {
    let failure = || DecodeFailure { raw: body.to_vec() };
    let value: Value = serde_json::from_slice(body).map_err(|_| failure())?;

    let decoded = match &value {
        Value::Array(items) => decode_first(items),
        Value::Object(map) => match map.get("responses") {
            Some(Value::Array(items)) => decode_first(items).or_else(|| decode_object(&value)),
            _ => decode_object(&value),
        },
        _ => None,
    };

    decoded.ok_or_else(failure)
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod decode_tests;
