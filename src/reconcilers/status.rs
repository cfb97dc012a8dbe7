// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `NetworkConfiguration`.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (this operator writes `Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `observedGeneration`: The generation the condition was computed from
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! Status is built in memory by [`next_status`] and only written when
//! [`status_changed`] reports a difference in a meaningful field.
//!
//! # Example
//!
//! ```rust,no_run
//! use kea_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition("Ready", "True", "Configured", "All 2 MAC reservations configured", Some(3));
//! assert_eq!(condition.observed_generation, Some(3));
//! ```

use crate::constants::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY, PHASE_ERROR,
    PHASE_READY, PHASE_RECONCILING, STATUS_FAILED, STATUS_IN_PROGRESS, STATUS_SUCCESS,
};
use crate::crd::{Condition, NetworkConfigurationStatus, NetworkInterfaceStatus};
use chrono::Utc;

/// Overall state of a `NetworkConfiguration` as recorded in status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Reconciling,
    Ready,
    Error,
}

impl Phase {
    /// `(phase, status, Ready condition status)` written for this state.
    #[must_use]
    pub fn fields(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Reconciling => (PHASE_RECONCILING, STATUS_IN_PROGRESS, CONDITION_STATUS_FALSE),
            Self::Ready => (PHASE_READY, STATUS_SUCCESS, CONDITION_STATUS_TRUE),
            Self::Error => (PHASE_ERROR, STATUS_FAILED, CONDITION_STATUS_FALSE),
        }
    }
}

/// Create a new condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        observed_generation,
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status value is unchanged,
/// and set to now when it flips or the condition is new.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.observed_generation = observed_generation;
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(
            condition_type,
            status,
            reason,
            message,
            observed_generation,
        ));
    }
}

/// Whether a pass must first record the Reconciling state: true unless a
/// `Ready` condition already exists for `generation`.
#[must_use]
pub fn needs_reconciling_mark(
    status: Option<&NetworkConfigurationStatus>,
    generation: Option<i64>,
) -> bool {
    status
        .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_READY))
        .is_none_or(|c| c.observed_generation != generation)
}

/// Build the status to write next from the current one.
///
/// `created` is carried over once set; the Ready condition keeps its
/// transition time while its status value is unchanged. `interfaces` of
/// `None` keeps the current per-interface projection.
#[must_use]
pub fn next_status(
    current: Option<&NetworkConfigurationStatus>,
    phase: Phase,
    reason: &str,
    message: &str,
    generation: Option<i64>,
    interfaces: Option<Vec<NetworkInterfaceStatus>>,
) -> NetworkConfigurationStatus {
    let mut next = current.cloned().unwrap_or_default();
    let (phase_name, status_word, condition_status) = phase.fields();

    next.phase = Some(phase_name.to_string());
    next.status = Some(status_word.to_string());
    next.message = Some(message.to_string());
    if next.created.is_none() {
        next.created = Some(Utc::now().to_rfc3339());
    }
    update_condition_in_memory(
        &mut next.conditions,
        CONDITION_TYPE_READY,
        condition_status,
        reason,
        message,
        generation,
    );
    if let Some(interfaces) = interfaces {
        next.network_interfaces = interfaces;
    }
    next
}

fn condition_key(c: &Condition) -> (&str, &str, Option<&str>, Option<&str>, Option<i64>) {
    (
        c.r#type.as_str(),
        c.status.as_str(),
        c.reason.as_deref(),
        c.message.as_deref(),
        c.observed_generation,
    )
}

/// Whether writing `next` would change anything meaningful.
///
/// Timestamps are ignored: `created` and `lastTransitionTime` never trigger a write.
#[must_use]
pub fn status_changed(
    current: Option<&NetworkConfigurationStatus>,
    next: &NetworkConfigurationStatus,
) -> bool {
    let Some(current) = current else {
        return true;
    };

    current.phase != next.phase
        || current.status != next.status
        || current.message != next.message
        || current.network_interfaces != next.network_interfaces
        || current.conditions.len() != next.conditions.len()
        || current
            .conditions
            .iter()
            .zip(&next.conditions)
            .any(|(a, b)| condition_key(a) != condition_key(b))
}
