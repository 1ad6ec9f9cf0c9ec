use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display as EnumDisplay, EnumString};

pub mod mongo_model;

pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Hours after placement during which a pending order may still be cancelled.
pub const CANCELLATION_WINDOW_HOURS: i64 = 24;
/// Days after delivery during which a return may be requested.
pub const RETURN_WINDOW_DAYS: i64 = 14;
/// Days after delivery during which a replacement may be requested.
pub const REPLACEMENT_WINDOW_DAYS: i64 = 30;

/// Maximum number of reviews returned for a single product page.
pub const REVIEW_PAGE_LIMIT: i64 = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Cancelled,
    ReturnApproved,
    ReplacementApproved,
    ReturnInProgress,
    ReplacementInProgress,
    Returned,
    Replaced,
}

impl OrderStatus {
    /// Canonical forward path of the fulfilment flow. The return/replacement
    /// sub-states are reachable only through the return-request flow, so the
    /// base status path treats them as out-of-table.
    pub fn is_forward_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Delivered)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Upi,
    Card,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReturnKind {
    Return,
    Replacement,
}

impl ReturnKind {
    pub fn window_days(self) -> i64 {
        match self {
            ReturnKind::Return => RETURN_WINDOW_DAYS,
            ReturnKind::Replacement => REPLACEMENT_WINDOW_DAYS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReturnKind::Return => "Return",
            ReturnKind::Replacement => "Replacement",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Picked,
    Completed,
}

/// Whether `now` still falls inside a day-granular window that opened at
/// `from`. Plain millisecond arithmetic: the boundary instant itself is in
/// the window, one millisecond later is out. A `from` stamped in the future
/// (demo data) counts as zero elapsed time, i.e. the full window remains.
pub fn within_window_days(from: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> bool {
    let elapsed_ms = (now.timestamp_millis() - from.timestamp_millis()).max(0);
    elapsed_ms <= window_days * MS_PER_DAY
}

/// Hour-granular variant of [`within_window_days`], used for the
/// cancellation window.
pub fn within_window_hours(from: DateTime<Utc>, now: DateTime<Utc>, window_hours: i64) -> bool {
    let elapsed_ms = (now.timestamp_millis() - from.timestamp_millis()).max(0);
    elapsed_ms <= window_hours * MS_PER_HOUR
}
