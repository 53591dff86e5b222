//! Built-in segment templates.
//!
//! Time-relative presets are evaluated against the clock on every call, so the
//! rolling windows never go stale.

use crate::domain::{Condition, Decimal, TimeMs};
use serde::Serialize;
use std::collections::BTreeMap;

/// Registration window for `new_users`.
pub const NEW_USER_WINDOW_DAYS: i64 = 30;
/// Minimum account age for `inactive_users`.
pub const INACTIVE_AFTER_DAYS: i64 = 60;
/// Single-order threshold for `high_value`.
pub const HIGH_VALUE_ORDER_AMOUNT: i64 = 200;

/// A read-only, named template condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub condition: Condition,
}

/// Every preset, keyed by preset key, with windows relative to now.
pub fn list_presets() -> BTreeMap<&'static str, Preset> {
    list_presets_at(TimeMs::now())
}

/// Every preset, keyed by preset key, with windows relative to `now`.
pub fn list_presets_at(now: TimeMs) -> BTreeMap<&'static str, Preset> {
    let presets = [
        Preset {
            key: "new_users",
            display_name: "New users",
            description: "Registered in the last 30 days without an order",
            condition: Condition {
                created_after: Some(now.days_before(NEW_USER_WINDOW_DAYS)),
                has_orders: Some(false),
                ..Default::default()
            },
        },
        Preset {
            key: "active_buyers",
            display_name: "Active buyers",
            description: "Placed at least one order",
            condition: Condition {
                has_orders: Some(true),
                order_count_min: Some(1),
                ..Default::default()
            },
        },
        Preset {
            key: "high_value",
            display_name: "High-value customers",
            description: "Placed a single order of 200 or more",
            condition: Condition {
                has_orders: Some(true),
                min_order_amount: Some(Decimal::from_i64(HIGH_VALUE_ORDER_AMOUNT)),
                ..Default::default()
            },
        },
        Preset {
            key: "designers",
            display_name: "Designers",
            description: "Created at least one design",
            condition: Condition {
                has_designs: Some(true),
                design_count_min: Some(1),
                ..Default::default()
            },
        },
        Preset {
            key: "inactive_users",
            display_name: "Inactive users",
            description: "Registered over 60 days ago and never ordered",
            condition: Condition {
                created_before: Some(now.days_before(INACTIVE_AFTER_DAYS)),
                has_orders: Some(false),
                ..Default::default()
            },
        },
    ];

    presets.into_iter().map(|p| (p.key, p)).collect()
}

/// Look up one preset by key.
pub fn find_preset(key: &str) -> Option<Preset> {
    list_presets().remove(key)
}
