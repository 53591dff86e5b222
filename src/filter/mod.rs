//! Typed predicate tree over user records.
//!
//! This module provides:
//! - `Filter`, the structured output of the condition compiler
//! - `compile` / `compile_value`, translating a Condition into a Filter
//! - In-memory evaluation against `UserRecord`s
//! - SQL rendering with bound parameters for the SQLite store

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};

pub mod compile;
pub mod eval;
pub mod sql;

pub use compile::{compile, compile_value};
pub use eval::UserRecord;

/// Column on the user record a comparison applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    /// Registration timestamp.
    CreatedAt,
}

/// Record kinds that reference a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Orders,
    Designs,
}

/// Predicate on a single related record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelatedPredicate {
    /// Record amount >= value. Only orders carry an amount.
    AmountGte { value: Decimal },
}

/// Boolean filter expression over user records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Conjunction; empty means always true.
    And { children: Vec<Filter> },
    Not { child: Box<Filter> },
    Gte { field: UserField, value: TimeMs },
    Lte { field: UserField, value: TimeMs },
    /// At least one related record exists (optionally matching a predicate).
    Exists {
        relation: Relation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matching: Option<RelatedPredicate>,
    },
    /// Number of related records >= min.
    CountGte { relation: Relation, min: i64 },
}

impl Filter {
    /// The identity filter.
    pub fn always() -> Self {
        Filter::And {
            children: Vec::new(),
        }
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And { children }
    }

    pub fn negate(child: Filter) -> Self {
        Filter::Not {
            child: Box::new(child),
        }
    }

    pub fn exists(relation: Relation) -> Self {
        Filter::Exists {
            relation,
            matching: None,
        }
    }

    /// True for the identity filter.
    pub fn is_always(&self) -> bool {
        matches!(self, Filter::And { children } if children.is_empty())
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::always()
    }
}
