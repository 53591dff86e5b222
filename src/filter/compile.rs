//! Condition → Filter compiler.
//!
//! Each present key contributes one conjunct, in a fixed key order, so equal
//! conditions always compile to equal trees. Empty or malformed input compiles
//! to the identity filter and therefore matches every user.

use super::{Filter, RelatedPredicate, Relation, UserField};
use crate::domain::Condition;
use serde_json::Value;

/// Compile a parsed condition.
pub fn compile(condition: &Condition) -> Filter {
    let mut children = Vec::new();

    if let Some(value) = condition.created_after {
        children.push(Filter::Gte {
            field: UserField::CreatedAt,
            value,
        });
    }
    if let Some(value) = condition.created_before {
        children.push(Filter::Lte {
            field: UserField::CreatedAt,
            value,
        });
    }

    push_presence(&mut children, Relation::Orders, condition.has_orders);
    if let Some(value) = condition.min_order_amount {
        children.push(Filter::Exists {
            relation: Relation::Orders,
            matching: Some(RelatedPredicate::AmountGte { value }),
        });
    }
    if let Some(min) = condition.order_count_min {
        children.push(Filter::CountGte {
            relation: Relation::Orders,
            min,
        });
    }

    push_presence(&mut children, Relation::Designs, condition.has_designs);
    if let Some(min) = condition.design_count_min {
        children.push(Filter::CountGte {
            relation: Relation::Designs,
            min,
        });
    }

    Filter::and(children)
}

/// Compile raw JSON, failing open to the identity filter.
pub fn compile_value(value: &Value) -> Filter {
    compile(&Condition::from_value(value))
}

fn push_presence(children: &mut Vec<Filter>, relation: Relation, present: Option<bool>) {
    match present {
        Some(true) => children.push(Filter::exists(relation)),
        Some(false) => children.push(Filter::negate(Filter::exists(relation))),
        None => {}
    }
}
