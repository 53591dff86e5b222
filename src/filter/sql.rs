//! Render filters as SQLite `WHERE` clauses.
//!
//! Every value is pushed as a bound parameter; table and column names come
//! only from the enums below. The user table is aliased `u`.

use super::{Filter, RelatedPredicate, Relation, UserField};
use crate::domain::Decimal;
use sqlx::{QueryBuilder, Sqlite};

impl Relation {
    /// Table holding records of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            Relation::Orders => "orders",
            Relation::Designs => "designs",
        }
    }
}

impl UserField {
    pub fn column(&self) -> &'static str {
        match self {
            UserField::CreatedAt => "u.created_at",
        }
    }
}

/// `SELECT COUNT(*)` over users matching `filter`.
pub fn count_users_query(filter: &Filter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) AS user_count FROM users u WHERE ");
    push_filter(&mut qb, filter);
    qb
}

/// Append `filter` as a boolean SQL expression.
pub fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
    match filter {
        Filter::And { children } if children.is_empty() => {
            qb.push("1 = 1");
        }
        Filter::And { children } => {
            qb.push("(");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, child);
            }
            qb.push(")");
        }
        Filter::Not { child } => {
            qb.push("NOT (");
            push_filter(qb, child);
            qb.push(")");
        }
        Filter::Gte { field, value } => {
            qb.push(field.column()).push(" >= ").push_bind(value.as_ms());
        }
        Filter::Lte { field, value } => {
            qb.push(field.column()).push(" <= ").push_bind(value.as_ms());
        }
        Filter::Exists { relation, matching } => match matching {
            None => {
                push_related_scope(qb, "EXISTS (SELECT 1", *relation);
                qb.push(")");
            }
            Some(RelatedPredicate::AmountGte { value }) => match relation {
                Relation::Orders => {
                    push_related_scope(qb, "EXISTS (SELECT 1", *relation);
                    qb.push(" AND r.amount_cents >= ")
                        .push_bind(amount_threshold_cents(value))
                        .push(")");
                }
                Relation::Designs => {
                    qb.push("1 = 0");
                }
            },
        },
        Filter::CountGte { relation, min } => {
            push_related_scope(qb, "(SELECT COUNT(*)", *relation);
            qb.push(") >= ").push_bind(*min);
        }
    }
}

fn push_related_scope(qb: &mut QueryBuilder<'_, Sqlite>, select: &str, relation: Relation) {
    qb.push(select)
        .push(" FROM ")
        .push(relation.table())
        .push(" r WHERE r.user_id = u.id");
}

/// Cent threshold equivalent to `amount >= value`, saturating on overflow.
fn amount_threshold_cents(value: &Decimal) -> i64 {
    match value.to_minor_units_ceil() {
        Some(cents) => cents,
        None if value.is_negative() => i64::MIN,
        None => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::compile_value;
    use serde_json::json;

    fn render(filter: &Filter) -> String {
        count_users_query(filter).sql().to_string()
    }

    #[test]
    fn test_identity_renders_tautology() {
        assert_eq!(
            render(&Filter::always()),
            "SELECT COUNT(*) AS user_count FROM users u WHERE 1 = 1"
        );
    }

    #[test]
    fn test_values_are_bound_not_inlined() {
        let sql = render(&compile_value(&json!({
            "created_after": 1700000000000i64,
            "min_order_amount": 200,
            "order_count_min": 3,
        })));

        assert!(!sql.contains("1700000000000"));
        assert!(!sql.contains("20000"));
        assert_eq!(sql.matches('?').count(), 3);
        assert!(sql.contains("u.created_at >= ?"));
        assert!(sql.contains("r.amount_cents >= ?"));
        assert!(sql.contains("(SELECT COUNT(*) FROM orders r WHERE r.user_id = u.id) >= ?"));
    }

    #[test]
    fn test_negated_exists() {
        let sql = render(&compile_value(&json!({ "has_designs": false })));
        assert!(sql.ends_with(
            "WHERE (NOT (EXISTS (SELECT 1 FROM designs r WHERE r.user_id = u.id)))"
        ));
    }

    #[test]
    fn test_design_amount_is_contradiction() {
        let filter = Filter::Exists {
            relation: Relation::Designs,
            matching: Some(RelatedPredicate::AmountGte {
                value: Decimal::zero(),
            }),
        };
        assert!(render(&filter).ends_with("WHERE 1 = 0"));
    }

    #[test]
    fn test_amount_threshold_rounds_up() {
        let v = Decimal::from_str_canonical("99.991").unwrap();
        assert_eq!(amount_threshold_cents(&v), 10000);
        assert_eq!(amount_threshold_cents(&Decimal::from_i64(200)), 20000);
    }

    #[test]
    fn test_amount_threshold_saturates() {
        let huge = Decimal::from_str_canonical("1000000000000000000000000000").unwrap();
        assert_eq!(amount_threshold_cents(&huge), i64::MAX);

        let tiny = Decimal::from_str_canonical("-1000000000000000000000000000").unwrap();
        assert_eq!(amount_threshold_cents(&tiny), i64::MIN);

        let sql = render(&compile_value(&json!({
            "min_order_amount": "1000000000000000000000000000"
        })));
        assert!(sql.contains("r.amount_cents >= ?"));
    }
}
