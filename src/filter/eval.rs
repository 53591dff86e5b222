//! In-memory evaluation of filters against user records.

use super::{Filter, RelatedPredicate, Relation, UserField};
use crate::domain::{Decimal, TimeMs, UserId};

/// A user together with the related records filters can reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub created_at: TimeMs,
    pub order_amounts: Vec<Decimal>,
    pub design_count: i64,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, created_at: TimeMs) -> Self {
        Self {
            id: UserId::new(id.into()),
            created_at,
            order_amounts: Vec::new(),
            design_count: 0,
        }
    }

    pub fn with_order(mut self, amount: Decimal) -> Self {
        self.order_amounts.push(amount);
        self
    }

    pub fn with_designs(mut self, count: i64) -> Self {
        self.design_count = count;
        self
    }

    fn field(&self, field: UserField) -> TimeMs {
        match field {
            UserField::CreatedAt => self.created_at,
        }
    }

    fn related_count(&self, relation: Relation) -> i64 {
        match relation {
            Relation::Orders => self.order_amounts.len() as i64,
            Relation::Designs => self.design_count,
        }
    }

    fn any_related(&self, relation: Relation, predicate: &RelatedPredicate) -> bool {
        match (relation, predicate) {
            (Relation::Orders, RelatedPredicate::AmountGte { value }) => {
                self.order_amounts.iter().any(|amount| amount >= value)
            }
            // Designs have no amount.
            (Relation::Designs, RelatedPredicate::AmountGte { .. }) => false,
        }
    }
}

impl Filter {
    /// Whether `user` satisfies this filter.
    pub fn matches(&self, user: &UserRecord) -> bool {
        match self {
            Filter::And { children } => children.iter().all(|child| child.matches(user)),
            Filter::Not { child } => !child.matches(user),
            Filter::Gte { field, value } => user.field(*field) >= *value,
            Filter::Lte { field, value } => user.field(*field) <= *value,
            Filter::Exists {
                relation,
                matching: None,
            } => user.related_count(*relation) > 0,
            Filter::Exists {
                relation,
                matching: Some(predicate),
            } => user.any_related(*relation, predicate),
            Filter::CountGte { relation, min } => user.related_count(*relation) >= *min,
        }
    }

    /// Number of `users` satisfying this filter.
    pub fn count_matching<'a>(&self, users: impl IntoIterator<Item = &'a UserRecord>) -> i64 {
        users.into_iter().filter(|u| self.matches(u)).count() as i64
    }
}
