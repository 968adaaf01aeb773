//! Partition/sort-key planner
//!
//! Chooses the index and access path for a partition-key table and splits
//! the predicates into a native key condition and a residual filter.
//!
//! Index selection (deterministic, table order):
//! 1. Candidates are indexes whose partition key is covered by a
//!    conjunctive comparison.
//! 2. A candidate whose sort key is covered wins unless an order on a
//!    different field was requested; a candidate whose sort key is the
//!    order field wins. Later winners replace earlier ones.
//! 3. Without a sort-key winner the last candidate is used, except that
//!    the primary index is preferred when it shares that partition key.
//! 4. No candidate means a full scan.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::errors::{RqlError, RqlResult};
use crate::metadata::{Index, Table};
use crate::model::{Comparison, Conjunction, Operator, Order, Predicate, Statement};

use super::expression::{FilterExpression, KeyCondition, SortKeyCondition, SORT_KEY_OPERATORS};

/// Physical access path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Key-condition query against one partition
    Query,
    /// Full table scan
    Scan,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Query => "QUERY",
            Access::Scan => "SCAN",
        }
    }
}

/// Immutable plan for a partition-key table
#[derive(Debug, Clone, PartialEq)]
pub struct KeyConditionPlan {
    /// Chosen index
    pub index: Index,
    /// Query or scan
    pub access: Access,
    /// Native key condition (queries only)
    pub key_condition: Option<KeyCondition>,
    /// Predicates not absorbed by the key condition, in original order
    pub excluded_predicates: Vec<Predicate>,
    /// How the excluded predicates combine
    pub conjunction: Conjunction,
    /// Native filter for the excluded predicates, when one exists
    pub filter: Option<FilterExpression>,
    /// Order the results come back in
    pub resolved_order: Option<Order>,
    /// Page size
    pub limit: usize,
    /// Continuation cursor from the request
    pub marker: Option<String>,
}

impl Serialize for KeyConditionPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let excluded: Vec<String> = self
            .excluded_predicates
            .iter()
            .map(|p| p.to_string())
            .collect();
        let order = self
            .resolved_order
            .as_ref()
            .map(|o| format!("{} {}", o.field, o.direction.as_str()));

        let mut s = serializer.serialize_struct("KeyConditionPlan", 8)?;
        s.serialize_field("index", &self.index.name)?;
        s.serialize_field("access", self.access.as_str())?;
        s.serialize_field("key_condition", &self.key_condition)?;
        s.serialize_field("excluded", &excluded)?;
        s.serialize_field("filter", &self.filter)?;
        s.serialize_field("order", &order)?;
        s.serialize_field("limit", &self.limit)?;
        s.serialize_field("marker", &self.marker)?;
        s.end()
    }
}

/// Planner for partition/sort-key tables
#[derive(Debug, Clone, Copy)]
pub struct PartitionPlanner {
    wildcard: char,
}

impl Default for PartitionPlanner {
    fn default() -> Self {
        Self { wildcard: '*' }
    }
}

impl PartitionPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Glyph that keeps an `eq`/`ne` out of the native filter
    pub fn with_wildcard(mut self, wildcard: char) -> Self {
        self.wildcard = wildcard;
        self
    }

    /// Plan a statement.
    ///
    /// Deterministic: the same statement and table always give the same plan.
    pub fn plan(&self, statement: &Statement, table: &Table) -> RqlResult<KeyConditionPlan> {
        let primary = table.primary_index().ok_or_else(|| {
            RqlError::invalid_metadata(&table.name, "partition tables need a primary index")
        })?;

        // one index, one sort key
        if let Some(extra) = statement.order.get(1) {
            return Err(RqlError::unsupported_sort(
                &extra.field,
                "partition-key tables sort on a single key",
            ));
        }
        let order = statement.order.first();

        let conjuncts = statement.conjuncts();
        let comparisons: Vec<&Comparison> =
            conjuncts.iter().filter_map(|p| p.as_comparison()).collect();
        let covered = |field: &str| comparisons.iter().any(|c| c.field.eq_ignore_ascii_case(field));

        let candidates: Vec<&Index> = table
            .indexes
            .iter()
            .filter(|idx| covered(&idx.partition_key))
            .collect();

        let mut chosen = candidates.last().copied();
        let mut has_sort_key = false;
        for idx in &candidates {
            let Some(sk) = idx.sort_key.as_deref() else {
                continue;
            };
            if covered(sk) {
                if order.is_some_and(|o| !o.field.eq_ignore_ascii_case(sk)) {
                    continue;
                }
                chosen = Some(*idx);
                has_sort_key = true;
            } else if order.is_some_and(|o| o.field.eq_ignore_ascii_case(sk)) {
                chosen = Some(*idx);
                has_sort_key = true;
            }
        }

        let index = match chosen {
            Some(idx)
                if has_sort_key
                    || !idx.partition_key.eq_ignore_ascii_case(&primary.partition_key) =>
            {
                idx
            }
            _ => primary,
        };

        if candidates.is_empty() {
            if let Some(order) = order {
                return Err(RqlError::unsupported_sort(
                    &order.field,
                    "a full scan cannot be ordered",
                ));
            }
            return self.finish(
                statement,
                table,
                KeyConditionPlan {
                    index: index.clone(),
                    access: Access::Scan,
                    key_condition: None,
                    excluded_predicates: statement.predicates.clone(),
                    conjunction: statement.conjunction,
                    filter: None,
                    resolved_order: None,
                    limit: statement.page.max_rows,
                    marker: statement.page.marker.clone(),
                },
            );
        }

        // partition key: equality only
        let pk_comparisons: Vec<&Comparison> = comparisons
            .iter()
            .copied()
            .filter(|c| c.field.eq_ignore_ascii_case(&index.partition_key))
            .collect();
        if let Some(bad) = pk_comparisons.iter().find(|c| c.op != Operator::Eq) {
            return Err(RqlError::unsupported_operator(
                bad.op.as_str(),
                &bad.field,
                "partition keys only support equality",
            ));
        }
        let pk = pk_comparisons.first().copied().ok_or_else(|| {
            RqlError::invalid_metadata(&table.name, "chosen index partition key is not covered")
        })?;

        // sort key: key-condition operators only
        let sk = match index.sort_key.as_deref() {
            Some(sk_field) => {
                let sk_comparisons: Vec<&Comparison> = comparisons
                    .iter()
                    .copied()
                    .filter(|c| c.field.eq_ignore_ascii_case(sk_field))
                    .collect();
                if let Some(bad) = sk_comparisons.iter().find(|c| {
                    !SORT_KEY_OPERATORS.contains(&c.op) || c.values.len() != 1
                }) {
                    return Err(RqlError::unsupported_operator(
                        bad.op.as_str(),
                        &bad.field,
                        "sort keys support eq, gt, ge, lt, le and a single sw prefix",
                    ));
                }
                sk_comparisons.first().copied()
            }
            None => None,
        };

        let resolved_order = match (order, index.sort_key.as_deref()) {
            (Some(o), Some(sk_field)) if o.field.eq_ignore_ascii_case(sk_field) => Some(o.clone()),
            (Some(o), sk_field) => {
                return Err(RqlError::unsupported_sort(
                    &o.field,
                    format!(
                        "index '{}' sorts on '{}'",
                        index.name,
                        sk_field.unwrap_or("<none>")
                    ),
                ))
            }
            (None, Some(sk_field)) if sk.is_some() => Some(Order::asc(sk_field)),
            (None, _) => None,
        };

        let consumed = [Some(pk), sk];
        let excluded_predicates: Vec<Predicate> = conjuncts
            .iter()
            .filter(|p| {
                !consumed.iter().flatten().any(|c| {
                    p.as_comparison().is_some_and(|pc| std::ptr::eq(pc, *c))
                })
            })
            .map(|p| (*p).clone())
            .collect();

        let sort_key = match sk {
            Some(c) => Some(SortKeyCondition {
                field: c.field.clone(),
                op: c.op,
                // begins_with only takes a string operand
                value: if c.op == Operator::Sw {
                    Value::String(c.values[0].as_str().to_string())
                } else {
                    table.bind_value(&c.field, &c.values[0])?
                },
            }),
            None => None,
        };
        let key_condition = KeyCondition {
            partition_key: index.partition_key.clone(),
            partition_value: table.bind_value(&pk.field, &pk.values[0])?,
            sort_key,
        };

        self.finish(
            statement,
            table,
            KeyConditionPlan {
                index: index.clone(),
                access: Access::Query,
                key_condition: Some(key_condition),
                excluded_predicates,
                conjunction: Conjunction::And,
                filter: None,
                resolved_order,
                limit: statement.page.max_rows,
                marker: statement.page.marker.clone(),
            },
        )
    }

    fn finish(
        &self,
        statement: &Statement,
        table: &Table,
        mut plan: KeyConditionPlan,
    ) -> RqlResult<KeyConditionPlan> {
        plan.filter = FilterExpression::build(
            &plan.excluded_predicates,
            plan.conjunction,
            table,
            self.wildcard,
        )?;

        debug!(
            event = "RQL_INDEX_SELECTED",
            table = %table.name,
            index = %plan.index.name,
            access = plan.access.as_str(),
            predicates = statement.predicates.len(),
            excluded = plan.excluded_predicates.len(),
            native_filter = plan.filter.is_some()
        );

        Ok(plan)
    }
}
