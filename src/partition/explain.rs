//! Text rendering of partition plans.
//!
//! The same plan always renders the same text; rejected statements render
//! their error code and message in place of the plan.

use std::fmt;

use crate::errors::RqlError;

use super::planner::KeyConditionPlan;

/// Outcome of planning, flattened to labelled rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainPlan {
    Accepted(Vec<(&'static str, String)>),
    Rejected { code: &'static str, reason: String },
}

impl ExplainPlan {
    pub fn from_plan(plan: &KeyConditionPlan) -> Self {
        let mut rows = vec![
            ("index", plan.index.name.clone()),
            ("access", plan.access.as_str().to_string()),
        ];
        if let Some(kc) = &plan.key_condition {
            rows.push(("key", kc.to_string()));
        }
        rows.extend(
            plan.excluded_predicates
                .iter()
                .map(|p| ("excluded", p.to_string())),
        );
        if let Some(filter) = &plan.filter {
            rows.push(("filter", filter.expression.clone()));
        }
        if let Some(order) = &plan.resolved_order {
            rows.push(("order", format!("{} {}", order.field, order.direction.as_str())));
        }
        rows.push(("limit", plan.limit.to_string()));
        if let Some(marker) = &plan.marker {
            rows.push(("marker", marker.clone()));
        }
        ExplainPlan::Accepted(rows)
    }

    pub fn from_error(err: &RqlError) -> Self {
        ExplainPlan::Rejected {
            code: err.code(),
            reason: err.to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ExplainPlan::Accepted(_))
    }

    /// Value of the first row with this label
    pub fn row(&self, label: &str) -> Option<&str> {
        match self {
            ExplainPlan::Accepted(rows) => rows
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.as_str()),
            ExplainPlan::Rejected { .. } => None,
        }
    }
}

impl From<&KeyConditionPlan> for ExplainPlan {
    fn from(plan: &KeyConditionPlan) -> Self {
        Self::from_plan(plan)
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplainPlan::Accepted(rows) => {
                writeln!(f, "plan: accepted")?;
                for (label, value) in rows {
                    writeln!(f, "  {:<9}{}", label, value)?;
                }
            }
            ExplainPlan::Rejected { code, reason } => {
                writeln!(f, "plan: rejected")?;
                writeln!(f, "  {:<9}{}", "code", code)?;
                writeln!(f, "  {:<9}{}", "reason", reason)?;
            }
        }
        Ok(())
    }
}
