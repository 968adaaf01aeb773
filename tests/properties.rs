//! Property Tests
//!
//! Randomized checks over generated predicate trees:
//! - `in` binds exactly one placeholder per value
//! - SQL parenthesis depth follows the predicate tree depth
//! - Compilers and the planner are pure functions of their input

use proptest::prelude::*;
use rql::partition::PartitionPlanner;
use rql::search::SearchCompiler;
use rql::sql::{SqlCompiler, SqlDialect};
use rql::{
    Backend, Column, Conjunction, Index, IndexKind, Literal, Operator, Predicate, Statement, Table,
};

const FIELDS: &[&str] = &["hk", "sk", "type", "customer", "placed", "color"];

fn sql_table() -> Table {
    FIELDS.iter().fold(
        Table::new("t", Backend::Sql(SqlDialect::Ansi)).with_column(Column::key("id", "BIGINT")),
        |table, field| table.with_column(Column::new(*field, "VARCHAR")),
    )
}

fn partition_table() -> Table {
    Table::new("t", Backend::PartitionKey)
        .with_index(Index::primary("hk", Some("sk")))
        .with_index(Index::new("by_type", IndexKind::LocalSecondary, "hk", Some("type")))
        .with_index(Index::new("by_customer", IndexKind::GlobalSecondary, "customer", Some("placed")))
}

fn arb_leaf() -> impl Strategy<Value = Predicate> {
    (
        prop::sample::select(FIELDS),
        prop_oneof![Just(Operator::Eq), Just(Operator::Gt)],
        "v[a-z0-9]{0,6}",
    )
        .prop_map(|(field, op, value)| {
            Predicate::compare(op, field, vec![Literal::bare(value)]).unwrap()
        })
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    arb_leaf().prop_recursive(4, 24, 4, |inner| {
        (any::<bool>(), prop::collection::vec(inner, 1..4)).prop_map(|(and, children)| {
            let conjunction = if and { Conjunction::And } else { Conjunction::Or };
            Predicate::group(conjunction, children).unwrap()
        })
    })
}

fn arb_statement() -> impl Strategy<Value = Statement> {
    (any::<bool>(), prop::collection::vec(arb_predicate(), 0..4)).prop_map(|(and, predicates)| {
        let conjunction = if and { Conjunction::And } else { Conjunction::Or };
        predicates
            .into_iter()
            .fold(Statement::new("t").with_conjunction(conjunction), |stmt, pred| {
                stmt.with_predicate(pred)
            })
    })
}

fn paren_depth(sql: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for c in sql.chars() {
        match c {
            '(' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    max
}

proptest! {
    #[test]
    fn prop_in_placeholders_match_values(values in prop::collection::vec("v[a-z0-9]{0,6}", 1..40)) {
        let literals = values.iter().map(|v| Literal::bare(v.as_str())).collect();
        let stmt = Statement::new("t")
            .with_predicate(Predicate::compare(Operator::In, "color", literals).unwrap());

        let (sql, params) = SqlCompiler::new(SqlDialect::Ansi)
            .compile_where(&stmt, &sql_table())
            .unwrap();

        prop_assert_eq!(sql.matches('?').count(), values.len());
        prop_assert_eq!(params.len(), values.len());
    }

    #[test]
    fn prop_sql_depth_follows_tree(stmt in arb_statement()) {
        let (sql, params) = SqlCompiler::new(SqlDialect::Ansi)
            .compile_where(&stmt, &sql_table())
            .unwrap();

        prop_assert_eq!(paren_depth(&sql), stmt.depth());
        prop_assert_eq!(sql.matches('?').count(), params.len());
    }

    #[test]
    fn prop_compilers_are_idempotent(stmt in arb_statement()) {
        let sql = SqlCompiler::new(SqlDialect::Postgres);
        prop_assert_eq!(
            sql.compile(&stmt, &sql_table()).unwrap(),
            sql.compile(&stmt, &sql_table()).unwrap()
        );

        let search = SearchCompiler::new();
        let table = Table::new("t", Backend::Search);
        prop_assert_eq!(
            search.compile(&stmt, &table).unwrap(),
            search.compile(&stmt, &table).unwrap()
        );
    }

    #[test]
    fn prop_planner_is_deterministic(stmt in arb_statement()) {
        let planner = PartitionPlanner::new();
        let table = partition_table();

        match (planner.plan(&stmt, &table), planner.plan(&stmt, &table)) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn prop_plan_accounts_for_every_conjunct(stmt in arb_statement()) {
        if let Ok(plan) = PartitionPlanner::new().plan(&stmt, &partition_table()) {
            match plan.key_condition.as_ref() {
                // scans hand back the statement's predicates as written
                None => prop_assert_eq!(&plan.excluded_predicates, &stmt.predicates),
                Some(kc) => {
                    let consumed = 1 + usize::from(kc.sort_key.is_some());
                    prop_assert_eq!(
                        plan.excluded_predicates.len() + consumed,
                        stmt.conjuncts().len()
                    );
                }
            }
        }
    }
}
