//! Parser Tests
//!
//! Tests for query-string parsing invariants:
//! - Implicit top-level AND equals an explicit and group
//! - Predicate text round-trips through Display
//! - Reserved parameters never become predicates
//! - Malformed input is rejected, never guessed at

use std::fs;

use rql::sql::SqlDialect;
use rql::{
    Backend, Column, CompilerRegistry, Conjunction, MetadataLoader, Parser, RqlConfig, RqlError,
    Statement, Table,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn table() -> Table {
    Table::new("places", Backend::Sql(SqlDialect::Ansi))
        .with_column(Column::key("id", "BIGINT"))
        .with_column(Column::new("city", "VARCHAR"))
}

fn parse(query: &str) -> Result<Statement, RqlError> {
    let config = RqlConfig::default();
    Parser::new(&config).parse_query_string(&table(), query)
}

// =============================================================================
// Grouping Tests
// =============================================================================

/// `a&b` and `and(a,b)` are the same statement.
#[test]
fn test_implicit_and_equals_explicit() {
    let implicit = parse("eq(city,Tempe)&gt(rank,5)").unwrap();
    let explicit = parse("and(eq(city,Tempe),gt(rank,5))").unwrap();
    assert_eq!(implicit, explicit);
    assert_eq!(implicit.conjunction, Conjunction::And);
}

/// A lone top-level or switches the statement conjunction.
#[test]
fn test_top_level_or() {
    let stmt = parse("or(eq(city,Tempe),eq(city,Mesa))&order=city").unwrap();
    assert_eq!(stmt.conjunction, Conjunction::Or);
    assert_eq!(stmt.predicates.len(), 2);
}

/// An or next to other predicates stays a group.
#[test]
fn test_or_beside_other_predicates_stays_grouped() {
    let stmt = parse("or(eq(city,Tempe),eq(city,Mesa))&gt(rank,5)").unwrap();
    assert_eq!(stmt.conjunction, Conjunction::And);
    assert_eq!(stmt.predicates[0].token(), "or");
    assert_eq!(stmt.depth(), 2);
}

/// Display output parses back to the same predicate.
#[test]
fn test_display_round_trip() {
    let original = parse(r#"and(eq(city,"New, York"),or(n(state),in(rank,1,2)),sw(name,'O\'B'))"#)
        .unwrap();
    let text: Vec<String> = original.predicates.iter().map(|p| p.to_string()).collect();
    assert_eq!(parse(&text.join("&")).unwrap(), original);
}

/// Operator tokens are case-insensitive, field names are not.
#[test]
fn test_operator_case() {
    let stmt = parse("AND(EQ(City,x),Gt(rank,1))").unwrap();
    assert_eq!(stmt.predicates[0].to_string(), "eq(City,x)");
    assert_eq!(stmt.predicates[1].to_string(), "gt(rank,1)");
}

// =============================================================================
// Reserved Parameter Tests
// =============================================================================

#[test]
fn test_paging_parameters() {
    let stmt = parse("eq(city,x)&pageSize=20&page=3").unwrap();
    assert_eq!(stmt.page.max_rows, 20);
    assert_eq!(stmt.page.offset, 40);
    assert_eq!(stmt.predicates.len(), 1);

    // last page that still fits the offset
    let stmt = parse(&format!("page={}&limit=1", usize::MAX)).unwrap();
    assert_eq!(stmt.page.offset, usize::MAX - 1);

    let stmt = parse("limit=5&offset=7&marker=abc").unwrap();
    assert_eq!(stmt.page.max_rows, 5);
    assert_eq!(stmt.page.offset, 7);
    assert_eq!(stmt.page.marker.as_deref(), Some("abc"));
    assert!(stmt.predicates.is_empty());
}

/// Projection parameters are accepted and ignored.
#[test]
fn test_passthrough_parameters() {
    let stmt = parse("includes=id,city&excludes=rank&expands=owner").unwrap();
    assert!(stmt.predicates.is_empty());
}

#[test]
fn test_shorthand_parameters() {
    let stmt = parse("city=Chandler&name=sw(Chan)&state=%27AZ%27").unwrap();
    let text: Vec<String> = stmt.predicates.iter().map(|p| p.to_string()).collect();
    assert_eq!(text, vec!["eq(city,Chandler)", "sw(name,Chan)", r#"eq(state,"AZ")"#]);
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_malformed_queries_rejected() {
    let cases = [
        "eq(city",
        "eq(city,x))",
        "frob(city,x)",
        "eq(city)",
        "eq(city,1,2)",
        "n(city,1)",
        "in(city)",
        "and()",
        "eq(city,'open",
        "eq(city,x)=1",
        "city=",
        "eq(,x)",
        "eq(and(a,b),x)",
        "page=0",
        "limit=0",
        "limit=100000",
        "offset=-1",
        "eq(city,%zz)",
        "page=18446744073709551615",
        "page=99999999999999999999",
    ];

    for query in cases {
        let result = parse(query);
        assert!(
            matches!(result, Err(RqlError::MalformedQuery(_))),
            "expected malformed for {:?}, got {:?}",
            query,
            result
        );
    }
}

// =============================================================================
// Entity Key Tests
// =============================================================================

#[test]
fn test_key_predicate() {
    let config = RqlConfig::default();
    let pred = Parser::new(&config)
        .key_predicate(&table(), "7,'8,9'")
        .unwrap();
    assert_eq!(pred.to_string(), r#"in(id,7,"8,9")"#);
}

#[test]
fn test_key_predicate_needs_single_key_column() {
    let config = RqlConfig::default();
    let keyless = Table::new("t", Backend::Search);
    let err = Parser::new(&config).key_predicate(&keyless, "1").unwrap_err();
    assert_eq!(err.code(), "RQL_INVALID_METADATA");
}

// =============================================================================
// End-to-End Tests
// =============================================================================

/// Loaded descriptors compile through the registry.
#[test]
fn test_loaded_tables_compile() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tables.json"),
        r#"[{"name": "places", "backend": "postgres",
             "columns": [{"name": "id", "is_key": true}, {"name": "city"}]},
            {"name": "docs", "backend": "elastic"}]"#,
    )
    .unwrap();

    let mut tables = MetadataLoader::new(dir.path());
    tables.load_all().unwrap();

    let config = RqlConfig::default();
    let registry = CompilerRegistry::with_defaults(&config);
    let parser = Parser::new(&config);

    let places = tables.get("places").unwrap();
    let stmt = parser.parse_query_string(places, "city=Tempe").unwrap();
    let sql = registry.compile(&stmt, places).unwrap();
    assert_eq!(
        sql.as_sql().unwrap().sql,
        r#"SELECT "places".* FROM "places" WHERE "places"."city" = ? ORDER BY "places"."id" ASC LIMIT 100"#
    );

    let docs = tables.get("docs").unwrap();
    let stmt = parser.parse_query_string(docs, "city=Tempe").unwrap();
    assert!(registry.compile(&stmt, docs).unwrap().as_search().is_some());
}
