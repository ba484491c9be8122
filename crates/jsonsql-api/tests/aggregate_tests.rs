use jsonsql::{Column, ColumnType, Database, Error, Row, Table};
use serde_json::{json, Value};

fn rows(value: Value) -> Vec<Row> {
    serde_json::from_value(value).unwrap()
}

fn sales_db() -> Database {
    let sales = Table::new(
        "sales",
        vec![
            Column::new("region", ColumnType::String),
            Column::new("product", ColumnType::String),
            Column::new("amount", ColumnType::Int),
            Column::new("paid", ColumnType::Bool),
        ],
    )
    .with_rows(rows(json!([
        {"region": "north", "product": "apple", "amount": 10, "paid": true},
        {"region": "south", "product": "pear", "amount": 5, "paid": true},
        {"region": "north", "product": "pear", "amount": 7, "paid": false},
        {"region": "east", "product": "apple", "amount": null, "paid": true},
        {"region": "south", "product": "apple", "amount": 3, "paid": true},
    ])));
    Database::with_tables(vec![sales, Table::new("empty", vec![])]).unwrap()
}

#[test]
fn test_count_star_vs_count_column() {
    let db = sales_db();
    let results = db
        .query("SELECT count(*) AS all_rows, count(amount) AS priced FROM sales")
        .unwrap();
    assert_eq!(results, rows(json!([{"all_rows": 5, "priced": 4}])));
}

#[test]
fn test_sum_avg_min_max() {
    let db = sales_db();
    let results = db
        .query("SELECT sum(amount), avg(amount), min(amount), max(amount) FROM sales")
        .unwrap();
    assert_eq!(
        results,
        rows(json!([{"sum": 25, "avg": 6.25, "min": 3, "max": 10}]))
    );
}

#[test]
fn test_group_by_keeps_first_seen_order() {
    let db = sales_db();
    let results = db
        .query("SELECT region, count(*) AS n, sum(amount) AS total FROM sales GROUP BY region")
        .unwrap();
    assert_eq!(
        results,
        rows(json!([
            {"region": "north", "n": 2, "total": 17},
            {"region": "south", "n": 2, "total": 8},
            {"region": "east", "n": 1, "total": null},
        ]))
    );
}

#[test]
fn test_group_by_multiple_keys() {
    let db = sales_db();
    let results = db
        .query("SELECT product, paid, count(*) AS n FROM sales GROUP BY product, paid")
        .unwrap();
    assert_eq!(
        results,
        rows(json!([
            {"product": "apple", "paid": true, "n": 3},
            {"product": "pear", "paid": true, "n": 1},
            {"product": "pear", "paid": false, "n": 1},
        ]))
    );
}

#[test]
fn test_order_groups_by_aggregate() {
    let db = sales_db();
    // sort keys apply one after another, so count(amount) is the primary key
    let results = db
        .query("SELECT region FROM sales GROUP BY region ORDER BY region DESC, count(amount)")
        .unwrap();
    assert_eq!(
        results,
        rows(json!([{"region": "east"}, {"region": "south"}, {"region": "north"}]))
    );

    let results = db
        .query("SELECT region, sum(amount) AS total FROM sales GROUP BY region ORDER BY sum(amount) DESC LIMIT 1")
        .unwrap();
    assert_eq!(results, rows(json!([{"region": "north", "total": 17}])));
}

#[test]
fn test_ordering_operators_reject_null() {
    let db = sales_db();
    assert!(matches!(
        db.query("SELECT count(*) FROM sales WHERE amount > 4"),
        Err(Error::TypeError(_))
    ));
}

#[test]
fn test_boolean_and_bitwise_aggregates() {
    let db = sales_db();
    let results = db
        .query(
            "SELECT every(paid) AS every, bool_or(paid) AS any, \
             bit_and(amount) AS band, bit_or(amount) AS bor FROM sales",
        )
        .unwrap();
    assert_eq!(
        results,
        rows(json!([{"every": false, "any": true, "band": 0, "bor": 15}]))
    );
}

#[test]
fn test_collecting_aggregates() {
    let db = sales_db();
    let results = db
        .query(
            "SELECT region, array_agg(amount) AS amounts, string_agg(product, '|') AS products \
             FROM sales GROUP BY region",
        )
        .unwrap();
    assert_eq!(
        results[0],
        rows(json!([{"region": "north", "amounts": [10, 7], "products": "apple|pear"}]))[0]
    );
    assert_eq!(results[2]["amounts"], json!([null]));
}

#[test]
fn test_aggregates_over_no_rows() {
    let db = sales_db();
    let results = db
        .query("SELECT count(*) AS n, sum(amount) AS s, array_agg(amount) AS a FROM sales WHERE region = 'west'")
        .unwrap();
    assert_eq!(results, rows(json!([{"n": 0, "s": null, "a": []}])));

    let results = db.query("SELECT count(*) AS n FROM empty").unwrap();
    assert_eq!(results, rows(json!([{"n": 0}])));
}

#[test]
fn test_aggregate_with_context_variable() {
    let db = sales_db();
    let context = rows(json!([{"rate": 2}])).remove(0);
    let results = db
        .query_with_context("SELECT sum(amount * rate) AS doubled FROM sales WHERE region <> 'east'", &context)
        .unwrap();
    assert_eq!(results, rows(json!([{"doubled": 50}])));
}
