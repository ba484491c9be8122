/// Expression evaluator
///
/// Evaluates expression trees against a layered scope of named values. A
/// scope optionally carries the member rows of the current group, which is
/// what aggregate functions read.
use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::ast::*;
use crate::error::{Error, Result};
use crate::tables::Row;

/// Function names evaluated over a group bucket rather than a single row
pub const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "every",
    "bool_and",
    "bool_or",
    "bit_and",
    "bit_or",
    "array_agg",
    "string_agg",
];

/// True if `name` is an aggregate function (case-insensitive)
pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Layered name lookup. Later frames shadow earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    frames: Vec<&'a Row>,
    group: Option<&'a [Row]>,
}

impl<'a> Scope<'a> {
    /// Scope with a single base frame and no group
    pub fn new(base: &'a Row) -> Self {
        Self {
            frames: vec![base],
            group: None,
        }
    }

    /// Add a frame on top of the existing ones
    pub fn with_row(mut self, row: &'a Row) -> Self {
        self.frames.push(row);
        self
    }

    /// Set the rows aggregate functions operate on
    pub fn with_group(mut self, rows: &'a [Row]) -> Self {
        self.group = Some(rows);
        self
    }

    /// Look up `name`, topmost frame first
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Rows of the current group, if any
    pub fn group(&self) -> Option<&'a [Row]> {
        self.group
    }
}

/// Evaluate an expression in the given scope
pub fn evaluate(expr: &Expression, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expression::Literal(lit) => Ok(literal_value(lit)),
        Expression::Name(name) => {
            if name.eq_ignore_ascii_case("true") {
                return Ok(Value::Bool(true));
            }
            if name.eq_ignore_ascii_case("false") {
                return Ok(Value::Bool(false));
            }
            scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| Error::UnknownVariable(name.clone()))
        }
        Expression::Arithmetic { left, op, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            arithmetic(&left, *op, &right)
        }
        Expression::Comparison { left, op, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            compare(&left, *op, &right).map(Value::Bool)
        }
        Expression::Logical { left, op, right } => {
            let left = expect_bool(&evaluate(left, scope)?, op)?;
            let short_circuit = match op {
                LogicalOperator::And => !left,
                LogicalOperator::Or => left,
            };
            if short_circuit {
                return Ok(Value::Bool(left));
            }
            let right = expect_bool(&evaluate(right, scope)?, op)?;
            Ok(Value::Bool(right))
        }
        Expression::Not(inner) => match evaluate(inner, scope)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(Error::TypeError(format!(
                "NOT requires a boolean operand, got {}",
                type_name(&other)
            ))),
        },
        Expression::Function { name, args } => {
            if is_aggregate_function(name) {
                evaluate_aggregate(name, args, scope)
            } else {
                evaluate_scalar(name, args, scope)
            }
        }
        Expression::Wildcard => Err(Error::TypeError(
            "'*' is only valid as a select field or function argument".to_string(),
        )),
    }
}

/// Convert a literal to its runtime value
pub fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(i) => Value::from(*i),
        Literal::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn expect_bool(value: &Value, op: &LogicalOperator) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        Error::TypeError(format!(
            "{} requires boolean operands, got {}",
            op,
            type_name(value)
        ))
    })
}

/// JSON type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Numeric::Int(i)),
                None => n.as_f64().map(Numeric::Float),
            },
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Numeric::Int(i) => i == 0,
            Numeric::Float(f) => f == 0.0,
        }
    }
}

fn float_value(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| Error::TypeError(format!("arithmetic produced a non-finite value: {}", f)))
}

fn numeric_operands(left: &Value, right: &Value, what: &str) -> Result<(Numeric, Numeric)> {
    match (Numeric::from_value(left), Numeric::from_value(right)) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(Error::TypeError(format!(
            "unsupported operand types for {}: {} and {}",
            what,
            type_name(left),
            type_name(right)
        ))),
    }
}

fn arithmetic(left: &Value, op: ArithmeticOperator, right: &Value) -> Result<Value> {
    let (l, r) = numeric_operands(left, right, &op.to_string())?;

    if op == ArithmeticOperator::Divide {
        if r.is_zero() {
            return Err(Error::DivisionByZero);
        }
        return float_value(l.as_f64() / r.as_f64());
    }

    if let (Numeric::Int(a), Numeric::Int(b)) = (l, r) {
        let exact = match op {
            ArithmeticOperator::Add => a.checked_add(b),
            ArithmeticOperator::Subtract => a.checked_sub(b),
            ArithmeticOperator::Multiply => a.checked_mul(b),
            ArithmeticOperator::Divide => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }

    let (a, b) = (l.as_f64(), r.as_f64());
    float_value(match op {
        ArithmeticOperator::Add => a + b,
        ArithmeticOperator::Subtract => a - b,
        ArithmeticOperator::Multiply => a * b,
        ArithmeticOperator::Divide => a / b,
    })
}

fn compare(left: &Value, op: ComparisonOperator, right: &Value) -> Result<bool> {
    match op {
        ComparisonOperator::Eq => Ok(values_equal(left, right)),
        ComparisonOperator::Ne => Ok(!values_equal(left, right)),
        ComparisonOperator::Gt => Ok(ordering(left, op, right)? == Ordering::Greater),
        ComparisonOperator::Ge => Ok(ordering(left, op, right)? != Ordering::Less),
        ComparisonOperator::Lt => Ok(ordering(left, op, right)? == Ordering::Less),
        ComparisonOperator::Le => Ok(ordering(left, op, right)? != Ordering::Greater),
    }
}

fn ordering(left: &Value, op: ComparisonOperator, right: &Value) -> Result<Ordering> {
    let (l, r) = numeric_operands(left, right, &op.to_string())?;
    Ok(numeric_cmp(l, r))
}

fn numeric_cmp(l: Numeric, r: Numeric) -> Ordering {
    match (l, r) {
        (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
        _ => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
    }
}

/// Structural equality; integers and floats compare numerically
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            match (Numeric::from_value(left), Numeric::from_value(right)) {
                (Some(l), Some(r)) => numeric_cmp(l, r) == Ordering::Equal,
                _ => left == right,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

/// Total order used for sorting: null first, then numbers, strings and
/// booleans among their own kind. Mixed kinds are a type error.
pub fn compare_values(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Less),
        (_, Value::Null) => Ok(Ordering::Greater),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Number(_), Value::Number(_)) => {
            match (Numeric::from_value(left), Numeric::from_value(right)) {
                (Some(l), Some(r)) => Ok(numeric_cmp(l, r)),
                _ => Err(incomparable(left, right)),
            }
        }
        _ => Err(incomparable(left, right)),
    }
}

fn incomparable(left: &Value, right: &Value) -> Error {
    Error::TypeError(format!(
        "cannot compare {} with {}",
        type_name(left),
        type_name(right)
    ))
}

fn evaluate_aggregate(name: &str, args: &[Expression], scope: &Scope<'_>) -> Result<Value> {
    let function = name.to_ascii_lowercase();
    let rows = scope.group().ok_or_else(|| {
        Error::TypeError(format!(
            "aggregate function {} used outside of a grouped context",
            function
        ))
    })?;

    if function == "count" {
        expect_arity(&function, args, 1)?;
        if matches!(args[0], Expression::Wildcard) {
            return Ok(Value::from(rows.len()));
        }
        let values = member_values(&args[0], scope, rows)?;
        return Ok(Value::from(values.iter().filter(|v| !v.is_null()).count()));
    }

    if function == "string_agg" {
        expect_arity(&function, args, 2)?;
        let separator = match evaluate(&args[1], scope)? {
            Value::String(s) => s,
            other => {
                return Err(Error::TypeError(format!(
                    "string_agg separator must be a string, got {}",
                    type_name(&other)
                )))
            }
        };
        let values = member_values(&args[0], scope, rows)?;
        return string_agg(values, &separator);
    }

    expect_arity(&function, args, 1)?;
    let values = member_values(&args[0], scope, rows)?;

    match function.as_str() {
        "sum" => sum(&values),
        "avg" => avg(&values),
        "min" => extreme(&values, Ordering::Less),
        "max" => extreme(&values, Ordering::Greater),
        "every" | "bool_and" => bool_fold(&function, &values, true),
        "bool_or" => bool_fold(&function, &values, false),
        "bit_and" => bit_fold(&function, &values, |a, b| a & b),
        "bit_or" => bit_fold(&function, &values, |a, b| a | b),
        "array_agg" => Ok(Value::Array(values)),
        _ => Err(Error::UnsupportedFunction(name.to_string())),
    }
}

fn expect_arity(function: &str, args: &[Expression], arity: usize) -> Result<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(Error::TypeError(format!(
            "{} expects {} argument(s), got {}",
            function,
            arity,
            args.len()
        )))
    }
}

/// The argument's value for each member row. A bare name reads the member
/// directly, a missing key counting as null.
fn member_values(arg: &Expression, scope: &Scope<'_>, rows: &[Row]) -> Result<Vec<Value>> {
    match arg {
        Expression::Name(name) => Ok(rows
            .iter()
            .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
            .collect()),
        Expression::Wildcard => Err(Error::TypeError(
            "'*' is only valid as an argument to count".to_string(),
        )),
        _ => rows
            .iter()
            .map(|row| {
                let member_scope = Scope {
                    frames: scope.frames.clone(),
                    group: None,
                }
                .with_row(row);
                evaluate(arg, &member_scope)
            })
            .collect(),
    }
}

fn non_null_numbers(values: &[Value], function: &str) -> Result<Vec<Numeric>> {
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| {
            Numeric::from_value(v).ok_or_else(|| {
                Error::TypeError(format!(
                    "{} requires numeric values, got {}",
                    function,
                    type_name(v)
                ))
            })
        })
        .collect()
}

fn sum(values: &[Value]) -> Result<Value> {
    let numbers = non_null_numbers(values, "sum")?;
    if numbers.is_empty() {
        return Ok(Value::Null);
    }

    let mut total = Numeric::Int(0);
    for n in numbers {
        total = match (total, n) {
            (Numeric::Int(a), Numeric::Int(b)) => match a.checked_add(b) {
                Some(s) => Numeric::Int(s),
                None => Numeric::Float(a as f64 + b as f64),
            },
            (a, b) => Numeric::Float(a.as_f64() + b.as_f64()),
        };
    }

    match total {
        Numeric::Int(i) => Ok(Value::from(i)),
        Numeric::Float(f) => float_value(f),
    }
}

fn avg(values: &[Value]) -> Result<Value> {
    let numbers = non_null_numbers(values, "avg")?;
    if numbers.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = numbers.iter().map(|n| n.as_f64()).sum();
    float_value(total / numbers.len() as f64)
}

fn extreme(values: &[Value], wanted: Ordering) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for value in values.iter().filter(|v| !v.is_null()) {
        best = match best {
            Some(current) if compare_values(value, current)? != wanted => Some(current),
            _ => Some(value),
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

/// `identity` is the result when no value decides it: true for AND-like
/// folds, false for OR-like ones.
fn bool_fold(function: &str, values: &[Value], identity: bool) -> Result<Value> {
    let mut result = identity;
    for value in values {
        match value {
            Value::Null => {}
            Value::Bool(b) => {
                if *b != identity {
                    result = *b;
                }
            }
            other => {
                return Err(Error::TypeError(format!(
                    "{} requires boolean values, got {}",
                    function,
                    type_name(other)
                )))
            }
        }
    }
    Ok(Value::Bool(result))
}

fn bit_fold(function: &str, values: &[Value], op: fn(i64, i64) -> i64) -> Result<Value> {
    let mut acc: Option<i64> = None;
    for value in values.iter().filter(|v| !v.is_null()) {
        let i = value.as_i64().ok_or_else(|| {
            Error::TypeError(format!(
                "{} requires integer values, got {}",
                function,
                type_name(value)
            ))
        })?;
        acc = Some(acc.map_or(i, |a| op(a, i)));
    }
    Ok(acc.map_or(Value::Null, Value::from))
}

fn string_agg(values: Vec<Value>, separator: &str) -> Result<Value> {
    let mut parts = Vec::new();
    for value in values {
        match value {
            Value::Null => {}
            Value::String(s) => parts.push(s),
            other => {
                return Err(Error::TypeError(format!(
                    "string_agg requires string values, got {}",
                    type_name(&other)
                )))
            }
        }
    }
    if parts.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::String(parts.join(separator)))
    }
}

fn evaluate_scalar(name: &str, args: &[Expression], scope: &Scope<'_>) -> Result<Value> {
    let function = name.to_ascii_lowercase();
    let convert: fn(&str) -> String = match function.as_str() {
        "lower" => str::to_lowercase,
        "upper" => str::to_uppercase,
        _ => return Err(Error::UnsupportedFunction(name.to_string())),
    };

    let values = args
        .iter()
        .map(|arg| evaluate(arg, scope))
        .collect::<Result<Vec<_>>>()?;

    match values.as_slice() {
        [Value::String(s)] => Ok(Value::String(convert(s))),
        [other] => Err(Error::TypeError(format!(
            "{} requires a string argument, got {}",
            function,
            type_name(other)
        ))),
        _ => Err(Error::TypeError(format!(
            "{} expects 1 argument(s), got {}",
            function,
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn eval_field(sql: &str, scope: &Scope<'_>) -> Result<Value> {
        let select = parse(sql).unwrap();
        evaluate(&select.fields[0].expression, scope)
    }

    fn numbers_group() -> Vec<Row> {
        vec![
            row(json!({"x": 1, "b": true, "s": "a"})),
            row(json!({"x": 2, "b": false, "s": "b"})),
            row(json!({"x": null, "b": null, "s": null})),
            row(json!({"x": 3, "b": true, "s": "c"})),
        ]
    }

    #[test]
    fn test_literals_and_arithmetic() {
        let base = Row::new();
        let scope = Scope::new(&base);

        assert_eq!(eval_field("SELECT 1 + 1", &scope).unwrap(), json!(2));
        assert_eq!(eval_field("SELECT 7 - 10", &scope).unwrap(), json!(-3));
        assert_eq!(eval_field("SELECT 2 * 2.5", &scope).unwrap(), json!(5.0));
        assert_eq!(eval_field("SELECT 7 / 2", &scope).unwrap(), json!(3.5));
        assert_eq!(eval_field("SELECT 'x'", &scope).unwrap(), json!("x"));
    }

    #[test]
    fn test_integer_overflow_promotes_to_float() {
        let base = Row::new();
        let scope = Scope::new(&base);
        let value = eval_field("SELECT 9223372036854775807 + 1", &scope).unwrap();
        assert!(value.is_f64());
    }

    #[test]
    fn test_division_by_zero() {
        let base = Row::new();
        let scope = Scope::new(&base);
        assert!(matches!(
            eval_field("SELECT 1 / 0", &scope),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            eval_field("SELECT 1 / 0.0", &scope),
            Err(Error::DivisionByZero)
        ));
    }

    #[test]
    fn test_arithmetic_requires_numbers() {
        let base = Row::new();
        let scope = Scope::new(&base);
        assert!(matches!(
            eval_field("SELECT 'a' + 1", &scope),
            Err(Error::TypeError(_))
        ));
        assert!(matches!(
            eval_field("SELECT 'a' > 'b'", &scope),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_names_and_booleans() {
        let base = row(json!({"a": 1, "name": "base"}));
        let frame = row(json!({"name": "row"}));
        let scope = Scope::new(&base).with_row(&frame);

        assert_eq!(eval_field("SELECT name", &scope).unwrap(), json!("row"));
        assert_eq!(eval_field("SELECT a", &scope).unwrap(), json!(1));
        assert_eq!(eval_field("SELECT TRUE", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT \"False\"", &scope).unwrap(), json!(false));
        assert!(matches!(
            eval_field("SELECT missing", &scope),
            Err(Error::UnknownVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_comparisons() {
        let base = row(json!({"a": 1, "f": 1.0, "s": "x"}));
        let scope = Scope::new(&base);

        assert_eq!(eval_field("SELECT a = f", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT s <> 'x'", &scope).unwrap(), json!(false));
        assert_eq!(eval_field("SELECT s != 1", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT a >= 1", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT a < 0.5", &scope).unwrap(), json!(false));
        assert_eq!(eval_field("SELECT NULL = NULL", &scope).unwrap(), json!(true));
    }

    #[test]
    fn test_logical_operators() {
        let base = row(json!({"a": 1}));
        let scope = Scope::new(&base);

        assert_eq!(
            eval_field("SELECT a = 1 AND NOT a = 2", &scope).unwrap(),
            json!(true)
        );
        assert_eq!(
            eval_field("SELECT a = 2 OR a = 3", &scope).unwrap(),
            json!(false)
        );
        // right side is not evaluated once the result is known
        assert_eq!(
            eval_field("SELECT a = 1 OR missing", &scope).unwrap(),
            json!(true)
        );
        assert!(matches!(
            eval_field("SELECT a AND TRUE", &scope),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_null_skipping_aggregates() {
        let base = Row::new();
        let rows = numbers_group();
        let scope = Scope::new(&base).with_group(&rows);

        assert_eq!(eval_field("SELECT sum(x)", &scope).unwrap(), json!(6));
        assert_eq!(eval_field("SELECT avg(x)", &scope).unwrap(), json!(2.0));
        assert_eq!(eval_field("SELECT min(x)", &scope).unwrap(), json!(1));
        assert_eq!(eval_field("SELECT max(x)", &scope).unwrap(), json!(3));
        assert_eq!(eval_field("SELECT count(x)", &scope).unwrap(), json!(3));
        assert_eq!(eval_field("SELECT COUNT(*)", &scope).unwrap(), json!(4));
    }

    #[test]
    fn test_boolean_and_bit_aggregates() {
        let base = Row::new();
        let rows = numbers_group();
        let scope = Scope::new(&base).with_group(&rows);

        assert_eq!(eval_field("SELECT every(b)", &scope).unwrap(), json!(false));
        assert_eq!(eval_field("SELECT bool_and(b)", &scope).unwrap(), json!(false));
        assert_eq!(eval_field("SELECT bool_or(b)", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT bit_and(x)", &scope).unwrap(), json!(0));
        assert_eq!(eval_field("SELECT bit_or(x)", &scope).unwrap(), json!(3));
    }

    #[test]
    fn test_collection_aggregates() {
        let base = Row::new();
        let rows = numbers_group();
        let scope = Scope::new(&base).with_group(&rows);

        assert_eq!(
            eval_field("SELECT string_agg(s, ',')", &scope).unwrap(),
            json!("a,b,c")
        );
        assert_eq!(
            eval_field("SELECT array_agg(x)", &scope).unwrap(),
            json!([1, 2, null, 3])
        );
    }

    #[test]
    fn test_aggregate_over_expression() {
        let base = row(json!({"factor": 10}));
        let rows = vec![row(json!({"x": 1})), row(json!({"x": 2}))];
        let scope = Scope::new(&base).with_group(&rows);

        assert_eq!(
            eval_field("SELECT sum(x * factor)", &scope).unwrap(),
            json!(30)
        );
        assert_eq!(
            eval_field("SELECT count(*) + 1", &scope).unwrap(),
            json!(3)
        );
    }

    #[test]
    fn test_aggregates_over_empty_group() {
        let base = Row::new();
        let rows: Vec<Row> = Vec::new();
        let scope = Scope::new(&base).with_group(&rows);

        assert_eq!(eval_field("SELECT count(*)", &scope).unwrap(), json!(0));
        assert_eq!(eval_field("SELECT sum(x)", &scope).unwrap(), json!(null));
        assert_eq!(eval_field("SELECT max(x)", &scope).unwrap(), json!(null));
        assert_eq!(eval_field("SELECT every(x)", &scope).unwrap(), json!(true));
        assert_eq!(eval_field("SELECT bool_or(x)", &scope).unwrap(), json!(false));
        assert_eq!(eval_field("SELECT array_agg(x)", &scope).unwrap(), json!([]));
        assert_eq!(
            eval_field("SELECT string_agg(x, '-')", &scope).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn test_aggregate_without_group_fails() {
        let base = Row::new();
        let scope = Scope::new(&base);
        assert!(matches!(
            eval_field("SELECT count(*)", &scope),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_scalar_functions() {
        let base = row(json!({"name": "Ada"}));
        let scope = Scope::new(&base);

        assert_eq!(eval_field("SELECT lower(name)", &scope).unwrap(), json!("ada"));
        assert_eq!(eval_field("SELECT UPPER(name)", &scope).unwrap(), json!("ADA"));
        assert!(matches!(
            eval_field("SELECT upper(1)", &scope),
            Err(Error::TypeError(_))
        ));
        assert!(matches!(
            eval_field("SELECT lower(name, name)", &scope),
            Err(Error::TypeError(_))
        ));
        assert!(matches!(
            eval_field("SELECT reverse(name)", &scope),
            Err(Error::UnsupportedFunction(name)) if name == "reverse"
        ));
    }

    #[test]
    fn test_compare_values_ordering() {
        assert_eq!(
            compare_values(&json!(null), &json!(1)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!(2), &json!(1.5)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&json!("a"), &json!("b")).unwrap(),
            Ordering::Less
        );
        assert!(compare_values(&json!("a"), &json!(1)).is_err());
    }
}
