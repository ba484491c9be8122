/// Static type inference for expressions
use super::ast::*;
use crate::tables::ColumnType;

/// Best-effort result type of an expression, without evaluating it
pub fn infer_type(expr: &Expression) -> ColumnType {
    match expr {
        Expression::Literal(Literal::Integer(_)) => ColumnType::Int,
        Expression::Literal(Literal::Float(_)) => ColumnType::Float,
        Expression::Literal(Literal::String(_)) => ColumnType::String,
        Expression::Literal(Literal::Boolean(_)) => ColumnType::Bool,
        Expression::Literal(Literal::Null) => ColumnType::Null,
        Expression::Name(name)
            if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("false") =>
        {
            ColumnType::Bool
        }
        Expression::Name(_) | Expression::Wildcard => ColumnType::Unknown,
        Expression::Comparison { .. } | Expression::Logical { .. } | Expression::Not(_) => {
            ColumnType::Bool
        }
        Expression::Arithmetic { left, op, right } => {
            if *op == ArithmeticOperator::Divide {
                return ColumnType::Float;
            }
            match (infer_type(left), infer_type(right)) {
                (ColumnType::Int, ColumnType::Int) => ColumnType::Int,
                (ColumnType::Int | ColumnType::Float, ColumnType::Int | ColumnType::Float) => {
                    ColumnType::Float
                }
                _ => ColumnType::Unknown,
            }
        }
        Expression::Function { name, .. } => match name.to_ascii_lowercase().as_str() {
            "count" | "bit_and" | "bit_or" => ColumnType::Int,
            "sum" | "avg" => ColumnType::Float,
            "every" | "bool_and" | "bool_or" => ColumnType::Bool,
            "lower" | "upper" | "string_agg" => ColumnType::String,
            _ => ColumnType::Unknown,
        },
    }
}

/// Output name and inferred type of every field in a SELECT list
pub fn infer_fields(select: &Select) -> Vec<(String, ColumnType)> {
    select
        .fields
        .iter()
        .map(|field| (field.output_name().to_string(), infer_type(&field.expression)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn infer(sql: &str) -> ColumnType {
        let select = parse(sql).unwrap();
        infer_type(&select.fields[0].expression)
    }

    #[test]
    fn test_literals() {
        assert_eq!(infer("SELECT 1"), ColumnType::Int);
        assert_eq!(infer("SELECT 1.5"), ColumnType::Float);
        assert_eq!(infer("SELECT 'a'"), ColumnType::String);
        assert_eq!(infer("SELECT TRUE"), ColumnType::Bool);
        assert_eq!(infer("SELECT NULL"), ColumnType::Null);
    }

    #[test]
    fn test_functions() {
        assert_eq!(infer("SELECT count(*)"), ColumnType::Int);
        assert_eq!(infer("SELECT SUM(x)"), ColumnType::Float);
        assert_eq!(infer("SELECT avg(x)"), ColumnType::Float);
        assert_eq!(infer("SELECT bool_or(x)"), ColumnType::Bool);
        assert_eq!(infer("SELECT upper(x)"), ColumnType::String);
        assert_eq!(infer("SELECT max(x)"), ColumnType::Unknown);
    }

    #[test]
    fn test_operators() {
        assert_eq!(infer("SELECT 1 + 2"), ColumnType::Int);
        assert_eq!(infer("SELECT 1 + 2.0"), ColumnType::Float);
        assert_eq!(infer("SELECT 4 / 2"), ColumnType::Float);
        assert_eq!(infer("SELECT a + 1"), ColumnType::Unknown);
        assert_eq!(infer("SELECT a > 1"), ColumnType::Bool);
        assert_eq!(infer("SELECT NOT a"), ColumnType::Bool);
    }

    #[test]
    fn test_infer_fields() {
        let select = parse("SELECT name, count(*) AS n, 1 FROM t").unwrap();
        assert_eq!(
            infer_fields(&select),
            vec![
                ("name".to_string(), ColumnType::Unknown),
                ("n".to_string(), ColumnType::Int),
                ("?column?".to_string(), ColumnType::Int),
            ]
        );
    }
}
