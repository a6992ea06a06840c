use serde_json::{Value, json};

use crate::server::{FnToolHandler, Server};
use crate::types::{McpError, ToolResult, error_result, structured_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Subtract),
            "*" => Some(Operator::Multiply),
            "/" => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalcError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Result is not a finite number")]
    NotFinite,
}

/// Apply `op` to the operands.
pub fn apply(a: f64, b: f64, op: Operator) -> Result<f64, CalcError> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide if b == 0.0 => return Err(CalcError::DivisionByZero),
        Operator::Divide => a / b,
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(CalcError::NotFinite)
    }
}

pub fn register(srv: &mut Server) -> Result<(), McpError> {
    srv.handle_tool(
        "calc",
        FnToolHandler::new(|args: Value| async move { handle_calc(args) }),
    )
}

fn handle_calc(args: Value) -> Result<ToolResult, McpError> {
    let a = args.get("num1").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let b = args.get("num2").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let symbol = args.get("operator").and_then(|v| v.as_str()).unwrap_or("");

    let Some(op) = Operator::parse(symbol) else {
        return Ok(error_result(format!("Error: unsupported operator '{}'", symbol)));
    };

    match apply(a, b, op) {
        Ok(result) => {
            let expression = format!("{} {} {} = {}", a, op.symbol(), b, result);
            Ok(structured_result(
                expression.clone(),
                json!({ "result": result, "expression": expression }),
            ))
        }
        Err(e) => Ok(error_result(format!("Error: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(a: Value, b: Value, op: &str) -> ToolResult {
        handle_calc(json!({"num1": a, "num2": b, "operator": op})).unwrap()
    }

    #[test]
    fn test_multiply() {
        let result = calc(json!(6), json!(3), "*");
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("6 * 3 = 18"));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["result"].as_f64(), Some(18.0));
        assert_eq!(structured["expression"], "6 * 3 = 18");
    }

    #[test]
    fn test_fractional_division() {
        let result = calc(json!(10), json!(4), "/");
        assert_eq!(result.first_text(), Some("10 / 4 = 2.5"));
    }

    #[test]
    fn test_add_and_subtract() {
        assert_eq!(calc(json!(1.5), json!(2), "+").first_text(), Some("1.5 + 2 = 3.5"));
        assert_eq!(calc(json!(2), json!(5), "-").first_text(), Some("2 - 5 = -3"));
    }

    #[test]
    fn test_division_by_zero_is_error() {
        for a in [0.0, 1.0, -7.5] {
            let result = calc(json!(a), json!(0), "/");
            assert!(result.is_error);
            assert!(result.structured_content.is_none());
            assert!(result.first_text().unwrap().contains("Division by zero"));
        }
    }

    #[test]
    fn test_overflow_is_error() {
        assert_eq!(apply(f64::MAX, 2.0, Operator::Multiply), Err(CalcError::NotFinite));
    }

    #[test]
    fn test_unknown_operator() {
        assert!(calc(json!(1), json!(1), "%").is_error);
    }
}
