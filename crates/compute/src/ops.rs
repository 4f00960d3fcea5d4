//! The arithmetic operations.
//!
//! Pure functions; validation of argument ranges happens at the API
//! boundary. Fibonacci and factorial grow far beyond machine integers
//! (fib(20000) has thousands of digits), so they return big integers
//! and serialize as arbitrary-precision JSON numbers.

use num_bigint::BigUint;
use std::str::FromStr;

/// The supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pow,
    Fibonacci,
    Factorial,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Pow => "pow",
            Operation::Fibonacci => "fibonacci",
            Operation::Factorial => "factorial",
        }
    }
}

/// base^exponent over f64.
pub fn pow(base: f64, exponent: f64) -> f64 {
    base.powf(exponent)
}

/// Iterative fibonacci: fib(0) = 0, fib(1) = 1.
pub fn fibonacci(n: u32) -> BigUint {
    let mut a = BigUint::ZERO;
    let mut b = BigUint::from(1u8);
    for _ in 0..n {
        let next = &a + &b;
        a = b;
        b = next;
    }
    a
}

/// Iterative factorial: 0! = 1! = 1.
pub fn factorial(n: u32) -> BigUint {
    let mut result = BigUint::from(1u8);
    for i in 2..=n.max(1) {
        result *= i;
    }
    result
}

/// Render a big integer as a JSON number without precision loss.
pub fn integer_value(n: &BigUint) -> serde_json::Value {
    let digits = n.to_string();
    match serde_json::Number::from_str(&digits) {
        Ok(number) => serde_json::Value::Number(number),
        // Unreachable for a digit string; keep the textual form anyway.
        Err(_) => serde_json::Value::String(digits),
    }
}
