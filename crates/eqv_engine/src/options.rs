use eqv_parser::DEFAULT_VARIABLES;
use serde::{Deserialize, Serialize};

use crate::multipoly::PolyBudget;

/// Tunables shared by every strategy of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Symbol alphabet the parser accepts.
    pub variables: Vec<String>,
    /// Absolute tolerance of the numeric strategy (strict `<`).
    pub numeric_tolerance: f64,
    /// Largest number of terms any expansion may produce.
    pub max_terms: usize,
    /// Largest total degree any expanded polynomial may reach.
    pub max_total_degree: u32,
    /// Largest integer power of a sum that will be multiplied out.
    pub max_pow_exp: u32,
    /// Deepest expression tree the engine will walk.
    pub max_depth: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            variables: DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect(),
            numeric_tolerance: 1e-9,
            max_terms: 200,
            max_total_degree: 32,
            max_pow_exp: 32,
            max_depth: 200,
        }
    }
}

impl CheckOptions {
    pub fn poly_budget(&self) -> PolyBudget {
        PolyBudget {
            max_terms: self.max_terms,
            max_total_degree: self.max_total_degree,
            max_pow_exp: self.max_pow_exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = CheckOptions::default();
        assert_eq!(opts.variables, vec!["x", "y", "z", "a", "b", "c", "n", "i"]);
        assert_eq!(opts.numeric_tolerance, 1e-9);
        assert_eq!(opts.poly_budget().max_terms, 200);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let opts: CheckOptions = serde_json::from_str(r#"{"max_terms": 10}"#).unwrap();
        assert_eq!(opts.max_terms, 10);
        assert_eq!(opts.max_depth, 200);
    }
}
