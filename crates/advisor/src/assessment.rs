use serde::{Deserialize, Serialize};

use crate::advice::AdvisorError;

/// Inputs for a single low-stock assessment.
///
/// All three values must be finite and non-negative; fractional values are
/// allowed (daily sales averages rarely land on whole numbers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockAssessmentInput {
    pub current_stock: f64,
    pub average_daily_sales: f64,
    pub lead_time_days: f64,
}

/// Outcome of a low-stock assessment. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockAssessmentResult {
    pub is_low_stock: bool,
    pub threshold: f64,
    pub reorder_quantity: u64,
}

/// Deterministic low-stock assessment.
///
/// Model:
/// - `threshold = average_daily_sales * lead_time_days + average_daily_sales * 2`
///   (expected consumption over the lead time, plus a two-day buffer).
/// - An item is low when `current_stock < threshold`.
/// - When low, the recommended reorder quantity is `ceil(threshold * 1.5)`;
///   otherwise 0.
///
/// No side effects and no state: identical inputs always produce identical
/// results. The only failure mode is input validation.
pub fn assess(input: &StockAssessmentInput) -> Result<StockAssessmentResult, AdvisorError> {
    ensure_non_negative("current_stock", input.current_stock)?;
    ensure_non_negative("average_daily_sales", input.average_daily_sales)?;
    ensure_non_negative("lead_time_days", input.lead_time_days)?;

    let threshold =
        input.average_daily_sales * input.lead_time_days + input.average_daily_sales * 2.0;
    let is_low_stock = input.current_stock < threshold;

    let reorder_quantity = if is_low_stock {
        (threshold * 1.5).ceil() as u64
    } else {
        0
    };

    Ok(StockAssessmentResult {
        is_low_stock,
        threshold,
        reorder_quantity,
    })
}

fn ensure_non_negative(field: &str, value: f64) -> Result<(), AdvisorError> {
    if !value.is_finite() {
        return Err(AdvisorError::InvalidInput(format!(
            "{field} must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(AdvisorError::InvalidInput(format!(
            "{field} must be non-negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(stock: f64, sales: f64, lead: f64) -> StockAssessmentInput {
        StockAssessmentInput {
            current_stock: stock,
            average_daily_sales: sales,
            lead_time_days: lead,
        }
    }

    #[test]
    fn five_daily_sales_over_ten_days_yields_threshold_sixty() {
        let result = assess(&input(50.0, 5.0, 10.0)).unwrap();
        assert_eq!(result.threshold, 60.0);
        assert!(result.is_low_stock);
        assert_eq!(result.reorder_quantity, 90);
    }

    #[test]
    fn stock_at_threshold_is_not_low() {
        let result = assess(&input(60.0, 5.0, 10.0)).unwrap();
        assert!(!result.is_low_stock);
        assert_eq!(result.reorder_quantity, 0);
    }

    #[test]
    fn zero_sales_is_never_low() {
        let result = assess(&input(0.0, 0.0, 30.0)).unwrap();
        assert_eq!(result.threshold, 0.0);
        assert!(!result.is_low_stock);
        assert_eq!(result.reorder_quantity, 0);
    }

    #[test]
    fn fractional_inputs_round_reorder_up() {
        // threshold = 2.5 * 7 + 2.5 * 2 = 22.5; reorder = ceil(33.75) = 34.
        let result = assess(&input(20.0, 2.5, 7.0)).unwrap();
        assert_eq!(result.threshold, 22.5);
        assert!(result.is_low_stock);
        assert_eq!(result.reorder_quantity, 34);
    }

    #[test]
    fn negative_inputs_are_rejected() {
        for bad in [
            input(-1.0, 5.0, 10.0),
            input(50.0, -0.5, 10.0),
            input(50.0, 5.0, -3.0),
        ] {
            let err = assess(&bad).unwrap_err();
            match err {
                AdvisorError::InvalidInput(_) => {}
                _ => panic!("Expected InvalidInput for negative input"),
            }
        }
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        for bad in [
            input(f64::NAN, 5.0, 10.0),
            input(50.0, f64::INFINITY, 10.0),
            input(50.0, 5.0, f64::NEG_INFINITY),
        ] {
            let err = assess(&bad).unwrap_err();
            match err {
                AdvisorError::InvalidInput(msg) => assert!(msg.contains("finite")),
                _ => panic!("Expected InvalidInput for non-finite input"),
            }
        }
    }

    #[test]
    fn assessment_is_idempotent() {
        let sample = input(12.0, 3.0, 4.0);
        let first = assess(&sample).unwrap();
        let second = assess(&sample).unwrap();
        assert_eq!(first, second);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn non_negative() -> impl Strategy<Value = f64> {
            0.0..1_000_000.0f64
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            #[test]
            fn threshold_follows_the_formula(
                stock in non_negative(),
                sales in non_negative(),
                lead in non_negative(),
            ) {
                let result = assess(&input(stock, sales, lead)).unwrap();
                prop_assert_eq!(result.threshold, sales * lead + sales * 2.0);
            }

            #[test]
            fn low_stock_matches_threshold_comparison(
                stock in non_negative(),
                sales in non_negative(),
                lead in non_negative(),
            ) {
                let result = assess(&input(stock, sales, lead)).unwrap();
                prop_assert_eq!(result.is_low_stock, stock < result.threshold);
            }

            #[test]
            fn reorder_quantity_is_zero_unless_low(
                stock in non_negative(),
                sales in non_negative(),
                lead in non_negative(),
            ) {
                let result = assess(&input(stock, sales, lead)).unwrap();
                if result.is_low_stock {
                    prop_assert_eq!(result.reorder_quantity, (result.threshold * 1.5).ceil() as u64);
                } else {
                    prop_assert_eq!(result.reorder_quantity, 0);
                }
            }

            #[test]
            fn identical_inputs_yield_identical_results(
                stock in non_negative(),
                sales in non_negative(),
                lead in non_negative(),
            ) {
                let sample = input(stock, sales, lead);
                prop_assert_eq!(assess(&sample).unwrap(), assess(&sample).unwrap());
            }
        }
    }
}
