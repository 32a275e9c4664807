//! Direction-dependent bid validation.
//!
//! Pure functions with no side effects, cheap enough to run on every
//! keystroke for live feedback.

use thiserror::Error;

use crate::protocol::{AuctionType, BestBid, format_amount};

/// Why a candidate amount is not a legal bid. The `Display` text is the
/// user-facing explanation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BidRejection {
    /// No amount, a non-finite amount, or an amount ≤ 0.
    #[error("Please enter a valid bid amount")]
    NotPositive,
    #[error("Bid must be higher than {}", format_amount(.current))]
    NotHigher { current: f64 },
    #[error("Bid must be lower than {}", format_amount(.current))]
    NotLower { current: f64 },
}

/// Check a candidate amount against the auction direction and current best
/// bid, returning the accepted amount.
pub fn check(
    amount: Option<f64>,
    auction_type: AuctionType,
    current_best: Option<&BestBid>,
) -> Result<f64, BidRejection> {
    let amount = match amount {
        Some(a) if a.is_finite() && a > 0.0 => a,
        _ => return Err(BidRejection::NotPositive),
    };
    let Some(best) = current_best else {
        return Ok(amount);
    };
    match auction_type {
        AuctionType::Ascending if amount > best.amount => Ok(amount),
        AuctionType::Ascending => Err(BidRejection::NotHigher {
            current: best.amount,
        }),
        AuctionType::Descending if amount < best.amount => Ok(amount),
        AuctionType::Descending => Err(BidRejection::NotLower {
            current: best.amount,
        }),
    }
}

pub fn is_valid(
    amount: Option<f64>,
    auction_type: AuctionType,
    current_best: Option<&BestBid>,
) -> bool {
    check(amount, auction_type, current_best).is_ok()
}

/// Explanation for an invalid amount, or `None` when the amount is valid.
pub fn explain(
    amount: Option<f64>,
    auction_type: AuctionType,
    current_best: Option<&BestBid>,
) -> Option<String> {
    check(amount, auction_type, current_best)
        .err()
        .map(|rejection| rejection.to_string())
}

/// Parse raw user input into an amount. Empty or unparsable input is `None`.
pub fn parse_amount(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn best(amount: f64) -> BestBid {
        BestBid {
            ticket_id: "t".to_string(),
            amount,
        }
    }

    const SAMPLES: [f64; 9] = [0.01, 1.0, 49.99, 50.0, 50.01, 99.0, 100.0, 101.0, 1e9];

    #[test]
    fn ascending_requires_strictly_higher() {
        for current in SAMPLES {
            for amount in SAMPLES {
                assert_eq!(
                    is_valid(Some(amount), AuctionType::Ascending, Some(&best(current))),
                    amount > current,
                    "amount {amount} vs current {current}"
                );
            }
        }
    }

    #[test]
    fn descending_requires_strictly_lower() {
        for current in SAMPLES {
            for amount in SAMPLES {
                assert_eq!(
                    is_valid(Some(amount), AuctionType::Descending, Some(&best(current))),
                    amount < current,
                    "amount {amount} vs current {current}"
                );
            }
        }
    }

    #[test]
    fn any_positive_amount_is_valid_without_a_best_bid() {
        for kind in AuctionType::ALL {
            for amount in SAMPLES {
                assert!(is_valid(Some(amount), kind, None));
            }
        }
    }

    #[test]
    fn non_positive_and_absent_amounts_are_rejected() {
        for kind in AuctionType::ALL {
            assert_eq!(check(None, kind, None), Err(BidRejection::NotPositive));
            assert_eq!(check(Some(0.0), kind, None), Err(BidRejection::NotPositive));
            assert_eq!(check(Some(-3.0), kind, None), Err(BidRejection::NotPositive));
            assert_eq!(
                check(Some(f64::NAN), kind, None),
                Err(BidRejection::NotPositive)
            );
        }
    }

    #[test]
    fn explanations_mention_the_current_best() {
        assert_eq!(
            explain(Some(90.0), AuctionType::Ascending, Some(&best(100.0))).as_deref(),
            Some("Bid must be higher than 100")
        );
        assert_eq!(
            explain(Some(20.0), AuctionType::Descending, Some(&best(12.5))).as_deref(),
            Some("Bid must be lower than 12.50")
        );
        assert_eq!(explain(Some(5.0), AuctionType::Descending, None), None);
    }

    #[test]
    fn parse_amount_input() {
        assert_eq!(parse_amount(" 120 "), Some(120.0));
        assert_eq!(parse_amount("7.25"), Some(7.25));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
