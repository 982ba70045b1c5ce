//! End-of-session settlement.
//!
//! Sells every open share position at its final price, pays out in-the-money
//! hedge contracts and clears the rest. Final prices are checked for every
//! non-flat instrument before anything is mutated.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::portfolio::Portfolio;

use super::engine::EngineError;
use super::trade::{ExitReason, TradeAction, TradeEvent};

/// Result of settling a portfolio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementReport {
    pub events: Vec<TradeEvent>,
    /// Cash raised by liquidating shares.
    pub share_proceeds: Decimal,
    /// Cash raised by exercised contracts.
    pub option_payouts: Decimal,
    /// Contracts cleared without payout.
    pub expired_options: usize,
    /// Balance once everything is settled.
    pub final_cash: Decimal,
}

/// Liquidate all shares and options in `portfolio` at `final_prices`.
pub fn settle_portfolio(
    portfolio: &mut Portfolio,
    final_prices: &HashMap<String, Decimal>,
) -> Result<SettlementReport, EngineError> {
    for (symbol, position) in portfolio.positions() {
        if !position.is_flat() && !final_prices.contains_key(symbol) {
            return Err(EngineError::MissingFinalPrice(symbol.to_string()));
        }
    }

    let mut report = SettlementReport::default();
    let symbols = portfolio.symbols().to_vec();

    for symbol in &symbols {
        let Some(&price) = final_prices.get(symbol) else {
            continue;
        };
        let Some(position) = portfolio.position_mut(symbol) else {
            continue;
        };

        let qty = position.close_all();
        let contracts = position.take_options();

        if qty > 0 {
            let proceeds = Decimal::from(qty) * price;
            portfolio.credit(proceeds);
            report.share_proceeds += proceeds;
            push_event(
                &mut report,
                TradeEvent::new(
                    symbol,
                    TradeAction::Sell {
                        qty,
                        price,
                        reason: ExitReason::EndOfSession,
                    },
                ),
            );
        }

        for contract in contracts {
            if contract.is_exercisable(price) {
                let payout = contract.payout(price);
                portfolio.credit(payout);
                report.option_payouts += payout;
                push_event(
                    &mut report,
                    TradeEvent::new(
                        symbol,
                        TradeAction::OptionExercised {
                            contract,
                            payout,
                            at_settlement: true,
                        },
                    ),
                );
            } else {
                report.expired_options += 1;
                push_event(
                    &mut report,
                    TradeEvent::new(symbol, TradeAction::OptionExpired { contract }),
                );
            }
        }
    }

    report.final_cash = portfolio.cash();
    Ok(report)
}

fn push_event(report: &mut SettlementReport, event: TradeEvent) {
    info!("{}", event);
    report.events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use crate::portfolio::OptionContract;
    use rust_decimal_macros::dec;

    fn contract(option_type: OptionType, strike: Decimal) -> OptionContract {
        OptionContract {
            option_type,
            strike,
            premium: dec!(1),
            time_to_maturity: 0.1,
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(dec!(100), &["X".to_string(), "Y".to_string()])
    }

    #[test]
    fn test_call_payout_at_settlement() {
        let mut portfolio = portfolio();
        portfolio
            .position_mut("X")
            .unwrap()
            .add_option(contract(OptionType::Call, dec!(50)));

        let prices = HashMap::from([("X".to_string(), dec!(60))]);
        let report = settle_portfolio(&mut portfolio, &prices).unwrap();

        assert_eq!(report.option_payouts, dec!(10));
        assert_eq!(portfolio.cash(), dec!(110));
        assert_eq!(report.final_cash, dec!(110));
    }

    #[test]
    fn test_liquidates_shares_at_final_price() {
        let mut portfolio = portfolio();
        portfolio.position_mut("X").unwrap().open_or_add(20, dec!(95));
        portfolio.position_mut("Y").unwrap().open_or_add(3, dec!(40));

        let prices = HashMap::from([
            ("X".to_string(), dec!(101.25)),
            ("Y".to_string(), dec!(38.10)),
        ]);
        let report = settle_portfolio(&mut portfolio, &prices).unwrap();

        assert_eq!(report.share_proceeds, dec!(2025) + dec!(114.30));
        assert_eq!(portfolio.cash(), dec!(100) + dec!(2025) + dec!(114.30));
        assert_eq!(report.events.len(), 2);
        assert!(matches!(
            report.events[0].action,
            TradeAction::Sell {
                reason: ExitReason::EndOfSession,
                ..
            }
        ));
    }

    #[test]
    fn test_clears_everything() {
        let mut portfolio = portfolio();
        {
            let x = portfolio.position_mut("X").unwrap();
            x.open_or_add(5, dec!(10));
            x.add_option(contract(OptionType::Call, dec!(12)));
            x.add_option(contract(OptionType::Put, dec!(9)));
        }
        portfolio
            .position_mut("Y")
            .unwrap()
            .add_option(contract(OptionType::Put, dec!(30)));

        let prices = HashMap::from([
            ("X".to_string(), dec!(10)),
            ("Y".to_string(), dec!(25)),
        ]);
        let report = settle_portfolio(&mut portfolio, &prices).unwrap();

        assert!(portfolio.is_flat());
        for (_, position) in portfolio.positions() {
            assert_eq!(position.shares, 0);
            assert_eq!(position.avg_cost, Decimal::ZERO);
            assert!(position.options.is_empty());
        }
        // Both X contracts out of the money, Y put pays 5
        assert_eq!(report.expired_options, 2);
        assert_eq!(report.option_payouts, dec!(5));
        assert_eq!(portfolio.cash(), dec!(100) + dec!(50) + dec!(5));
    }

    #[test]
    fn test_missing_price_leaves_portfolio_untouched() {
        let mut portfolio = portfolio();
        portfolio.position_mut("X").unwrap().open_or_add(5, dec!(10));
        portfolio.position_mut("Y").unwrap().open_or_add(5, dec!(10));

        let prices = HashMap::from([("X".to_string(), dec!(11))]);
        let err = settle_portfolio(&mut portfolio, &prices).unwrap_err();

        assert_eq!(err, EngineError::MissingFinalPrice("Y".to_string()));
        assert_eq!(portfolio.cash(), dec!(100));
        assert_eq!(portfolio.position("X").unwrap().shares, 5);
    }

    #[test]
    fn test_flat_instrument_needs_no_price() {
        let mut portfolio = portfolio();
        let report = settle_portfolio(&mut portfolio, &HashMap::new()).unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.final_cash, dec!(100));
    }
}
