// src/core/reconciler.rs
use crate::types::{AccountState, OpenOrder, OrderType, Position, Side};

/// What the account looks like for one symbol at the start of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No position (zero quantity or no record at all). A new entry may be computed.
    Flat,
    /// Position open and at least one order resting for the symbol. Nothing to do.
    Protected {
        position: Position,
        coverage: BracketCoverage,
    },
    /// Position open with no resting orders. Brackets must be attached.
    Unprotected {
        position: Position,
        closing_side: Side,
    },
}

/// Which protective order types are among the open orders.
///
/// Classification only counts orders; this is reported so the caller can flag
/// positions that rely on a stray order for "protection".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketCoverage {
    pub stop_loss: bool,
    pub take_profit: bool,
    pub order_count: usize,
}

impl BracketCoverage {
    pub fn from_orders(orders: &[OpenOrder]) -> Self {
        Self {
            stop_loss: orders.iter().any(|o| o.order_type == OrderType::StopMarket),
            take_profit: orders
                .iter()
                .any(|o| o.order_type == OrderType::TakeProfitMarket),
            order_count: orders.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stop_loss && self.take_profit
    }
}

pub fn reconcile(account: &AccountState, symbol: &str, open_orders: &[OpenOrder]) -> Reconciliation {
    let position = match account.position(symbol) {
        Some(position) => position,
        // A symbol missing from the snapshot is flat, not an error.
        None => return Reconciliation::Flat,
    };

    let closing_side = match position.closing_side() {
        Some(side) => side,
        None => return Reconciliation::Flat,
    };

    let orders: Vec<OpenOrder> = open_orders
        .iter()
        .filter(|o| o.symbol == symbol)
        .cloned()
        .collect();

    if orders.is_empty() {
        Reconciliation::Unprotected {
            position: position.clone(),
            closing_side,
        }
    } else {
        Reconciliation::Protected {
            position: position.clone(),
            coverage: BracketCoverage::from_orders(&orders),
        }
    }
}
