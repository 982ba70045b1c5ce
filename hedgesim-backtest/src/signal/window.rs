//! Bounded price history producing a simple moving average.
//!
//! A window is "warm" once it holds exactly `capacity` samples; before that
//! no average is produced. Eviction is strictly FIFO.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;

/// Rolling window for one instrument.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    prices: VecDeque<Decimal>,
    capacity: usize,
}

impl SignalWindow {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "window capacity must be positive");
        Self {
            prices: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a price, evicting the oldest once over capacity.
    pub fn push(&mut self, price: Decimal) {
        self.prices.push_back(price);
        if self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
    }

    pub fn is_warm(&self) -> bool {
        self.prices.len() == self.capacity
    }

    /// Arithmetic mean of the window, `None` until warm.
    pub fn average(&self) -> Option<Decimal> {
        if !self.is_warm() {
            return None;
        }
        let sum: Decimal = self.prices.iter().sum();
        Some(sum / Decimal::from(self.capacity as u64))
    }
}

/// Per-instrument collection of signal windows.
#[derive(Debug, Clone)]
pub struct SignalBook {
    windows: HashMap<String, SignalWindow>,
    capacity: usize,
}

impl SignalBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity,
        }
    }

    pub fn push(&mut self, symbol: &str, price: Decimal) {
        let capacity = self.capacity;
        self.windows
            .entry(symbol.to_string())
            .or_insert_with(|| SignalWindow::new(capacity))
            .push(price);
    }

    pub fn average(&self, symbol: &str) -> Option<Decimal> {
        self.windows.get(symbol).and_then(SignalWindow::average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_ready_before_full() {
        let mut window = SignalWindow::new(10);
        for i in 1..10 {
            window.push(Decimal::from(i));
            assert_eq!(window.average(), None);
        }
        window.push(dec!(10));
        assert_eq!(window.average(), Some(dec!(5.5)));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = SignalWindow::new(10);
        window.push(dec!(1000));
        for _ in 0..10 {
            window.push(dec!(100));
        }
        // The 1000 was the oldest sample and must be gone
        assert!(window.is_warm());
        assert_eq!(window.average(), Some(dec!(100)));
    }

    #[test]
    fn test_mean_of_last_ten_for_long_sequences() {
        let mut window = SignalWindow::new(10);
        let prices: Vec<Decimal> = (0..37)
            .map(|i| Decimal::new(10_000 + i * 137 % 900, 2))
            .collect();
        for (n, price) in prices.iter().enumerate() {
            window.push(*price);
            if n + 1 >= 10 {
                let tail = &prices[n + 1 - 10..=n];
                let expected: Decimal = tail.iter().sum::<Decimal>() / dec!(10);
                assert_eq!(window.average(), Some(expected));
            }
        }
    }

    #[test]
    fn test_book_keeps_instruments_apart() {
        let mut book = SignalBook::new(2);
        book.push("AAPL", dec!(10));
        book.push("MSFT", dec!(50));
        assert_eq!(book.average("AAPL"), None);

        book.push("AAPL", dec!(20));
        assert_eq!(book.average("AAPL"), Some(dec!(15)));
        assert_eq!(book.average("MSFT"), None);
        assert_eq!(book.average("TSLA"), None);
    }
}
