//! Session-local log of performed conversions.

use chrono::{DateTime, Utc};

use crate::currency::Currency;

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRecord {
    pub id: u64,
    pub from: Currency,
    pub to: Currency,
    pub amount: f64,
    pub result: f64,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// Newest-first, in-memory only. Cleared on demand and gone when the
/// session ends; nothing is persisted.
#[derive(Debug, Default)]
pub struct ConversionLog {
    entries: Vec<ConversionRecord>,
    next_id: u64,
}

impl ConversionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a record for a performed conversion and returns it.
    pub fn record(
        &mut self,
        from: Currency,
        to: Currency,
        amount: f64,
        result: f64,
        rate: f64,
    ) -> &ConversionRecord {
        self.next_id += 1;
        self.entries.insert(
            0,
            ConversionRecord {
                id: self.next_id,
                from,
                to,
                amount,
                result,
                rate,
                timestamp: Utc::now(),
            },
        );
        &self.entries[0]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Records, newest first.
    pub fn entries(&self) -> &[ConversionRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_newest_first_with_increasing_ids() {
        let mut log = ConversionLog::new();
        log.record(Currency::Usd, Currency::Bob, 100.0, 1350.0, 13.5);
        log.record(Currency::Eur, Currency::Bob, 50.0, 729.7, 14.59);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].from, Currency::Eur);
        assert_eq!(log.entries()[1].from, Currency::Usd);
        assert!(log.entries()[0].id > log.entries()[1].id);
    }

    #[test]
    fn test_clear_empties_but_keeps_id_sequence() {
        let mut log = ConversionLog::new();
        log.record(Currency::Usd, Currency::Bob, 100.0, 1350.0, 13.5);
        log.clear();
        assert!(log.is_empty());

        let record = log.record(Currency::Usd, Currency::Bob, 10.0, 135.0, 13.5);
        assert_eq!(record.id, 2);
    }
}
