//! Playback rate table and the cycling rule over it.
//!
//! The table is configuration, not a global: the session receives one at
//! construction. Cycling is a pure function of (table, index); the only state
//! is the index the session keeps.

/// Reference rate table: `S` key / speed button steps through it in order.
pub const REFERENCE_SPEEDS: &[f64] = &[0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

/// Ordered, non-empty list of positive playback rates.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTable {
    rates: Vec<f64>,
    /// Entry used after load (the 1.0 entry, or the closest one)
    normal_index: usize,
}

impl SpeedTable {
    /// Build a table. Returns None for an empty table or any non-finite/non-positive rate.
    pub fn new(rates: Vec<f64>) -> Option<Self> {
        if rates.is_empty() || rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return None;
        }
        let normal_index = rates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - 1.0).abs().total_cmp(&(*b - 1.0).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Some(Self { rates, normal_index })
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn normal_index(&self) -> usize {
        self.normal_index
    }

    /// Rate at `index` (wraps, so any index is valid)
    pub fn rate(&self, index: usize) -> f64 {
        self.rates[index % self.rates.len()]
    }

    /// Display label at `index`, e.g. "1.25x"
    pub fn label(&self, index: usize) -> String {
        format_rate(self.rate(index))
    }
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            rates: REFERENCE_SPEEDS.to_vec(),
            normal_index: 2,
        }
    }
}

/// Next index in cyclic order: last entry wraps to the first.
pub fn cycle(table: &SpeedTable, index: usize) -> usize {
    (index + 1) % table.rates.len()
}

/// "1x", "0.75x", "2x"
pub fn format_rate(rate: f64) -> String {
    format!("{}x", rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_normal_is_one() {
        let table = SpeedTable::default();
        assert_eq!(table.rate(table.normal_index()), 1.0);
        assert_eq!(SpeedTable::new(REFERENCE_SPEEDS.to_vec()), Some(table));
    }

    #[test]
    fn test_cycle_from_normal() {
        let table = SpeedTable::default();
        let next = cycle(&table, table.normal_index());
        assert_eq!(table.label(next), "1.25x");
    }

    #[test]
    fn test_cycle_wraps_after_table_len() {
        let table = SpeedTable::default();
        let start = table.normal_index();
        let mut idx = start;
        for _ in 0..table.rates().len() {
            idx = cycle(&table, idx);
        }
        assert_eq!(idx, start);

        // Last wraps to first
        assert_eq!(cycle(&table, table.rates().len() - 1), 0);
        assert_eq!(table.label(0), "0.5x");
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(SpeedTable::new(vec![]).is_none());
        assert!(SpeedTable::new(vec![1.0, 0.0]).is_none());
        assert!(SpeedTable::new(vec![1.0, -2.0]).is_none());
        assert!(SpeedTable::new(vec![f64::NAN]).is_none());
    }

    #[test]
    fn test_normal_index_picks_closest_to_one() {
        let table = SpeedTable::new(vec![0.5, 0.9, 2.0]).unwrap();
        assert_eq!(table.normal_index(), 1);
    }

    #[test]
    fn test_labels() {
        assert_eq!(format_rate(1.0), "1x");
        assert_eq!(format_rate(0.75), "0.75x");
        assert_eq!(format_rate(4.0), "4x");
    }
}
