use crate::cell_days::*;
use log::info;

/// Ordered `(t0, t1)` pairs for which transport maps are computed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayPairs {
    pub pairs: Vec<(f64, f64)>,
}

impl DayPairs {
    pub fn new(pairs: Vec<(f64, f64)>) -> anyhow::Result<Self> {
        for &(t0, t1) in pairs.iter() {
            if t0 >= t1 {
                anyhow::bail!("day pair ({}, {}) must be increasing", t0, t1);
            }
        }
        Ok(Self { pairs })
    }

    /// Read `day_a<TAB>day_b` lines
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let pairs = read_two_columns(file)?
            .into_iter()
            .map(|(a, b)| Ok((parse_day(&a)?, parse_day(&b)?)))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| anyhow::anyhow!("{}: {}", file, e))?;
        info!("Read {} day pairs from {}", pairs.len(), file);
        Self::new(pairs).map_err(|e| anyhow::anyhow!("{}: {}", file, e))
    }

    /// Consecutive pairs of the sorted distinct days
    pub fn consecutive(days: &CellDays) -> Self {
        let unique = days.unique_days();
        Self {
            pairs: unique.windows(2).map(|w| (w[0], w[1])).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Days referenced by some pair but absent from `days`
    pub fn missing_days(&self, days: &CellDays) -> Vec<f64> {
        let mut ret: Vec<f64> = self
            .pairs
            .iter()
            .flat_map(|&(t0, t1)| [t0, t1])
            .filter(|&t| !days.contains_day(t))
            .collect();
        ret.sort_by(|a, b| a.total_cmp(b));
        ret.dedup();
        ret
    }
}
