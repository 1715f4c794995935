use crate::cell_days::CellDays;
use crate::day_pairs::DayPairs;
use crate::mat_with_names::*;
use fnv::FnvHashSet as HashSet;
use log::{info, warn};

/// Consistency between the expression matrix, the cell days, the day
/// pairs and an optional score table
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// matrix cells with no day
    pub cells_without_day: Vec<Box<str>>,
    /// cell-day entries with no matrix row
    pub days_without_cell: Vec<Box<str>>,
    /// days named in a pair but never assigned to a cell
    pub missing_pair_days: Vec<f64>,
    /// matrix cells with a day but without a score row
    pub cells_without_score: Vec<Box<str>>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.cells_without_day.is_empty()
            && self.days_without_cell.is_empty()
            && self.missing_pair_days.is_empty()
            && self.cells_without_score.is_empty()
    }

    /// Errors that make transport maps impossible to compute
    pub fn check_fatal(&self) -> anyhow::Result<()> {
        if !self.missing_pair_days.is_empty() {
            anyhow::bail!(
                "days {:?} appear in day pairs but not in cell days",
                self.missing_pair_days
            );
        }
        if !self.cells_without_score.is_empty() {
            anyhow::bail!(
                "{} cells have no gene-set scores, e.g., {}",
                self.cells_without_score.len(),
                self.cells_without_score[0]
            );
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        if self.is_ok() {
            info!("inputs are consistent");
            return;
        }
        if let Some(x) = self.cells_without_day.first() {
            warn!(
                "{} matrix cells have no day, e.g., {}",
                self.cells_without_day.len(),
                x
            );
        }
        if let Some(x) = self.days_without_cell.first() {
            warn!(
                "{} cell days refer to cells not in the matrix, e.g., {}",
                self.days_without_cell.len(),
                x
            );
        }
        if !self.missing_pair_days.is_empty() {
            warn!("pair days missing from cell days: {:?}", self.missing_pair_days);
        }
        if let Some(x) = self.cells_without_score.first() {
            warn!(
                "{} cells have no score, e.g., {}",
                self.cells_without_score.len(),
                x
            );
        }
    }
}

pub fn validate_inputs(
    matrix: &ExpressionData,
    days: &CellDays,
    pairs: &DayPairs,
    scores: Option<&ExpressionData>,
) -> ValidationReport {
    let matrix_cells: HashSet<&str> = matrix.rows.iter().map(|x| x.as_ref()).collect();

    let cells_without_day: Vec<Box<str>> = matrix
        .rows
        .iter()
        .filter(|x| days.get(x).is_none())
        .cloned()
        .collect();

    let days_without_cell: Vec<Box<str>> = days
        .cells()
        .iter()
        .filter(|x| !matrix_cells.contains(x.as_ref()))
        .cloned()
        .collect();

    let cells_without_score = match scores {
        Some(scores) => {
            let scored: HashSet<&str> = scores.rows.iter().map(|x| x.as_ref()).collect();
            matrix
                .rows
                .iter()
                .filter(|x| days.get(x).is_some() && !scored.contains(x.as_ref()))
                .cloned()
                .collect()
        }
        None => vec![],
    };

    ValidationReport {
        cells_without_day,
        days_without_cell,
        missing_pair_days: pairs.missing_days(days),
        cells_without_score,
    }
}
