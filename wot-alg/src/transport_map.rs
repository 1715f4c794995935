use crate::cost::cost_matrix;
use crate::local_pca::local_pca;
use crate::sinkhorn::*;
use log::{info, warn};
use wot_data::cell_days::CellDays;
use wot_data::dataset_io::{write_dataset, OutputFormat};
use wot_data::hdf5_io::RowAttr;
use wot_data::mat_with_names::*;
use wot_data::text_data::write_text_matrix;

/// Days appear in file names as printed by `f64`'s `Display`
/// (`1`, `1.5`)
pub fn day_label(day: f64) -> String {
    format!("{}", day)
}

/// Keep the cells (rows) that have a day
pub fn cells_with_day(data: &ExpressionData, days: &CellDays) -> ExpressionData {
    let keep: Vec<usize> = (0..data.nrows())
        .filter(|&i| days.get(&data.rows[i]).is_some())
        .collect();
    if keep.len() < data.nrows() {
        warn!("dropping {} cells without a day", data.nrows() - keep.len());
    }
    data.select_rows(&keep)
}

/// Coupling between the cells of two days
#[derive(Debug, Clone)]
pub struct TransportMap {
    pub t0: f64,
    pub t1: f64,
    /// source cells x target cells
    pub map: ExpressionData,
    /// `g0` (prior), `g1`, ... over the source cells
    pub growth: Vec<RowAttr>,
}

impl TransportMap {
    /// `{out}_{t0}_{t1}`
    pub fn prefix(&self, out: &str) -> String {
        format!("{}_{}_{}", out, day_label(self.t0), day_label(self.t1))
    }

    /// Source cells x growth estimates
    pub fn growth_table(&self) -> anyhow::Result<ExpressionData> {
        let names: Vec<Box<str>> = self.growth.iter().map(|(k, _)| k.clone()).collect();
        let mat = Mat::from_fn(self.map.nrows(), names.len(), |i, k| {
            self.growth[k].1[i] as f32
        });
        MatWithNames::new(self.map.rows.clone(), names, mat)
    }

    /// Write `{out}_{t0}_{t1}.{loom|txt}` and return the file name.
    /// Text maps have no row attributes, so their growth goes to
    /// `{out}_{t0}_{t1}_growth.txt`.
    pub fn write(&self, out: &str, format: OutputFormat) -> anyhow::Result<Box<str>> {
        let prefix = self.prefix(out);
        if format == OutputFormat::Txt {
            let growth_file = format!("{}_growth.txt", prefix);
            write_text_matrix(&self.growth_table()?, &growth_file, "\t")?;
            info!("Wrote growth estimates to {}", growth_file);
        }
        write_dataset(&self.map, &self.growth, &prefix, format)
    }
}

/// Transport map for one day pair
///
/// * `data` - cells x genes
/// * `days` - day of each cell
/// * `growth` - growth rate per day of each row of `data`
/// * `ncomp` - local PCA components (0: use genes)
pub fn compute_pair_map(
    data: &ExpressionData,
    days: &CellDays,
    growth: &[f64],
    (t0, t1): (f64, f64),
    ncomp: usize,
    params: &SinkhornParams,
) -> anyhow::Result<TransportMap> {
    if growth.len() != data.nrows() {
        anyhow::bail!(
            "{} growth rates for {} cells",
            growth.len(),
            data.nrows()
        );
    }

    let idx0 = days.positions_at(&data.rows, t0);
    let idx1 = days.positions_at(&data.rows, t1);
    if idx0.is_empty() || idx1.is_empty() {
        anyhow::bail!(
            "day pair ({}, {}) has {} and {} cells in the matrix",
            t0,
            t1,
            idx0.len(),
            idx1.len()
        );
    }
    info!(
        "Day pair ({}, {}): {} x {} cells",
        t0,
        t1,
        idx0.len(),
        idx1.len()
    );

    let x0 = data.mat.select_rows(&idx0);
    let x1 = data.mat.select_rows(&idx1);

    let (z0, z1) = local_pca(&x0, &x1, ncomp)?;
    let cost = cost_matrix(&z0, &z1)?;

    let g0: Vec<f64> = idx0.iter().map(|&i| growth[i]).collect();
    let result = compute_transport_map(&cost, &g0, t1 - t0, params)
        .map_err(|e| anyhow::anyhow!("day pair ({}, {}): {}", t0, t1, e))?;

    let rows: Vec<Box<str>> = idx0.iter().map(|&i| data.rows[i].clone()).collect();
    let cols: Vec<Box<str>> = idx1.iter().map(|&j| data.rows[j].clone()).collect();
    let map = MatWithNames::new(rows, cols, result.plan.map(|x| x as f32))?;

    let growth = result
        .growth
        .into_iter()
        .enumerate()
        .map(|(k, g)| (format!("g{}", k).into_boxed_str(), g))
        .collect();

    Ok(TransportMap { t0, t1, map, growth })
}
