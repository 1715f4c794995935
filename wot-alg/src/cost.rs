use log::{debug, warn};
use matrix_util::dmatrix_util::median;
use matrix_util::traits::DistanceOps;
use nalgebra::DMatrix;
use wot_data::mat_with_names::Mat;

pub type CostMat = DMatrix<f64>;

/// Squared Euclidean distances between the rows of `x0` and `x1`,
/// divided by their median (unless the median is zero)
pub fn cost_matrix(x0: &Mat, x1: &Mat) -> anyhow::Result<CostMat> {
    if x0.nrows() == 0 || x1.nrows() == 0 {
        anyhow::bail!("empty cell block: {} x {}", x0.nrows(), x1.nrows());
    }

    let x0 = x0.map(|x| x as f64);
    let x1 = x1.map(|x| x as f64);
    let mut cost = x0.squared_euclidean_rows(&x1)?;

    match median(cost.as_slice()) {
        Some(med) if med > 0.0 => {
            debug!("cost median {}", med);
            cost /= med;
        }
        _ => warn!("median cost is zero, leaving the cost unscaled"),
    }
    Ok(cost)
}
