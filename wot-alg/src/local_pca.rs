use log::{info, warn};
use matrix_util::dmatrix_rsvd::RSVD;
use matrix_util::traits::MatOps;
use wot_data::mat_with_names::Mat;

/// Project the cells of two days onto the principal components of
/// their union
///
/// The stacked `[x0; x1]` is centred by its column means and
/// multiplied by the top `ncomp` right singular vectors. `ncomp = 0`
/// returns the inputs unchanged.
///
/// * `x0` - cells of the first day x genes
/// * `x1` - cells of the second day x genes
/// * `ncomp` - number of components
pub fn local_pca(x0: &Mat, x1: &Mat, ncomp: usize) -> anyhow::Result<(Mat, Mat)> {
    if x0.ncols() != x1.ncols() {
        anyhow::bail!(
            "different numbers of genes: {} vs {}",
            x0.ncols(),
            x1.ncols()
        );
    }

    if ncomp == 0 {
        return Ok((x0.clone(), x1.clone()));
    }

    let (n0, n1, d) = (x0.nrows(), x1.nrows(), x0.ncols());

    let mut stacked = Mat::zeros(n0 + n1, d);
    stacked.rows_mut(0, n0).copy_from(x0);
    stacked.rows_mut(n0, n1).copy_from(x1);
    stacked.centre_columns_inplace();

    let max_rank = (n0 + n1).min(d);
    let rank = if ncomp > max_rank {
        warn!(
            "local PCA: {} components requested but rank is at most {}",
            ncomp, max_rank
        );
        max_rank
    } else {
        ncomp
    };

    let (_, _, vv) = stacked.rsvd(rank)?;
    let proj = &stacked * &vv;
    info!(
        "local PCA: [{} x {}] -> [{} x {}]",
        n0 + n1,
        d,
        proj.nrows(),
        proj.ncols()
    );

    Ok((
        proj.rows(0, n0).into_owned(),
        proj.rows(n0, n1).into_owned(),
    ))
}
