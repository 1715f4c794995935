use approx::assert_abs_diff_eq;
use matrix_util::dmatrix_rsvd::RSVD;
use matrix_util::dmatrix_util::*;
use matrix_util::traits::SampleOps;

#[test]
fn dmatrix_rsvd_identity() -> anyhow::Result<()> {
    let mut xx = DMatrix::<f32>::zeros(8, 8);
    xx.fill_with_identity();

    let (u, d, v) = xx.rsvd(3)?;

    assert_eq!(u.shape(), (8, 3));
    assert_eq!(v.shape(), (8, 3));
    assert_eq!(d.len(), 3);
    d.iter().for_each(|&s| assert_abs_diff_eq!(s, 1.0, epsilon = 1e-4));
    Ok(())
}

#[test]
fn dmatrix_rsvd_low_rank() -> anyhow::Result<()> {
    // rank-2 matrix 200 x 50
    let aa = DMatrix::<f32>::rnorm(200, 2);
    let bb = DMatrix::<f32>::rnorm(2, 50);
    let xx = &aa * &bb;

    let (u, d, v) = xx.rsvd(2)?;

    let recon = &u * DMatrix::from_diagonal(&d) * v.transpose();
    let err = (&recon - &xx).norm() / xx.norm();
    assert!(err < 1e-3, "relative error {}", err);

    // orthonormal columns
    let utu = u.transpose() * &u;
    assert_abs_diff_eq!(utu[(0, 0)], 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(utu[(0, 1)], 0.0, epsilon = 1e-3);
    assert!(d[0] >= d[1]);
    Ok(())
}
