use approx::assert_abs_diff_eq;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use wot_alg::simulate::*;

fn points(xs: &[(f64, f64)]) -> Vec<DVector<f64>> {
    xs.iter().map(|&(a, b)| DVector::from_vec(vec![a, b])).collect()
}

#[test]
fn linear_interp_hits_keys_and_clamps() -> anyhow::Result<()> {
    let tp = vec![0.0, 2.0, 4.0];
    let fp = points(&[(0.0, 1.0), (2.0, 1.0), (2.0, 5.0)]);
    let t = vec![-1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 9.0];

    let x = interp(&t, &tp, &fp, InterpMethod::Linear, 0)?;
    assert_eq!(x.len(), t.len());
    assert_eq!(x[0], fp[0]);
    assert_abs_diff_eq!(x[1], fp[0]);
    assert_abs_diff_eq!(x[2], DVector::from_vec(vec![1.0, 1.0]));
    assert_abs_diff_eq!(x[3], fp[1]);
    assert_abs_diff_eq!(x[4], DVector::from_vec(vec![2.0, 3.0]));
    assert_abs_diff_eq!(x[5], fp[2]);
    assert_eq!(x[6], fp[2]);
    Ok(())
}

#[test]
fn quadratic_interp_hits_keys() -> anyhow::Result<()> {
    let tp = vec![0.0, 1.0, 3.0, 4.0];
    let fp = points(&[(0.0, 0.0), (1.0, -1.0), (0.5, 2.0), (3.0, 3.0)]);
    let x = interp(&tp, &tp, &fp, InterpMethod::Quadratic, 0)?;
    for (a, b) in x.iter().zip(fp.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }

    // zero slope at the first key point
    let y = interp(&[1e-4], &tp, &fp, InterpMethod::Quadratic, 0)?;
    assert_abs_diff_eq!(y[0][0], 0.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn smoothing() -> anyhow::Result<()> {
    let tp = vec![0.0, 10.0];
    let flat = points(&[(3.0, 3.0), (3.0, 3.0)]);
    let t: Vec<f64> = (0..11).map(|x| x as f64).collect();

    let x = interp(&t, &tp, &flat, InterpMethod::Linear, 4)?;
    assert_eq!(x.len(), t.len());
    for v in x.iter() {
        assert_abs_diff_eq!(v[1], 3.0, epsilon = 1e-12);
    }

    let ramp = points(&[(0.0, 0.0), (10.0, 0.0)]);
    let x = interp(&t, &tp, &ramp, InterpMethod::Linear, 3)?;
    // interior points of a line are unchanged by a centred mean
    assert_abs_diff_eq!(x[5][0], 5.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn interp_errors() {
    let fp = points(&[(0.0, 0.0)]);
    assert!(interp(&[0.0], &[0.0, 1.0], &fp, InterpMethod::Linear, 0).is_err());
    assert!(interp(&[0.0], &[], &[], InterpMethod::Linear, 0).is_err());
    let fp2 = points(&[(0.0, 0.0), (1.0, 1.0)]);
    assert!(interp(&[0.0], &[1.0, 0.0], &fp2, InterpMethod::Linear, 0).is_err());
}

#[test]
fn mixture_sampling() -> anyhow::Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let means = points(&[(0.0, 0.0), (100.0, 100.0)]);
    let covs = vec![
        Covariance::Scalar(0.01),
        Covariance::Full(DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0])),
    ];

    let x = multivariate_normal_mixture(&means, &covs, Some(&[1.0, 0.0][..]), 50, &mut rng)?;
    assert_eq!(x.shape(), (50, 2));
    assert!(x.iter().all(|v| v.abs() < 1.0));

    let diag = vec![Covariance::Diagonal(DVector::from_vec(vec![0.0, 0.0])); 2];
    let y = multivariate_normal_mixture(&means, &diag, None, 20, &mut rng)?;
    assert!(y.row_iter().all(|r| r[0] == r[1]));

    assert!(multivariate_normal_mixture(&means, &covs, Some(&[0.5, 0.6][..]), 5, &mut rng).is_err());
    assert!(multivariate_normal_mixture(&means, &covs, None, 0, &mut rng).is_err());
    assert!(multivariate_normal_mixture(&means, &covs[..1], None, 5, &mut rng).is_err());

    let not_pd = vec![Covariance::Full(DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0])); 2];
    assert!(multivariate_normal_mixture(&means, &not_pd, None, 5, &mut rng).is_err());
    Ok(())
}

#[test]
fn evolving_mixture_shapes() -> anyhow::Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let means = vec![points(&[(0.0, 0.0)]), points(&[(5.0, 5.0)])];
    let covs = vec![vec![Covariance::Scalar(0.0)]; 2];

    let (x, time_index) = evolving_mixture(&means, &covs, None, &[3, 2], &mut rng)?;
    assert_eq!(x.shape(), (5, 2));
    assert_eq!(time_index, vec![0, 0, 0, 1, 1]);
    assert_abs_diff_eq!(x[(4, 1)], 5.0);

    assert!(evolving_mixture(&means, &covs, None, &[3], &mut rng).is_err());
    Ok(())
}

#[test]
fn simulated_time_course() -> anyhow::Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let params = SimParams {
        dim: 4,
        clusters: 2,
        key_timepoints: 3,
        timepoints: 5,
        cells: 10,
        method: InterpMethod::Quadratic,
        smooth: 0,
        cov: 0.5,
    };
    let (data, days) = simulate_time_course(&params, &mut rng)?;
    assert_eq!(data.nrows(), 50);
    assert_eq!(data.ncols(), 4);
    assert_eq!(days.len(), 50);
    assert!(data.mat.iter().all(|&x| x >= 0.0));
    assert_eq!(&*days[12].0, "cell_1_2");
    assert_abs_diff_eq!(days[12].1, 1.0);
    data.validate_expression()?;
    Ok(())
}
