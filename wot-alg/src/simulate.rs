use clap::ValueEnum;
use log::info;
use nalgebra::{DMatrix, DVector};
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{StandardNormal, Uniform};
use wot_data::mat_with_names::*;

type Vec64 = DVector<f64>;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "lowercase")]
pub enum InterpMethod {
    #[default]
    Linear,
    /// quadratic splines with continuous first derivative
    Quadratic,
}

/// Interpolate vector-valued key points `fp` at times `tp` (increasing)
///
/// Times before `tp[0]` take `fp[0]`, after the last key point the last
/// value. With `smooth > 0` the result is a running mean over an odd
/// window (even sizes round up).
pub fn interp(
    times: &[f64],
    tp: &[f64],
    fp: &[Vec64],
    method: InterpMethod,
    smooth: usize,
) -> anyhow::Result<Vec<Vec64>> {
    if tp.len() != fp.len() {
        anyhow::bail!("{} key times but {} key points", tp.len(), fp.len());
    }
    let Some(first) = fp.first() else {
        anyhow::bail!("no key points");
    };
    let dim = first.len();
    if fp.iter().any(|x| x.len() != dim) {
        anyhow::bail!("key points differ in dimension");
    }
    if tp.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("key times must be increasing");
    }

    let last = tp.len() - 1;
    let mut ret = Vec::with_capacity(times.len());

    for &t in times {
        if t < tp[0] {
            ret.push(fp[0].clone());
            continue;
        }

        // slope at the start of the segment, for the quadratic splines
        let mut z = Vec64::zeros(dim);
        let mut i = 0;
        while i < last && tp[i + 1] < t {
            z = (&fp[i + 1] - &fp[i]) * (2.0 / (tp[i + 1] - tp[i])) - z;
            i += 1;
        }
        if i == last {
            ret.push(fp[last].clone());
            continue;
        }

        let h = tp[i + 1] - tp[i];
        let x = match method {
            InterpMethod::Linear => {
                let r = (t - tp[i]) / h;
                &fp[i] * (1.0 - r) + &fp[i + 1] * r
            }
            InterpMethod::Quadratic => {
                let z1 = (&fp[i + 1] - &fp[i]) * (2.0 / h) - &z;
                let s = t - tp[i];
                &fp[i] + &z * s + (z1 - &z) * (s * s / (2.0 * h))
            }
        };
        ret.push(x);
    }

    if smooth > 1 && !ret.is_empty() {
        ret = running_mean(&ret, smooth);
    }
    Ok(ret)
}

/// Centred running mean; the ends are padded with the first `w + 1`
/// and the last `w` points
fn running_mean(x: &[Vec64], window: usize) -> Vec<Vec64> {
    let window = window + 1 - window % 2;
    let w = (window - 1) / 2;
    let n = x.len();
    let dim = x[0].len();

    let padded: Vec<&Vec64> = x[..(w + 1).min(n)]
        .iter()
        .chain(x.iter())
        .chain(x[n.saturating_sub(w)..].iter())
        .collect();

    (0..n)
        .map(|k| {
            let end = (k + window).min(padded.len() - 1);
            let mut acc = Vec64::zeros(dim);
            for v in padded[(k + 1)..=end].iter() {
                acc += *v;
            }
            acc / window as f64
        })
        .collect()
}

/// Covariance of one mixture component
#[derive(Debug, Clone, PartialEq)]
pub enum Covariance {
    Full(DMatrix<f64>),
    Diagonal(Vec64),
    /// multiple of the identity
    Scalar(f64),
}

impl Covariance {
    /// Lower-triangular factor `L` with `L L' = cov`
    fn factor(&self, dim: usize) -> anyhow::Result<DMatrix<f64>> {
        match self {
            Covariance::Full(cov) => {
                if cov.shape() != (dim, dim) {
                    anyhow::bail!("covariance is {:?}, expected {} x {}", cov.shape(), dim, dim);
                }
                cov.clone()
                    .cholesky()
                    .map(|c| c.l())
                    .ok_or_else(|| anyhow::anyhow!("covariance is not positive definite"))
            }
            Covariance::Diagonal(d) => {
                if d.len() != dim || d.iter().any(|&x| !(x >= 0.0)) {
                    anyhow::bail!("diagonal covariance needs {} non-negative entries", dim);
                }
                Ok(DMatrix::from_diagonal(&d.map(f64::sqrt)))
            }
            Covariance::Scalar(c) => {
                if !(*c >= 0.0) {
                    anyhow::bail!("scalar covariance must be non-negative: {}", c);
                }
                Ok(DMatrix::identity(dim, dim) * c.sqrt())
            }
        }
    }
}

/// `size` draws (rows) from a mixture of multivariate normals
///
/// * `means` - component means, all of the same dimension
/// * `covs` - one covariance per component
/// * `p` - component weights summing to 1 (uniform if `None`)
pub fn multivariate_normal_mixture(
    means: &[Vec64],
    covs: &[Covariance],
    p: Option<&[f64]>,
    size: usize,
    rng: &mut StdRng,
) -> anyhow::Result<DMatrix<f64>> {
    let k = means.len();
    if k == 0 {
        anyhow::bail!("no mixture components");
    }
    if covs.len() != k {
        anyhow::bail!("{} means but {} covariances", k, covs.len());
    }
    if size == 0 {
        anyhow::bail!("sample size must be positive");
    }

    let weights = match p {
        Some(p) => {
            if p.len() != k {
                anyhow::bail!("{} means but {} weights", k, p.len());
            }
            let total: f64 = p.iter().sum();
            if (total - 1.0).abs() > 1e-8 {
                anyhow::bail!("mixture weights sum to {}, not 1", total);
            }
            p.to_vec()
        }
        None => vec![1.0 / k as f64; k],
    };

    let dim = means[0].len();
    if means.iter().any(|m| m.len() != dim) {
        anyhow::bail!("mixture means differ in dimension");
    }
    let factors = covs
        .iter()
        .map(|c| c.factor(dim))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let pick = WeightedIndex::new(&weights)?;
    let mut ret = DMatrix::<f64>::zeros(size, dim);
    for i in 0..size {
        let c = pick.sample(rng);
        let z = Vec64::from_fn(dim, |_, _| rng.sample(StandardNormal));
        let x = &means[c] + &factors[c] * z;
        ret.row_mut(i).copy_from(&x.transpose());
    }
    Ok(ret)
}

/// Draws from a mixture whose components change over time
///
/// Returns the stacked samples and the time index of each row.
///
/// * `means` - `means[t][k]`
/// * `covs` - `covs[t][k]`
/// * `p` - weights per time point (uniform if `None`)
/// * `sizes` - number of draws per time point
pub fn evolving_mixture(
    means: &[Vec<Vec64>],
    covs: &[Vec<Covariance>],
    p: Option<&[Vec<f64>]>,
    sizes: &[usize],
    rng: &mut StdRng,
) -> anyhow::Result<(DMatrix<f64>, Vec<usize>)> {
    let nt = means.len();
    if covs.len() != nt || sizes.len() != nt || p.is_some_and(|p| p.len() != nt) {
        anyhow::bail!("means, covariances, weights and sizes need {} time points", nt);
    }
    let Some(dim) = means.first().and_then(|m| m.first()).map(|x| x.len()) else {
        anyhow::bail!("no mixture components");
    };

    let total: usize = sizes.iter().sum();
    let mut ret = DMatrix::<f64>::zeros(total, dim);
    let mut time_index = Vec::with_capacity(total);
    let mut offset = 0;

    for t in 0..nt {
        let p_t = p.map(|p| p[t].as_slice());
        let x_t = multivariate_normal_mixture(&means[t], &covs[t], p_t, sizes[t], rng)?;
        if x_t.ncols() != dim {
            anyhow::bail!("dimension changes at time point {}", t);
        }
        ret.rows_mut(offset, sizes[t]).copy_from(&x_t);
        time_index.extend(std::iter::repeat(t).take(sizes[t]));
        offset += sizes[t];
    }
    Ok((ret, time_index))
}

/// Settings of a synthetic time course
#[derive(Debug, Clone)]
pub struct SimParams {
    pub dim: usize,
    pub clusters: usize,
    pub key_timepoints: usize,
    pub timepoints: usize,
    pub cells: usize,
    pub method: InterpMethod,
    pub smooth: usize,
    pub cov: f64,
}

/// Random key means per cluster, interpolated over `timepoints` days,
/// sampled with isotropic noise
///
/// Returns cells x dimensions (shifted to be non-negative) and the
/// day of each cell.
pub fn simulate_time_course(
    params: &SimParams,
    rng: &mut StdRng,
) -> anyhow::Result<(ExpressionData, Vec<(Box<str>, f64)>)> {
    let SimParams {
        dim,
        clusters,
        key_timepoints,
        timepoints,
        cells,
        ..
    } = *params;

    if dim == 0 || clusters == 0 || key_timepoints == 0 || timepoints == 0 || cells == 0 {
        anyhow::bail!("dimensions, clusters, time points and cells must be positive");
    }

    // 1. key points of each cluster
    let span = (timepoints - 1) as f64;
    let tp: Vec<f64> = if key_timepoints == 1 {
        vec![0.0]
    } else {
        (0..key_timepoints)
            .map(|k| span * k as f64 / (key_timepoints - 1) as f64)
            .collect()
    };
    let runif = Uniform::new(0.0, 10.0)?;

    // 2. interpolate over days
    let days: Vec<f64> = (0..timepoints).map(|t| t as f64).collect();
    let mut means = vec![Vec::with_capacity(clusters); timepoints];
    for _ in 0..clusters {
        let fp: Vec<Vec64> = (0..key_timepoints)
            .map(|_| Vec64::from_fn(dim, |_, _| runif.sample(rng)))
            .collect();
        let path = interp(&days, &tp, &fp, params.method, params.smooth)?;
        for (t, x) in path.into_iter().enumerate() {
            means[t].push(x);
        }
    }

    // 3. sample
    let covs = vec![vec![Covariance::Scalar(params.cov); clusters]; timepoints];
    let sizes = vec![cells; timepoints];
    let (mut xx, time_index) = evolving_mixture(&means, &covs, None, &sizes, rng)?;

    let min = xx.min();
    if min < 0.0 {
        xx.add_scalar_mut(-min);
    }
    info!(
        "simulated {} cells x {} dimensions over {} days",
        xx.nrows(),
        dim,
        timepoints
    );

    let mut within = vec![0_usize; timepoints];
    let cell_ids: Vec<Box<str>> = time_index
        .iter()
        .map(|&t| {
            within[t] += 1;
            format!("cell_{}_{}", t, within[t] - 1).into_boxed_str()
        })
        .collect();
    let genes: Vec<Box<str>> = (0..dim)
        .map(|j| format!("gene_{}", j).into_boxed_str())
        .collect();

    let data = MatWithNames::new(cell_ids.clone(), genes, xx.map(|x| x as f32))?;
    let cell_days = cell_ids
        .into_iter()
        .zip(time_index.iter().map(|&t| days[t]))
        .collect();
    Ok((data, cell_days))
}
