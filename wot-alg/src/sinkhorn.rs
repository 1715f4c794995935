use crate::cost::CostMat;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

pub type PlanMat = DMatrix<f64>;
type Vec64 = DVector<f64>;

/// Unbalanced entropic transport settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkhornParams {
    /// target entropic regularization
    pub epsilon: f64,
    /// KL penalty on the source marginal
    pub lambda1: f64,
    /// KL penalty on the target marginal
    pub lambda2: f64,
    /// starting regularization of the annealing
    pub epsilon0: f64,
    /// absorb scalings into the dual potentials above this value
    pub tau: f64,
    /// iteration budget of the annealing stage
    pub scaling_iter: usize,
    /// iterations per regularization step
    pub inner_iter_max: usize,
    /// iterations at the target regularization
    pub extra_iter: usize,
    /// relative change of the scalings to stop at
    pub tolerance: f64,
    /// number of transport solves, re-estimating growth in between
    pub growth_iters: usize,
}

impl Default for SinkhornParams {
    fn default() -> Self {
        Self {
            epsilon: 0.05,
            lambda1: 1.0,
            lambda2: 50.0,
            epsilon0: 1.0,
            tau: 1e4,
            scaling_iter: 3000,
            inner_iter_max: 50,
            extra_iter: 1000,
            tolerance: 1e-8,
            growth_iters: 1,
        }
    }
}

impl SinkhornParams {
    pub fn check(&self) -> anyhow::Result<()> {
        if !(self.epsilon > 0.0 && self.epsilon0 > 0.0) {
            anyhow::bail!("epsilon and epsilon0 must be positive");
        }
        if !(self.lambda1 > 0.0 && self.lambda2 > 0.0) {
            anyhow::bail!("lambda1 and lambda2 must be positive");
        }
        if !(self.tau > 1.0) {
            anyhow::bail!("tau must be greater than 1");
        }
        if self.inner_iter_max == 0 {
            anyhow::bail!("inner_iter_max must be positive");
        }
        if self.growth_iters == 0 {
            anyhow::bail!("growth_iters must be positive");
        }
        Ok(())
    }
}

/// Regularization path `(epsilon0 - epsilon) exp(-k) + epsilon`,
/// ending exactly at `epsilon` once within `1e-3 epsilon` of it
pub fn epsilon_schedule(epsilon0: f64, epsilon: f64) -> Vec<f64> {
    if epsilon0 <= epsilon {
        return vec![epsilon];
    }
    let mut ret = vec![];
    for k in 0.. {
        let eps_k = (epsilon0 - epsilon) * (-(k as f64)).exp() + epsilon;
        if eps_k - epsilon < 1e-3 * epsilon {
            ret.push(epsilon);
            break;
        }
        ret.push(eps_k);
    }
    ret
}

/// `K[i,j] = exp((u[i] + v[j] - C[i,j]) / eps)`, one column per task
fn stabilized_kernel(cost: &CostMat, u: &Vec64, v: &Vec64, eps: f64) -> PlanMat {
    let (n, m) = cost.shape();
    let columns: Vec<Vec<f64>> = (0..m)
        .into_par_iter()
        .map(|j| {
            let c_j = cost.column(j);
            (0..n)
                .map(|i| ((u[i] + v[j] - c_j[i]) / eps).exp())
                .collect()
        })
        .collect();
    PlanMat::from_iterator(n, m, columns.into_iter().flatten())
}

/// `K' x` over contiguous columns
fn par_tr_mul(kk: &PlanMat, x: &Vec64) -> Vec64 {
    let ret: Vec<f64> = (0..kk.ncols())
        .into_par_iter()
        .map(|j| kk.column(j).dot(x))
        .collect();
    Vec64::from_vec(ret)
}

fn max_relative_change(old: &Vec64, new: &Vec64) -> f64 {
    old.iter()
        .zip(new.iter())
        .map(|(&o, &x)| (x - o).abs() / o.abs().max(f64::MIN_POSITIVE))
        .fold(0.0, f64::max)
}

/// Scaling vectors, dual potentials and the current kernel
struct ScalingState<'a> {
    cost: &'a CostMat,
    p: Vec64,
    q: Vec64,
    dx: f64,
    dy: f64,
    eps: f64,
    u: Vec64,
    v: Vec64,
    a: Vec64,
    b: Vec64,
    kk: PlanMat,
}

impl<'a> ScalingState<'a> {
    fn new(cost: &'a CostMat, p: &[f64], eps: f64) -> Self {
        let (n, m) = cost.shape();
        let p = Vec64::from_column_slice(p);
        let q = Vec64::from_element(m, p.mean());
        let u = Vec64::zeros(n);
        let v = Vec64::zeros(m);
        let kk = stabilized_kernel(cost, &u, &v, eps);
        Self {
            cost,
            p,
            q,
            dx: 1.0 / n as f64,
            dy: 1.0 / m as f64,
            eps,
            u,
            v,
            a: Vec64::from_element(n, 1.0),
            b: Vec64::from_element(m, 1.0),
            kk,
        }
    }

    /// One pass of the damped Sinkhorn updates
    fn step(&mut self, params: &SinkhornParams) -> anyhow::Result<()> {
        let eps = self.eps;
        let alpha1 = params.lambda1 / (params.lambda1 + eps);
        let alpha2 = params.lambda2 / (params.lambda2 + eps);

        let kb = &self.kk * (&self.b * self.dy);
        self.a = Vec64::from_fn(self.a.len(), |i, _| {
            (self.p[i] / kb[i]).powf(alpha1) * (-self.u[i] / (params.lambda1 + eps)).exp()
        });

        let ka = par_tr_mul(&self.kk, &(&self.a * self.dx));
        self.b = Vec64::from_fn(self.b.len(), |j, _| {
            (self.q[j] / ka[j]).powf(alpha2) * (-self.v[j] / (params.lambda2 + eps)).exp()
        });

        if self.a.iter().chain(self.b.iter()).any(|x| !x.is_finite()) {
            anyhow::bail!(
                "non-finite scaling at epsilon {}; the kernel underflowed",
                eps
            );
        }
        Ok(())
    }

    /// Move the scalings into the potentials and rebuild the kernel at
    /// `eps`
    fn absorb(&mut self, eps: f64) {
        let old = self.eps;
        self.u.iter_mut().zip(self.a.iter()).for_each(|(u, &a)| *u += old * a.ln());
        self.v.iter_mut().zip(self.b.iter()).for_each(|(v, &b)| *v += old * b.ln());
        self.a.fill(1.0);
        self.b.fill(1.0);
        self.eps = eps;
        self.kk = stabilized_kernel(self.cost, &self.u, &self.v, eps);
    }

    fn absorb_if_large(&mut self, tau: f64) -> bool {
        let large = self.a.max() > tau || self.b.max() > tau;
        if large {
            self.absorb(self.eps);
        }
        large
    }

    fn plan(&self) -> PlanMat {
        let mut ret = self.kk.clone();
        for (j, mut k_j) in ret.column_iter_mut().enumerate() {
            let b_j = self.b[j];
            k_j.iter_mut()
                .zip(self.a.iter())
                .for_each(|(k, &a_i)| *k *= a_i * b_j);
        }
        ret
    }
}

/// Entropic unbalanced transport between `n` source and `m` target
/// cells
///
/// The source marginal is `p` (growth over the interval), the target
/// marginal the constant `mean(p)`; both are enforced softly by KL
/// penalties. Returns the `n x m` coupling.
///
/// * `cost` - `n x m` cost matrix
/// * `p` - source mass per cell
/// * `params` - solver settings
pub fn solve_unbalanced(
    cost: &CostMat,
    p: &[f64],
    params: &SinkhornParams,
) -> anyhow::Result<PlanMat> {
    params.check()?;
    let (n, m) = cost.shape();
    if n == 0 || m == 0 {
        anyhow::bail!("empty cost matrix [{} x {}]", n, m);
    }
    if p.len() != n {
        anyhow::bail!("{} source masses for {} source cells", p.len(), n);
    }
    if p.iter().any(|x| !x.is_finite() || *x <= 0.0) {
        anyhow::bail!("source masses must be positive and finite");
    }
    if cost.iter().any(|x| !x.is_finite()) {
        anyhow::bail!("non-finite cost");
    }

    let schedule = epsilon_schedule(params.epsilon0, params.epsilon);
    let mut state = ScalingState::new(cost, p, schedule[0]);

    // 1. anneal epsilon
    let mut stage = 0;
    let mut since_adjusted = 0;
    let mut iter = 0;
    while stage + 1 < schedule.len() && iter < params.scaling_iter {
        state.step(params)?;
        state.absorb_if_large(params.tau);
        iter += 1;
        since_adjusted += 1;

        if since_adjusted >= params.inner_iter_max {
            stage += 1;
            since_adjusted = 0;
            state.absorb(schedule[stage]);
            debug!("iteration {}: epsilon {:.4}", iter, state.eps);
        }
    }

    if state.eps != params.epsilon {
        state.absorb(params.epsilon);
    }

    // 2. iterate at the target epsilon until the scalings settle
    let mut converged = false;
    let mut extra = 0;
    while extra < params.extra_iter {
        let (a_old, b_old) = (state.a.clone(), state.b.clone());
        state.step(params)?;
        extra += 1;

        if state.absorb_if_large(params.tau) {
            continue;
        }

        let change = max_relative_change(&a_old, &state.a)
            .max(max_relative_change(&b_old, &state.b));
        if change < params.tolerance {
            converged = true;
            break;
        }
    }

    info!(
        "sinkhorn [{} x {}]: {} annealing + {} iterations, converged: {}",
        n, m, iter, extra, converged
    );

    let plan = state.plan();
    if plan.iter().any(|x| !x.is_finite() || *x < 0.0) {
        anyhow::bail!("transport plan has non-finite entries");
    }
    Ok(plan)
}

/// Transport plan with the growth estimates of every solve
#[derive(Debug, Clone)]
pub struct TransportResult {
    pub plan: PlanMat,
    /// `growth[0]` is the prior; `growth[k]` the row mass of the k-th
    /// solve
    pub growth: Vec<Vec<f64>>,
}

/// Learned growth: row sums of the plan under the target measure
pub fn learned_growth(plan: &PlanMat) -> Vec<f64> {
    let dy = 1.0 / plan.ncols().max(1) as f64;
    plan.row_iter().map(|r| r.sum() * dy).collect()
}

/// Solve for one day pair
///
/// The first solve uses `g^dt` as the source mass; each further solve
/// (`growth_iters > 1`) uses the learned growth of the previous plan.
///
/// * `cost` - `n x m` cost
/// * `growth` - per-day growth rate of each source cell
/// * `dt` - `t1 - t0`
pub fn compute_transport_map(
    cost: &CostMat,
    growth: &[f64],
    dt: f64,
    params: &SinkhornParams,
) -> anyhow::Result<TransportResult> {
    params.check()?;
    if !(dt > 0.0) {
        anyhow::bail!("time difference must be positive: {}", dt);
    }

    let mut p: Vec<f64> = growth.iter().map(|g| g.powf(dt)).collect();
    let mut history = vec![growth.to_vec()];
    let mut plan = PlanMat::zeros(0, 0);

    for k in 0..params.growth_iters {
        plan = solve_unbalanced(cost, &p, params)?;
        p = learned_growth(&plan);
        debug!(
            "growth iteration {}: mean mass {:.4}",
            k + 1,
            p.iter().sum::<f64>() / p.len().max(1) as f64
        );
        history.push(p.clone());
    }

    Ok(TransportResult {
        plan,
        growth: history,
    })
}
