use crate::common::*;
use wot_alg::growth::*;
use wot_alg::sinkhorn::*;
use wot_alg::transport_map::*;
use wot_data::cell_days::*;
use wot_data::day_pairs::DayPairs;
use wot_data::validation::validate_inputs;

#[derive(Args, Debug)]
pub struct OtArgs {
    /// Expression matrix, cells x genes (`.mtx` files are genes x cells)
    #[arg(long, short, required = true)]
    matrix: Box<str>,

    /// Two columns: cell id and the day it was sampled
    #[arg(long, short, required = true, alias = "cell_days")]
    cell_days: Box<str>,

    /// Two columns: `t0` and `t1` of every transport map. Consecutive
    /// days if not given.
    #[arg(long, short, alias = "day_pairs")]
    day_pairs: Option<Box<str>>,

    /// Gene-set scores (`gene-set` output) with `Cell.cycle` and
    /// `Apoptosis` columns for the growth-rate prior
    #[arg(long, short, alias = "gene_set_scores", conflicts_with = "cell_growth_rates")]
    gene_set_scores: Option<Box<str>>,

    /// Two columns: cell id and growth rate per day
    #[arg(long, alias = "cell_growth_rates")]
    cell_growth_rates: Option<Box<str>>,

    /// Number of principal components of each day pair (0: use genes)
    #[arg(long, short = 'p', default_value_t = 30, alias = "local_pca")]
    local_pca: usize,

    /// Entropic regularization
    #[arg(long, default_value_t = 0.05)]
    epsilon: f64,

    /// Penalty on the source marginal
    #[arg(long, default_value_t = 1.0)]
    lambda1: f64,

    /// Penalty on the target marginal
    #[arg(long, default_value_t = 50.0)]
    lambda2: f64,

    /// Starting regularization of the annealing
    #[arg(long, default_value_t = 1.0)]
    epsilon0: f64,

    /// Scaling threshold for absorbing into the dual potentials
    #[arg(long, default_value_t = 1e4)]
    tau: f64,

    /// Iteration budget of the annealing
    #[arg(long, default_value_t = 3000, alias = "scaling_iter")]
    scaling_iter: usize,

    /// Iterations per annealing step
    #[arg(long, default_value_t = 50, alias = "inner_iter_max")]
    inner_iter_max: usize,

    /// Iterations at the final regularization
    #[arg(long, default_value_t = 1000, alias = "extra_iter")]
    extra_iter: usize,

    /// Convergence tolerance
    #[arg(long, default_value_t = 1e-8)]
    tolerance: f64,

    /// Number of solves per pair, re-estimating growth in between
    #[arg(long, default_value_t = 1, alias = "growth_iters")]
    growth_iters: usize,

    /// Maximum birth rate
    #[arg(long, default_value_t = 1.7, alias = "beta_max")]
    beta_max: f64,

    /// Minimum birth rate
    #[arg(long, default_value_t = 0.3, alias = "beta_min")]
    beta_min: f64,

    /// Proliferation score at the half-way birth rate
    #[arg(long, default_value_t = 0.25, alias = "beta_center")]
    beta_center: f64,

    /// Maximum death rate
    #[arg(long, default_value_t = 1.7, alias = "delta_max")]
    delta_max: f64,

    /// Minimum death rate
    #[arg(long, default_value_t = 0.3, alias = "delta_min")]
    delta_min: f64,

    /// Apoptosis score at the half-way death rate
    #[arg(long, default_value_t = 0.1, alias = "delta_center")]
    delta_center: f64,

    /// Output format of the transport maps
    #[arg(long, value_enum, default_value = "loom")]
    format: OutputFormat,

    /// Output header; maps go to `{out}_{t0}_{t1}.{loom|txt}`
    #[arg(long, short, default_value = "tmaps")]
    out: Box<str>,
}

impl OtArgs {
    fn sinkhorn_params(&self) -> SinkhornParams {
        SinkhornParams {
            epsilon: self.epsilon,
            lambda1: self.lambda1,
            lambda2: self.lambda2,
            epsilon0: self.epsilon0,
            tau: self.tau,
            scaling_iter: self.scaling_iter,
            inner_iter_max: self.inner_iter_max,
            extra_iter: self.extra_iter,
            tolerance: self.tolerance,
            growth_iters: self.growth_iters,
        }
    }

    fn growth_params(&self) -> GrowthParams {
        GrowthParams {
            beta_max: self.beta_max,
            beta_min: self.beta_min,
            beta_center: self.beta_center,
            delta_max: self.delta_max,
            delta_min: self.delta_min,
            delta_center: self.delta_center,
            ..Default::default()
        }
    }
}

pub fn run_ot(args: &OtArgs) -> anyhow::Result<()> {
    let params = args.sinkhorn_params();
    params.check()?;

    // 1. inputs
    let data = read_dataset(&args.matrix)?;
    data.validate_expression()?;

    let days = CellDays::from_file(&args.cell_days)?;

    let pairs = match &args.day_pairs {
        Some(file) => DayPairs::from_file(file)?,
        None => {
            let pairs = DayPairs::consecutive(&days);
            info!("Using {} consecutive day pairs", pairs.len());
            pairs
        }
    };
    if pairs.is_empty() {
        anyhow::bail!("no day pairs to compute");
    }

    let scores = match &args.gene_set_scores {
        Some(file) => Some(read_dataset(file)?),
        None => None,
    };

    // 2. consistency
    let report = validate_inputs(&data, &days, &pairs, scores.as_ref());
    report.log_summary();
    report.check_fatal()?;

    let data = cells_with_day(&data, &days);

    // 3. growth-rate prior of every cell
    let growth = match (&scores, &args.cell_growth_rates) {
        (Some(scores), _) => growth_from_scores(scores, &data.rows, &args.growth_params())?,
        (None, Some(file)) => growth_from_pairs(&read_cell_values(file)?, &data.rows)?,
        (None, None) => {
            info!("No growth information; uniform growth");
            unit_growth(data.nrows())
        }
    };

    // 4. transport maps
    let pb = ProgressBar::new(pairs.len() as u64);
    if log::log_enabled!(log::Level::Info) {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    for &pair in pairs.pairs.iter() {
        let tmap = compute_pair_map(&data, &days, &growth, pair, args.local_pca, &params)?;
        let file = tmap.write(&args.out, args.format)?;
        info!("[{}, {}] -> {}", pair.0, pair.1, file);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(())
}
