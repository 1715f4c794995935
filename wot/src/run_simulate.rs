use crate::common::*;
use rand::SeedableRng;
use wot_alg::simulate::*;
use wot_data::cell_days::CellDays;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of dimensions (genes)
    #[arg(long, default_value_t = 2)]
    dim: usize,

    /// Number of mixture components
    #[arg(long, default_value_t = 3)]
    clusters: usize,

    /// Number of random key points per component
    #[arg(long, default_value_t = 3, alias = "key_timepoints")]
    key_timepoints: usize,

    /// Number of days
    #[arg(long, default_value_t = 10)]
    timepoints: usize,

    /// Cells per day
    #[arg(long, default_value_t = 100)]
    cells: usize,

    /// Interpolation between key points
    #[arg(long, value_enum, default_value = "linear")]
    method: InterpMethod,

    /// Running-mean window over days (0: none)
    #[arg(long, default_value_t = 0)]
    smooth: usize,

    /// Isotropic covariance of every component
    #[arg(long, default_value_t = 0.1)]
    cov: f64,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output header; `{out}_matrix.txt` and `{out}_cell_days.txt`
    #[arg(long, short, required = true)]
    out: Box<str>,
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let params = SimParams {
        dim: args.dim,
        clusters: args.clusters,
        key_timepoints: args.key_timepoints,
        timepoints: args.timepoints,
        cells: args.cells,
        method: args.method,
        smooth: args.smooth,
        cov: args.cov,
    };

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);
    let (data, cell_days) = simulate_time_course(&params, &mut rng)?;

    write_table(&data, &args.out, "matrix.txt")?;

    CellDays::from_pairs(cell_days)?.to_file(&format!("{}_cell_days.txt", args.out))?;
    Ok(())
}
