use crate::common::*;
use fnv::FnvHashSet as HashSet;
use rand::SeedableRng;
use std::io::Write;
use wot_alg::trajectory::*;
use wot_data::gene_sets::{read_set_filter, GeneSets};

#[derive(Args, Debug)]
pub struct TrajectoryArgs {
    /// Directory of transport maps named `{prefix}_{t0}_{t1}.{loom|txt}`
    #[arg(long, short, required = true)]
    dir: Box<str>,

    /// The day the cell sets are defined at
    #[arg(long, short, required = true)]
    time: f64,

    /// Cell sets in `.gmt` or `.gmx` format
    #[arg(long, short, required = true, alias = "cell_sets")]
    cell_sets: Box<str>,

    /// Only follow these cell sets: comma-separated names, or a file
    /// with one name per line
    #[arg(long, alias = "cell_set_filter")]
    cell_set_filter: Option<Box<str>>,

    /// Expression matrix for `--gene`
    #[arg(long, short, requires = "gene")]
    matrix: Option<Box<str>>,

    /// Genes to summarize along the trajectories (repeatable)
    #[arg(long, requires = "matrix")]
    gene: Vec<Box<str>>,

    /// Gene-set scores to summarize along the trajectories
    #[arg(long, short, alias = "gene_set_scores")]
    gene_set_scores: Option<Box<str>>,

    /// Random seed for sampling cells
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output header; `{out}_trajectory.txt` and `{out}_trajectory.json`
    #[arg(long, short, default_value = "traj")]
    out: Box<str>,
}

/// Put the columns of several cell tables side by side; cells missing
/// from a table get NaN
fn join_features(tables: Vec<ExpressionData>) -> anyhow::Result<ExpressionData> {
    let mut rows: Vec<Box<str>> = vec![];
    let mut seen: HashSet<Box<str>> = HashSet::default();
    for t in tables.iter() {
        for r in t.rows.iter() {
            if seen.insert(r.clone()) {
                rows.push(r.clone());
            }
        }
    }
    let index = name_to_index(&rows);

    let cols: Vec<Box<str>> = tables.iter().flat_map(|t| t.cols.iter().cloned()).collect();
    let mut mat = Mat::from_element(rows.len(), cols.len(), f32::NAN);

    let mut offset = 0;
    for t in tables.iter() {
        for (i, r) in t.rows.iter().enumerate() {
            let ii = index[r];
            for j in 0..t.ncols() {
                mat[(ii, offset + j)] = t.mat[(i, j)];
            }
        }
        offset += t.ncols();
    }
    MatWithNames::new(rows, cols, mat)
}

pub fn run_trajectory(args: &TrajectoryArgs) -> anyhow::Result<()> {
    // 1. maps and cell sets
    let maps = list_transport_maps(&args.dir)?;

    let mut cell_sets = GeneSets::from_file(&args.cell_sets)?;
    if let Some(filter) = &args.cell_set_filter {
        let names = read_set_filter(filter)?;
        cell_sets.retain_names(&names);
    }
    if cell_sets.is_empty() {
        anyhow::bail!("no cell sets to follow");
    }

    // 2. what to summarize
    let mut tables = vec![];
    if let Some(matrix) = &args.matrix {
        tables.push(read_dataset_genes(matrix, &args.gene)?);
    }
    if let Some(file) = &args.gene_set_scores {
        tables.push(read_dataset(file)?);
    }
    let features = join_features(tables)?;

    // 3. propagate
    let steps = compute_trajectories(&maps, args.time, &cell_sets)?;
    info!("{} trajectory steps", steps.len());

    // 4. summarize
    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);
    let mut lines: Vec<Box<str>> = vec![];
    let header = ["set", "time", "direction", "entropy", "n_sampled"]
        .iter()
        .map(|x| x.to_string())
        .chain(features.cols.iter().map(|x| x.to_string()))
        .collect::<Vec<_>>()
        .join("\t");
    lines.push(header.into_boxed_str());

    let mut traces = vec![];
    for step in steps.iter() {
        let (summary, step_traces) = summarize_step(step, &features, &mut rng)?;
        let line = [
            summary.set.to_string(),
            summary.time.to_string(),
            summary.direction.to_string(),
            summary.entropy.to_string(),
            summary.n_sampled.to_string(),
        ]
        .into_iter()
        .chain(summary.means.iter().map(|x| x.to_string()))
        .collect::<Vec<_>>()
        .join("\t");
        lines.push(line.into_boxed_str());
        traces.extend(step_traces);
    }

    let txt_file = format!("{}_trajectory.txt", args.out);
    io::mkdir(&txt_file)?;
    io::write_lines(&lines, &txt_file)?;
    info!("Wrote {}", txt_file);

    let json_file = format!("{}_trajectory.json", args.out);
    let mut buf = io::open_buf_writer(&json_file)?;
    serde_json::to_writer(&mut buf, &traces)?;
    buf.flush()?;
    info!("Wrote {} traces to {}", traces.len(), json_file);

    Ok(())
}
