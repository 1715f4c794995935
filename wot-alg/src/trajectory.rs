use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};
use log::{info, warn};
use matrix_util::common_io::{basename, file_ext};
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::rngs::StdRng;
use serde::Serialize;
use wot_data::dataset_io::read_dataset;
use wot_data::gene_sets::GeneSets;
use wot_data::mat_with_names::*;

/// A transport map file and the two days it connects
#[derive(Debug, Clone, PartialEq)]
pub struct MapFile {
    pub path: Box<str>,
    pub t0: f64,
    pub t1: f64,
}

/// `{prefix}_{t0}_{t1}.{loom|txt}` (optionally `.gz`) -> `(t0, t1)`
pub fn parse_map_name(file: &str) -> Option<(f64, f64)> {
    let ext = file_ext(file).ok()?;
    if !matches!(ext.as_ref(), "loom" | "txt") {
        return None;
    }
    let stem = basename(file).ok()?;
    let mut words = stem.rsplitn(3, '_');
    let t1 = words.next()?.parse::<f64>().ok()?;
    let t0 = words.next()?.parse::<f64>().ok()?;
    words.next()?;
    (t0 < t1).then_some((t0, t1))
}

/// Transport maps in `dir`, sorted by `t0`
pub fn list_transport_maps(dir: &str) -> anyhow::Result<Vec<MapFile>> {
    let mut ret = vec![];
    for entry in std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("failed to read directory {}: {}", dir, e))?
    {
        let path = entry?.path();
        let Some(name) = path.to_str() else {
            continue;
        };
        if let Some((t0, t1)) = parse_map_name(name) {
            ret.push(MapFile {
                path: name.into(),
                t0,
                t1,
            });
        }
    }
    if ret.is_empty() {
        anyhow::bail!("no transport maps found in {}", dir);
    }
    ret.sort_by(|a, b| a.t0.total_cmp(&b.t0).then(a.t1.total_cmp(&b.t1)));
    info!("Found {} transport maps in {}", ret.len(), dir);
    Ok(ret)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Backward,
    Forward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Backward => write!(f, "backward"),
            Direction::Forward => write!(f, "forward"),
        }
    }
}

fn normalize(mut probs: Vec<f64>) -> anyhow::Result<Vec<f64>> {
    let total: f64 = probs.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        anyhow::bail!("cannot normalize a vector with total mass {}", total);
    }
    probs.iter_mut().for_each(|x| *x /= total);
    Ok(probs)
}

/// Probability distribution over named cells
#[derive(Debug, Clone, PartialEq)]
pub struct CellDistribution {
    pub cells: Vec<Box<str>>,
    pub probs: Vec<f64>,
}

impl CellDistribution {
    pub fn new(cells: Vec<Box<str>>, probs: Vec<f64>) -> anyhow::Result<Self> {
        if cells.len() != probs.len() {
            anyhow::bail!("{} cells but {} probabilities", cells.len(), probs.len());
        }
        if probs.iter().any(|x| !x.is_finite() || *x < 0.0) {
            anyhow::bail!("probabilities must be non-negative and finite");
        }
        Ok(Self {
            cells,
            probs: normalize(probs)?,
        })
    }

    /// Uniform over the `cells` that are `members`; `None` if no cell is
    pub fn from_members(cells: &[Box<str>], members: &HashSet<&str>) -> Option<Self> {
        let probs: Vec<f64> = cells
            .iter()
            .map(|x| if members.contains(x.as_ref()) { 1.0 } else { 0.0 })
            .collect();
        Self::new(cells.to_vec(), probs).ok()
    }

    /// `exp(H(p))`, the effective number of cells
    pub fn entropy(&self) -> f64 {
        let h: f64 = self
            .probs
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum();
        h.exp()
    }

    /// Carry the mass over to `cells`, matching by id; mass on cells
    /// not in `cells` is dropped
    pub fn reindex(&self, cells: &[Box<str>]) -> anyhow::Result<Self> {
        let mass: HashMap<&str, f64> = self
            .cells
            .iter()
            .zip(self.probs.iter())
            .map(|(c, &p)| (c.as_ref(), p))
            .collect();
        let probs = cells
            .iter()
            .map(|c| mass.get(c.as_ref()).copied().unwrap_or(0.0))
            .collect();
        Self::new(cells.to_vec(), probs)
            .map_err(|_| anyhow::anyhow!("no overlap between consecutive transport maps"))
    }

    /// Draw `n` cell positions with replacement
    pub fn sample(&self, n: usize, rng: &mut StdRng) -> anyhow::Result<Vec<usize>> {
        let disc = WeightedIndex::new(&self.probs)?;
        Ok((0..n).map(|_| disc.sample(rng)).collect())
    }
}

/// Distribution over the source cells (rows) of a map, given one over
/// its target cells (columns): `T v`
pub fn push_backward(map: &ExpressionData, dist: &CellDistribution) -> anyhow::Result<CellDistribution> {
    let v = dist.reindex(&map.cols)?;
    let probs = (0..map.nrows())
        .map(|i| {
            map.mat
                .row(i)
                .iter()
                .zip(v.probs.iter())
                .map(|(&t, &p)| t as f64 * p)
                .sum()
        })
        .collect();
    CellDistribution::new(map.rows.clone(), probs)
}

/// Distribution over the target cells (columns) of a map, given one
/// over its source cells (rows): `v' T`
pub fn push_forward(map: &ExpressionData, dist: &CellDistribution) -> anyhow::Result<CellDistribution> {
    let v = dist.reindex(&map.rows)?;
    let probs = map
        .mat
        .column_iter()
        .map(|t_j| {
            t_j.iter()
                .zip(v.probs.iter())
                .map(|(&t, &p)| t as f64 * p)
                .sum()
        })
        .collect();
    CellDistribution::new(map.cols.clone(), probs)
}

/// Where a cell set sits at one time point
#[derive(Debug, Clone)]
pub struct TrajectoryStep {
    pub set: Box<str>,
    pub time: f64,
    pub direction: Direction,
    pub dist: CellDistribution,
}

/// Initial distributions of each set over `cells`; sets without a cell
/// there are dropped
fn initial_distributions(
    cells: &[Box<str>],
    cell_sets: &GeneSets,
    time: f64,
) -> anyhow::Result<Vec<(Box<str>, CellDistribution)>> {
    let mut ret = vec![];
    for set in cell_sets.sets.iter() {
        let members: HashSet<&str> = set.members.iter().map(|x| x.as_ref()).collect();
        match CellDistribution::from_members(cells, &members) {
            Some(dist) => ret.push((set.name.clone(), dist)),
            None => warn!("cell set {} has no cell at time {}", set.name, time),
        }
    }
    if ret.is_empty() {
        anyhow::bail!("no cell set has cells at time {}", time);
    }
    Ok(ret)
}

/// Next map in the chain: the one ending at `time` going backward, the
/// one starting at `time` going forward
fn next_map(maps: &[MapFile], time: f64, direction: Direction) -> Option<&MapFile> {
    match direction {
        Direction::Backward => maps.iter().rev().find(|m| m.t1 == time),
        Direction::Forward => maps.iter().find(|m| m.t0 == time),
    }
}

/// Follow one direction through consecutive maps
fn follow_chain(
    maps: &[MapFile],
    time: f64,
    direction: Direction,
    cell_sets: &GeneSets,
    load: &mut dyn FnMut(&MapFile) -> anyhow::Result<ExpressionData>,
) -> anyhow::Result<Vec<TrajectoryStep>> {
    let mut steps = vec![];
    let mut current: Vec<(Box<str>, CellDistribution)> = vec![];
    let mut from = time;

    // t0 < t1 for every map, so the chain terminates
    while let Some(map_file) = next_map(maps, from, direction) {
        let to = match direction {
            Direction::Backward => map_file.t0,
            Direction::Forward => map_file.t1,
        };

        let map = load(map_file)?;

        if current.is_empty() {
            let cells = match direction {
                Direction::Backward => &map.cols,
                Direction::Forward => &map.rows,
            };
            current = initial_distributions(cells, cell_sets, time)?;
            for (set, dist) in current.iter() {
                steps.push(TrajectoryStep {
                    set: set.clone(),
                    time,
                    direction,
                    dist: dist.clone(),
                });
            }
        }

        let mut next = Vec::with_capacity(current.len());
        for (set, dist) in current.iter() {
            let pushed = match direction {
                Direction::Backward => push_backward(&map, dist),
                Direction::Forward => push_forward(&map, dist),
            };
            match pushed {
                Ok(pushed) => {
                    steps.push(TrajectoryStep {
                        set: set.clone(),
                        time: to,
                        direction,
                        dist: pushed.clone(),
                    });
                    next.push((set.clone(), pushed));
                }
                Err(e) => warn!("{} stops at time {}: {}", set, from, e),
            }
        }
        if next.is_empty() {
            break;
        }
        current = next;
        from = to;
    }
    Ok(steps)
}

/// Ancestors (maps ending at `time`) and descendants (maps starting at
/// `time`) of every cell set
///
/// * `maps` - transport map files
/// * `time` - the day the cell sets are defined at
/// * `cell_sets` - named sets of cell ids
/// * `load` - read a transport map
pub fn compute_trajectories_with(
    maps: &[MapFile],
    time: f64,
    cell_sets: &GeneSets,
    load: &mut dyn FnMut(&MapFile) -> anyhow::Result<ExpressionData>,
) -> anyhow::Result<Vec<TrajectoryStep>> {
    let directions: Vec<Direction> = [Direction::Backward, Direction::Forward]
        .into_iter()
        .filter(|&d| next_map(maps, time, d).is_some())
        .collect();

    if directions.is_empty() {
        anyhow::bail!("no transport map starts or ends at time {}", time);
    }

    let mut steps = vec![];
    for direction in directions {
        steps.extend(follow_chain(maps, time, direction, cell_sets, load)?);
    }
    Ok(steps)
}

/// [`compute_trajectories_with`] reading each map from disk
pub fn compute_trajectories(
    maps: &[MapFile],
    time: f64,
    cell_sets: &GeneSets,
) -> anyhow::Result<Vec<TrajectoryStep>> {
    let mut load = |m: &MapFile| read_dataset(&m.path);
    compute_trajectories_with(maps, time, cell_sets, &mut load)
}

/// One row of the trajectory table
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub set: Box<str>,
    pub time: f64,
    pub direction: Direction,
    pub entropy: f64,
    pub n_sampled: usize,
    /// weighted mean of each feature, NaN if no cell has values
    pub means: Vec<f64>,
}

/// Sampled values of one feature at one step, for plotting
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub set: Box<str>,
    pub feature: Box<str>,
    pub direction: Direction,
    pub time: f64,
    pub mean: f64,
    pub values: Vec<f32>,
}

/// Entropy, weighted feature means and sampled feature values of a step
///
/// * `step` - distribution of a cell set at one time point
/// * `features` - cells x features (genes and scores); non-finite
///   entries count as missing
/// * `rng` - sampling `ceil(entropy)` cells with replacement
pub fn summarize_step(
    step: &TrajectoryStep,
    features: &ExpressionData,
    rng: &mut StdRng,
) -> anyhow::Result<(StepSummary, Vec<Trace>)> {
    let entropy = step.dist.entropy();
    // exp(H) of a uniform distribution may land just above an integer
    let n_sampled = ((entropy - 1e-9).ceil() as usize).max(1);
    let sampled = step.dist.sample(n_sampled, rng)?;

    let feature_row = name_to_index(&features.rows);
    let rows: Vec<Option<usize>> = step
        .dist
        .cells
        .iter()
        .map(|c| feature_row.get(c).copied())
        .collect();

    let mut means = Vec::with_capacity(features.ncols());
    let mut traces = Vec::with_capacity(features.ncols());

    for (j, feature) in features.cols.iter().enumerate() {
        let (mut num, mut denom) = (0.0, 0.0);
        let value = |k: usize| rows[k].map(|i| features.mat[(i, j)]).filter(|x| x.is_finite());

        for (k, &p) in step.dist.probs.iter().enumerate() {
            if let Some(x) = value(k) {
                num += p * x as f64;
                denom += p;
            }
        }
        let mean = if denom > 0.0 { num / denom } else { f64::NAN };

        let values: Vec<f32> = sampled.iter().filter_map(|&k| value(k)).collect();

        means.push(mean);
        traces.push(Trace {
            set: step.set.clone(),
            feature: feature.clone(),
            direction: step.direction,
            time: step.time,
            mean,
            values,
        });
    }

    Ok((
        StepSummary {
            set: step.set.clone(),
            time: step.time,
            direction: step.direction,
            entropy,
            n_sampled,
            means,
        },
        traces,
    ))
}
