use fnv::FnvHashMap as HashMap;
use log::info;
use wot_data::mat_with_names::*;

/// `L / (1 + exp(-k (x - x0)))`
pub fn logistic(x: f64, l: f64, k: f64, x0: f64) -> f64 {
    l / (1.0 + (-k * (x - x0)).exp())
}

/// Logistic curve between `min` and `max`, centred at `center`,
/// rising over roughly `width`
pub fn gen_logistic(p: f64, max: f64, min: f64, center: f64, width: f64) -> f64 {
    min + logistic(p, max - min, 4.0 / width, center)
}

/// Shape of the birth (`beta`) and death (`delta`) curves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthParams {
    pub beta_max: f64,
    pub beta_min: f64,
    pub beta_center: f64,
    pub beta_width: f64,
    pub delta_max: f64,
    pub delta_min: f64,
    pub delta_center: f64,
    pub delta_width: f64,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            beta_max: 1.7,
            beta_min: 0.3,
            beta_center: 0.25,
            beta_width: 0.5,
            delta_max: 1.7,
            delta_min: 0.3,
            delta_center: 0.1,
            delta_width: 0.2,
        }
    }
}

impl GrowthParams {
    /// proliferation score -> birth rate
    pub fn beta(&self, p: f64) -> f64 {
        gen_logistic(
            p,
            self.beta_max,
            self.beta_min,
            self.beta_center,
            self.beta_width,
        )
    }

    /// apoptosis score -> death rate
    pub fn delta(&self, a: f64) -> f64 {
        gen_logistic(
            a,
            self.delta_max,
            self.delta_min,
            self.delta_center,
            self.delta_width,
        )
    }

    /// `exp(beta - delta)`, growth over one day
    pub fn growth_rate(&self, proliferation: f64, apoptosis: f64) -> f64 {
        (self.beta(proliferation) - self.delta(apoptosis)).exp()
    }
}

const PROLIFERATION_COLUMNS: [&str; 2] = ["Cell.cycle", "Proliferation"];
const APOPTOSIS_COLUMNS: [&str; 1] = ["Apoptosis"];

fn find_column(scores: &ExpressionData, candidates: &[&str]) -> anyhow::Result<usize> {
    candidates
        .iter()
        .find_map(|x| scores.column_position_case_insensitive(x))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "gene-set scores need one of {:?} among {:?}",
                candidates,
                scores.cols
            )
        })
}

/// Per-cell growth rates from a score table (cells x sets) in the
/// order of `cells`
pub fn growth_from_scores(
    scores: &ExpressionData,
    cells: &[Box<str>],
    params: &GrowthParams,
) -> anyhow::Result<Vec<f64>> {
    let pj = find_column(scores, &PROLIFERATION_COLUMNS)?;
    let aj = find_column(scores, &APOPTOSIS_COLUMNS)?;
    info!(
        "growth prior from {} and {}",
        scores.cols[pj], scores.cols[aj]
    );

    let aligned = scores.align_rows(cells)?;
    Ok((0..aligned.nrows())
        .map(|i| {
            params.growth_rate(
                aligned.mat[(i, pj)] as f64,
                aligned.mat[(i, aj)] as f64,
            )
        })
        .collect())
}

/// Per-cell growth rates from `(cell, rate)` pairs, in the order of
/// `cells`
pub fn growth_from_pairs(pairs: &[(Box<str>, f64)], cells: &[Box<str>]) -> anyhow::Result<Vec<f64>> {
    let rates: HashMap<&str, f64> = pairs.iter().map(|(c, g)| (c.as_ref(), *g)).collect();
    cells
        .iter()
        .map(|c| match rates.get(c.as_ref()) {
            Some(&g) if g.is_finite() && g > 0.0 => Ok(g),
            Some(&g) => Err(anyhow::anyhow!("growth rate of {} must be positive: {}", c, g)),
            None => Err(anyhow::anyhow!("no growth rate for cell {}", c)),
        })
        .collect()
}

/// Uniform growth
pub fn unit_growth(n: usize) -> Vec<f64> {
    vec![1.0; n]
}
