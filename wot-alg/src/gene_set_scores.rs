use clap::ValueEnum;
use fnv::FnvHashSet as HashSet;
use log::{info, warn};
use matrix_util::traits::MatOps;
use rayon::prelude::*;
use wot_data::gene_sets::GeneSets;
use wot_data::mat_with_names::*;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[clap(rename_all = "snake_case")]
pub enum ScoreMethod {
    /// standardize each gene across cells, then average
    #[default]
    MeanZScore,
    /// average raw expression
    Mean,
}

/// Score every cell against every gene set
///
/// Returns a cells x sets table. Gene ids are matched ignoring case;
/// sets without any matched gene are skipped.
///
/// * `data` - cells x genes
/// * `sets` - gene sets
/// * `method` - `mean_z_score` or `mean`
/// * `max_z` - z-scores are clipped to `[-max_z, max_z]`
pub fn score_gene_sets(
    data: &ExpressionData,
    sets: &GeneSets,
    method: ScoreMethod,
    max_z: f32,
) -> anyhow::Result<ExpressionData> {
    // 1. restrict to the genes used by some set
    let wanted: HashSet<Box<str>> = sets
        .sets
        .iter()
        .flat_map(|s| s.lowercase_members())
        .collect();
    let sub = data.filter_columns_case_insensitive(&wanted);
    info!(
        "{} of {} genes appear in {} gene sets",
        sub.ncols(),
        data.ncols(),
        sets.len()
    );

    if sub.ncols() == 0 {
        anyhow::bail!("none of the gene-set genes are in the expression matrix");
    }

    // 2. transform
    let values = match method {
        ScoreMethod::MeanZScore => sub.mat.standardize_columns(Some(max_z)),
        ScoreMethod::Mean => sub.mat.clone(),
    };

    // 3. average over each set's matched genes
    let lower_cols: Vec<Box<str>> = sub
        .cols
        .iter()
        .map(|x| x.to_lowercase().into_boxed_str())
        .collect();

    let mut names = vec![];
    let mut columns = vec![];

    for set in sets.sets.iter() {
        let members = set.lowercase_members();
        let genes: Vec<usize> = lower_cols
            .iter()
            .enumerate()
            .filter(|(_, x)| members.contains(*x))
            .map(|(j, _)| j)
            .collect();

        if genes.is_empty() {
            warn!("no genes of {} found in the matrix, skipping", set.name);
            continue;
        }
        info!(
            "{}: {} of {} genes matched",
            set.name,
            genes.len(),
            set.members.len()
        );

        let denom = genes.len() as f32;
        let score: Vec<f32> = (0..values.nrows())
            .into_par_iter()
            .map(|i| genes.iter().map(|&j| values[(i, j)]).sum::<f32>() / denom)
            .collect();

        names.push(set.name.clone());
        columns.push(score);
    }

    if names.is_empty() {
        anyhow::bail!("no gene set matched the expression matrix");
    }

    let mat = Mat::from_fn(data.nrows(), names.len(), |i, k| columns[k][i]);
    MatWithNames::new(data.rows.clone(), names, mat)
}
