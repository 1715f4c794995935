use crate::mat_with_names::*;
use log::info;
use matrix_util::common_io::*;
use matrix_util::mtx_io::read_mtx_triplets;
use matrix_util::traits::MatTriplets;
use nalgebra_sparse::CscMatrix;
use std::path::Path;

/// Look for the first existing file among `{dir}/{name}` and
/// `{dir}/{name}.gz`
fn find_sibling(dir: &Path, names: &[String]) -> Option<String> {
    names
        .iter()
        .flat_map(|name| [name.clone(), format!("{}.gz", name)])
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .and_then(|path| path.to_str().map(|x| x.to_string()))
}

/// First tab-separated field of every line
fn read_first_column(file: &str) -> anyhow::Result<Vec<Box<str>>> {
    Ok(read_lines_of_words_delim(file, '\t', -1)?
        .lines
        .into_iter()
        .filter_map(|words| words.into_iter().next())
        .map(|x| x.trim().to_string().into_boxed_str())
        .collect())
}

fn read_ids_or_default(
    id_file: Option<String>,
    expected: usize,
    what: &str,
) -> anyhow::Result<Vec<Box<str>>> {
    match id_file {
        Some(file) => {
            let ids = read_first_column(&file)?;
            if ids.len() != expected {
                anyhow::bail!("{} has {} {} but expected {}", file, ids.len(), what, expected);
            }
            info!("Read {} {} from {}", ids.len(), what, file);
            Ok(ids)
        }
        None => {
            info!("no {} file found, using indices", what);
            Ok((0..expected).map(|x| x.to_string().into_boxed_str()).collect())
        }
    }
}

/// Read a Matrix Market file in 10x orientation (genes x cells) and
/// return cells x genes.
///
/// Gene ids come from `{stem}.genes.txt`, `{stem}.genes.tsv`,
/// `genes.tsv` or `features.tsv`; cell ids from
/// `{stem}.barcodes.txt`, `{stem}.barcodes.tsv` or `barcodes.tsv`,
/// each possibly gzipped and next to the matrix file.
pub fn read_mtx_data(mtx_file: &str) -> anyhow::Result<ExpressionData> {
    let (triplets, (ngenes, ncells, _)) = read_mtx_triplets(mtx_file)?;

    let transposed: Vec<(u64, u64, f32)> = triplets
        .into_iter()
        .map(|(gene, cell, x)| (cell, gene, x))
        .collect();

    let mat = Mat::from(&CscMatrix::from_nonzero_triplets(ncells, ngenes, &transposed)?);

    let dir = Path::new(mtx_file)
        .parent()
        .map(|x| x.to_path_buf())
        .unwrap_or_default();
    let stem = basename(mtx_file)?;

    let gene_file = find_sibling(
        &dir,
        &[
            format!("{}.genes.txt", stem),
            format!("{}.genes.tsv", stem),
            "genes.tsv".to_string(),
            "features.tsv".to_string(),
        ],
    );
    let cell_file = find_sibling(
        &dir,
        &[
            format!("{}.barcodes.txt", stem),
            format!("{}.barcodes.tsv", stem),
            "barcodes.tsv".to_string(),
        ],
    );

    let genes = read_ids_or_default(gene_file, ngenes, "genes")?;
    let cells = read_ids_or_default(cell_file, ncells, "barcodes")?;

    info!("Read {} cells x {} genes from {}", ncells, ngenes, mtx_file);
    MatWithNames::new(cells, genes, mat)
}
