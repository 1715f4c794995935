use crate::common_io::*;
use std::io::Write;

/// `nrow`, `ncol`, `nnz` of a matrix market file
pub type MtxShape = (usize, usize, usize);

/// Write the triplets into a MatrixMarket file with 1-based indices
/// * `triplets` - the triplets to write (0-based)
/// * `nrow` - number of rows
/// * `ncol` - number of columns
/// * `mtx_file` - the output file (e.g., "matrix.mtx.gz")
pub fn write_mtx_triplets(
    triplets: &[(u64, u64, f32)],
    nrow: usize,
    ncol: usize,
    mtx_file: &str,
) -> anyhow::Result<()> {
    mkdir(mtx_file)?;

    let mut buf = open_buf_writer(mtx_file)?;

    let nnz = triplets.len();
    writeln!(buf, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(buf, "{}\t{}\t{}", nrow, ncol, nnz)?;

    for (row, col, val) in triplets {
        writeln!(buf, "{}\t{}\t{}", row + 1, col + 1, val)?;
    }

    buf.flush()?;
    Ok(())
}

/// Read a matrix market file and return a vector of 0-based triplets
/// (row, col, val) sorted by column, then row, together with the
/// `(nrow, ncol, nnz)` header.
///
/// `pattern` files (no value column) get value 1.
///
/// * `mtx_file` - Path to the matrix market file
pub fn read_mtx_triplets(mtx_file: &str) -> anyhow::Result<(Vec<(u64, u64, f32)>, MtxShape)> {
    let mtx_hdr_position = 0;
    let ReadLinesOut { lines, header } = read_lines_of_words(mtx_file, mtx_hdr_position)?;

    if header.len() != 3 {
        anyhow::bail!("Failed to parse mtx header in {}", mtx_file);
    }

    let nrow = header[0].parse::<usize>()?;
    let ncol = header[1].parse::<usize>()?;
    let nnz = header[2].parse::<usize>()?;

    let parse_row_col_val = |triplet: &Vec<Box<str>>| -> anyhow::Result<(u64, u64, f32)> {
        if triplet.len() < 2 || triplet.len() > 3 {
            anyhow::bail!("expected 2 or 3 fields, found {}", triplet.len());
        }

        let row = triplet[0].parse::<u64>()?;
        let col = triplet[1].parse::<u64>()?;

        if row < 1 || col < 1 || row as usize > nrow || col as usize > ncol {
            anyhow::bail!("index ({}, {}) out of range [{} x {}]", row, col, nrow, ncol);
        }

        // f32 should be enough for most cases
        let val = match triplet.get(2) {
            Some(v) => v.parse::<f32>()?,
            None => 1.0,
        };

        // convert 1-based to 0-based
        Ok((row - 1, col - 1, val))
    };

    let mut mtx_triplets = lines
        .iter()
        .map(parse_row_col_val)
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(|e| anyhow::anyhow!("{}: {}", mtx_file, e))?;

    if mtx_triplets.len() != nnz {
        log::warn!(
            "{}: header says {} non-zeros, found {}",
            mtx_file,
            nnz,
            mtx_triplets.len()
        );
    }

    mtx_triplets.sort_by_key(|&(row, col, _)| (col, row));
    Ok((mtx_triplets, (nrow, ncol, nnz)))
}
