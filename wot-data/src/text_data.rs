use crate::mat_with_names::*;
use log::info;
use matrix_util::common_io::*;
use rayon::prelude::*;

/// Read a delimited text matrix: header row of column ids, first
/// column row ids.
///
/// The first header field is a label (e.g. `id`) when the header is
/// as wide as the data lines, otherwise every header field is a column
/// id.
///
/// * `file` - `.txt`, `.tsv`, `.csv`, optionally gzipped
/// * `delim` - field delimiter
pub fn read_text_matrix(file: &str, delim: &str) -> anyhow::Result<ExpressionData> {
    let ReadLinesOut { lines, header } = read_lines_of_words_delim(file, delim, 0)?;

    let width = match lines.first() {
        Some(line) => line.len(),
        None => header.len() + 1,
    };

    if width < 1 {
        anyhow::bail!("{}: empty data line", file);
    }

    let cols: Vec<Box<str>> = if header.len() == width {
        header[1..].to_vec()
    } else if header.len() + 1 == width {
        header
    } else {
        anyhow::bail!(
            "{}: header has {} fields but data lines have {}",
            file,
            header.len(),
            width
        );
    };

    let ncols = width - 1;
    let nrows = lines.len();

    let parsed: Vec<(Box<str>, Vec<f32>)> = lines
        .into_par_iter()
        .enumerate()
        .map(|(i, words)| {
            if words.len() != width {
                anyhow::bail!(
                    "{}: line {} has {} fields, expected {}",
                    file,
                    i + 2,
                    words.len(),
                    width
                );
            }
            let values = words[1..]
                .iter()
                .map(|x| {
                    x.trim()
                        .parse::<f32>()
                        .map_err(|e| anyhow::anyhow!("{}: line {}: '{}': {}", file, i + 2, x, e))
                })
                .collect::<anyhow::Result<Vec<f32>>>()?;
            Ok((words[0].clone(), values))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (rows, values): (Vec<Box<str>>, Vec<Vec<f32>>) = parsed.into_iter().unzip();

    let mat = Mat::from_row_iterator(nrows, ncols, values.into_iter().flatten());
    info!("Read {} x {} matrix from {}", nrows, ncols, file);

    MatWithNames::new(rows, cols, mat)
}

/// Write a named matrix as delimited text with an `id` header label
///
/// * `data` - named matrix
/// * `file` - output file (gzipped if it ends with `.gz`)
/// * `delim` - field delimiter
pub fn write_text_matrix(data: &ExpressionData, file: &str, delim: &str) -> anyhow::Result<()> {
    mkdir(file)?;

    let header = std::iter::once("id")
        .chain(data.cols.iter().map(|x| x.as_ref()))
        .collect::<Vec<_>>()
        .join(delim)
        .into_boxed_str();

    // rows in parallel, order preserved by the indexed collect
    let body: Vec<Box<str>> = (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            std::iter::once(data.rows[i].to_string())
                .chain(data.mat.row(i).iter().map(|x| format!("{}", x)))
                .collect::<Vec<_>>()
                .join(delim)
                .into_boxed_str()
        })
        .collect();

    let mut lines = Vec::with_capacity(body.len() + 1);
    lines.push(header);
    lines.extend(body);
    write_lines(&lines, file)
}
