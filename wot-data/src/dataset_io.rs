use crate::hdf5_io::*;
use crate::mat_with_names::*;
use crate::mtx_data::read_mtx_data;
use crate::text_data::*;
use clap::ValueEnum;
use fnv::FnvHashSet as HashSet;
use log::info;
use matrix_util::common_io::file_ext;

/// Supported input formats, detected from the file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Mtx,
    TenxH5,
    Loom,
    Text { comma: bool },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum OutputFormat {
    Loom,
    Txt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Loom => "loom",
            OutputFormat::Txt => "txt",
        }
    }
}

/// Figure out the input format; a trailing `.gz` is looked through
pub fn detect_format(file: &str) -> anyhow::Result<InputFormat> {
    let ext = file_ext(file).unwrap_or_else(|_| "txt".into());
    Ok(match ext.as_ref() {
        "mtx" => InputFormat::Mtx,
        "h5" | "hdf5" => InputFormat::TenxH5,
        "loom" => InputFormat::Loom,
        "csv" => InputFormat::Text { comma: true },
        _ => InputFormat::Text { comma: false },
    })
}

/// Read an expression matrix (cells x genes) in any supported format,
/// together with numeric row attributes (loom only)
pub fn read_dataset_with_attrs(file: &str) -> anyhow::Result<(ExpressionData, Vec<RowAttr>)> {
    if !std::path::Path::new(file).exists() {
        anyhow::bail!("file not found: {}", file);
    }
    let format = detect_format(file)?;
    info!("Reading {} as {:?}", file, format);
    match format {
        InputFormat::Mtx => Ok((read_mtx_data(file)?, vec![])),
        InputFormat::TenxH5 => Ok((read_10x_h5(file)?, vec![])),
        InputFormat::Loom => read_loom(file),
        InputFormat::Text { comma } => {
            let delim = if comma { "," } else { "\t" };
            Ok((read_text_matrix(file, delim)?, vec![]))
        }
    }
}

/// Read an expression matrix (cells x genes) in any supported format
pub fn read_dataset(file: &str) -> anyhow::Result<ExpressionData> {
    Ok(read_dataset_with_attrs(file)?.0)
}

/// Read an expression matrix keeping only the genes named in
/// `genes` (case-insensitive)
pub fn read_dataset_genes(file: &str, genes: &[Box<str>]) -> anyhow::Result<ExpressionData> {
    let keep: HashSet<Box<str>> = genes
        .iter()
        .map(|x| x.to_lowercase().into_boxed_str())
        .collect();
    let data = read_dataset(file)?.filter_columns_case_insensitive(&keep);
    if data.ncols() < keep.len() {
        log::warn!(
            "found {} of {} requested genes in {}",
            data.ncols(),
            keep.len(),
            file
        );
    }
    Ok(data)
}

/// Write a named matrix to `{prefix}.{loom|txt}` and return the file name
pub fn write_dataset(
    data: &ExpressionData,
    row_attrs: &[RowAttr],
    prefix: &str,
    format: OutputFormat,
) -> anyhow::Result<Box<str>> {
    let file = format!("{}.{}", prefix, format.extension());
    match format {
        OutputFormat::Loom => write_loom(data, row_attrs, &file)?,
        OutputFormat::Txt => write_text_matrix(data, &file, "\t")?,
    }
    info!("Wrote {} x {} matrix to {}", data.nrows(), data.ncols(), file);
    Ok(file.into_boxed_str())
}
