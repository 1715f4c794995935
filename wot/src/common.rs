#![allow(unused)]

pub use matrix_util::common_io as io;

pub use clap::{Args, Parser, Subcommand};

pub use log::{info, warn};

pub use indicatif::{ProgressBar, ProgressDrawTarget};

pub use wot_data::dataset_io::*;
pub use wot_data::mat_with_names::*;

/// `{prefix}_{suffix}` written as a tab-separated table with an `id`
/// header label
pub fn write_table(data: &ExpressionData, prefix: &str, suffix: &str) -> anyhow::Result<Box<str>> {
    let file = format!("{}_{}", prefix, suffix);
    wot_data::text_data::write_text_matrix(data, &file, "\t")?;
    info!("Wrote {} x {} table to {}", data.nrows(), data.ncols(), file);
    Ok(file.into_boxed_str())
}
