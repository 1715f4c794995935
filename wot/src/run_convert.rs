use crate::common::*;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Expression matrices to convert
    #[arg(required = true)]
    files: Vec<Box<str>>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "loom")]
    format: OutputFormat,

    /// Output directory
    #[arg(long, short, default_value = ".")]
    out_dir: Box<str>,
}

pub fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    for file in args.files.iter() {
        let (data, row_attrs) = read_dataset_with_attrs(file)?;
        let stem = io::basename(file)?;
        let prefix = format!("{}/{}", args.out_dir, stem);
        let out = write_dataset(&data, &row_attrs, &prefix, args.format)?;
        info!("{} -> {}", file, out);
    }
    Ok(())
}
