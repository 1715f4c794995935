pub mod builtin_gene_sets; // cell cycle and apoptosis markers
pub mod cell_days; // cell -> day table
pub mod dataset_io; // format dispatch
pub mod day_pairs; // (t0, t1) table
pub mod gene_sets; // GMT/GMX
pub mod hdf5_io; // 10x h5 and loom
pub mod mat_with_names; // dense matrix with unique row/column ids
pub mod mtx_data; // matrix market with sibling id files
pub mod text_data; // delimited text
pub mod validation; // cross-file consistency checks
