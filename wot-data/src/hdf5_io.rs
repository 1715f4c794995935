use crate::mat_with_names::*;
use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use log::{info, warn};
use matrix_util::common_io::mkdir;
use nalgebra_sparse::CscMatrix;
use ndarray::{Array2, ArrayBase, Data, Dim};

const COMPRESSION_LEVEL: u8 = 4;
const MAX_CHUNK: usize = 256;

/// Numeric per-row annotation carried along with a loom matrix
pub type RowAttr = (Box<str>, Vec<f64>);

fn ndarray_into_box_str<T, U>(data: &ArrayBase<T, Dim<[usize; 1]>>) -> Vec<Box<str>>
where
    T: Data<Elem = U>,
    U: ToString,
{
    data.iter()
        .map(|x| x.to_string().into_boxed_str())
        .collect()
}

/// Read strings from `HDF5` dataset
pub fn read_hdf5_strings(data: hdf5::Dataset) -> anyhow::Result<Vec<Box<str>>> {
    let desc = data.dtype()?.to_descriptor()?;

    let ret: Vec<Box<str>> = match desc {
        TypeDescriptor::VarLenUnicode => ndarray_into_box_str(&data.read_1d::<VarLenUnicode>()?),
        TypeDescriptor::VarLenAscii => ndarray_into_box_str(&data.read_1d::<VarLenAscii>()?),
        TypeDescriptor::FixedAscii(n) => {
            if n <= 24 {
                ndarray_into_box_str(&data.read_1d::<FixedAscii<24>>()?)
            } else if n <= 128 {
                ndarray_into_box_str(&data.read_1d::<FixedAscii<128>>()?)
            } else {
                ndarray_into_box_str(&data.read_1d::<FixedAscii<1024>>()?)
            }
        }
        TypeDescriptor::FixedUnicode(n) => {
            if n <= 24 {
                ndarray_into_box_str(&data.read_1d::<FixedUnicode<24>>()?)
            } else if n <= 128 {
                ndarray_into_box_str(&data.read_1d::<FixedUnicode<128>>()?)
            } else {
                ndarray_into_box_str(&data.read_1d::<FixedUnicode<1024>>()?)
            }
        }
        _ => {
            return Err(anyhow::anyhow!("unsupported string type: {:?}", desc));
        }
    };

    Ok(ret)
}

fn write_hdf5_strings(group: &hdf5::Group, key: &str, names: &[Box<str>]) -> anyhow::Result<()> {
    let names: Vec<VarLenUnicode> = names
        .iter()
        .map(|x| {
            x.parse::<VarLenUnicode>()
                .map_err(|e| anyhow::anyhow!("invalid name {}: {}", x, e))
        })
        .collect::<anyhow::Result<_>>()?;

    group
        .new_dataset::<VarLenUnicode>()
        .shape(names.len())
        .create(key)?
        .write(&names)?;
    Ok(())
}

/// Find the matrix group of a 10x file: `matrix` (Cell Ranger v3) or
/// the single genome group (Cell Ranger v2)
fn tenx_root_group(file: &hdf5::File, h5_file: &str) -> anyhow::Result<hdf5::Group> {
    if let Ok(root) = file.group("matrix") {
        return Ok(root);
    }
    let groups: Vec<String> = file
        .member_names()?
        .into_iter()
        .filter(|x| file.group(x).is_ok())
        .collect();

    match groups.as_slice() {
        [name] => Ok(file.group(name)?),
        [] => Err(anyhow::anyhow!("no matrix group in {}", h5_file)),
        _ => {
            warn!("multiple groups in {}: {:?}, using {}", h5_file, groups, groups[0]);
            Ok(file.group(&groups[0])?)
        }
    }
}

fn first_strings(root: &hdf5::Group, keys: &[&str]) -> Option<Vec<Box<str>>> {
    keys.iter()
        .filter_map(|k| root.dataset(k).ok())
        .find_map(|ds| read_hdf5_strings(ds).ok())
}

/// Read a 10x gene-barcode HDF5 file as cells x genes
///
/// ```text
/// (root)
///   └── matrix (or a genome name)
///       ├── data, indices, indptr  (CSC, one column per cell)
///       ├── shape                  [#genes, #cells]
///       ├── barcodes
///       └── features/id (v3) or genes (v2)
/// ```
pub fn read_10x_h5(h5_file: &str) -> anyhow::Result<ExpressionData> {
    let file = hdf5::File::open(h5_file)?;
    info!("Opened data file: {}", h5_file);
    let root = tenx_root_group(&file, h5_file)?;

    let read_missing = |key: &str| anyhow::anyhow!("missing '{}' dataset in {}", key, h5_file);

    let values = root
        .dataset("data")
        .map_err(|_| read_missing("data"))?
        .read_raw::<f32>()?;
    let indices = root
        .dataset("indices")
        .map_err(|_| read_missing("indices"))?
        .read_raw::<u64>()?;
    let indptr = root
        .dataset("indptr")
        .map_err(|_| read_missing("indptr"))?
        .read_raw::<u64>()?;
    let shape = root
        .dataset("shape")
        .map_err(|_| read_missing("shape"))?
        .read_raw::<u64>()?;

    if shape.len() != 2 {
        anyhow::bail!("bad shape {:?} in {}", shape, h5_file);
    }
    let (ngenes, ncells) = (shape[0] as usize, shape[1] as usize);

    let nnz = values.len();
    let to_usize = |v: Vec<u64>| v.into_iter().map(|x| x as usize).collect::<Vec<_>>();

    // one column per cell, one row per gene
    let csc = CscMatrix::try_from_csc_data(ngenes, ncells, to_usize(indptr), to_usize(indices), values)
        .map_err(|e| anyhow::anyhow!("invalid sparse matrix in {}: {}", h5_file, e))?;

    info!(
        "Read {} non-zero elements in {} cells x {} genes",
        nnz, ncells, ngenes
    );

    let mat: Mat = Mat::from(&csc).transpose();

    let genes = first_strings(&root, &["features/id", "genes"]).unwrap_or_else(|| {
        info!("gene ids not found");
        (0..ngenes).map(|x| x.to_string().into_boxed_str()).collect()
    });

    let barcodes = first_strings(&root, &["barcodes"]).unwrap_or_else(|| {
        info!("barcodes not found");
        (0..ncells).map(|x| x.to_string().into_boxed_str()).collect()
    });

    MatWithNames::new(barcodes, genes, mat)
}

/// Read a loom file; rows and columns as stored in `/matrix`, ids
/// from `/row_attrs/id` and `/col_attrs/id`, and any other 1-d
/// numeric row attributes
pub fn read_loom(loom_file: &str) -> anyhow::Result<(ExpressionData, Vec<RowAttr>)> {
    let file = hdf5::File::open(loom_file)?;

    let arr: Array2<f32> = file
        .dataset("matrix")
        .map_err(|_| anyhow::anyhow!("missing /matrix in {}", loom_file))?
        .read_2d::<f32>()?;

    let (nrows, ncols) = arr.dim();
    info!("Read {} x {} matrix from {}", nrows, ncols, loom_file);

    let mat = Mat::from_row_iterator(nrows, ncols, arr.iter().copied());

    let rows = file
        .dataset("row_attrs/id")
        .ok()
        .and_then(|ds| read_hdf5_strings(ds).ok())
        .unwrap_or_else(|| (0..nrows).map(|x| x.to_string().into_boxed_str()).collect());

    let cols = file
        .dataset("col_attrs/id")
        .ok()
        .and_then(|ds| read_hdf5_strings(ds).ok())
        .unwrap_or_else(|| (0..ncols).map(|x| x.to_string().into_boxed_str()).collect());

    let mut row_attrs = vec![];
    if let Ok(group) = file.group("row_attrs") {
        for name in group.member_names()? {
            if name == "id" {
                continue;
            }
            let Ok(ds) = group.dataset(&name) else {
                continue;
            };
            if ds.ndim() != 1 || ds.size() != nrows {
                continue;
            }
            if let Ok(values) = ds.read_raw::<f64>() {
                row_attrs.push((name.into_boxed_str(), values));
            }
        }
    }

    Ok((MatWithNames::new(rows, cols, mat)?, row_attrs))
}

/// Write a loom file with `/matrix` (gzip compressed), ids and row
/// attributes
pub fn write_loom(
    data: &ExpressionData,
    row_attrs: &[RowAttr],
    loom_file: &str,
) -> anyhow::Result<()> {
    mkdir(loom_file)?;
    let file = hdf5::File::create(loom_file)?;

    let (nrows, ncols) = (data.nrows(), data.ncols());
    let arr = Array2::from_shape_fn((nrows, ncols), |(i, j)| data.mat[(i, j)]);

    let builder = file.new_dataset::<f32>().shape((nrows, ncols));
    if nrows > 0 && ncols > 0 {
        builder
            .chunk((nrows.min(MAX_CHUNK), ncols.min(MAX_CHUNK)))
            .deflate(COMPRESSION_LEVEL)
            .create("matrix")?
            .write(&arr)?;
    } else {
        builder.create("matrix")?;
    }

    let row_group = file.create_group("row_attrs")?;
    write_hdf5_strings(&row_group, "id", &data.rows)?;
    for (name, values) in row_attrs {
        if values.len() != nrows {
            anyhow::bail!(
                "row attribute {} has {} values for {} rows",
                name,
                values.len(),
                nrows
            );
        }
        row_group
            .new_dataset::<f64>()
            .shape(nrows)
            .create(&**name)?
            .write(values.as_slice())?;
    }

    let col_group = file.create_group("col_attrs")?;
    write_hdf5_strings(&col_group, "id", &data.cols)?;

    for empty in ["layers", "row_graphs", "col_graphs"] {
        file.create_group(empty)?;
    }

    file.flush()?;
    Ok(())
}
