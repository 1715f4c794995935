use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};
use nalgebra::DMatrix;

pub type Mat = DMatrix<f32>;

/// Dense matrix with unique row and column identifiers
///
/// For expression data, rows are cells and columns are genes.
#[derive(Debug, Clone)]
pub struct MatWithNames<M> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: M,
}

pub type ExpressionData = MatWithNames<Mat>;

/// Return the first duplicated name, if any
pub fn first_duplicate(names: &[Box<str>]) -> Option<&str> {
    let mut seen: HashSet<&str> = HashSet::default();
    names.iter().map(|x| x.as_ref()).find(|x| !seen.insert(*x))
}

/// name -> position
pub fn name_to_index(names: &[Box<str>]) -> HashMap<Box<str>, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, x)| (x.clone(), i))
        .collect()
}

impl MatWithNames<Mat> {
    /// Assemble a named matrix, checking the shape and uniqueness of
    /// the identifiers
    pub fn new(rows: Vec<Box<str>>, cols: Vec<Box<str>>, mat: Mat) -> anyhow::Result<Self> {
        if rows.len() != mat.nrows() {
            anyhow::bail!(
                "{} row names for a matrix with {} rows",
                rows.len(),
                mat.nrows()
            );
        }
        if cols.len() != mat.ncols() {
            anyhow::bail!(
                "{} column names for a matrix with {} columns",
                cols.len(),
                mat.ncols()
            );
        }
        if let Some(dup) = first_duplicate(&rows) {
            anyhow::bail!("duplicate row id: {}", dup);
        }
        if let Some(dup) = first_duplicate(&cols) {
            anyhow::bail!("duplicate column id: {}", dup);
        }
        Ok(Self { rows, cols, mat })
    }

    pub fn nrows(&self) -> usize {
        self.mat.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.mat.ncols()
    }

    /// Expression values must be finite and non-negative
    pub fn validate_expression(&self) -> anyhow::Result<()> {
        for (j, x_j) in self.mat.column_iter().enumerate() {
            for (i, &x_ij) in x_j.iter().enumerate() {
                if !x_ij.is_finite() || x_ij < 0.0 {
                    anyhow::bail!(
                        "invalid expression value {} at cell {}, gene {}",
                        x_ij,
                        self.rows[i],
                        self.cols[j]
                    );
                }
            }
        }
        Ok(())
    }

    /// Keep the rows in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            cols: self.cols.clone(),
            mat: self.mat.select_rows(indices),
        }
    }

    /// Keep the columns in the given order
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            rows: self.rows.clone(),
            cols: indices.iter().map(|&j| self.cols[j].clone()).collect(),
            mat: self.mat.select_columns(indices),
        }
    }

    /// Keep the columns whose lower-cased id is in `keep_lower`
    pub fn filter_columns_case_insensitive(&self, keep_lower: &HashSet<Box<str>>) -> Self {
        let indices: Vec<usize> = self
            .cols
            .iter()
            .enumerate()
            .filter(|(_, x)| keep_lower.contains(x.to_lowercase().as_str()))
            .map(|(j, _)| j)
            .collect();
        self.select_columns(&indices)
    }

    /// Position of a column, ignoring case
    pub fn column_position_case_insensitive(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|x| x.eq_ignore_ascii_case(name))
    }

    /// Reorder rows to match `ids`; ids missing here are reported as an error
    pub fn align_rows(&self, ids: &[Box<str>]) -> anyhow::Result<Self> {
        let index = name_to_index(&self.rows);
        let mut positions = Vec::with_capacity(ids.len());
        let mut missing = 0;
        for id in ids {
            match index.get(id) {
                Some(&i) => positions.push(i),
                None => missing += 1,
            }
        }
        if missing > 0 {
            anyhow::bail!("{} of {} ids have no row", missing, ids.len());
        }
        Ok(self.select_rows(&positions))
    }
}
