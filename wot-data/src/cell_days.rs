use crate::mat_with_names::first_duplicate;
use fnv::FnvHashMap as HashMap;
use log::info;
use matrix_util::common_io::{mkdir, read_lines_of_words_delim, write_lines, ReadLinesOut};

/// Parse a day label: finite and non-negative
pub fn parse_day(word: &str) -> anyhow::Result<f64> {
    let day = word
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow::anyhow!("invalid day: '{}'", word))?;
    if !day.is_finite() || day < 0.0 {
        anyhow::bail!("day must be a non-negative number: '{}'", word);
    }
    Ok(day)
}

/// Read a tab-separated two-column table, skipping a first line whose
/// second field is not numeric. Ids may contain spaces.
pub(crate) fn read_two_columns(file: &str) -> anyhow::Result<Vec<(Box<str>, Box<str>)>> {
    let ReadLinesOut { lines, .. } = read_lines_of_words_delim(file, '\t', -1)?;

    let mut ret = Vec::with_capacity(lines.len());
    for (i, words) in lines.iter().enumerate() {
        let [a, b] = words.as_slice() else {
            anyhow::bail!(
                "{}: line {} has {} tab-separated fields, expected 2",
                file,
                i + 1,
                words.len()
            );
        };
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() {
            anyhow::bail!("{}: line {} has an empty id", file, i + 1);
        }
        if i == 0 && b.parse::<f64>().is_err() {
            info!("{}: skipping header line", file);
            continue;
        }
        ret.push((Box::from(a), Box::from(b)));
    }
    Ok(ret)
}

/// Read `cell_id<TAB>value` lines, e.g., per-cell growth rates
pub fn read_cell_values(file: &str) -> anyhow::Result<Vec<(Box<str>, f64)>> {
    read_two_columns(file)?
        .into_iter()
        .map(|(cell, x)| {
            let value = x
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow::anyhow!("{}: invalid value '{}' for {}", file, x, cell))?;
            Ok((cell, value))
        })
        .collect()
}

/// Cell id -> sampling day
#[derive(Debug, Clone, Default)]
pub struct CellDays {
    cells: Vec<Box<str>>,
    days: Vec<f64>,
    index: HashMap<Box<str>, usize>,
}

impl CellDays {
    /// Build from pairs; every cell has exactly one valid day
    pub fn from_pairs(pairs: Vec<(Box<str>, f64)>) -> anyhow::Result<Self> {
        let (cells, days): (Vec<Box<str>>, Vec<f64>) = pairs.into_iter().unzip();

        if let Some(dup) = first_duplicate(&cells) {
            anyhow::bail!("cell {} has more than one day", dup);
        }
        if let Some(bad) = days.iter().find(|d| !d.is_finite() || **d < 0.0) {
            anyhow::bail!("day must be a non-negative number: {}", bad);
        }

        let index = cells
            .iter()
            .enumerate()
            .map(|(i, x)| (x.clone(), i))
            .collect();

        Ok(Self { cells, days, index })
    }

    /// Read `cell_id<TAB>day` lines
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let pairs = read_two_columns(file)?
            .into_iter()
            .map(|(cell, day)| Ok((cell, parse_day(&day)?)))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| anyhow::anyhow!("{}: {}", file, e))?;

        let ret = Self::from_pairs(pairs).map_err(|e| anyhow::anyhow!("{}: {}", file, e))?;
        info!(
            "Read {} cells over {} days from {}",
            ret.len(),
            ret.unique_days().len(),
            file
        );
        Ok(ret)
    }

    /// Write `cell_id<TAB>day` lines, no header
    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        let lines: Vec<Box<str>> = self
            .iter()
            .map(|(cell, day)| format!("{}\t{}", cell, day).into_boxed_str())
            .collect();
        write_lines(&lines, file)?;
        info!("Wrote {} cell days to {}", lines.len(), file);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, cell: &str) -> Option<f64> {
        self.index.get(cell).map(|&i| self.days[i])
    }

    pub fn contains_day(&self, day: f64) -> bool {
        self.days.iter().any(|&d| d == day)
    }

    pub fn cells(&self) -> &[Box<str>] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Box<str>, f64)> {
        self.cells.iter().zip(self.days.iter().copied())
    }

    /// Sorted distinct days
    pub fn unique_days(&self) -> Vec<f64> {
        let mut ret = self.days.clone();
        ret.sort_by(|a, b| a.total_cmp(b));
        ret.dedup();
        ret
    }

    /// Positions (in `names`) of the cells sampled at `day`
    pub fn positions_at(&self, names: &[Box<str>], day: f64) -> Vec<usize> {
        names
            .iter()
            .enumerate()
            .filter(|(_, x)| self.get(x) == Some(day))
            .map(|(i, _)| i)
            .collect()
    }
}
