use crate::builtin_gene_sets::*;
use fnv::FnvHashSet as HashSet;
use log::{info, warn};
use matrix_util::common_io::{file_ext, read_lines};

/// A named list of gene (or cell) ids
#[derive(Debug, Clone, PartialEq)]
pub struct GeneSet {
    pub name: Box<str>,
    pub description: Box<str>,
    pub members: Vec<Box<str>>,
}

impl GeneSet {
    /// Drop empty and repeated members, keeping the first occurrence
    pub fn new(name: &str, description: &str, members: Vec<Box<str>>) -> Self {
        let mut seen: HashSet<Box<str>> = HashSet::default();
        let members = members
            .into_iter()
            .map(|x| x.trim().to_string().into_boxed_str())
            .filter(|x| !x.is_empty() && seen.insert(x.clone()))
            .collect();
        Self {
            name: name.trim().into(),
            description: description.trim().into(),
            members,
        }
    }

    /// Lower-cased member ids
    pub fn lowercase_members(&self) -> HashSet<Box<str>> {
        self.members
            .iter()
            .map(|x| x.to_lowercase().into_boxed_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneSets {
    pub sets: Vec<GeneSet>,
}

impl GeneSets {
    /// `Cell.cycle` (G1/S and G2/M markers) and `Apoptosis`
    pub fn builtin() -> Self {
        let boxed = |genes: &[&str]| genes.iter().map(|&x| Box::from(x)).collect::<Vec<_>>();
        let mut cell_cycle = boxed(G1_S_GENES);
        cell_cycle.extend(boxed(G2_M_GENES));
        Self {
            sets: vec![
                GeneSet::new(CELL_CYCLE, "G1/S and G2/M markers", cell_cycle),
                GeneSet::new(APOPTOSIS, "hallmark apoptosis", boxed(APOPTOSIS_GENES)),
            ],
        }
    }

    /// Read `.gmt` (one set per line) or `.gmx` (one set per column)
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let lines = read_lines(file)?;
        let ext = file_ext(file).unwrap_or_else(|_| "".into());
        let ret = match ext.as_ref() {
            "gmx" => Self::parse_gmx(&lines),
            "gmt" => Self::parse_gmt(&lines),
            _ => anyhow::bail!("{}: expected a .gmt or .gmx file", file),
        };
        if ret.sets.is_empty() {
            anyhow::bail!("no sets found in {}", file);
        }
        info!("Read {} sets from {}", ret.sets.len(), file);
        Ok(ret)
    }

    /// `name<TAB>description<TAB>member...`
    pub fn parse_gmt(lines: &[Box<str>]) -> Self {
        let sets = lines
            .iter()
            .filter(|x| !x.trim().is_empty() && !x.starts_with('#'))
            .filter_map(|line| {
                let mut words = line.split('\t');
                let name = words.next()?;
                let description = words.next().unwrap_or("");
                let members = words.map(Box::from).collect();
                Some(GeneSet::new(name, description, members))
            })
            .collect();
        Self { sets }
    }

    /// Names in the first row, descriptions in the second, members
    /// below; blank cells are ignored
    pub fn parse_gmx(lines: &[Box<str>]) -> Self {
        let rows: Vec<Vec<&str>> = lines
            .iter()
            .filter(|x| !x.trim().is_empty())
            .map(|x| x.split('\t').collect())
            .collect();

        let Some(names) = rows.first() else {
            return Self::default();
        };

        let cell = |i: usize, j: usize| rows.get(i).and_then(|r| r.get(j)).copied().unwrap_or("");

        let sets = names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(j, name)| {
                let members = (2..rows.len()).map(|i| Box::from(cell(i, j))).collect();
                GeneSet::new(name, cell(1, j), members)
            })
            .collect();
        Self { sets }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn names(&self) -> Vec<Box<str>> {
        self.sets.iter().map(|x| x.name.clone()).collect()
    }

    /// Keep only the sets whose names appear in `names`
    pub fn retain_names(&mut self, names: &[Box<str>]) {
        let before = self.sets.len();
        self.sets.retain(|s| names.iter().any(|n| n.as_ref() == s.name.as_ref()));
        if self.sets.len() < before {
            info!("kept {} of {} sets", self.sets.len(), before);
        }
        if self.sets.len() < names.len() {
            warn!("some requested sets were not found");
        }
    }
}

/// Names of the sets to keep: one per line (first tab-separated field)
/// when `arg` is an existing file, otherwise a comma-separated list
pub fn read_set_filter(arg: &str) -> anyhow::Result<Vec<Box<str>>> {
    let names: Vec<Box<str>> = if std::path::Path::new(arg).is_file() {
        let names: Vec<Box<str>> = read_lines(arg)?
            .iter()
            .filter_map(|line| line.split('\t').next())
            .map(|x| x.trim())
            .filter(|x| !x.is_empty() && !x.starts_with('#'))
            .map(Box::from)
            .collect();
        info!("Read {} set names from {}", names.len(), arg);
        names
    } else {
        arg.split(',')
            .map(|x| x.trim())
            .filter(|x| !x.is_empty())
            .map(Box::from)
            .collect()
    };
    if names.is_empty() {
        anyhow::bail!("empty set filter: {}", arg);
    }
    Ok(names)
}
