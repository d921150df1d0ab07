/// branch/mod.rs — Input modalities and their resolution
///
///   alphabet: complement table and one-hot alphabets
///   value: resolved per-record arrays and their TSV cell form
///   mapper: resolves every branch of a record list, dropping what
///     cannot be resolved
///   fold: external secondary-structure folding
pub mod alphabet;
pub mod fold;
pub mod mapper;
pub mod value;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub use mapper::BranchMapper;
pub use value::BranchValue;

/// One input modality of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum Branch {
    #[serde(rename = "seq", alias = "sequence")]
    Sequence,
    #[serde(rename = "cons", alias = "conservation")]
    Conservation,
    #[serde(rename = "fold", alias = "structure")]
    Structure,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::Sequence, Branch::Conservation, Branch::Structure];

    /// Column name used in dataset files.
    pub fn name(&self) -> &'static str {
        match self {
            Branch::Sequence => "seq",
            Branch::Conservation => "cons",
            Branch::Structure => "fold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "seq" | "sequence" => Some(Branch::Sequence),
            "cons" | "conservation" => Some(Branch::Conservation),
            "fold" | "structure" => Some(Branch::Structure),
            _ => None,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Branch::from_name(s).ok_or_else(|| format!("unknown branch '{}'", s))
    }
}

/// Comma-joined names, used in mismatch messages and logs.
pub fn branch_list(branches: &[Branch]) -> String {
    branches
        .iter()
        .map(|b| b.name())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for b in Branch::ALL {
            assert_eq!(b.name().parse::<Branch>().unwrap(), b);
        }
        assert_eq!("structure".parse::<Branch>().unwrap(), Branch::Structure);
        assert!("shape".parse::<Branch>().is_err());
    }

    #[test]
    fn test_branch_list() {
        assert_eq!(branch_list(&[Branch::Sequence, Branch::Structure]), "seq,fold");
        assert_eq!(branch_list(&[]), "");
    }
}
