/// branch/value.rs — Resolved per-branch arrays and their text form
///
/// TEXT FORM (one TSV cell)
/// ───────────────────────────────────────────────────────────────────────
///  Bases    A,C,G,T              one character per position
///  Scores   0.5,1,-2.25          shortest float form that parses back
///  OneHot   1 0 0 0 0,0 1 0 0 0  components separated by a space
/// ───────────────────────────────────────────────────────────────────────
///
/// Positions are always separated by ','. Which variant a cell holds is
/// decided by its column branch plus the presence of spaces.
use crate::branch::alphabet::{one_hot_encode, SEQUENCE_ALPHABET};
use crate::branch::Branch;

#[derive(Debug, Clone, PartialEq)]
pub enum BranchValue {
    /// Un-encoded bases (sequence branch without one-hot).
    Bases(String),
    /// One row per position.
    OneHot(Vec<Vec<f32>>),
    /// One score per position.
    Scores(Vec<f32>),
}

impl BranchValue {
    /// Number of positions.
    pub fn len(&self) -> usize {
        match self {
            BranchValue::Bases(s) => s.chars().count(),
            BranchValue::OneHot(rows) => rows.len(),
            BranchValue::Scores(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bases(&self) -> Option<&str> {
        match self {
            BranchValue::Bases(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric matrix with one row per position. Bases are one-hot
    /// encoded over the sequence alphabet; scores become 1-wide rows.
    pub fn to_matrix(&self) -> Vec<Vec<f32>> {
        match self {
            BranchValue::Bases(s) => one_hot_encode(s, SEQUENCE_ALPHABET).unwrap_or_else(|| {
                // stored bases are normalised, anything else is all-zero
                s.chars().map(|_| vec![0.0; SEQUENCE_ALPHABET.len()]).collect()
            }),
            BranchValue::OneHot(rows) => rows.clone(),
            BranchValue::Scores(s) => s.iter().map(|v| vec![*v]).collect(),
        }
    }

    /// Flattened cell text.
    pub fn to_field(&self) -> String {
        match self {
            BranchValue::Bases(s) => {
                let mut out = String::with_capacity(s.len() * 2);
                for (i, c) in s.chars().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push(c);
                }
                out
            }
            BranchValue::Scores(s) => s
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            BranchValue::OneHot(rows) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Parse a cell written by `to_field` for a column of `branch`.
    pub fn parse(branch: Branch, field: &str) -> Result<Self, String> {
        if field.is_empty() {
            return Ok(match branch {
                Branch::Sequence => BranchValue::Bases(String::new()),
                Branch::Conservation => BranchValue::Scores(Vec::new()),
                Branch::Structure => BranchValue::OneHot(Vec::new()),
            });
        }

        let items: Vec<&str> = field.split(',').collect();

        if branch == Branch::Conservation {
            return items
                .iter()
                .map(|s| parse_f32(s))
                .collect::<Result<Vec<_>, _>>()
                .map(BranchValue::Scores);
        }

        if items[0].contains(' ') {
            return items
                .iter()
                .map(|row| row.split(' ').map(parse_f32).collect::<Result<Vec<_>, _>>())
                .collect::<Result<Vec<_>, _>>()
                .map(BranchValue::OneHot);
        }

        let mut bases = String::with_capacity(items.len());
        for item in items {
            let mut chars = item.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => bases.push(c),
                _ => return Err(format!("expected a single base, got '{}'", item)),
            }
        }
        Ok(BranchValue::Bases(bases))
    }
}

fn parse_f32(s: &str) -> Result<f32, String> {
    s.parse::<f32>()
        .map_err(|_| format!("invalid number '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bases_field() {
        let v = BranchValue::Bases("GTAC".to_string());
        assert_eq!(v.to_field(), "G,T,A,C");
        assert_eq!(BranchValue::parse(Branch::Sequence, "G,T,A,C").unwrap(), v);
    }

    #[test]
    fn test_scores_field_keeps_precision() {
        let v = BranchValue::Scores(vec![0.1, -2.25, 1.0, 3.3333333]);
        let field = v.to_field();
        assert_eq!(BranchValue::parse(Branch::Conservation, &field).unwrap(), v);
    }

    #[test]
    fn test_one_hot_field() {
        let v = BranchValue::OneHot(vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]);
        assert_eq!(v.to_field(), "1 0 0,0 0 1");
        assert_eq!(BranchValue::parse(Branch::Structure, "1 0 0,0 0 1").unwrap(), v);
        assert_eq!(BranchValue::parse(Branch::Sequence, "1 0 0,0 0 1").unwrap(), v);
    }

    #[test]
    fn test_empty_field_per_branch() {
        assert_eq!(
            BranchValue::parse(Branch::Conservation, "").unwrap(),
            BranchValue::Scores(vec![])
        );
        assert!(BranchValue::parse(Branch::Sequence, "").unwrap().is_empty());
    }

    #[test]
    fn test_bad_cells_rejected() {
        assert!(BranchValue::parse(Branch::Conservation, "1,x").is_err());
        assert!(BranchValue::parse(Branch::Sequence, "AC,G").is_err());
    }

    #[test]
    fn test_matrix_shapes() {
        let bases = BranchValue::Bases("AN".to_string());
        assert_eq!(
            bases.to_matrix(),
            vec![vec![1.0, 0.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 0.0, 1.0]]
        );
        let scores = BranchValue::Scores(vec![0.5, 0.25]);
        assert_eq!(scores.to_matrix(), vec![vec![0.5], vec![0.25]]);
    }
}
