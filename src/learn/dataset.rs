//! Projection of samples onto a learning unit's features and labels

use crate::ir::Var;
use crate::semantics::state::Assignment;

/// Column-major training data for one learning unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Feature variables, one per column
    pub features: Vec<Var>,
    pub columns: Vec<Vec<bool>>,
    /// Target variables, one per label column
    pub targets: Vec<Var>,
    pub labels: Vec<Vec<bool>>,
}

impl Dataset {
    /// Project `samples` onto `features` and `targets`
    ///
    /// Feature columns that are constant over all samples carry no split and
    /// are dropped.
    pub fn project(samples: &[Assignment], features: &[Var], targets: &[Var]) -> Self {
        let mut kept = Vec::new();
        let mut columns = Vec::new();
        for &f in features {
            let column: Vec<bool> = samples.iter().map(|s| s.get(f)).collect();
            if column.iter().any(|&b| b) && column.iter().any(|&b| !b) {
                kept.push(f);
                columns.push(column);
            }
        }
        let labels = targets
            .iter()
            .map(|&t| samples.iter().map(|s| s.get(t)).collect())
            .collect();
        Self {
            features: kept,
            columns,
            targets: targets.to_vec(),
            labels,
        }
    }

    pub fn num_samples(&self) -> usize {
        self.labels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn num_outputs(&self) -> usize {
        self.targets.len()
    }

    /// The single value of a label column, if it never changes
    pub fn constant_label(&self, output: usize) -> Option<bool> {
        let column = self.labels.get(output)?;
        let first = *column.first()?;
        column.iter().all(|&b| b == first).then_some(first)
    }

    /// Every label column is constant
    pub fn all_labels_constant(&self) -> bool {
        (0..self.num_outputs()).all(|k| self.constant_label(k).is_some())
    }
}
