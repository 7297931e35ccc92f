use serde::{Deserialize, Serialize};

use difftrack_types::{PatchOp, PatchOpKind};

/// Operation counts over a patch list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub replacements: usize,
}

impl DiffSummary {
    pub fn from_patches(patches: &[PatchOp]) -> Self {
        patches.iter().fold(Self::default(), |mut summary, patch| {
            match patch.op {
                PatchOpKind::Add => summary.additions += 1,
                PatchOpKind::Remove => summary.removals += 1,
                PatchOpKind::Replace => summary.replacements += 1,
            }
            summary
        })
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.additions + self.removals + self.replacements
    }

    /// Returns `true` if there are no operations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::diff;
    use serde_json::json;

    #[test]
    fn mixed_changes() {
        let old = json!({"keep": true, "modify": "old", "remove": 42});
        let new = json!({"keep": true, "modify": "new", "added": [1, 2, 3]});

        let summary = DiffSummary::from_patches(&diff(&old, &new));
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.replacements, 1);
    }

    #[test]
    fn empty_summary() {
        assert!(DiffSummary::from_patches(&[]).is_empty());
    }
}
