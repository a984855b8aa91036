use std::collections::BTreeSet;

use zigkeep_core::{total_size_bytes, VersionRecord};

/// Keep-last-N partition of installed versions, newest first in both halves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: Vec<VersionRecord>,
    pub remove: Vec<VersionRecord>,
}

impl RetentionPlan {
    /// `keep_last == 0` disables automatic removal. The active version never lands
    /// in `remove` and does not count against `keep_last`.
    pub fn compute(records: &[VersionRecord], keep_last: usize) -> Self {
        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| b.installed_at.cmp(&a.installed_at));

        if keep_last == 0 {
            return Self {
                keep: sorted,
                remove: Vec::new(),
            };
        }

        let protected = sorted
            .iter()
            .filter(|record| record.is_active)
            .map(|record| record.version.clone())
            .collect::<BTreeSet<_>>();

        let mut plan = Self::default();
        let mut kept = 0_usize;
        for record in sorted {
            if record.is_active || protected.contains(&record.version) {
                plan.keep.push(record);
                continue;
            }
            if kept < keep_last {
                kept += 1;
                plan.keep.push(record);
            } else {
                plan.remove.push(record);
            }
        }
        plan
    }

    pub fn is_noop(&self) -> bool {
        self.remove.is_empty()
    }

    pub fn reclaimable_bytes(&self) -> u64 {
        total_size_bytes(&self.remove)
    }

    pub fn kept_versions(&self) -> Vec<&str> {
        self.keep.iter().map(|record| record.version.as_str()).collect()
    }

    pub fn removed_versions(&self) -> Vec<&str> {
        self.remove
            .iter()
            .map(|record| record.version.as_str())
            .collect()
    }
}

pub fn plan_removals(records: &[VersionRecord], keep_last: usize) -> Vec<VersionRecord> {
    RetentionPlan::compute(records, keep_last).remove
}
