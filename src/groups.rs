use crate::error::PipelineError;
use crate::models::PercentileTables;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Two groups that declared the same subject combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCollision {
    pub subjects: Vec<String>,
    pub replaced: String,
    pub kept: String,
}

/// Exact subject-set -> group id lookup.
#[derive(Debug, Clone, Default)]
pub struct SubjectGroupIndex {
    groups: HashMap<BTreeSet<String>, String>,
    collisions: Vec<SubjectCollision>,
}

impl SubjectGroupIndex {
    /// Index every group in ascending group-id order.
    ///
    /// When two groups share a combination the later one replaces the earlier
    /// mapping; each replacement is logged and kept in [`Self::collisions`].
    pub fn build(tables: &PercentileTables) -> Self {
        let mut index = Self::default();
        for (group_id, group) in tables {
            let subjects = group.subject_set();
            if let Some(previous) = index.groups.insert(subjects.clone(), group_id.clone()) {
                warn!(
                    subjects = ?subjects,
                    replaced = %previous,
                    kept = %group_id,
                    "duplicate subject combination, later group wins"
                );
                index.collisions.push(SubjectCollision {
                    subjects: subjects.into_iter().collect(),
                    replaced: previous,
                    kept: group_id.clone(),
                });
            }
        }
        index
    }

    /// Like [`Self::build`] but refuses ambiguous tables.
    pub fn build_strict(tables: &PercentileTables) -> Result<Self, PipelineError> {
        let index = Self::build(tables);
        match index.collisions.first() {
            Some(collision) => Err(PipelineError::DuplicateSubjectGroup {
                subjects: collision.subjects.clone(),
                previous: collision.replaced.clone(),
                current: collision.kept.clone(),
            }),
            None => Ok(index),
        }
    }

    pub fn lookup(&self, subjects: &BTreeSet<String>) -> Option<&str> {
        self.groups.get(subjects).map(String::as_str)
    }

    /// Order-insensitive lookup for any list of subject names.
    pub fn lookup_names<I, S>(&self, subjects: I) -> Option<&str>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = subjects.into_iter().map(Into::into).collect();
        self.lookup(&set)
    }

    pub fn collisions(&self) -> &[SubjectCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
