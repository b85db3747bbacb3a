//! Per-node execution status for progress views
//!
//! Built from a plan and fed the executor's per-operation results. Every
//! planned directory, and every ancestor up to the destination root,
//! aggregates the outcomes of the files planned beneath it.

use crate::plan::{Operation, Plan};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    /// Some but not all planned children succeeded
    Partial,
    Complete,
    Failed,
}

#[derive(Debug, Default, Clone, Copy)]
struct DirProgress {
    planned: usize,
    succeeded: usize,
    failed: usize,
    created: Option<bool>,
}

impl DirProgress {
    fn status(&self) -> NodeStatus {
        if self.failed > 0 || self.created == Some(false) {
            NodeStatus::Failed
        } else if self.planned == 0 {
            match self.created {
                Some(true) => NodeStatus::Complete,
                _ => NodeStatus::Pending,
            }
        } else if self.succeeded == self.planned {
            NodeStatus::Complete
        } else if self.succeeded > 0 {
            NodeStatus::Partial
        } else {
            NodeStatus::Pending
        }
    }
}

/// Tracks directory and file status while a plan executes
#[derive(Debug)]
pub struct ExecutionTracker {
    root: PathBuf,
    dirs: BTreeMap<PathBuf, DirProgress>,
    files: HashMap<PathBuf, NodeStatus>,
}

impl ExecutionTracker {
    pub fn new(plan: &Plan, destination_root: &Path) -> Self {
        Self::from_operations(&plan.operations, destination_root)
    }

    pub fn from_operations(operations: &[Operation], destination_root: &Path) -> Self {
        let mut tracker = Self {
            root: destination_root.to_path_buf(),
            dirs: BTreeMap::new(),
            files: HashMap::new(),
        };

        for op in operations {
            match op {
                Operation::MakeDir { dir } => {
                    tracker.dirs.entry(dir.clone()).or_default();
                }
                Operation::Copy { destination, .. } | Operation::Move { destination, .. } => {
                    tracker.files.insert(destination.clone(), NodeStatus::Pending);
                    for dir in ancestors_within(destination, &tracker.root) {
                        tracker.dirs.entry(dir.to_path_buf()).or_default().planned += 1;
                    }
                }
                Operation::Delete { .. } => {}
            }
        }
        tracker
    }

    /// Apply one operation outcome, as reported by the executor
    pub fn record(&mut self, op: &Operation, success: bool) {
        match op {
            Operation::MakeDir { dir } => {
                if let Some(progress) = self.dirs.get_mut(dir) {
                    progress.created = Some(success);
                }
                if !success {
                    for parent in ancestors_within(dir, &self.root) {
                        self.dirs.entry(parent.to_path_buf()).or_default().failed += 1;
                    }
                }
            }
            Operation::Copy { destination, .. } | Operation::Move { destination, .. } => {
                let status = if success {
                    NodeStatus::Complete
                } else {
                    NodeStatus::Failed
                };
                self.files.insert(destination.clone(), status);

                for dir in ancestors_within(destination, &self.root) {
                    if let Some(progress) = self.dirs.get_mut(dir) {
                        if success {
                            progress.succeeded += 1;
                        } else {
                            progress.failed += 1;
                        }
                    }
                }
            }
            Operation::Delete { .. } => {}
        }
    }

    pub fn dir_status(&self, dir: &Path) -> Option<NodeStatus> {
        self.dirs.get(dir).map(DirProgress::status)
    }

    pub fn file_status(&self, file: &Path) -> Option<NodeStatus> {
        self.files.get(file).copied()
    }

    /// All tracked directories in path order
    pub fn directories(&self) -> impl Iterator<Item = (&Path, NodeStatus)> {
        self.dirs
            .iter()
            .map(|(path, progress)| (path.as_path(), progress.status()))
    }
}

/// Parent directories of `path`, nearest first, stopping at `root`
fn ancestors_within<'p>(path: &'p Path, root: &'p Path) -> impl Iterator<Item = &'p Path> {
    path.ancestors()
        .skip(1)
        .take_while(move |dir| dir.starts_with(root))
}
