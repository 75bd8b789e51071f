//! Workload profiles and operation generation.

use std::fmt;

use serde::Serialize;

use cl_core::{ConcurrentSet, Key};
use cl_dst::DeterministicRng;

/// Kind of set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Search,
    Insert,
    Delete,
}

impl OperationKind {
    /// All kinds, in profile order.
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Search,
        OperationKind::Insert,
        OperationKind::Delete,
    ];

    /// Get the name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Search => "Search",
            OperationKind::Insert => "Insert",
            OperationKind::Delete => "Delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One generated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub key: Key,
}

impl Operation {
    /// Apply to `set`, returning the operation's result.
    #[inline]
    pub fn apply<S: ConcurrentSet>(&self, set: &S) -> bool {
        match self.kind {
            OperationKind::Search => set.search(self.key),
            OperationKind::Insert => set.insert(self.key),
            OperationKind::Delete => set.delete(self.key),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.key)
    }
}

/// Distribution over operation kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadProfile {
    pub name: &'static str,
    pub search: f64,
    pub insert: f64,
    pub delete: f64,
}

impl WorkloadProfile {
    /// Create a profile; the fractions must sum to 1.
    pub fn new(name: &'static str, search: f64, insert: f64, delete: f64) -> Self {
        debug_assert!(
            [search, insert, delete].iter().all(|f| (0.0..=1.0).contains(f)),
            "Fractions must be in [0.0, 1.0]"
        );
        debug_assert!(
            ((search + insert + delete) - 1.0).abs() < 1e-9,
            "Fractions must sum to 1"
        );

        Self {
            name,
            search,
            insert,
            delete,
        }
    }

    /// 90% search, 9% insert, 1% delete.
    pub fn read_dominated() -> Self {
        Self::new("read-dominated", 0.90, 0.09, 0.01)
    }

    /// 50% search, 25% insert, 25% delete.
    pub fn mixed() -> Self {
        Self::new("mixed", 0.50, 0.25, 0.25)
    }

    /// 10% search, 45% insert, 45% delete.
    pub fn write_dominated() -> Self {
        Self::new("write-dominated", 0.10, 0.45, 0.45)
    }

    /// The three fixed profiles, in report order.
    pub fn standard() -> Vec<Self> {
        vec![Self::read_dominated(), Self::mixed(), Self::write_dominated()]
    }

    /// Each kind paired with its fraction.
    pub fn mix(&self) -> [(OperationKind, f64); 3] {
        [
            (OperationKind::Search, self.search),
            (OperationKind::Insert, self.insert),
            (OperationKind::Delete, self.delete),
        ]
    }

    /// E.g. `read-dominated: 0.9 Search 0.09 Insert 0.01 Delete`.
    pub fn describe(&self) -> String {
        let mix = self
            .mix()
            .iter()
            .map(|(kind, fraction)| format!("{} {}", fraction, kind))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}: {}", self.name, mix)
    }
}

/// Generate `total` operations following `profile` and split them across
/// `threads` groups.
///
/// Each kind gets `floor(fraction * total)` operations; whatever rounding
/// leaves over gets a uniformly random kind. Keys are uniform in
/// `1..=max_key`. After a shuffle, every group takes `total / threads`
/// consecutive operations and each remaining operation joins a random group.
pub fn generate_operations(
    profile: &WorkloadProfile,
    threads: usize,
    total: usize,
    max_key: Key,
    rng: &mut DeterministicRng,
) -> Vec<Vec<Operation>> {
    debug_assert!(threads > 0, "Need at least one thread");
    debug_assert!(max_key >= 1, "Key range must not be empty");

    let mut operations = Vec::with_capacity(total);

    for (kind, fraction) in profile.mix() {
        let count = ((fraction * total as f64).floor() as usize).min(total - operations.len());
        for _ in 0..count {
            operations.push(Operation {
                kind,
                key: rng.gen_key(max_key),
            });
        }
    }
    while operations.len() < total {
        let kind = OperationKind::ALL[rng.gen_index(OperationKind::ALL.len())];
        operations.push(Operation {
            kind,
            key: rng.gen_key(max_key),
        });
    }

    rng.shuffle(&mut operations);

    let per_thread = total / threads;
    let mut remaining = operations.into_iter();
    let mut groups: Vec<Vec<Operation>> = (0..threads)
        .map(|_| remaining.by_ref().take(per_thread).collect())
        .collect();

    for operation in remaining {
        let thread = rng.gen_index(threads);
        groups[thread].push(operation);
    }

    groups
}
