//! Stateright model of the lock-free list's mark-then-unlink protocol.
//!
//! Each thread runs a fixed program of inserts and deletes. An operation
//! is split into the steps whose interleaving matters:
//!
//! | Step | Effect |
//! |------|--------|
//! | `Locate` | atomic traversal from head, unlinking marked nodes met on the way |
//! | `InsertCas` | link a new node if `pred` is unmarked and still points at `curr` |
//! | `MarkCas` | set `curr`'s mark if it is still clear (linearization of delete) |
//! | `UnlinkCas` | best-effort physical removal after a successful mark |
//!
//! A failed CAS sends the thread back to `Locate`. Nodes are never freed;
//! an unlinked node is flagged `retired` instead, so that stale windows can
//! still be evaluated, mirroring epoch-deferred destruction.

use std::collections::{BTreeMap, BTreeSet};

use cl_core::{Key, KEY_MAX, KEY_MIN};
use stateright::Model;

/// Index of a node in the model's arena.
pub type NodeId = u64;

/// Index of a thread.
pub type ThreadId = u64;

const HEAD: NodeId = 0;
const TAIL: NodeId = 1;

/// One operation in a thread's program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOp {
    Insert(Key),
    Delete(Key),
}

impl ListOp {
    fn key(self) -> Key {
        match self {
            ListOp::Insert(key) | ListOp::Delete(key) => key,
        }
    }
}

/// A node of the modelled list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub key: Key,
    pub next: Option<NodeId>,
    /// Deletion mark carried by the node's link.
    pub marked: bool,
    /// Unlinked and handed to the collector.
    pub retired: bool,
}

/// Where a thread is within its current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// About to (re)start the operation at `pc`.
    Locate,
    InsertWindow { pred: NodeId, curr: NodeId },
    DeleteWindow { pred: NodeId, curr: NodeId },
    /// Mark succeeded; the node still has to be unlinked.
    Unlink { pred: NodeId, curr: NodeId, succ: NodeId },
    /// Program finished.
    Done,
}

/// Per-thread state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadState {
    /// Index of the current operation in the thread's program
    pub pc: usize,
    pub phase: Phase,
    /// Return values of the completed operations
    pub results: Vec<bool>,
}

/// State of the lock-free list model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListState {
    /// Every node ever allocated, retired ones included
    pub nodes: BTreeMap<NodeId, Node>,
    /// Counter for allocating new node IDs
    pub node_id_next: NodeId,
    /// Abstract set, updated at the linearization points
    pub abstract_set: BTreeSet<Key>,
    pub threads: BTreeMap<ThreadId, ThreadState>,
}

impl ListState {
    /// Empty list (sentinels only) with idle threads.
    pub fn new(threads_count: u64) -> Self {
        debug_assert!(threads_count > 0, "Must have at least one thread");
        debug_assert!(threads_count <= 4, "Model checking with many threads is slow");

        let mut nodes = BTreeMap::new();
        nodes.insert(
            HEAD,
            Node {
                key: KEY_MIN,
                next: Some(TAIL),
                marked: false,
                retired: false,
            },
        );
        nodes.insert(
            TAIL,
            Node {
                key: KEY_MAX,
                next: None,
                marked: false,
                retired: false,
            },
        );

        let threads = (0..threads_count)
            .map(|tid| {
                (
                    tid,
                    ThreadState {
                        pc: 0,
                        phase: Phase::Locate,
                        results: Vec::new(),
                    },
                )
            })
            .collect();

        Self {
            nodes,
            node_id_next: TAIL + 1,
            abstract_set: BTreeSet::new(),
            threads,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }

    /// Node ids reachable from the head, head and tail included.
    pub fn chain(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = Some(HEAD);

        while let Some(id) = current {
            // A cycle can only come from a broken protocol; stop rather than spin.
            if ids.len() > self.nodes.len() {
                break;
            }
            ids.push(id);
            current = self.nodes.get(&id).and_then(|n| n.next);
        }
        ids
    }

    /// Keys of the reachable, unmarked interior nodes.
    pub fn contents(&self) -> Vec<Key> {
        self.chain()
            .into_iter()
            .filter(|id| *id != HEAD && *id != TAIL)
            .map(|id| self.node(id))
            .filter(|n| !n.marked)
            .map(|n| n.key)
            .collect()
    }

    /// Whether every thread has finished its program.
    pub fn all_done(&self) -> bool {
        self.threads.values().all(|t| t.phase == Phase::Done)
    }

    /// Atomic traversal with helping, as performed by `locate`.
    ///
    /// Returns the window `(pred, curr)` where `curr` is the first unmarked
    /// node with `key >= target`.
    fn locate(&mut self, target: Key) -> (NodeId, NodeId) {
        let mut pred = HEAD;
        let mut curr = self.node(HEAD).next.unwrap_or(TAIL);

        loop {
            while self.node(curr).marked {
                let succ = self.node(curr).next.unwrap_or(TAIL);
                self.unlink(pred, curr, succ);
                curr = succ;
            }
            if self.node(curr).key >= target {
                return (pred, curr);
            }
            pred = curr;
            curr = self.node(curr).next.unwrap_or(TAIL);
        }
    }

    /// CAS `pred.next` from unmarked `curr` to `succ`.
    fn unlink(&mut self, pred: NodeId, curr: NodeId, succ: NodeId) -> bool {
        let pred_node = self.node(pred);
        if pred_node.marked || pred_node.next != Some(curr) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(&pred) {
            node.next = Some(succ);
        }
        if let Some(node) = self.nodes.get_mut(&curr) {
            node.retired = true;
        }
        true
    }

    fn finish_op(&mut self, tid: ThreadId, result: bool, program_len: usize) {
        if let Some(thread) = self.threads.get_mut(&tid) {
            thread.results.push(result);
            thread.pc += 1;
            thread.phase = if thread.pc >= program_len {
                Phase::Done
            } else {
                Phase::Locate
            };
        }
    }

    fn set_phase(&mut self, tid: ThreadId, phase: Phase) {
        if let Some(thread) = self.threads.get_mut(&tid) {
            thread.phase = phase;
        }
    }

    // ========== Invariants ==========

    /// Keys along the physical chain strictly increase from head to tail.
    pub fn chain_sorted(&self) -> bool {
        let keys: Vec<Key> = self.chain().into_iter().map(|id| self.node(id).key).collect();
        keys.windows(2).all(|w| w[0] < w[1])
    }

    /// No two reachable unmarked nodes share a key.
    pub fn no_duplicate_unmarked(&self) -> bool {
        let contents = self.contents();
        let unique: BTreeSet<Key> = contents.iter().copied().collect();
        unique.len() == contents.len()
    }

    /// The logical contents equal the abstract set.
    pub fn matches_abstract_set(&self) -> bool {
        let contents: BTreeSet<Key> = self.contents().into_iter().collect();
        contents == self.abstract_set
    }

    /// Head and tail are unmarked, reachable, and bound the chain.
    pub fn sentinels_intact(&self) -> bool {
        let head = self.node(HEAD);
        let tail = self.node(TAIL);
        let chain = self.chain();

        !head.marked
            && !tail.marked
            && head.key == KEY_MIN
            && tail.key == KEY_MAX
            && tail.next.is_none()
            && chain.last() == Some(&TAIL)
    }

    /// No retired node is reachable from the head.
    pub fn retired_unreachable(&self) -> bool {
        self.chain().into_iter().all(|id| !self.node(id).retired)
    }

    /// Combined invariant check.
    pub fn invariants_hold(&self) -> bool {
        self.chain_sorted()
            && self.no_duplicate_unmarked()
            && self.matches_abstract_set()
            && self.sentinels_intact()
            && self.retired_unreachable()
    }
}

/// Step a thread can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListAction {
    Locate { thread: ThreadId },
    InsertCas { thread: ThreadId },
    MarkCas { thread: ThreadId },
    UnlinkCas { thread: ThreadId },
}

/// Model for bounded model checking.
pub struct ListModel {
    /// One program per thread
    pub programs: Vec<Vec<ListOp>>,
}

impl ListModel {
    /// Create a model running `programs`, one per thread.
    pub fn new(programs: Vec<Vec<ListOp>>) -> Self {
        debug_assert!(!programs.is_empty(), "Need at least one thread");
        debug_assert!(
            programs.iter().flatten().all(|op| op.key() > KEY_MIN && op.key() < KEY_MAX),
            "Programs must not touch sentinel keys"
        );

        Self { programs }
    }

    fn program(&self, tid: ThreadId) -> &[ListOp] {
        self.programs.get(tid as usize).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Model for ListModel {
    type State = ListState;
    type Action = ListAction;

    fn init_states(&self) -> Vec<Self::State> {
        let mut state = ListState::new(self.programs.len() as u64);
        for (tid, thread) in state.threads.iter_mut() {
            if self.program(*tid).is_empty() {
                thread.phase = Phase::Done;
            }
        }
        vec![state]
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        for (&thread, thread_state) in &state.threads {
            match thread_state.phase {
                Phase::Locate => actions.push(ListAction::Locate { thread }),
                Phase::InsertWindow { .. } => actions.push(ListAction::InsertCas { thread }),
                Phase::DeleteWindow { .. } => actions.push(ListAction::MarkCas { thread }),
                Phase::Unlink { .. } => actions.push(ListAction::UnlinkCas { thread }),
                Phase::Done => {}
            }
        }
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut next = state.clone();

        match action {
            ListAction::Locate { thread } => {
                let pc = next.threads.get(&thread)?.pc;
                let program = self.program(thread);
                let op = *program.get(pc)?;
                let (pred, curr) = next.locate(op.key());
                let found = next.node(curr).key == op.key();

                match (op, found) {
                    (ListOp::Insert(_), true) | (ListOp::Delete(_), false) => {
                        next.finish_op(thread, false, program.len());
                    }
                    (ListOp::Insert(_), false) => {
                        next.set_phase(thread, Phase::InsertWindow { pred, curr });
                    }
                    (ListOp::Delete(_), true) => {
                        next.set_phase(thread, Phase::DeleteWindow { pred, curr });
                    }
                }
            }

            ListAction::InsertCas { thread } => {
                let thread_state = next.threads.get(&thread)?;
                let Phase::InsertWindow { pred, curr } = thread_state.phase else {
                    return None;
                };
                let program = self.program(thread);
                let key = program.get(thread_state.pc)?.key();

                let pred_node = next.node(pred);
                if !pred_node.marked && pred_node.next == Some(curr) {
                    let node_id = next.node_id_next;
                    next.node_id_next += 1;
                    next.nodes.insert(
                        node_id,
                        Node {
                            key,
                            next: Some(curr),
                            marked: false,
                            retired: false,
                        },
                    );
                    if let Some(node) = next.nodes.get_mut(&pred) {
                        node.next = Some(node_id);
                    }
                    next.abstract_set.insert(key);
                    next.finish_op(thread, true, program.len());
                } else {
                    next.set_phase(thread, Phase::Locate);
                }
            }

            ListAction::MarkCas { thread } => {
                let thread_state = next.threads.get(&thread)?;
                let Phase::DeleteWindow { pred, curr } = thread_state.phase else {
                    return None;
                };

                let curr_node = next.node(curr);
                if curr_node.marked {
                    next.set_phase(thread, Phase::Locate);
                } else {
                    let key = curr_node.key;
                    let succ = curr_node.next.unwrap_or(TAIL);
                    if let Some(node) = next.nodes.get_mut(&curr) {
                        node.marked = true;
                    }
                    next.abstract_set.remove(&key);
                    next.set_phase(thread, Phase::Unlink { pred, curr, succ });
                }
            }

            ListAction::UnlinkCas { thread } => {
                let thread_state = next.threads.get(&thread)?;
                let Phase::Unlink { pred, curr, succ } = thread_state.phase else {
                    return None;
                };

                // Best effort: a failed CAS leaves the node for a later traversal.
                next.unlink(pred, curr, succ);
                next.finish_op(thread, true, self.program(thread).len());
            }
        }

        Some(next)
    }

    fn properties(&self) -> Vec<stateright::Property<Self>> {
        vec![
            stateright::Property::always("ChainSorted", |_model: &Self, state: &Self::State| {
                state.chain_sorted()
            }),
            stateright::Property::always(
                "NoDuplicateUnmarked",
                |_model: &Self, state: &Self::State| state.no_duplicate_unmarked(),
            ),
            stateright::Property::always(
                "MatchesAbstractSet",
                |_model: &Self, state: &Self::State| state.matches_abstract_set(),
            ),
            stateright::Property::always("SentinelsIntact", |_model: &Self, state: &Self::State| {
                state.sentinels_intact()
            }),
            stateright::Property::always(
                "RetiredUnreachable",
                |_model: &Self, state: &Self::State| state.retired_unreachable(),
            ),
            stateright::Property::sometimes("ProgramsComplete", |_model: &Self, state: &Self::State| {
                state.all_done()
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stateright::Checker;

    #[test]
    fn test_initial_state() {
        let state = ListState::new(2);
        assert_eq!(state.chain(), vec![HEAD, TAIL]);
        assert!(state.contents().is_empty());
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_sequential_program() {
        let model = ListModel::new(vec![vec![
            ListOp::Insert(2),
            ListOp::Insert(1),
            ListOp::Insert(2),
            ListOp::Delete(1),
            ListOp::Delete(3),
        ]]);

        let mut state = model.init_states().remove(0);
        while !state.all_done() {
            let mut actions = Vec::new();
            model.actions(&state, &mut actions);
            let action = actions.remove(0);
            state = model.next_state(&state, action).unwrap();
            assert!(state.invariants_hold());
        }

        assert_eq!(state.threads[&0].results, vec![true, true, false, true, false]);
        assert_eq!(state.contents(), vec![2]);
    }

    #[test]
    fn test_stale_insert_window_retries() {
        let model = ListModel::new(vec![vec![ListOp::Insert(5)], vec![ListOp::Insert(3)]]);
        let mut state = model.init_states().remove(0);

        // Both threads locate the same window (head, tail).
        state = model.next_state(&state, ListAction::Locate { thread: 0 }).unwrap();
        state = model.next_state(&state, ListAction::Locate { thread: 1 }).unwrap();

        state = model.next_state(&state, ListAction::InsertCas { thread: 1 }).unwrap();
        state = model.next_state(&state, ListAction::InsertCas { thread: 0 }).unwrap();
        assert_eq!(state.threads[&0].phase, Phase::Locate);

        state = model.next_state(&state, ListAction::Locate { thread: 0 }).unwrap();
        state = model.next_state(&state, ListAction::InsertCas { thread: 0 }).unwrap();
        assert!(state.all_done());
        assert_eq!(state.contents(), vec![3, 5]);
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_marked_node_is_unlinked_by_traversal() {
        let model = ListModel::new(vec![
            vec![ListOp::Insert(4), ListOp::Delete(4)],
            vec![ListOp::Insert(6)],
        ]);
        let mut state = model.init_states().remove(0);

        state = model.next_state(&state, ListAction::Locate { thread: 0 }).unwrap();
        state = model.next_state(&state, ListAction::InsertCas { thread: 0 }).unwrap();
        state = model.next_state(&state, ListAction::Locate { thread: 0 }).unwrap();
        state = model.next_state(&state, ListAction::MarkCas { thread: 0 }).unwrap();
        assert!(state.contents().is_empty());
        assert_eq!(state.chain().len(), 3);

        // Thread 1 helps remove the marked node, so thread 0's unlink fails.
        state = model.next_state(&state, ListAction::Locate { thread: 1 }).unwrap();
        assert_eq!(state.chain().len(), 2);
        state = model.next_state(&state, ListAction::UnlinkCas { thread: 0 }).unwrap();
        assert_eq!(state.threads[&0].results, vec![true, true]);
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_model_checking_small() {
        let model = ListModel::new(vec![
            vec![ListOp::Insert(1), ListOp::Delete(1)],
            vec![ListOp::Insert(1), ListOp::Insert(2)],
        ]);

        model
            .checker()
            .threads(1)
            .spawn_bfs()
            .join()
            .assert_properties();
    }

    #[test]
    fn test_model_checking_conflicting_deletes() {
        let model = ListModel::new(vec![
            vec![ListOp::Insert(2), ListOp::Delete(2), ListOp::Delete(1)],
            vec![ListOp::Insert(1), ListOp::Delete(2), ListOp::Insert(2)],
        ]);

        model
            .checker()
            .threads(1)
            .spawn_bfs()
            .join()
            .assert_properties();
    }

    #[test]
    #[ignore] // Slower test, run with --ignored
    fn test_model_checking_medium() {
        let model = ListModel::new(vec![
            vec![ListOp::Insert(1), ListOp::Delete(2), ListOp::Insert(3)],
            vec![ListOp::Insert(2), ListOp::Delete(1), ListOp::Delete(3)],
            vec![ListOp::Insert(3), ListOp::Insert(1), ListOp::Delete(2)],
        ]);

        model
            .checker()
            .threads(num_cpus::get())
            .spawn_bfs()
            .join()
            .assert_properties();
    }
}
