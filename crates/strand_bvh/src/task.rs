//! The parallel build engine: pending-subtree queue and worker pools.
//!
//! Pending subtrees wait in a max-heap keyed on reference count so
//! workers always pull the largest open problem, keeping the pool busy
//! during the wide early phase of the build. Ties pop in insertion order
//! for reproducibility. A task stays counted as active from the moment
//! it is queued until the worker that popped it either finishes the
//! subtree or has queued its children, so no worker can mistake a
//! momentarily empty heap for a finished build.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};

use strand_math::OrientedBox;

use crate::prim_info::PrimInfo;
use crate::ref_list::RefList;

/// Where a finished subtree's reference gets written.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ChildSlot {
    Root,
    Aligned { node: usize, slot: usize },
    Unaligned { node: usize, slot: usize },
}

/// One pending subtree.
pub(crate) struct BuildTask {
    pub dst: ChildSlot,
    pub depth: usize,
    pub pinfo: PrimInfo,
    pub prims: RefList,
    pub bounds: OrientedBox,
}

struct HeapEntry {
    size: usize,
    seq: u64,
    task: BuildTask,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// Largest size first; earlier insertion wins ties.
    fn cmp(&self, other: &Self) -> Ordering {
        self.size
            .cmp(&other.size)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    heap: BinaryHeap<HeapEntry>,
    /// Tasks queued or currently being processed.
    active: usize,
    next_seq: u64,
}

/// Shared work queue for build workers.
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                active: 0,
                next_seq: 0,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn push(&self, task: BuildTask) {
        let mut state = self.state.lock().unwrap();
        state.active += 1;
        let entry = HeapEntry {
            size: task.pinfo.size(),
            seq: state.next_seq,
            task,
        };
        state.next_seq += 1;
        state.heap.push(entry);
        drop(state);
        self.ready.notify_one();
    }

    /// Blocks for the largest pending task; `None` once every task has
    /// completed.
    pub fn pop(&self) -> Option<BuildTask> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.active == 0 {
                return None;
            }
            if let Some(entry) = state.heap.pop() {
                return Some(entry.task);
            }
            state = self.ready.wait(state).unwrap();
        }
    }

    /// Marks a popped task finished without children (it was, or will
    /// be, completed outside the queue).
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.active -= 1;
        if state.active == 0 {
            drop(state);
            self.ready.notify_all();
        }
    }

    /// Queues a popped task's children and retires the parent in one
    /// critical section.
    pub fn finish_into(&self, children: Vec<BuildTask>) {
        let mut state = self.state.lock().unwrap();
        for task in children {
            state.active += 1;
            let entry = HeapEntry {
                size: task.pinfo.size(),
                seq: state.next_seq,
                task,
            };
            state.next_seq += 1;
            state.heap.push(entry);
        }
        state.active -= 1;
        drop(state);
        self.ready.notify_all();
    }
}

/// Supplies the worker threads that drain the task queue.
///
/// `worker` is called once per thread as `worker(thread_index,
/// thread_count)` and must be driven until it returns.
pub trait WorkerPool: Sync {
    fn execute(&self, thread_count: usize, worker: &(dyn Fn(usize, usize) + Sync));
}

/// Runs workers on rayon's global thread pool.
pub struct RayonPool;

impl WorkerPool for RayonPool {
    fn execute(&self, thread_count: usize, worker: &(dyn Fn(usize, usize) + Sync)) {
        rayon::scope(|scope| {
            for thread_index in 0..thread_count {
                scope.spawn(move |_| worker(thread_index, thread_count));
            }
        });
    }
}

/// Runs a single worker on the calling thread.
pub struct SerialPool;

impl WorkerPool for SerialPool {
    fn execute(&self, _thread_count: usize, worker: &(dyn Fn(usize, usize) + Sync)) {
        worker(0, 1);
    }
}
