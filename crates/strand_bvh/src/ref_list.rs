//! Chunked reference lists and the block recycler behind them.
//!
//! Splitting partitions large reference sets over and over; a linked list
//! of fixed-capacity blocks lets a partition consume its input block by
//! block and hand the emptied storage straight back for the output sides.

use std::sync::Mutex;

use crate::curve::CurveSegment;

/// Number of curve references per block.
pub(crate) const BLOCK_CAPACITY: usize = 64;

/// One fixed-capacity chunk of a reference list.
pub struct RefBlock {
    items: Vec<CurveSegment>,
    next: Option<Box<RefBlock>>,
}

impl RefBlock {
    fn new() -> Self {
        Self {
            items: Vec::with_capacity(BLOCK_CAPACITY),
            next: None,
        }
    }

    pub fn items(&self) -> &[CurveSegment] {
        &self.items
    }
}

/// A singly linked chain of reference blocks.
///
/// New references fill the head block; fresh blocks are pushed in front.
/// The list owns its blocks until they are handed back to an allocator
/// or the list is dropped.
#[derive(Default)]
pub struct RefList {
    head: Option<Box<RefBlock>>,
}

impl RefList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference, pulling a new block from `alloc` when the
    /// head block is full.
    pub fn push(&mut self, seg: CurveSegment, alloc: &BlockAllocator, thread_index: usize) {
        let needs_block = match &self.head {
            Some(block) => block.items.len() == BLOCK_CAPACITY,
            None => true,
        };
        if needs_block {
            let mut block = alloc.alloc(thread_index);
            block.next = self.head.take();
            self.head = Some(block);
        }
        self.head.as_mut().unwrap().items.push(seg);
    }

    /// Detaches and returns the head block.
    pub fn take_block(&mut self) -> Option<Box<RefBlock>> {
        let mut block = self.head.take()?;
        self.head = block.next.take();
        Some(block)
    }

    /// Total number of references, by walking the chain.
    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head.as_deref();
        while let Some(block) = cur {
            n += block.items.len();
            cur = block.next.as_deref();
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn iter(&self) -> RefIter<'_> {
        RefIter {
            block: self.head.as_deref(),
            index: 0,
        }
    }

    /// Returns every block to the allocator, emptying the list.
    pub fn release(&mut self, alloc: &BlockAllocator, thread_index: usize) {
        while let Some(block) = self.take_block() {
            alloc.release(thread_index, block);
        }
    }
}

impl Drop for RefList {
    fn drop(&mut self) {
        // Unlink iteratively; a recursive Box drop would overflow the
        // stack on long chains.
        let mut cur = self.head.take();
        while let Some(mut block) = cur {
            cur = block.next.take();
        }
    }
}

pub struct RefIter<'a> {
    block: Option<&'a RefBlock>,
    index: usize,
}

impl<'a> Iterator for RefIter<'a> {
    type Item = &'a CurveSegment;

    fn next(&mut self) -> Option<&'a CurveSegment> {
        loop {
            let block = self.block?;
            if self.index < block.items.len() {
                let item = &block.items[self.index];
                self.index += 1;
                return Some(item);
            }
            self.block = block.next.as_deref();
            self.index = 0;
        }
    }
}

/// Recycles reference blocks through per-thread free lists.
///
/// Each build worker allocates and frees through its own thread index, so
/// the locks below are uncontended in practice; they exist so a block
/// built on one thread may be freed from another.
pub struct BlockAllocator {
    free: Box<[Mutex<Vec<Box<RefBlock>>>]>,
}

impl BlockAllocator {
    pub fn new(num_threads: usize) -> Self {
        let free = (0..num_threads.max(1))
            .map(|_| Mutex::new(Vec::new()))
            .collect();
        Self { free }
    }

    pub fn alloc(&self, thread_index: usize) -> Box<RefBlock> {
        let mut free = self.free[thread_index].lock().unwrap();
        free.pop().unwrap_or_else(|| Box::new(RefBlock::new()))
    }

    pub fn release(&self, thread_index: usize, mut block: Box<RefBlock>) {
        block.items.clear();
        block.next = None;
        let mut free = self.free[thread_index].lock().unwrap();
        free.push(block);
    }
}
