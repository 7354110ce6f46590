use std::collections::VecDeque;

use byte_unit::Byte;
use num_integer::div_rem;

use crate::config::*;
use crate::error::{FtlError, Result};
use crate::victim::{select_victim_index, Candidate, SelectionParams};

pub struct Ftl {
    geometry: Geometry,
    params: SelectionParams,

    l2p: Vec<L2PValue>,
    logical_size: Addr,

    blocks: Vec<Block>,
    host_open_block: BlockId,
    host_gc_open_block: BlockId,

    free_blocks: VecDeque<BlockId>,
    // close order, oldest first
    full_blocks: Vec<BlockId>,

    stats: FtlStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum L2PValue {
    Invalid,
    Valid(Addr),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FtlStats {
    pub host_writes: Counter,
    pub gc_writes: Counter,
    pub gc_cycles: Counter,
    pub erases: Counter,
}

impl FtlStats {
    /// Physical page programs per host write.
    pub fn write_amplification(&self) -> f64 {
        if self.host_writes == 0 {
            return 1.0;
        }
        (self.host_writes + self.gc_writes) as f64 / self.host_writes as f64
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    block_id: BlockId,
    valid_counter: Counter,
    cursor: PageId, // points to the next page
    erase_counter: Counter,
    p2l: Vec<PageId>,
}

impl Block {
    pub fn new(block_id: BlockId, pages: PageId) -> Self {
        Block {
            block_id,
            valid_counter: 0,
            cursor: 0,
            erase_counter: 0,
            p2l: vec![INVALID_PAGE_ID; pages],
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn valid_counter(&self) -> Counter {
        self.valid_counter
    }

    pub fn erase_counter(&self) -> Counter {
        self.erase_counter
    }

    fn invalid_counter(&self) -> Counter {
        self.cursor - self.valid_counter
    }

    fn full(&self) -> bool {
        self.cursor == self.p2l.len()
    }

    fn free_pages(&self) -> PageId {
        self.p2l.len() - self.cursor
    }

    fn write_one_page(&mut self, lba: PageId) -> PageId {
        debug_assert!(!self.full(), "write more pages than block has");

        let offset = self.cursor;
        self.p2l[offset] = lba;
        self.cursor += 1;
        self.valid_counter += 1;
        offset
    }

    fn invalidate(&mut self, offset: PageId) {
        debug_assert_ne!(
            self.p2l[offset],
            INVALID_PAGE_ID,
            "page {} of block {} already stale",
            offset,
            self.block_id
        );

        self.p2l[offset] = INVALID_PAGE_ID;
        self.valid_counter -= 1;
    }

    fn valid_lbas(&self) -> Vec<PageId> {
        self.p2l[..self.cursor]
            .iter()
            .copied()
            .filter(|&lba| lba != INVALID_PAGE_ID)
            .collect()
    }

    fn erase(&mut self) {
        self.p2l.fill(INVALID_PAGE_ID);
        self.cursor = 0;
        self.valid_counter = 0;
        self.erase_counter += 1;
    }

    fn snapshot(&self) -> Candidate {
        Candidate::with_id(self.block_id, self.valid_counter, self.erase_counter)
    }
}

impl Ftl {
    pub fn new_with_op(op: f64) -> Result<Self> {
        Ftl::with_geometry(Geometry::default(), SelectionParams::default(), op)
    }

    pub fn with_geometry(geometry: Geometry, params: SelectionParams, op: f64) -> Result<Self> {
        if geometry.blocks == 0 || geometry.pages_per_block == 0 {
            return Err(FtlError::InvalidGeometry("device has no pages"));
        }
        if !op.is_finite() || !(0.0..100.0).contains(&op) {
            return Err(FtlError::InvalidGeometry("over-provisioning must be in [0, 100) percent"));
        }

        let all_pages = geometry.all_pages();
        let op_pages = (all_pages as f64 * (op / 100.)).trunc() as Addr;
        let op_blocks = op_pages / geometry.pages_per_block;

        // the free reserve plus both open blocks must fit into the spare area
        let required = geometry.free_blocks + 2;
        if op_blocks < required {
            return Err(FtlError::InsufficientOverProvisioning { op_blocks, required });
        }

        let logical_size = all_pages - op_pages;
        if logical_size == 0 {
            return Err(FtlError::InvalidGeometry("no logical capacity left"));
        }

        trace!("ALL_PAGES: {}", all_pages);
        trace!("op_pages: {}", op_pages);
        trace!(
            "Physical Capacity: {} bytes, {}",
            geometry.capacity(),
            Byte::from(geometry.capacity()).get_appropriate_unit(true).to_string()
        );
        trace!(
            "User Capacity: {} bytes, {}",
            logical_size * geometry.page_size,
            Byte::from(logical_size * geometry.page_size)
                .get_appropriate_unit(true)
                .to_string()
        );

        let blocks = (0..geometry.blocks)
            .map(|id| Block::new(id, geometry.pages_per_block))
            .collect();

        Ok(Ftl {
            geometry,
            params,
            l2p: vec![L2PValue::Invalid; logical_size],
            logical_size,
            blocks,
            host_open_block: 0,
            host_gc_open_block: 1,
            free_blocks: (2..geometry.blocks).collect(),
            full_blocks: Vec::with_capacity(geometry.blocks),
            stats: FtlStats::default(),
        })
    }

    pub fn get_max_lba(&self) -> PageId {
        self.logical_size - 1
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stats(&self) -> &FtlStats {
        &self.stats
    }

    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }

    pub fn full_block_count(&self) -> usize {
        self.full_blocks.len()
    }

    pub fn erase_counts(&self) -> Vec<Counter> {
        self.blocks.iter().map(Block::erase_counter).collect()
    }

    pub fn average_erase_count(&self) -> f64 {
        let total: Counter = self.blocks.iter().map(Block::erase_counter).sum();
        total as f64 / self.blocks.len() as f64
    }

    pub fn mapped_pages(&self) -> usize {
        self.l2p.iter().filter(|v| matches!(v, L2PValue::Valid(_))).count()
    }

    pub fn valid_pages(&self) -> Counter {
        self.blocks.iter().map(Block::valid_counter).sum()
    }

    pub fn read(&self, lba: PageId) -> Option<Addr> {
        match self.l2p.get(lba) {
            Some(L2PValue::Valid(addr)) => Some(*addr),
            _ => None,
        }
    }

    fn addr_of(&self, block_id: BlockId, offset: PageId) -> Addr {
        block_id * self.geometry.pages_per_block + offset
    }

    fn invalidate(&mut self, lba: PageId) {
        if let L2PValue::Valid(addr) = self.l2p[lba] {
            let (block_id, offset) = div_rem(addr, self.geometry.pages_per_block);
            self.blocks[block_id].invalidate(offset);
            self.l2p[lba] = L2PValue::Invalid;
        }
    }

    fn next_free_block(&mut self) -> Result<BlockId> {
        self.free_blocks.pop_front().ok_or(FtlError::NoFreeBlock)
    }

    // the old page stays mapped until its copy is programmed
    fn program_gc_page(&mut self, lba: PageId) -> Result<()> {
        if self.blocks[self.host_gc_open_block].full() {
            let next = self.next_free_block()?;
            self.full_blocks.push(self.host_gc_open_block);
            self.host_gc_open_block = next;
            trace!("GC OpenBlock rotated to {}", self.host_gc_open_block);
        }

        let block_id = self.host_gc_open_block;
        let offset = self.blocks[block_id].write_one_page(lba);
        self.invalidate(lba);
        self.l2p[lba] = L2PValue::Valid(self.addr_of(block_id, offset));
        self.stats.gc_writes += 1;
        Ok(())
    }

    /// Pages the GC can program without touching the victim itself.
    fn gc_headroom(&self) -> PageId {
        self.blocks[self.host_gc_open_block].free_pages()
            + self.free_blocks.len() * self.geometry.pages_per_block
    }

    /// Reclaims one full block chosen by the victim selector.
    pub fn gc(&mut self) -> Result<BlockId> {
        // blocks without stale pages reclaim nothing
        let (positions, candidates): (Vec<usize>, Vec<Candidate>) = self
            .full_blocks
            .iter()
            .enumerate()
            .filter(|(_, &id)| self.blocks[id].invalid_counter() > 0)
            .map(|(pos, &id)| (pos, self.blocks[id].snapshot()))
            .unzip();

        let params = self.params.with_pe_avg(self.average_erase_count());
        let idx = select_victim_index(&candidates, &params).ok_or(FtlError::NoVictim {
            full_blocks: self.full_blocks.len(),
        })?;

        let victim = candidates[idx];
        if victim.valid_page_count > self.gc_headroom() {
            return Err(FtlError::NoFreeBlock);
        }

        let victim_id = self.full_blocks.remove(positions[idx]);
        debug!(
            "GC victim {} valid {} erase {} of {} candidates",
            victim_id,
            victim.valid_page_count,
            victim.erase_count,
            candidates.len()
        );

        for lba in self.blocks[victim_id].valid_lbas() {
            self.program_gc_page(lba)?;
        }

        self.blocks[victim_id].erase();
        self.free_blocks.push_back(victim_id);
        self.stats.gc_cycles += 1;
        self.stats.erases += 1;

        Ok(victim_id)
    }

    pub fn write(&mut self, lba: PageId) -> Result<()> {
        if lba >= self.logical_size {
            return Err(FtlError::LbaOutOfRange {
                lba,
                max_lba: self.get_max_lba(),
            });
        }

        if self.blocks[self.host_open_block].full() {
            let next = self.next_free_block()?;
            self.full_blocks.push(self.host_open_block);
            self.host_open_block = next;
        }
        if self.free_blocks.len() < self.geometry.free_blocks {
            self.gc()?;
        }

        debug_assert!(
            !self.blocks[self.host_open_block].full(),
            "host_open_block is full before write"
        );

        self.invalidate(lba);
        let block_id = self.host_open_block;
        let offset = self.blocks[block_id].write_one_page(lba);
        self.l2p[lba] = L2PValue::Valid(self.addr_of(block_id, offset));
        self.stats.host_writes += 1;

        Ok(())
    }

    pub fn write_range(&mut self, start: PageId, count: usize) -> Result<()> {
        for lba in start..start + count {
            self.write(lba)?;
        }
        Ok(())
    }
}
