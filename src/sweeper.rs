//! Sweep phase: per-block reclamation of unmarked gateways, per-ring
//! compaction of now-empty blocks.

use crate::block::ObjectBlock;
use crate::bitmap::BLOCK_WIDTH;
use crate::engine::{finalize_and_free, Engine};
use crate::tables::FinalizerTable;
use crate::statistics::EngineStatistics;

/// Sweep every block in the object ring: finalize and free unmarked
/// gateways, clear the mark bit of survivors, and compact any block left
/// fully empty (short of the last one in the ring).
pub(crate) fn sweep(engine: &mut Engine) {
    let Engine {
        objects,
        finalizers,
        stats,
        ..
    } = engine;
    let before = stats.count;
    objects.sweep_all(|block| sweep_block(block, finalizers, &mut *stats));
    tracing::debug!(reclaimed = before - stats.count, "sweep: reclaimed gateways");
}

fn sweep_block(block: &mut ObjectBlock, finalizers: &FinalizerTable, stats: &mut EngineStatistics) {
    for ix in 0..BLOCK_WIDTH {
        if !block.is_used(ix) {
            continue;
        }
        let gateway = block.slot(ix);
        let marked = unsafe { (*gateway).is_marked() };
        if marked {
            unsafe { (*gateway).clear_marked() };
        } else {
            let bytes = unsafe { (*gateway).descriptor().byte_size() };
            tracing::trace!(bytes, "sweep: reclaiming gateway");
            finalize_and_free(finalizers, gateway);
            block.release(ix);
            stats.remove(bytes);
        }
    }
}
