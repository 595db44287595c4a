//! Mark phase: reachability propagation from the root set through
//! sub-reference edges.

use crate::engine::Engine;
use crate::gateway::Gateway;

/// Trace from every non-null root, marking everything reachable. Mark bits
/// of unreachable gateways are left exactly as they were on entry (sweep is
/// responsible for clearing survivors' marks afterward).
pub(crate) fn trace_from_roots(engine: &mut Engine) {
    // `for_each_root` only reads the root ring; the engine pointer handed to
    // `trace_gateway` is reborrowed fresh for each root so recursive marking
    // can still mutate gateways and dispatch through the engine's tracer
    // table.
    let engine_ptr: *mut Engine = engine;
    engine.roots.for_each_root(|root| {
        trace_gateway(unsafe { &mut *engine_ptr }, root);
    });
}

/// Mark `gateway` and, if it was not already marked, recurse into its
/// sub-references. A null gateway or one already marked is a no-op, which
/// is what guarantees termination on a cyclic graph.
pub(crate) fn trace_gateway(engine: &mut Engine, gateway: *mut Gateway) {
    if gateway.is_null() {
        return;
    }
    let already_marked = unsafe { (*gateway).is_marked() };
    if already_marked {
        return;
    }
    unsafe { (*gateway).set_marked() };

    let descriptor = unsafe { (*gateway).descriptor };
    if descriptor.is_custom() {
        let tracer_id = descriptor.tracer_id();
        if let Some(tracer) = engine.tracers.get(tracer_id) {
            let data = unsafe { (*gateway).data };
            tracer(engine as *mut Engine, data, mark_callback);
        }
        return;
    }

    let arrlen = descriptor.arrlen() as usize;
    let num_subrefs = descriptor.num_subrefs() as usize;
    for k in 0..arrlen {
        for i in 0..num_subrefs {
            let sub = unsafe { (*gateway).read_arr_subref(k, i) };
            trace_gateway(engine, sub);
        }
    }
}

/// The callback handed to custom tracers: marks one sub-reference.
pub(crate) extern "C" fn mark_callback(engine: *mut Engine, sub: *mut Gateway) {
    trace_gateway(unsafe { &mut *engine }, sub);
}
