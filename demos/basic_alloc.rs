//! Grows a linked list through `Engine::alloc`, periodically dropping the
//! root reference so a collection has real garbage to reclaim.
//!
//! Each node is a `Fixed` object: one sub-reference slot (`next`) followed by
//! eight raw bytes holding an `i64` value.

use tenure::{Descriptor, Engine, EngineConfig};

fn node_layout() -> Descriptor {
    Descriptor::fixed(1, 1, 8, 0)
}

fn set_value(node: *mut tenure::Gateway, value: i64) {
    unsafe {
        std::ptr::write((*node).raw().cast::<i64>(), value);
    }
}

fn set_next(node: *mut tenure::Gateway, next: *mut tenure::Gateway) {
    unsafe {
        std::ptr::write((*node).subref(0), next);
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut config = EngineConfig::default();
    config.verbose = true;
    let mut engine = Engine::with_config(config);

    let mut list = engine.alloc(node_layout()).expect("initial allocation");
    set_next(list, std::ptr::null_mut());
    set_value(list, 0);
    let root = engine.new_root(list).expect("root slot");

    let mut i: i64 = 0;
    while i < 500_000 {
        let node = engine.alloc(node_layout()).expect("alloc under memory pressure");
        set_next(node, list);
        set_value(node, i);
        list = node;
        engine.set_root(root, list);

        if i % 8192 == 0 {
            // drop everything accumulated so far; the next collection has
            // real garbage to walk past the new head.
            list = engine.alloc(node_layout()).expect("alloc under memory pressure");
            set_next(list, std::ptr::null_mut());
            set_value(list, i);
            engine.set_root(root, list);
        }
        i += 1;
    }

    engine.collect_major();
    println!("done: {}", engine.statistics());
}
