#![no_main]

use libfuzzer_sys::fuzz_target;
use cilflow::prelude::*;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = MethodBody::decode(data, data.first().is_some_and(|b| b & 1 == 0), &()) else {
        return;
    };
    if let Ok(cfg) = ControlFlowGraph::build(&body, CfgOptions::full()) {
        let _ = cfg.to_dot(None);
        let _ = cfg.to_string();
    }
});
