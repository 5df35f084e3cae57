#![no_main]

use libfuzzer_sys::fuzz_target;
use myriadmesh_nodedb::RouterContact;

fuzz_target!(|data: &[u8]| {
    // Decoding untrusted bytes must never panic or over-allocate
    if let Ok(rc) = RouterContact::from_bytes(data) {
        let _ = rc.verify_signature();
        let _ = rc.to_bytes();
    }
});
