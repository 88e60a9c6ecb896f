#![no_main]

use libfuzzer_sys::fuzz_target;
use zabbix_protocol::utils::compression::{compress, decompress, maybe_decompress};

fuzz_target!(|data: &[u8]| {
    // zlib roundtrip
    if let Ok(compressed) = compress(data) {
        assert_eq!(decompress(&compressed).ok().as_deref(), Some(data));
    }

    // Malformed streams must fail cleanly
    let _ = decompress(data);
    let _ = maybe_decompress(data, true);
});
