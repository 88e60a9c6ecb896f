#![no_main]

use libfuzzer_sys::fuzz_target;
use zabbix_protocol::core::packet::{decode, parse_header, Packet, HEADER_SIZE};
use zabbix_protocol::protocol::{AgentResponse, TrapperResult};

fuzz_target!(|data: &[u8]| {
    // Whole-frame and split header/payload decoding must never panic
    let _ = Packet::from_bytes(data);
    if data.len() >= HEADER_SIZE {
        let (header, payload) = data.split_at(HEADER_SIZE);
        if parse_header(header).is_ok() {
            let _ = decode(header, payload);
        }
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = TrapperResult::parse(text, 1);
        let _ = AgentResponse::parse(text);
    }
});
