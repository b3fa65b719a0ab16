#![no_main]
use ip2country::{format_ipv4, parse_ipv4};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Anything accepted must survive a round trip through dotted form
        if let Ok(ip) = parse_ipv4(s) {
            assert_eq!(parse_ipv4(&format_ipv4(ip)), Ok(ip));
        }
    }
});
