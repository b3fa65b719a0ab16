#![no_main]
use ip2country::parser::{parse_exact_lines, parse_range_lines};
use ip2country::{CancelToken, Config, RangeTable};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let config = Config::default();
    let cancel = CancelToken::none();

    // Arbitrary bytes must never panic the parser or the validator
    if let Ok(outcome) = parse_range_lines(Cursor::new(data), &config, &cancel) {
        if let Ok(table) = RangeTable::from_ranges(outcome.records) {
            for range in table.ranges() {
                assert!(table.find(range.start).is_some());
                assert!(table.find(range.end).is_some());
            }
        }
    }

    let _ = parse_exact_lines(Cursor::new(data), &config, &cancel);
});
