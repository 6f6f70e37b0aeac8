#![no_main]
use libfuzzer_sys::fuzz_target;
use sqlinject::{detect_sqli, fingerprint, SqliFlags};

fuzz_target!(|data: &[u8]| {
    // No input may break the folding window invariants.
    let result = detect_sqli(data);
    assert!(result.is_ok(), "{:?}", result);

    if let Some((&first, rest)) = data.split_first() {
        let flags = SqliFlags::from_bits_truncate(u32::from(first));
        if let Ok(fp) = fingerprint(rest, flags) {
            assert!(fp.len() <= 6);
        }
    }
});
