#![no_main]

use libfuzzer_sys::fuzz_target;
use shellgate_commandargs::split_ssh_args;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let words = split_ssh_args(&raw);

    let total: usize = words.iter().map(|word| word.chars().count()).sum();
    assert!(total <= raw.chars().count());
    if !raw.contains(['\'', '"']) {
        assert!(words.iter().all(|word| !word.is_empty()));
        assert!(words
            .iter()
            .all(|word| !word.contains([' ', '\t', '\n', '\x0C', '\r'])));
    }
});
