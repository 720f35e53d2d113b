#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use snipcheck_core::{ExtractOptions, compare_output, extract};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        let extraction = extract(Path::new("fuzz.md"), s, &ExtractOptions::default());
        for snippet in &extraction.snippets {
            let _ = snippet.error_probe_source();
            if let Some(expected) = &snippet.expected {
                let _ = compare_output(expected.as_slice(), expected.as_slice());
            }
        }
    }
});
