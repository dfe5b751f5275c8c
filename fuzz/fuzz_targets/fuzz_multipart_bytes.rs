#![no_main]

use std::io::Read;

use libfuzzer_sys::fuzz_target;
use multiform::{Constraints, Multipart, SizeLimit};

fuzz_target!(|data: &[u8]| {
    let constraints = Constraints::new()
        .buffer_size(64)
        .size_limit(SizeLimit::new().header_block(1024));
    let mut multipart = Multipart::with_constraints(data, "X-BOUNDARY", constraints);

    let mut sink = [0u8; 37];
    let mut breaks = 0;
    while breaks < 3 {
        match multipart.next_part() {
            Err(_) | Ok(None) => breaks += 1,
            Ok(Some(mut part)) => while let Ok(n) = part.read(&mut sink) {
                if n == 0 {
                    break;
                }
            },
        }
    }
});
