#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use ovozbot::tts::classify_response;

fuzz_target!(|data: &[u8]| {
    // Split the input into a content-type header and a response body so
    // both classification inputs vary together. The first byte picks the
    // split point; everything in the body is attacker-controlled,
    // including invalid UTF-8 and JSON with surprising shapes.
    let (head, body) = match data.split_first() {
        Some((first, rest)) => {
            let split = (*first as usize).min(rest.len());
            rest.split_at(split)
        }
        None => return,
    };

    let content_type = String::from_utf8_lossy(head);
    let _ = classify_response(&content_type, Bytes::copy_from_slice(body), "file");

    // Same body classified against a fuzzer-chosen field name, so the JSON
    // lookup path sees arbitrary keys too.
    if !content_type.is_empty() {
        let _ = classify_response(
            "application/json",
            Bytes::copy_from_slice(body),
            &content_type,
        );
    }
});
