#![no_main]

use charged_token_indexer::models::{add_amounts, is_negative_amount, sub_amounts};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (a, b) = text.split_once(',').unwrap_or((&text, "0"));
    if let Ok(sum) = add_amounts(a, b) {
        if let Ok(back) = sub_amounts(&sum, b) {
            assert!(!is_negative_amount(&back) || a.trim_start().starts_with('-'));
        }
    }
});
