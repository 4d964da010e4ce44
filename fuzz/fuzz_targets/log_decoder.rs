#![no_main]

use alloy::primitives::{Address, Bytes, B256};
use charged_token_indexer::{
    models::{ChainLog, ContractKind},
    services::blockchain::contracts::{known_events, ContractInterface},
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let kind = ContractKind::ALL[data[0] as usize % ContractKind::ALL.len()];
    let events = known_events(kind);
    let mut selectors: Vec<&B256> = events.keys().collect();
    selectors.sort();
    let selector = *selectors[data[1] as usize % selectors.len()];

    let rest = &data[2..];
    let indexed = rest.len().min(96) / 32;
    let mut topics = vec![selector];
    topics.extend(rest.chunks_exact(32).take(indexed).map(B256::from_slice));

    let log = ChainLog {
        address: Address::ZERO,
        topics,
        data: Bytes::copy_from_slice(&rest[indexed * 32..]),
        block_hash: None,
        block_number: None,
        transaction_hash: None,
        transaction_index: None,
        log_index: None,
        removed: None,
    };
    if let Ok(decoded) = ContractInterface::new(kind).decode_log(&log) {
        let _ = decoded.format_args();
    }
});
