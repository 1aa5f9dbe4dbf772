#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlscope_core::{completion_items, CompletionRequest, Dialect, Schema};

fuzz_target!(|data: &[u8]| {
    let Some((&cursor, rest)) = data.split_first() else {
        return;
    };
    if let Ok(sql) = std::str::from_utf8(rest) {
        let schema = Schema::from_iter([("users", vec!["id", "name"]), ("orders", vec!["id"])]);
        let request = CompletionRequest::new(sql, usize::from(cursor), schema)
            .with_dialect(Dialect::Postgres);

        let _ = completion_items(&request);
    }
});
