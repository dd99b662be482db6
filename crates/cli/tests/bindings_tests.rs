// Capability table driven from several threads at once.

use std::sync::Arc;
use std::thread;

use rust_xlsxwriter::Workbook;
use serde_json::json;

use colmatch_cli::Bindings;
use colmatch_engine::CompareOptions;

fn book(path: &std::path::Path, values: &[&str]) {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    for (r, v) in values.iter().enumerate() {
        ws.write_string(r as u32, 0, *v).unwrap();
    }
    workbook.save(path).unwrap();
}

#[test]
fn concurrent_excel_diff_calls_each_get_their_own_status() {
    let dir = tempfile::tempdir().unwrap();
    let bindings = Arc::new(Bindings::new(CompareOptions::default()));

    let handles: Vec<_> = (0..4usize)
        .map(|i| {
            let a = dir.path().join(format!("a{i}.xlsx"));
            let b = dir.path().join(format!("b{i}.xlsx"));
            // Pair i has exactly i + 1 matches.
            let values: Vec<&str> = std::iter::repeat("k").take(i + 1).collect();
            book(&a, &values);
            book(&b, &["k"]);

            let bindings = Arc::clone(&bindings);
            thread::spawn(move || {
                let args = [
                    json!(a.to_str().unwrap()),
                    json!(b.to_str().unwrap()),
                    json!(0),
                    json!(0),
                ];
                bindings.call("excel_diff", &args).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], json!("update complete: 1 match"));
    assert_eq!(results[3], json!("update complete: 4 matches"));

    // msg_text holds whichever call finished last, whole.
    let last = bindings.call("msg_text", &[]).unwrap();
    assert!(results.contains(&last), "{last}");
}

#[test]
fn msg_text_follows_the_latest_call() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    book(&a, &["x"]);
    book(&b, &["y"]);

    let bindings = Bindings::new(CompareOptions::default());
    assert_eq!(bindings.call("msg_text", &[]).unwrap(), json!(""));

    let out = bindings
        .call("excel_diff", &[json!(a.to_str().unwrap()), json!(b.to_str().unwrap()), json!(0), json!(0)])
        .unwrap();
    assert_eq!(out, json!("update complete: 0 matches"));
    assert_eq!(bindings.call("msg_text", &[]).unwrap(), out);

    let missing = dir.path().join("missing.xlsx");
    let out = bindings
        .call("excel_diff", &[json!(missing.to_str().unwrap()), json!(b.to_str().unwrap()), json!(0), json!(0)])
        .unwrap();
    assert!(out.as_str().unwrap().starts_with("failed to open "));
    assert_eq!(bindings.call("msg_text", &[]).unwrap(), out);
}
