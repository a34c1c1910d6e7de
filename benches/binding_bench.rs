//! Quick benchmark to verify binding parse performance

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use viewbind::{BindingParser, BindingParserOptions, DataModel, JsonModel};

fn main() {
    // Data shared by the nested and query bindings
    let model: Arc<dyn DataModel> = Arc::new(JsonModel::new(json!({
        "field": "label",
        "rows": (0..50).map(|i| json!({ "id": format!("r{}", i), "label": i })).collect::<Vec<_>>()
    })));
    let parser = BindingParser::new(BindingParserOptions::with_model(model).read_only(true));

    let bindings = vec![
        "foo.bar.baz",
        "foo.bar.01.baz",
        "foo['bar'].baz",
        "rows[id='r42'].label",
        "rows.3.{{field}}",
        "rows[id='r7'].{{field}}_suffix",
    ];

    println!("Binding Parse Performance Test");
    println!("==============================\n");

    // Warm up the caches
    for raw in &bindings {
        let _ = parser.parse(*raw);
    }

    for raw in &bindings {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = parser.parse(*raw);
        }

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Binding: {:40}", format!("\"{}\"", raw));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    println!("Cached ASTs: {}", parser.cached_asts());
    println!("Cached bindings: {}", parser.cached_bindings());
}
