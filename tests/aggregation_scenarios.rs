//! Integration tests for the aggregation pipeline
//!
//! Drives `range ... AGGREGATION ...` and aggregated `copy` through the
//! dispatcher and checks the numeric results bucket by bucket. The data set
//! used throughout: ids 10..=49 with
//! `value = floor(i / 10) * 100 + digits[i % 10]`, which puts ten values in
//! each of the four buckets 10, 20, 30 and 40.

use streamts::{Engine, MemoryStore, Reply};

const DIGITS: [u64; 10] = [31, 41, 59, 26, 53, 58, 97, 93, 23, 84];

// ============================================================================
// Helper Functions
// ============================================================================

fn seeded_engine() -> Engine<MemoryStore> {
    let engine = Engine::new(MemoryStore::new());
    for i in 10u64..=49 {
        let value = (i / 10) * 100 + DIGITS[(i % 10) as usize];
        let ts = i.to_string();
        let value = value.to_string();
        engine
            .dispatch(&["s"], "add", &[&ts, "value", &value])
            .expect("seed add");
    }
    engine
}

fn aggregate(engine: &Engine<MemoryStore>, kind: &str) -> Vec<(i64, Reply)> {
    let spec = format!("{}(value)", kind);
    let reply = engine
        .dispatch(&["s"], "range", &["-", "+", "AGGREGATION", "10", &spec])
        .expect("aggregation range");
    single_field_buckets(reply, kind)
}

/// Decode the flat `[bucket_ts, [field, [kind, value]], ...]` reply of a
/// single-field single-kind aggregation into `(bucket, value)` pairs
fn single_field_buckets(reply: Reply, kind: &str) -> Vec<(i64, Reply)> {
    let Reply::Array(items) = reply else {
        panic!("expected flat bucket array");
    };
    assert!(items.len() % 2 == 0, "bucket list must alternate key/fields");

    items
        .chunks(2)
        .map(|chunk| {
            let Reply::Int(bucket) = chunk[0] else {
                panic!("expected integer bucket key, got {:?}", chunk[0]);
            };
            let Reply::Array(fields) = &chunk[1] else {
                panic!("expected bucket fields array");
            };
            assert_eq!(fields[0], Reply::Bulk("value".to_string()));
            let Reply::Array(pairs) = &fields[1] else {
                panic!("expected [kind, value] pairs");
            };
            assert_eq!(pairs[0], Reply::Bulk(kind.to_string()));
            (bucket, pairs[1].clone())
        })
        .collect()
}

fn int_buckets(results: Vec<(i64, Reply)>) -> Vec<(i64, i64)> {
    results
        .into_iter()
        .map(|(bucket, value)| match value {
            Reply::Int(n) => (bucket, n),
            other => panic!("expected integer bucket value, got {:?}", other),
        })
        .collect()
}

fn float_buckets(results: Vec<(i64, Reply)>) -> Vec<(i64, f64)> {
    results
        .into_iter()
        .map(|(bucket, value)| match value {
            Reply::Int(n) => (bucket, n as f64),
            Reply::Bulk(text) => (bucket, text.parse::<f64>().expect("numeric bulk")),
            other => panic!("expected numeric bucket value, got {:?}", other),
        })
        .collect()
}

// ============================================================================
// S1: Aggregation Correctness
// ============================================================================

#[test]
fn test_min() {
    let engine = seeded_engine();
    assert_eq!(
        int_buckets(aggregate(&engine, "min")),
        vec![(10, 123), (20, 223), (30, 323), (40, 423)]
    );
}

#[test]
fn test_max() {
    let engine = seeded_engine();
    assert_eq!(
        int_buckets(aggregate(&engine, "max")),
        vec![(10, 197), (20, 297), (30, 397), (40, 497)]
    );
}

#[test]
fn test_avg() {
    let engine = seeded_engine();
    assert_eq!(
        float_buckets(aggregate(&engine, "avg")),
        vec![(10, 156.5), (20, 256.5), (30, 356.5), (40, 456.5)]
    );
}

#[test]
fn test_median() {
    let engine = seeded_engine();
    assert_eq!(
        float_buckets(aggregate(&engine, "median")),
        vec![(10, 155.5), (20, 255.5), (30, 355.5), (40, 455.5)]
    );
}

#[test]
fn test_sum() {
    let engine = seeded_engine();
    assert_eq!(
        int_buckets(aggregate(&engine, "sum")),
        vec![(10, 1565), (20, 2565), (30, 3565), (40, 4565)]
    );
}

#[test]
fn test_count() {
    let engine = seeded_engine();
    assert_eq!(
        int_buckets(aggregate(&engine, "count")),
        vec![(10, 10), (20, 10), (30, 10), (40, 10)]
    );
}

#[test]
fn test_range_kind() {
    let engine = seeded_engine();
    assert_eq!(
        int_buckets(aggregate(&engine, "range")),
        vec![(10, 74), (20, 74), (30, 74), (40, 74)]
    );
}

#[test]
fn test_first_and_last() {
    let engine = seeded_engine();
    let firsts = int_buckets(aggregate(&engine, "first"));
    assert_eq!(firsts[0], (10, 131));
    let lasts = int_buckets(aggregate(&engine, "last"));
    assert_eq!(lasts[0], (10, 184));
}

#[test]
fn test_stdev_matches_sample_deviation() {
    let engine = seeded_engine();

    // every bucket holds the same digits offset by a constant, so the sample
    // deviation is identical across buckets
    let mean = DIGITS.iter().sum::<u64>() as f64 / DIGITS.len() as f64;
    let m2: f64 = DIGITS
        .iter()
        .map(|&d| (d as f64 - mean) * (d as f64 - mean))
        .sum();
    let expected = (m2 / (DIGITS.len() - 1) as f64).sqrt();

    for (bucket, actual) in float_buckets(aggregate(&engine, "stdev")) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "bucket {}: {} vs {}",
            bucket,
            actual,
            expected
        );
    }
}

#[test]
fn test_rate() {
    let engine = seeded_engine();
    // ten entries per bucket of width ten
    assert_eq!(
        int_buckets(aggregate(&engine, "rate")),
        vec![(10, 1), (20, 1), (30, 1), (40, 1)]
    );
}

// ============================================================================
// Output Shape and Interaction
// ============================================================================

#[test]
fn test_bucket_keys_are_multiples_of_the_bucket() {
    let engine = seeded_engine();
    let reply = engine
        .dispatch(&["s"], "range", &["-", "+", "AGGREGATION", "7", "count(value)"])
        .unwrap();
    let buckets = single_field_buckets(reply, "count");
    assert!(!buckets.is_empty());
    for (bucket, _) in buckets {
        assert_eq!(bucket % 7, 0);
    }
}

#[test]
fn test_revrange_aggregation_buckets_still_ascend() {
    let engine = seeded_engine();
    let reply = engine
        .dispatch(&["s"], "revrange", &["-", "+", "AGGREGATION", "10", "count(value)"])
        .unwrap();
    let keys: Vec<i64> = single_field_buckets(reply, "count")
        .into_iter()
        .map(|(bucket, _)| bucket)
        .collect();
    assert_eq!(keys, vec![10, 20, 30, 40]);
}

#[test]
fn test_multiple_kinds_per_field_share_a_slot() {
    let engine = seeded_engine();
    let reply = engine
        .dispatch(
            &["s"],
            "range",
            &["-", "+", "AGGREGATION", "10", "min(value)", "max(value)"],
        )
        .unwrap();

    let Reply::Array(items) = reply else {
        panic!("expected flat bucket array");
    };
    let Reply::Array(fields) = &items[1] else {
        panic!("expected bucket fields");
    };
    // one field slot with alternating kind/value pairs
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0], Reply::Bulk("value".to_string()));
    assert_eq!(
        fields[1],
        Reply::Array(vec![
            Reply::Bulk("min".to_string()),
            Reply::Int(123),
            Reply::Bulk("max".to_string()),
            Reply::Int(197),
        ])
    );
}

#[test]
fn test_aggregation_json_format() {
    let engine = seeded_engine();
    let Reply::Bulk(json) = engine
        .dispatch(
            &["s"],
            "range",
            &["-", "+", "AGGREGATION", "10", "avg(value)", "FORMAT", "json"],
        )
        .unwrap()
    else {
        panic!("expected json bulk");
    };

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0][0], serde_json::json!(10));
    assert_eq!(parsed[0][1]["value"], serde_json::json!(["avg", 156.5]));
    assert_eq!(parsed[3][0], serde_json::json!(40));
}

#[test]
fn test_aggregation_respects_filter() {
    let engine = seeded_engine();
    let reply = engine
        .dispatch(
            &["s"],
            "range",
            &[
                "-",
                "+",
                "FILTER",
                "value>=400",
                "AGGREGATION",
                "10",
                "count(value)",
            ],
        )
        .unwrap();
    assert_eq!(
        int_buckets(single_field_buckets(reply, "count")),
        vec![(40, 10)]
    );
}

// ============================================================================
// Aggregated Copy
// ============================================================================

#[test]
fn test_copy_aggregated_into_stream_sink() {
    let engine = seeded_engine();
    let written = engine
        .dispatch(
            &["s", "rollup"],
            "copy",
            &["-", "+", "AGGREGATION", "10", "min(value)", "max(value)"],
        )
        .unwrap();
    assert_eq!(written, Reply::Int(4));

    let reply = engine.dispatch(&["rollup"], "get", &["10"]).unwrap();
    assert_eq!(
        reply,
        Reply::Array(vec![
            Reply::Bulk("value_min".to_string()),
            Reply::Bulk("123".to_string()),
            Reply::Bulk("value_max".to_string()),
            Reply::Bulk("197".to_string()),
        ])
    );

    let size = engine.dispatch(&["rollup"], "size", &[]).unwrap();
    assert_eq!(size, Reply::Int(4));
}

#[test]
fn test_copy_aggregated_into_hash_sink() {
    let engine = seeded_engine();
    let written = engine
        .dispatch(
            &["s", "rollup"],
            "copy",
            &["-", "+", "AGGREGATION", "10", "avg(value)", "STORAGE", "hash"],
        )
        .unwrap();
    assert_eq!(written, Reply::Int(4));

    let payload = engine
        .store()
        .hash_field("rollup", "20")
        .expect("bucket 20 payload");
    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed["value_avg"], serde_json::json!(256.5));
}
