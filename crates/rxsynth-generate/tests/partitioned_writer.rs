use std::fs;
use std::path::PathBuf;

use rxsynth_core::{ColumnSpec, FieldKind, FieldValue, RowSchema};
use rxsynth_generate::output::{PartitionedWriter, shard_file_name};

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("id", FieldKind::Text),
    ColumnSpec::required("count", FieldKind::Int),
    ColumnSpec::optional("note", FieldKind::Text),
];

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rxsynth_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn schema() -> RowSchema {
    RowSchema::new("sample", COLUMNS).expect("schema")
}

fn row(idx: i64, note: Option<&str>) -> Vec<FieldValue> {
    vec![
        FieldValue::from(format!("row-{idx:03}")),
        FieldValue::from(idx),
        FieldValue::from(note.map(str::to_string)),
    ]
}

#[test]
fn small_budget_rolls_into_numbered_shards_with_headers() {
    let dir = temp_out_dir("writer_roll");
    let mut writer = PartitionedWriter::new(&dir, "sample", schema(), 64).expect("writer");
    for idx in 0..20 {
        let note = if idx % 3 == 0 { Some("has, comma") } else { None };
        writer.write_row(&row(idx, note)).expect("write row");
    }
    assert_eq!(writer.rows_written(), 20);
    let shards = writer.close().expect("close");

    assert!(shards.len() > 1, "expected several shards, got {}", shards.len());
    assert_eq!(shards.iter().map(|shard| shard.rows).sum::<u64>(), 20);
    for (idx, shard) in shards.iter().enumerate() {
        assert_eq!(shard.file_name, shard_file_name("sample", idx as u32 + 1));
        let path = dir.join(&shard.file_name);
        let size = fs::metadata(&path).expect("shard metadata").len();
        assert_eq!(shard.bytes_written, size);
        assert_eq!(shard.estimated_bytes, size);
        assert!(shard.rows >= 1);
        assert!(size <= 64 || shard.rows == 1, "{} overflows its budget", shard.file_name);

        let contents = fs::read_to_string(&path).expect("read shard");
        assert!(contents.starts_with("id,count,note\n"));
    }

    let mut seen = Vec::new();
    for shard in &shards {
        let mut reader = csv::Reader::from_path(dir.join(&shard.file_name)).expect("reader");
        for record in reader.records() {
            let record = record.expect("record");
            assert_eq!(record.len(), 3);
            seen.push(record[0].to_string());
            let idx: i64 = record[1].parse().expect("count");
            if idx % 3 == 0 {
                assert_eq!(&record[2], "has, comma");
            } else {
                assert_eq!(&record[2], "");
            }
        }
    }
    let expected: Vec<String> = (0..20).map(|idx| format!("row-{idx:03}")).collect();
    assert_eq!(seen, expected);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn oversized_row_lands_alone() {
    let dir = temp_out_dir("writer_oversized");
    let mut writer = PartitionedWriter::new(&dir, "sample", schema(), 40).expect("writer");
    let long = "x".repeat(200);
    writer.write_row(&row(1, None)).expect("first row");
    writer.write_row(&row(2, Some(&long))).expect("oversized row");
    writer.write_row(&row(3, None)).expect("third row");
    let shards = writer.close().expect("close");

    let rows: Vec<u64> = shards.iter().map(|shard| shard.rows).collect();
    assert_eq!(rows, vec![1, 1, 1]);
    assert!(shards[1].bytes_written > 40);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn rows_are_checked_against_the_schema() {
    let dir = temp_out_dir("writer_schema");
    let mut writer = PartitionedWriter::new(&dir, "sample", schema(), 1024).expect("writer");

    let short = vec![FieldValue::from("row-001")];
    assert!(writer.write_row(&short).is_err());

    let missing_required = vec![
        FieldValue::from(None::<String>),
        FieldValue::from(1_i64),
        FieldValue::from("note"),
    ];
    assert!(writer.write_row(&missing_required).is_err());

    let wrong_kind = vec![
        FieldValue::from("row-001"),
        FieldValue::from(true),
        FieldValue::from("note"),
    ];
    assert!(writer.write_row(&wrong_kind).is_err());

    assert_eq!(writer.rows_written(), 0);
    assert!(writer.close().expect("close").is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn zero_budget_is_rejected() {
    let dir = temp_out_dir("writer_zero");
    assert!(PartitionedWriter::new(&dir, "sample", schema(), 0).is_err());
    fs::remove_dir_all(&dir).ok();
}
