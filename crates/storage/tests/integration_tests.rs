//! Integration tests for the storage layer
//!
//! These tests drive tables through a `Database` the way an application
//! would:
//! - Every read target over the same stored bytes
//! - Mis-declared headers and recovery mode
//! - Column projection against full reads
//! - Range boundaries and repeated reads

use std::fs;

use recstore_core::{Endian, Error, FieldDescriptor, Value};
use recstore_storage::{
    Database, DbMode, OpenMode, OpenOptions, ReadOutput, ReadRequest, ReadTarget, TableHeader,
    TablePaths,
};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const DECODED: [ReadTarget; 4] = [
    ReadTarget::Tuple,
    ReadTarget::Mapping,
    ReadTarget::Frame,
    ReadTarget::Array,
];

const ALL: [ReadTarget; 5] = [
    ReadTarget::Raw,
    ReadTarget::Tuple,
    ReadTarget::Mapping,
    ReadTarget::Frame,
    ReadTarget::Array,
];

fn writable_db() -> (TempDir, Database) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(tmp.path().join("db"), DbMode::Write).unwrap();
    (tmp, db)
}

/// Rows of any decoded output, as tuples
fn rows(output: ReadOutput) -> Vec<Vec<Value>> {
    match output {
        ReadOutput::Tuples(rows) => rows,
        ReadOutput::Mappings(maps) => maps.into_iter().map(|m| m.into_values()).collect(),
        ReadOutput::Frame(frame) => (0..frame.num_rows())
            .map(|i| frame.row(i).unwrap())
            .collect(),
        ReadOutput::Array(array) => (0..array.len()).map(|i| array.row(i).unwrap()).collect(),
        ReadOutput::Raw(_) => panic!("raw output has no rows"),
    }
}

fn weather_header() -> TableHeader {
    TableHeader::new(vec![
        FieldDescriptor::new("time", "d", 8),
        FieldDescriptor::new("ok", "?", 1),
        FieldDescriptor::new("wind", "3f", 12),
        FieldDescriptor::new("site", "3s", 3),
        FieldDescriptor::new("level", "b", 1),
    ])
    .with_memo("weather station")
}

fn weather_row(i: usize) -> Vec<Value> {
    vec![
        Value::Float(1_700_000_000.0 + i as f64),
        Value::Bool(i % 3 == 0),
        Value::Array(vec![
            Value::Float(i as f64),
            Value::Float(0.5),
            Value::Float(-(i as f64)),
        ]),
        Value::from(format!("s{}", i % 10).as_str()),
        Value::Int(i as i64 - 4),
    ]
}

fn weather_db(n: usize) -> (TempDir, Database) {
    let (tmp, db) = writable_db();
    db.create_table("weather", &weather_header()).unwrap();
    let mut table = db.open_table("weather", OpenMode::Append).unwrap();
    for i in 0..n {
        table.append(&weather_row(i)).unwrap();
    }
    table.close().unwrap();
    (tmp, db)
}

// ============================================================================
// Read Targets
// ============================================================================

mod read_targets {
    use super::*;

    #[test]
    fn test_padded_string_and_bool_every_target() {
        let (_tmp, db) = writable_db();
        let header = TableHeader::new(vec![
            FieldDescriptor::new("name", "5s", 5),
            FieldDescriptor::new("flag", "?", 1),
        ]);
        db.create_table("t", &header).unwrap();
        let mut table = db.open_table("t", OpenMode::Append).unwrap();
        table.append(&[Value::from("abc"), Value::Bool(true)]).unwrap();
        table.close().unwrap();

        let table = db.open_table("t", OpenMode::Read).unwrap();
        let raw = table
            .read(&ReadRequest::new().target(ReadTarget::Raw))
            .unwrap();
        assert_eq!(raw.into_raw().unwrap(), b"abc\0\0\x01".to_vec());

        for target in DECODED {
            let out = table.read(&ReadRequest::new().target(target)).unwrap();
            assert_eq!(
                rows(out),
                vec![vec![Value::from("abc"), Value::Bool(true)]],
                "{}",
                target
            );
        }

        let mapping = table
            .read(&ReadRequest::new().target("dict".parse().unwrap()))
            .unwrap()
            .into_mappings()
            .unwrap();
        assert_eq!(mapping[0].get("name").and_then(Value::as_str), Some("abc"));

        let array = table
            .read(&ReadRequest::new().target(ReadTarget::Array))
            .unwrap()
            .into_array()
            .unwrap();
        assert_eq!(array.descr()[0].1, "|S5");
        assert_eq!(array.descr()[1].1, "|b1");
    }

    #[test]
    fn test_round_trip_through_file() {
        let (_tmp, db) = weather_db(20);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        let out = table.read(&ReadRequest::new()).unwrap();
        let expected: Vec<_> = (0..20).map(weather_row).collect();
        assert_eq!(out.into_tuples().unwrap(), expected);
    }

    #[test]
    fn test_big_endian_table() {
        let (_tmp, db) = writable_db();
        let header = TableHeader::new(vec![
            FieldDescriptor::new("id", "H", 2),
            FieldDescriptor::new("v", "2i", 8),
        ])
        .with_endian(Endian::Big);
        db.create_table("be", &header).unwrap();

        let mut table = db.open_table("be", OpenMode::Append).unwrap();
        table
            .append(&[Value::UInt(0x0102), Value::Array(vec![Value::Int(-1), Value::Int(3)])])
            .unwrap();
        table.close().unwrap();

        let table = db.open_table("be", OpenMode::Read).unwrap();
        let raw = table
            .read(&ReadRequest::new().target(ReadTarget::Raw))
            .unwrap()
            .into_raw()
            .unwrap();
        assert_eq!(raw, vec![1, 2, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 3]);

        let array = table
            .read(&ReadRequest::new().target(ReadTarget::Array))
            .unwrap()
            .into_array()
            .unwrap();
        assert_eq!(
            array.descr(),
            vec![
                ("id".to_string(), ">u2".to_string(), vec![]),
                ("v".to_string(), ">i4".to_string(), vec![2]),
            ]
        );
    }

    #[test]
    fn test_half_float_array_target_fails() {
        let (_tmp, db) = writable_db();
        let header = TableHeader::new(vec![FieldDescriptor::new("x", "e", 2)]);
        db.create_table("h", &header).unwrap();
        let mut table = db.open_table("h", OpenMode::Append).unwrap();
        table.append(&[Value::Float(1.5)]).unwrap();
        table.close().unwrap();

        let table = db.open_table("h", OpenMode::Read).unwrap();
        let tuples = table.read(&ReadRequest::new()).unwrap();
        assert_eq!(tuples.into_tuples().unwrap(), vec![vec![Value::Float(1.5)]]);
        let err = table
            .read(&ReadRequest::new().target(ReadTarget::Array))
            .unwrap_err();
        assert!(err.is_format_mismatch());
    }
}

// ============================================================================
// Recovery Mode
// ============================================================================

mod recovery {
    use super::*;

    fn written_row(i: usize) -> Vec<Value> {
        vec![
            Value::Float(1_600_000_000.25 + i as f64),
            Value::Bool(i % 2 == 1),
            Value::Int(i as i64 * 1000),
            Value::from(format!("obs{:03}", i).as_str()),
        ]
    }

    /// Table whose header says `d i q 6s` but whose records were packed as
    /// `d ? q 6s` in native byte order
    fn corrupted_db() -> (TempDir, Database) {
        let (tmp, db) = writable_db();
        let actual = TableHeader::new(vec![
            FieldDescriptor::new("time", "d", 8),
            FieldDescriptor::new("flag", "?", 1),
            FieldDescriptor::new("count", "q", 8),
            FieldDescriptor::new("name", "6s", 6),
        ])
        .with_endian(Endian::Native);
        db.create_table("writer", &actual).unwrap();
        let mut table = db.open_table("writer", OpenMode::Append).unwrap();
        for i in 0..11 {
            table.append(&written_row(i)).unwrap();
        }
        table.close().unwrap();

        let declared = TableHeader::new(vec![
            FieldDescriptor::new("time", "d", 8),
            FieldDescriptor::new("flag", "i", 4),
            FieldDescriptor::new("count", "q", 8),
            FieldDescriptor::new("name", "6s", 6),
        ]);
        db.create_table("obs", &declared).unwrap();
        let writer = TablePaths::new(db.path(), "writer");
        let obs = TablePaths::new(db.path(), "obs");
        fs::copy(writer.data(), obs.data()).unwrap();
        (tmp, db)
    }

    #[test]
    fn test_declared_format_fails_uniformly() {
        let (_tmp, db) = corrupted_db();
        let table = db.open_table("obs", OpenMode::Read).unwrap();
        assert_eq!(table.record_size(), 26);
        assert_eq!(table.file_size().unwrap(), 11 * 23);

        for target in DECODED {
            let err = table
                .read(&ReadRequest::new().target(target))
                .unwrap_err();
            assert!(err.is_format_mismatch(), "{}: {}", target, err);
            assert!(err.to_string().contains("recovered"));
        }
        assert!(table
            .read(&ReadRequest::new().target(ReadTarget::Raw))
            .is_ok());
    }

    #[test]
    fn test_recovered_view_decodes_every_target() {
        let (_tmp, db) = corrupted_db();
        let table = db.open_table("obs", OpenMode::Read).unwrap();
        let recovered = table.recovered().unwrap();
        assert_eq!(recovered.record_size(), 23);
        assert_eq!(recovered.nrecords().unwrap(), 11);

        let expected: Vec<_> = (0..11).map(written_row).collect();
        for target in DECODED {
            let out = recovered.read(&ReadRequest::new().target(target)).unwrap();
            assert_eq!(rows(out), expected, "{}", target);
        }

        // The original table and its header are unchanged
        assert_eq!(table.format(), "<diq6s");
        let reopened = db.open_table("obs", OpenMode::Read).unwrap();
        assert_eq!(reopened.format(), "<diq6s");
    }

    #[test]
    fn test_recovered_view_is_read_only() {
        let (_tmp, db) = corrupted_db();
        let table = db.open_table("obs", OpenMode::Read).unwrap();
        let mut recovered = table.recovered().unwrap();
        let err = recovered.append(&written_row(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_recovered_projection() {
        let (_tmp, db) = corrupted_db();
        let recovered = db
            .open_table("obs", OpenMode::Read)
            .unwrap()
            .recovered()
            .unwrap();
        let out = recovered
            .read(&ReadRequest::new().start(9).columns(["name", "flag"]))
            .unwrap();
        assert_eq!(
            out.into_tuples().unwrap(),
            vec![
                vec![Value::Bool(true), Value::from("obs009")],
                vec![Value::Bool(false), Value::from("obs010")],
            ]
        );
    }
}

// ============================================================================
// Projection
// ============================================================================

mod projection {
    use super::*;

    const KEYS: [&str; 5] = ["time", "ok", "wind", "site", "level"];

    fn subsets() -> Vec<Vec<&'static str>> {
        (1..(1u32 << KEYS.len()))
            .map(|mask| {
                KEYS.iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, k)| *k)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_projection_matches_full_read() {
        let (_tmp, db) = weather_db(7);
        let table = db.open_table("weather", OpenMode::Read).unwrap();

        for target in DECODED {
            let full = rows(table.read(&ReadRequest::new().target(target)).unwrap());
            for subset in subsets() {
                // Caller order is reversed on purpose; output follows schema order
                let mut requested = subset.clone();
                requested.reverse();
                let projected = rows(
                    table
                        .read(&ReadRequest::new().columns(requested).target(target))
                        .unwrap(),
                );
                let indices: Vec<usize> = subset
                    .iter()
                    .map(|k| KEYS.iter().position(|x| x == k).unwrap())
                    .collect();
                let expected: Vec<Vec<Value>> = full
                    .iter()
                    .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                    .collect();
                assert_eq!(projected, expected, "{} {:?}", target, subset);
            }
        }
    }

    #[test]
    fn test_projected_raw_bytes() {
        let (_tmp, db) = weather_db(3);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        let raw = table
            .read(
                &ReadRequest::new()
                    .columns(["level", "ok"])
                    .target(ReadTarget::Raw),
            )
            .unwrap()
            .into_raw()
            .unwrap();
        // ok, level per record: i % 3 == 0, i - 4
        assert_eq!(raw, vec![1, 0xfc, 0, 0xfd, 0, 0xfe]);
    }

    #[test]
    fn test_frame_column_names_follow_schema() {
        let (_tmp, db) = weather_db(2);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        let frame = table
            .read(
                &ReadRequest::new()
                    .columns(["site", "time"])
                    .target(ReadTarget::Frame),
            )
            .unwrap()
            .into_frame()
            .unwrap();
        assert_eq!(frame.column_names(), vec!["time", "site"]);
    }

    #[test]
    fn test_unknown_column() {
        let (_tmp, db) = weather_db(1);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        let err = table
            .read(&ReadRequest::new().columns(["time", "pressure"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidColumn(_)));
        // The table stays usable
        assert_eq!(table.read(&ReadRequest::new()).unwrap().len(), 1);
    }
}

// ============================================================================
// Boundaries
// ============================================================================

mod boundaries {
    use super::*;

    #[test]
    fn test_zero_count_every_target() {
        let (_tmp, db) = weather_db(4);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        for target in ALL {
            let out = table
                .read(&ReadRequest::new().count(0).target(target))
                .unwrap();
            assert!(out.is_empty(), "{}", target);
        }
    }

    #[test]
    fn test_start_past_end_every_target() {
        let (_tmp, db) = weather_db(4);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        for start in [4, 5, 1000] {
            for target in ALL {
                let out = table
                    .read(&ReadRequest::new().start(start).target(target))
                    .unwrap();
                assert!(out.is_empty(), "{} at {}", target, start);
            }
        }
    }

    #[test]
    fn test_count_past_end() {
        let (_tmp, db) = weather_db(4);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        let out = table
            .read(&ReadRequest::new().start(2).count(10))
            .unwrap()
            .into_tuples()
            .unwrap();
        assert_eq!(out, vec![weather_row(2), weather_row(3)]);
    }

    #[test]
    fn test_empty_table_every_target() {
        let (_tmp, db) = weather_db(0);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        assert_eq!(table.nrecords().unwrap(), 0);
        for target in ALL {
            assert!(table
                .read(&ReadRequest::new().target(target))
                .unwrap()
                .is_empty());
        }
        let frame = table
            .read(&ReadRequest::new().target(ReadTarget::Frame))
            .unwrap()
            .into_frame()
            .unwrap();
        assert_eq!(frame.num_columns(), 5);
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let (_tmp, db) = weather_db(6);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        for target in ALL {
            let request = ReadRequest::new().start(1).count(3).target(target);
            let first = table.read(&request).unwrap();
            let second = table.read(&request).unwrap();
            assert_eq!(first, second, "{}", target);
        }
    }

    #[test]
    fn test_reads_see_appends_from_other_handle() {
        let (_tmp, db) = weather_db(2);
        let reader = db.open_table("weather", OpenMode::Read).unwrap();
        let mut writer = db.open_table("weather", OpenMode::Append).unwrap();
        writer.append(&weather_row(2)).unwrap();
        writer.close().unwrap();
        assert_eq!(reader.nrecords().unwrap(), 3);
        assert_eq!(reader.read(&ReadRequest::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_partial_tail_only_fails_windows_that_reach_it() {
        let (_tmp, db) = weather_db(3);
        let paths = TablePaths::new(db.path(), "weather");
        let mut bytes = fs::read(paths.data()).unwrap();
        bytes.extend_from_slice(&[0xee; 5]);
        fs::write(paths.data(), &bytes).unwrap();

        let table = db.open_table("weather", OpenMode::Read).unwrap();
        assert_eq!(table.nrecords().unwrap(), 3);
        for target in ALL {
            for request in [
                ReadRequest::new().start(3),
                ReadRequest::new().start(99),
                ReadRequest::new().count(0),
            ] {
                let out = table.read(&request.target(target)).unwrap();
                assert!(out.is_empty(), "{}", target);
            }
        }
        for target in DECODED {
            let head = table
                .read(&ReadRequest::new().count(2).target(target))
                .unwrap();
            assert_eq!(rows(head), vec![weather_row(0), weather_row(1)], "{}", target);

            let projected = table
                .read(&ReadRequest::new().columns(["time"]).target(target))
                .unwrap();
            assert_eq!(projected.len(), 3, "{}", target);

            let err = table
                .read(&ReadRequest::new().start(2).target(target))
                .unwrap_err();
            assert!(err.is_format_mismatch(), "{}", target);
        }
    }
}

// ============================================================================
// Database Glue
// ============================================================================

mod database {
    use super::*;

    #[test]
    fn test_open_table_with_endian_override() {
        let (_tmp, db) = weather_db(1);
        let table = db
            .open_table("weather", OpenOptions::read().endian(Endian::Big))
            .unwrap();
        assert_eq!(table.format(), ">d?3f3sb");
    }

    #[test]
    fn test_oversized_field_is_schema_error() {
        let (_tmp, db) = writable_db();
        let header = TableHeader::new(vec![FieldDescriptor::new("x", "2305843009213693952q", 0)]);
        assert!(matches!(
            db.create_table("huge", &header),
            Err(Error::Schema(_))
        ));

        // A header written by another tool fails the same way at open
        let paths = TablePaths::new(db.path(), "huge");
        fs::write(paths.data(), b"").unwrap();
        header.store(paths.header()).unwrap();
        assert!(matches!(
            db.open_table("huge", OpenMode::Read),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_missing_table() {
        let (_tmp, db) = writable_db();
        assert!(matches!(
            db.open_table("ghost", OpenMode::Read),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_header_metadata_survives() {
        let (_tmp, db) = weather_db(0);
        let table = db.open_table("weather", OpenMode::Read).unwrap();
        assert_eq!(
            table.header().meta("memo"),
            Some(&serde_json::json!("weather station"))
        );
    }
}
