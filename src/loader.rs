use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, info};

use crate::domain::DbvError;
use crate::format::FieldKind;
use crate::table::{FieldDescriptor, Table, Value};

/// Build number sentinel: let the source pick a layout on its own.
pub const BUILD_AUTODETECT: i64 = -1;

/// Boundary to the cache-decoding side. Implementations own the record
/// format knowledge (field layout, encoding, versioning by build number);
/// the viewer only consumes the resulting Table.
pub trait CacheSource {
    fn open(&self, path: &Path, build: i64) -> Result<Table, DbvError>;

    /// Lookup keyed by a logical identifier instead of a filesystem path.
    fn open_env(&self, name: &str, build: i64) -> Result<Table, DbvError>;
}

const WDBC_MAGIC: &[u8; 4] = b"WDBC";

/// Minimal built-in source for the plain WDBC container. Records are decoded
/// as untyped little-endian u32 columns; typed structures per build are the
/// job of an external schema library, not of this viewer. Environment
/// lookups resolve against the directory in DBV_CACHE_DIR.
#[derive(Debug, Default)]
pub struct GenericWdbcSource;

impl GenericWdbcSource {
    pub fn new() -> Self {
        Self
    }

    fn read_table<R: Read>(mut reader: R, source_name: &str, build: i64) -> Result<Table, DbvError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| truncated(source_name, e))?;
        if &magic != WDBC_MAGIC {
            return Err(DbvError::UnknownFormat(format!(
                "{source_name}: bad magic {magic:02x?}"
            )));
        }

        let record_count = reader.read_u32::<LittleEndian>().map_err(|e| truncated(source_name, e))?;
        let field_count = reader.read_u32::<LittleEndian>().map_err(|e| truncated(source_name, e))?;
        let record_size = reader.read_u32::<LittleEndian>().map_err(|e| truncated(source_name, e))?;
        let _string_block_size = reader.read_u32::<LittleEndian>().map_err(|e| truncated(source_name, e))?;

        // Header fields are untrusted; widen before multiplying
        if field_count == 0 || record_size as u64 != field_count as u64 * 4 {
            return Err(DbvError::CorruptFile(format!(
                "{source_name}: {field_count} fields do not fit a {record_size} byte record"
            )));
        }
        debug!("{source_name}: WDBC header, {record_count} records x {field_count} fields");

        let descriptors: Vec<FieldDescriptor> = (1..=field_count)
            .map(|i| FieldDescriptor::new(format!("field_{i}"), FieldKind::Plain))
            .collect();

        // Don't preallocate on the header's say-so; records may not exist
        let mut rows = Vec::with_capacity((record_count as usize).min(4096));
        for _ in 0..record_count {
            let mut row = Vec::with_capacity(field_count as usize);
            for _ in 0..field_count {
                let v = reader
                    .read_u32::<LittleEndian>()
                    .map_err(|e| truncated(source_name, e))?;
                row.push(Value::Int(v as i64));
            }
            rows.push(row);
        }
        // String block trails the records; without a structure there is
        // nothing to resolve against it.

        Ok(Table {
            descriptors,
            rows,
            source_name: source_name.to_string(),
            structure_name: format!("GenericWdbc<{field_count} fields>"),
            build,
        })
    }

    fn env_dir() -> Result<PathBuf, DbvError> {
        match std::env::var("DBV_CACHE_DIR") {
            Ok(dir) => Ok(PathBuf::from(dir)),
            Err(_) => Err(DbvError::FileNotFound(
                "DBV_CACHE_DIR is not set".to_string(),
            )),
        }
    }
}

impl CacheSource for GenericWdbcSource {
    fn open(&self, path: &Path, build: i64) -> Result<Table, DbvError> {
        info!("Opening {} with build {}", path.display(), build);
        if build == BUILD_AUTODETECT {
            debug!("Autodetect requested; the generic source keeps the sentinel");
        }
        let file = fs::File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DbvError::FileNotFound(path.display().to_string()),
            ErrorKind::PermissionDenied => DbvError::PermissionDenied(path.display().to_string()),
            _ => DbvError::IoError(e),
        })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Self::read_table(std::io::BufReader::new(file), &name, build)
    }

    fn open_env(&self, name: &str, build: i64) -> Result<Table, DbvError> {
        let path = Self::env_dir()?.join(name);
        self.open(&path, build)
    }
}

fn truncated(source_name: &str, err: std::io::Error) -> DbvError {
    if err.kind() == ErrorKind::UnexpectedEof {
        DbvError::CorruptFile(format!("{source_name}: unexpected end of file"))
    } else {
        DbvError::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    fn wdbc_blob(records: &[&[u32]], field_count: u32) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(WDBC_MAGIC);
        blob.extend_from_slice(&(records.len() as u32).to_le_bytes());
        blob.extend_from_slice(&field_count.to_le_bytes());
        blob.extend_from_slice(&(field_count * 4).to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        for record in records {
            for v in *record {
                blob.extend_from_slice(&v.to_le_bytes());
            }
        }
        blob
    }

    #[test]
    fn decodes_untyped_records() {
        let blob = wdbc_blob(&[&[1, 100], &[2, 200]], 2);
        let table = GenericWdbcSource::read_table(Cursor::new(blob), "Test.dbc", 12340).unwrap();
        assert_eq!(table.descriptors.len(), 2);
        assert_eq!(table.descriptors[0].name, "field_1");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], Value::Int(200));
        assert_eq!(table.build, 12340);
        assert_eq!(table.structure_name, "GenericWdbc<2 fields>");
    }

    #[test]
    fn rejects_unknown_magic() {
        let blob = b"WDB5\x00\x00\x00\x00".to_vec();
        let err = GenericWdbcSource::read_table(Cursor::new(blob), "x.db2", 0).unwrap_err();
        assert!(matches!(err, DbvError::UnknownFormat(_)));
    }

    #[test]
    fn rejects_record_size_mismatch() {
        let mut blob = Vec::new();
        blob.extend_from_slice(WDBC_MAGIC);
        blob.extend_from_slice(&1u32.to_le_bytes()); // records
        blob.extend_from_slice(&2u32.to_le_bytes()); // fields
        blob.extend_from_slice(&12u32.to_le_bytes()); // record size, not 2*4
        blob.extend_from_slice(&0u32.to_le_bytes());
        let err = GenericWdbcSource::read_table(Cursor::new(blob), "x.dbc", 0).unwrap_err();
        assert!(matches!(err, DbvError::CorruptFile(_)));
    }

    #[test]
    fn rejects_field_count_past_u32_range() {
        // field_count * 4 wraps to 4 in 32 bits; the mismatch must still
        // surface as a load error
        let mut blob = Vec::new();
        blob.extend_from_slice(WDBC_MAGIC);
        blob.extend_from_slice(&1u32.to_le_bytes()); // records
        blob.extend_from_slice(&0x4000_0001u32.to_le_bytes()); // fields
        blob.extend_from_slice(&4u32.to_le_bytes()); // record size
        blob.extend_from_slice(&0u32.to_le_bytes());
        let err = GenericWdbcSource::read_table(Cursor::new(blob), "x.dbc", 0).unwrap_err();
        assert!(matches!(err, DbvError::CorruptFile(_)));
    }

    #[test]
    fn inflated_record_count_fails_without_allocating_for_it() {
        let mut blob = Vec::new();
        blob.extend_from_slice(WDBC_MAGIC);
        blob.extend_from_slice(&u32::MAX.to_le_bytes()); // records, none present
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&4u32.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        let err = GenericWdbcSource::read_table(Cursor::new(blob), "x.dbc", 0).unwrap_err();
        assert!(matches!(err, DbvError::CorruptFile(_)));
    }

    #[test]
    fn rejects_truncated_records() {
        let mut blob = wdbc_blob(&[&[1, 2]], 2);
        blob.truncate(blob.len() - 3);
        let err = GenericWdbcSource::read_table(Cursor::new(blob), "x.dbc", 0).unwrap_err();
        assert!(matches!(err, DbvError::CorruptFile(_)));
    }

    #[test]
    fn open_reads_from_disk_and_keeps_the_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Spell.dbc");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&wdbc_blob(&[&[7]], 1))
            .unwrap();

        let source = GenericWdbcSource::new();
        let table = source.open(&path, BUILD_AUTODETECT).unwrap();
        assert_eq!(table.source_name, "Spell.dbc");
        assert_eq!(table.rows[0][0], Value::Int(7));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let source = GenericWdbcSource::new();
        let err = source.open(Path::new("/no/such/file.dbc"), 0).unwrap_err();
        assert!(matches!(err, DbvError::FileNotFound(_)));
    }
}
