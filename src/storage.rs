//! Database file: the solved value/action table on disk.
//!
//! Layout (v1, little-endian):
//!
//! ```text
//! 0    u32  magic "YZDB" (0x42445A59)
//! 4    u32  version (1)
//! 8    u32  category count (13)
//! 12   u32  roll count (252)
//! 16   u32  roll stage count (3)
//! 20   u32  root state code
//! 24   u32  reachable state count N
//! 28   u32  reserved (0)
//! 32   f64[N]            state values, reachable-index order
//! 32+8N  (f32, u8)[756 N]  records, ((state * 3 + stage) * 252 + roll)
//! ```
//!
//! The full game is about 2.0 GB, so opening maps the file with `memmap2`
//! instead of reading it.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use memmap2::Mmap;
use tracing::info;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::state_codec::Reachability;
use crate::types::ValueTable;

/// Fixed-size file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DatabaseHeader {
    magic: u32,
    version: u32,
    categories: u32,
    rolls: u32,
    stages: u32,
    root: u32,
    states: u32,
    reserved: u32,
}

impl DatabaseHeader {
    fn for_table(root: u32, states: usize) -> Self {
        Self {
            magic: DATABASE_MAGIC,
            version: DATABASE_VERSION,
            categories: CATEGORY_COUNT as u32,
            rolls: NUM_DICE_SETS as u32,
            stages: NUM_ROLL_STAGES as u32,
            root,
            states: states as u32,
            reserved: 0,
        }
    }

    fn to_bytes(self) -> [u8; DATABASE_HEADER_SIZE] {
        let fields = [
            self.magic,
            self.version,
            self.categories,
            self.rolls,
            self.stages,
            self.root,
            self.states,
            self.reserved,
        ];
        let mut out = [0u8; DATABASE_HEADER_SIZE];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let field = |i: usize| read_u32(bytes, i * 4);
        Self {
            magic: field(0),
            version: field(1),
            categories: field(2),
            rolls: field(3),
            stages: field(4),
            root: field(5),
            states: field(6),
            reserved: field(7),
        }
    }
}

#[inline(always)]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(b)
}

/// Expected file size for `states` reachable states.
pub fn database_file_size(states: usize) -> u64 {
    (DATABASE_HEADER_SIZE + states * STATE_VALUE_SIZE + states * RECORDS_PER_STATE * RECORD_SIZE)
        as u64
}

/// Table storage: owned vectors (built in memory) or a read-only file mapping.
enum TableData {
    Owned {
        state_values: Vec<f64>,
        record_values: Vec<f32>,
        record_actions: Vec<u8>,
    },
    Mmap {
        mmap: Mmap,
    },
}

/// An open strategy database.
pub struct Database {
    reach: Reachability,
    data: TableData,
}

impl Database {
    /// Serve queries straight from a solved table.
    pub fn from_table(table: ValueTable) -> Self {
        Self {
            reach: table.reach,
            data: TableData::Owned {
                state_values: table.state_values,
                record_values: table.record_values,
                record_actions: table.record_actions,
            },
        }
    }

    /// Map a database file.
    ///
    /// NotFound if the path does not exist; IOError if it cannot be read or
    /// mapped, has a bad magic or a size that disagrees with its header;
    /// RangeError if its dimensions, root or state count do not match.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let start_time = Instant::now();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let len = file.metadata()?.len();
        if len < DATABASE_HEADER_SIZE as u64 {
            return Err(Error::Format(format!(
                "{} bytes is shorter than the {}-byte header",
                len, DATABASE_HEADER_SIZE
            )));
        }
        // The mapping is read-only; the file must not be truncated while open.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = DatabaseHeader::from_bytes(&mmap[..DATABASE_HEADER_SIZE]);
        if header.magic != DATABASE_MAGIC {
            return Err(Error::Format(format!("bad magic {:#010x}", header.magic)));
        }
        if header.version != DATABASE_VERSION {
            return Err(Error::range(format!(
                "unsupported database version {} (expected {})",
                header.version, DATABASE_VERSION
            )));
        }
        if header.categories != CATEGORY_COUNT as u32
            || header.rolls != NUM_DICE_SETS as u32
            || header.stages != NUM_ROLL_STAGES as u32
        {
            return Err(Error::range(format!(
                "database dimensions {}x{}x{} do not match {}x{}x{}",
                header.categories,
                header.rolls,
                header.stages,
                CATEGORY_COUNT,
                NUM_DICE_SETS,
                NUM_ROLL_STAGES
            )));
        }

        let expected = database_file_size(header.states as usize);
        if len != expected {
            return Err(Error::Format(format!(
                "file size {} does not match {} expected for {} states",
                len, expected, header.states
            )));
        }

        let reach = Reachability::from_root(header.root)?;
        if reach.len() != header.states as usize {
            return Err(Error::range(format!(
                "database holds {} states but root {:#x} reaches {}",
                header.states,
                header.root,
                reach.len()
            )));
        }

        info!(
            path = %path.display(),
            root = format_args!("{:#x}", header.root),
            states = header.states,
            ms = start_time.elapsed().as_secs_f64() * 1000.0,
            "database opened"
        );
        Ok(Self {
            reach,
            data: TableData::Mmap { mmap },
        })
    }

    /// Release the database. Query engines borrow it, so none can outlive this.
    pub fn close(self) {
        let mapped = matches!(self.data, TableData::Mmap { .. });
        info!(
            root = format_args!("{:#x}", self.root()),
            mapped, "database closed"
        );
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reach
    }

    pub fn root(&self) -> u32 {
        self.reach.root().encode()
    }

    pub fn len(&self) -> usize {
        self.reach.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reach.is_empty()
    }

    /// Stage-0 expected value of a reachable index.
    #[inline]
    pub fn state_value(&self, state_idx: usize) -> f64 {
        match &self.data {
            TableData::Owned { state_values, .. } => state_values[state_idx],
            TableData::Mmap { mmap } => {
                let at = DATABASE_HEADER_SIZE + state_idx * STATE_VALUE_SIZE;
                let mut b = [0u8; 8];
                b.copy_from_slice(&mmap[at..at + 8]);
                f64::from_le_bytes(b)
            }
        }
    }

    /// Record (value, action) at a flat record index.
    #[inline]
    pub fn record(&self, record_idx: usize) -> (f32, u8) {
        match &self.data {
            TableData::Owned {
                record_values,
                record_actions,
                ..
            } => (record_values[record_idx], record_actions[record_idx]),
            TableData::Mmap { mmap } => {
                let at = DATABASE_HEADER_SIZE
                    + self.reach.len() * STATE_VALUE_SIZE
                    + record_idx * RECORD_SIZE;
                let mut b = [0u8; 4];
                b.copy_from_slice(&mmap[at..at + 4]);
                (f32::from_le_bytes(b), mmap[at + 4])
            }
        }
    }
}

/// Write a solved table to `path`, creating parent directories.
pub fn save(table: &ValueTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let start_time = Instant::now();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let n = table.reach.len();
    let header = DatabaseHeader::for_table(table.reach.root().encode(), n);
    let mut w = BufWriter::with_capacity(1 << 20, File::create(path)?);
    w.write_all(&header.to_bytes())?;
    for v in &table.state_values {
        w.write_all(&v.to_le_bytes())?;
    }
    let mut rec = [0u8; RECORD_SIZE];
    for (v, &a) in table.record_values.iter().zip(&table.record_actions) {
        rec[..4].copy_from_slice(&v.to_le_bytes());
        rec[4] = a;
        w.write_all(&rec)?;
    }
    w.flush()?;

    info!(
        path = %path.display(),
        states = n,
        bytes = database_file_size(n),
        secs = start_time.elapsed().as_secs_f64(),
        "database saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::state_codec::GameState;
    use crate::state_computation::solve_from;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("yahtzee_storage_{}_{}", std::process::id(), name))
    }

    fn chance_only_root() -> u32 {
        GameState::new(ALL_CATEGORIES_MASK ^ (1 << CATEGORY_CHANCE), 0, false)
            .unwrap()
            .encode()
    }

    #[test]
    fn test_header_round_trip() {
        let h = DatabaseHeader::for_table(0x1234, 99);
        let bytes = h.to_bytes();
        assert_eq!(&bytes[..4], b"YZDB");
        assert_eq!(DatabaseHeader::from_bytes(&bytes), h);
    }

    #[test]
    fn test_save_and_open() {
        let table = solve_from(chance_only_root()).unwrap();
        let expected_value = table.state_values[0];
        let path = temp_path("round_trip.db");
        save(&table, &path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), database_file_size(2));

        let in_memory = Database::from_table(table);
        let db = Database::open(&path).unwrap();
        assert_eq!(db.root(), chance_only_root());
        assert_eq!(db.len(), 2);
        assert_eq!(db.state_value(0), expected_value);
        for i in 0..db.len() * RECORDS_PER_STATE {
            assert_eq!(db.record(i), in_memory.record(i));
        }
        db.close();
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_missing() {
        let err = Database::open(temp_path("does_not_exist.db")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_open_unreadable_path_is_io() {
        // A regular file used as a directory: the path does not exist, but the
        // failure is ENOTDIR, not a missing database.
        let blocker = temp_path("not_a_dir");
        fs::write(&blocker, b"x").unwrap();
        let err = Database::open(blocker.join("yahtzee.db")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        fs::remove_file(&blocker).ok();
    }

    #[test]
    fn test_open_bad_magic_and_size() {
        let path = temp_path("bad_magic.db");
        fs::write(&path, [0u8; 64]).unwrap();
        assert_eq!(Database::open(&path).err().unwrap().kind(), ErrorKind::Io);

        let mut bytes = DatabaseHeader::for_table(chance_only_root(), 2).to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 100]);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(Database::open(&path).err().unwrap().kind(), ErrorKind::Io);

        fs::write(&path, [1u8; 8]).unwrap();
        assert_eq!(Database::open(&path).err().unwrap().kind(), ErrorKind::Io);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_incompatible_header() {
        let path = temp_path("bad_version.db");
        let mut header = DatabaseHeader::for_table(chance_only_root(), 2);
        header.version = 2;
        let mut bytes = header.to_bytes().to_vec();
        bytes.resize(database_file_size(2) as usize, 0);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(Database::open(&path).err().unwrap().kind(), ErrorKind::Range);

        // Correct size, but the root reaches 2 states, not 3.
        let header = DatabaseHeader::for_table(chance_only_root(), 3);
        let mut bytes = header.to_bytes().to_vec();
        bytes.resize(database_file_size(3) as usize, 0);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(Database::open(&path).err().unwrap().kind(), ErrorKind::Range);
        fs::remove_file(&path).ok();
    }
}
