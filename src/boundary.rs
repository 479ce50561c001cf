//! Result-with-diagnostic boundary for embedding hosts.
//!
//! Every entry point returns a [`NativeResult`]: either the value or a
//! [`NativeError`] carrying the numeric error code and a message. Panics inside
//! a call are caught by [`landingpad`] and reported with code 0 and the panic
//! location and message captured by the hook installed in [`init`].
//!
//! Databases are addressed through integer handles. The handle table hands
//! out `Arc<Database>` clones, so closing a handle while another thread is
//! querying it only unregisters the handle; the mapping goes away with the
//! last in-flight query.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, UnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once, OnceLock, RwLock};

use serde::Serialize;
use tracing::error;

use crate::api_computations::QueryEngine;
use crate::error::{Error, Result};
use crate::phase0_tables::tables;
use crate::storage::Database;

/// Code reported for a panic caught at the boundary.
pub const PANIC_CODE: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NativeError {
    pub code: u32,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum NativeResult<T> {
    Ok(T),
    Err(NativeError),
}

impl<T> NativeResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, NativeResult::Ok(_))
    }

    pub fn error_code(&self) -> Option<u32> {
        match self {
            NativeResult::Ok(_) => None,
            NativeResult::Err(e) => Some(e.code),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, NativeError> {
        match self {
            NativeResult::Ok(v) => Ok(v),
            NativeResult::Err(e) => Err(e),
        }
    }
}

impl From<Error> for NativeError {
    fn from(err: Error) -> Self {
        NativeError {
            code: err.kind().code(),
            message: err.to_string(),
        }
    }
}

thread_local! {
    static PANIC_INFO: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn capture_panic(info: &panic::PanicHookInfo<'_>) {
    let payload = info.payload();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "?".to_string()
    };
    let position = info
        .location()
        .map(|p| format!("At {}:{}: ", p.file(), p.line()))
        .unwrap_or_default();
    let full = format!("{}{}", position, message);
    error!(panic = %full, "panic inside boundary call");
    PANIC_INFO.with(|slot| *slot.borrow_mut() = Some(full));
}

static INIT: Once = Once::new();

/// One-time process setup: install the panic hook and build the lookup
/// tables. Repeated calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        panic::set_hook(Box::new(capture_panic));
        tables();
    });
}

/// Run a core call, converting its error or panic into a [`NativeError`].
pub fn landingpad<T, F>(f: F) -> NativeResult<T>
where
    F: FnOnce() -> Result<T> + UnwindSafe,
{
    init();
    match panic::catch_unwind(f) {
        Ok(Ok(v)) => NativeResult::Ok(v),
        Ok(Err(e)) => NativeResult::Err(e.into()),
        Err(_) => {
            let message = PANIC_INFO
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| "no panic info".to_string());
            NativeResult::Err(NativeError {
                code: PANIC_CODE,
                message,
            })
        }
    }
}

type HandleTable = RwLock<HashMap<u32, Arc<Database>>>;

static HANDLES: OnceLock<HandleTable> = OnceLock::new();
static NEXT_HANDLE: AtomicU32 = AtomicU32::new(1);

fn handles() -> &'static HandleTable {
    HANDLES.get_or_init(|| RwLock::new(HashMap::new()))
}

fn database(handle: u32) -> Result<Arc<Database>> {
    let table = handles().read().unwrap_or_else(|e| e.into_inner());
    table
        .get(&handle)
        .cloned()
        .ok_or_else(|| Error::range(format!("database handle {} is not open", handle)))
}

fn state_arg(state: i32) -> Result<u32> {
    u32::try_from(state).map_err(|_| Error::range(format!("state code {} is negative", state)))
}

fn dice_arg(dice: &[i32]) -> Result<Vec<u8>> {
    dice.iter()
        .map(|&d| {
            u8::try_from(d).map_err(|_| Error::range(format!("die face {} outside 1..=6", d)))
        })
        .collect()
}

/// Open a database from a UTF-8 path given as raw bytes; returns its handle.
pub fn open(path: &[u8]) -> NativeResult<u32> {
    landingpad(|| {
        let path = std::str::from_utf8(path)?;
        let db = Database::open(path)?;
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        handles()
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, Arc::new(db));
        Ok(handle)
    })
}

/// Release a handle. Closing an unknown or already closed handle is a RangeError.
pub fn close(handle: u32) -> NativeResult<()> {
    landingpad(|| {
        let removed = handles()
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle);
        match removed {
            Some(db) => {
                if let Ok(db) = Arc::try_unwrap(db) {
                    db.close();
                }
                Ok(())
            }
            None => Err(Error::range(format!("database handle {} is not open", handle))),
        }
    })
}

pub fn lookup(handle: u32, state: i32) -> NativeResult<f64> {
    landingpad(|| {
        let db = database(handle)?;
        QueryEngine::new(&db).lookup(state_arg(state)?)
    })
}

pub fn best_action(handle: u32, state: i32, dice: &[i32]) -> NativeResult<i32> {
    landingpad(|| {
        let db = database(handle)?;
        let state = state_arg(state)?;
        let dice = dice_arg(dice)?;
        QueryEngine::new(&db)
            .best_action(state, &dice)
            .map(|c| c as i32)
    })
}

pub fn keep_first(handle: u32, state: i32, dice: &[i32]) -> NativeResult<Vec<i32>> {
    landingpad(|| {
        let db = database(handle)?;
        let state = state_arg(state)?;
        let dice = dice_arg(dice)?;
        let kept = QueryEngine::new(&db).keep_first(state, &dice)?;
        Ok(kept.into_iter().map(i32::from).collect())
    })
}

pub fn keep_second(handle: u32, state: i32, dice: &[i32]) -> NativeResult<Vec<i32>> {
    landingpad(|| {
        let db = database(handle)?;
        let state = state_arg(state)?;
        let dice = dice_arg(dice)?;
        let kept = QueryEngine::new(&db).keep_second(state, &dice)?;
        Ok(kept.into_iter().map(i32::from).collect())
    })
}
