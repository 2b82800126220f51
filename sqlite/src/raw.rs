//! Thin owning wrappers around the engine's connection and statement handles.
//!
//! This is the only module that calls into the C API. Everything above it
//! works with [`RawConnection`] / [`RawStatement`] and plain Rust values.
//! Handles are `!Send` and `!Sync`; the engine objects they own are used
//! from one thread at a time.

use std::any::Any;
use std::borrow::Cow;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use rusqlite::ffi;
use tracing::warn;

use crate::error::EngineError;
use crate::exec::ExecRow;

pub(crate) use ffi::{
    SQLITE_BLOB, SQLITE_BUSY, SQLITE_DONE, SQLITE_FLOAT, SQLITE_INTEGER,
    SQLITE_MISUSE, SQLITE_NULL, SQLITE_OK, SQLITE_RANGE, SQLITE_ROW, SQLITE_TOOBIG,
};

/// SQLite's column type code for text (`SQLITE3_TEXT` in the C header).
pub(crate) const SQLITE_TEXT: c_int = 3;

/// Canonical English text for a result code.
pub(crate) fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr accepts any code and returns a static string.
    let message = unsafe { ffi::sqlite3_errstr(code) };
    // SAFETY: non-null pointers from sqlite3_errstr are NUL-terminated.
    unsafe { optional_text(message) }.unwrap_or_else(|| format!("unknown error code {code}"))
}

/// Open flags for a read-only or read-write database.
pub(crate) fn open_flags(read_only: bool, create: bool) -> c_int {
    if read_only {
        ffi::SQLITE_OPEN_READONLY
    } else if create {
        ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
    } else {
        ffi::SQLITE_OPEN_READWRITE
    }
}

/// Copies a possibly-null C string.
///
/// # Safety
///
/// `text` must be null or point to a NUL-terminated string.
unsafe fn optional_text(text: *const c_char) -> Option<String> {
    if text.is_null() {
        None
    } else {
        // SAFETY: caller guarantees NUL termination.
        Some(unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned())
    }
}

/// Reads the last error recorded on a connection.
///
/// # Safety
///
/// `db` must be a valid, open connection handle.
unsafe fn connection_error(db: *mut ffi::sqlite3) -> EngineError {
    // SAFETY: db is valid per the caller.
    let code = unsafe { ffi::sqlite3_errcode(db) };
    // SAFETY: sqlite3_errmsg returns a NUL-terminated string owned by db.
    let message = unsafe { optional_text(ffi::sqlite3_errmsg(db)) };
    EngineError::from_code(code, message.as_deref())
}

/// Why a prepare call produced no statement.
#[derive(Debug)]
pub(crate) struct PrepareFailure {
    pub(crate) error: EngineError,
    pub(crate) offset: Option<usize>,
}

/// An open engine connection. Closed on drop.
pub(crate) struct RawConnection {
    db: NonNull<ffi::sqlite3>,
}

impl RawConnection {
    /// Opens `path` with the given flags.
    pub(crate) fn open(path: &CStr, flags: c_int) -> Result<Self, EngineError> {
        let mut db = ptr::null_mut();
        // SAFETY: path is NUL-terminated and db is a valid out-pointer.
        let rc = unsafe { ffi::sqlite3_open_v2(path.as_ptr(), &mut db, flags, ptr::null()) };

        match NonNull::new(db) {
            Some(db) if rc == SQLITE_OK => Ok(Self { db }),
            Some(db) => {
                // The engine allocates a handle even on failure; it carries
                // the diagnostic and must still be closed.
                // SAFETY: db was just returned by sqlite3_open_v2.
                let error = unsafe { connection_error(db.as_ptr()) };
                // SAFETY: db is not used after this call.
                unsafe { ffi::sqlite3_close(db.as_ptr()) };
                Err(error)
            }
            None if rc == SQLITE_OK => Err(EngineError::from_code(ffi::SQLITE_NOMEM, None)),
            None => Err(EngineError::from_code(rc, None)),
        }
    }

    /// The most recent error recorded on this connection.
    pub(crate) fn last_error(&self) -> EngineError {
        // SAFETY: self.db is open for the lifetime of self.
        unsafe { connection_error(self.db.as_ptr()) }
    }

    /// Runs every statement in `sql`, discarding rows.
    pub(crate) fn exec(&self, sql: &CStr) -> Result<(), EngineError> {
        // SAFETY: no callback, so the argument pointer is never read.
        unsafe { self.exec_raw(sql, None, ptr::null_mut()) }
    }

    /// Runs every statement in `sql`, handing each produced row to `callback`.
    ///
    /// A `Break` from the callback aborts execution. A panic in the callback
    /// also aborts execution and is resumed once the engine has returned.
    pub(crate) fn exec_rows<F>(&self, sql: &CStr, callback: &mut F) -> Result<(), EngineError>
    where
        F: FnMut(&ExecRow<'_>) -> ControlFlow<()>,
    {
        let mut state = ExecState {
            callback,
            panic: None,
        };
        let arg = (&mut state as *mut ExecState<'_, F>).cast::<c_void>();
        // SAFETY: arg points at `state`, which outlives the sqlite3_exec call,
        // and exec_trampoline::<F> casts it back to the same type.
        let result = unsafe { self.exec_raw(sql, Some(exec_trampoline::<F>), arg) };

        if let Some(payload) = state.panic {
            panic::resume_unwind(payload);
        }
        result
    }

    /// # Safety
    ///
    /// `arg` must be valid for whatever `callback` does with it.
    unsafe fn exec_raw(
        &self,
        sql: &CStr,
        callback: ExecCallback,
        arg: *mut c_void,
    ) -> Result<(), EngineError> {
        let mut errmsg: *mut c_char = ptr::null_mut();
        // SAFETY: db is open, sql is NUL-terminated, errmsg is a valid out-pointer.
        let rc = unsafe {
            ffi::sqlite3_exec(self.db.as_ptr(), sql.as_ptr(), callback, arg, &mut errmsg)
        };
        if rc == SQLITE_OK {
            return Ok(());
        }

        // SAFETY: errmsg is null or a NUL-terminated string from sqlite3_malloc.
        let message = unsafe { optional_text(errmsg) };
        // SAFETY: sqlite3_free accepts null and engine-allocated pointers.
        unsafe { ffi::sqlite3_free(errmsg.cast()) };
        Err(EngineError::from_code(rc, message.as_deref()))
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Returns `Ok(None)` when the text holds no statement (only whitespace
    /// or comments).
    pub(crate) fn prepare(&self, sql: &str) -> Result<Option<RawStatement>, PrepareFailure> {
        let Ok(len) = c_int::try_from(sql.len()) else {
            return Err(PrepareFailure {
                error: EngineError::from_code(SQLITE_TOOBIG, None),
                offset: None,
            });
        };

        let mut stmt = ptr::null_mut();
        // SAFETY: db is open; sql is valid for `len` bytes; stmt is a valid out-pointer.
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.db.as_ptr(),
                sql.as_ptr().cast(),
                len,
                &mut stmt,
                ptr::null_mut(),
            )
        };

        if rc != SQLITE_OK {
            // SAFETY: db is open.
            let offset = unsafe { ffi::sqlite3_error_offset(self.db.as_ptr()) };
            return Err(PrepareFailure {
                error: self.last_error(),
                offset: usize::try_from(offset).ok(),
            });
        }

        Ok(NonNull::new(stmt).map(|stmt| RawStatement { stmt }))
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        // Fails with SQLITE_BUSY while a leaked statement is still unfinalized.
        // SAFETY: db is open and never used again.
        let rc = unsafe { ffi::sqlite3_close(self.db.as_ptr()) };
        if rc != SQLITE_OK {
            warn!(code = rc, "closing database connection failed");
        }
    }
}

type ExecCallback =
    Option<unsafe extern "C" fn(*mut c_void, c_int, *mut *mut c_char, *mut *mut c_char) -> c_int>;

struct ExecState<'f, F> {
    callback: &'f mut F,
    panic: Option<Box<dyn Any + Send>>,
}

unsafe extern "C" fn exec_trampoline<F>(
    arg: *mut c_void,
    count: c_int,
    values: *mut *mut c_char,
    names: *mut *mut c_char,
) -> c_int
where
    F: FnMut(&ExecRow<'_>) -> ControlFlow<()>,
{
    // SAFETY: arg is the ExecState<F> set up by exec_rows for this call.
    let state = unsafe { &mut *arg.cast::<ExecState<'_, F>>() };
    if state.panic.is_some() {
        return 1;
    }

    let count = usize::try_from(count).unwrap_or(0);
    // SAFETY: the engine passes `count` column names and `count` values
    // (entries may be null), valid for the duration of this callback.
    let (names, values) = unsafe { (c_string_array(names, count), c_string_array(values, count)) };
    let names = names
        .into_iter()
        .map(|name| name.unwrap_or(Cow::Borrowed("")))
        .collect();
    let row = ExecRow::new(names, values);

    let callback = &mut *state.callback;
    match panic::catch_unwind(AssertUnwindSafe(|| callback(&row))) {
        Ok(ControlFlow::Continue(())) => 0,
        Ok(ControlFlow::Break(())) => 1,
        Err(payload) => {
            state.panic = Some(payload);
            1
        }
    }
}

/// An owned compiled statement. Finalized on drop.
pub(crate) struct RawStatement {
    stmt: NonNull<ffi::sqlite3_stmt>,
}

impl RawStatement {
    fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    /// Turns a bind/step result code into an error with the connection's
    /// diagnostic, falling back to the canonical text when the connection
    /// recorded something else.
    pub(crate) fn check(&self, rc: c_int) -> Result<(), EngineError> {
        if rc == SQLITE_OK {
            return Ok(());
        }
        Err(self.error_for(rc))
    }

    pub(crate) fn error_for(&self, rc: c_int) -> EngineError {
        let last = self.last_error();
        if last.code() == rc {
            last
        } else {
            EngineError::from_code(rc, None)
        }
    }

    /// The last error on the owning connection.
    pub(crate) fn last_error(&self) -> EngineError {
        // SAFETY: stmt is valid; sqlite3_db_handle returns its open connection.
        unsafe { connection_error(ffi::sqlite3_db_handle(self.as_ptr())) }
    }

    pub(crate) fn bind_int64(&self, index: c_int, value: i64) -> c_int {
        // SAFETY: stmt is valid; out-of-range indices are reported, not UB.
        unsafe { ffi::sqlite3_bind_int64(self.as_ptr(), index, value) }
    }

    pub(crate) fn bind_double(&self, index: c_int, value: f64) -> c_int {
        // SAFETY: as bind_int64.
        unsafe { ffi::sqlite3_bind_double(self.as_ptr(), index, value) }
    }

    pub(crate) fn bind_null(&self, index: c_int) -> c_int {
        // SAFETY: as bind_int64.
        unsafe { ffi::sqlite3_bind_null(self.as_ptr(), index) }
    }

    pub(crate) fn bind_text(&self, index: c_int, value: &str) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: value is valid for `len` bytes; SQLITE_TRANSIENT makes the
        // engine copy it before returning.
        unsafe {
            ffi::sqlite3_bind_text(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        }
    }

    pub(crate) fn bind_blob(&self, index: c_int, value: &[u8]) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: as bind_text.
        unsafe {
            ffi::sqlite3_bind_blob(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        }
    }

    pub(crate) fn step(&self) -> c_int {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_step(self.as_ptr()) }
    }

    pub(crate) fn reset(&self) -> c_int {
        // SAFETY: stmt is valid; bindings are left in place.
        unsafe { ffi::sqlite3_reset(self.as_ptr()) }
    }

    pub(crate) fn sql(&self) -> String {
        // SAFETY: stmt is valid; the returned text is owned by the statement.
        unsafe { optional_text(ffi::sqlite3_sql(self.as_ptr())) }.unwrap_or_default()
    }

    pub(crate) fn parameter_count(&self) -> c_int {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    pub(crate) fn column_count(&self) -> c_int {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_column_count(self.as_ptr()) }
    }

    pub(crate) fn column_name(&self, index: c_int) -> Option<String> {
        // SAFETY: stmt is valid; out-of-range indices return null.
        unsafe { optional_text(ffi::sqlite3_column_name(self.as_ptr(), index)) }
    }

    // Column accessors below are defined by the engine for any index and
    // any statement state: out-of-range columns and "no current row" read
    // as NULL.

    pub(crate) fn column_type(&self, index: c_int) -> c_int {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_column_type(self.as_ptr(), index) }
    }

    pub(crate) fn column_int64(&self, index: c_int) -> i64 {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_column_int64(self.as_ptr(), index) }
    }

    pub(crate) fn column_double(&self, index: c_int) -> f64 {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_column_double(self.as_ptr(), index) }
    }

    pub(crate) fn column_bytes(&self, index: c_int) -> c_int {
        // SAFETY: stmt is valid.
        unsafe { ffi::sqlite3_column_bytes(self.as_ptr(), index) }
    }

    /// Text of a column, copied out. NULL reads as empty.
    pub(crate) fn column_text(&self, index: c_int) -> Vec<u8> {
        // The pointer must be fetched before the length: the text call may
        // convert the stored value, which changes its byte count.
        // SAFETY: stmt is valid.
        let text = unsafe { ffi::sqlite3_column_text(self.as_ptr(), index) };
        let len = self.column_bytes(index);
        // SAFETY: text is null or valid for `len` bytes until the next step,
        // reset or conversion, none of which happen before the copy.
        unsafe { copy_bytes(text.cast(), len) }
    }

    /// Bytes of a column, copied out. NULL reads as empty.
    pub(crate) fn column_blob(&self, index: c_int) -> Vec<u8> {
        // SAFETY: stmt is valid.
        let blob = unsafe { ffi::sqlite3_column_blob(self.as_ptr(), index) };
        let len = self.column_bytes(index);
        // SAFETY: as column_text.
        unsafe { copy_bytes(blob.cast(), len) }
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        // SAFETY: stmt is valid and never used again. The return value
        // repeats the last step error, which has already been reported.
        unsafe { ffi::sqlite3_finalize(self.as_ptr()) };
    }
}

/// # Safety
///
/// `data` must be null or valid for `len` bytes.
unsafe fn copy_bytes(data: *const u8, len: c_int) -> Vec<u8> {
    let len = usize::try_from(len).unwrap_or(0);
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    // SAFETY: guaranteed by the caller.
    unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
}

/// Borrows an array of `count` nullable C strings.
///
/// # Safety
///
/// `array` must be null or point to `count` pointers, each null or
/// NUL-terminated and valid for `'a`.
unsafe fn c_string_array<'a>(array: *mut *mut c_char, count: usize) -> Vec<Option<Cow<'a, str>>> {
    if array.is_null() {
        return vec![None; count];
    }
    (0..count)
        .map(|i| {
            // SAFETY: i < count per the caller.
            let entry = unsafe { *array.add(i) };
            if entry.is_null() {
                None
            } else {
                // SAFETY: entry is NUL-terminated per the caller.
                Some(unsafe { CStr::from_ptr(entry) }.to_string_lossy())
            }
        })
        .collect()
}
