//! Helpers for SQLite query construction.

/// Upper bound on ids bound into one `IN (...)` clause.
///
/// SQLite caps bound parameters per statement (999 on older builds); chunks of
/// 500 leave room for the other filters of the query.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits `items` into slices small enough for one `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}
