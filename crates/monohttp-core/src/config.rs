//! Process-global tuning knobs.
//!
//! The supervisor model runs one process per accepted connection, so these
//! limits are plain process-wide values read at use time. They exist to bound
//! hostile input: a single chunk announcing an absurd size, or a field value
//! built out of thousands of escapes or deeply nested comments.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default upper bound on a single chunk of a chunked request body (16 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default cap on the field-value parser's escape accumulation stack.
pub const DEFAULT_FIELD_PARSER_STACK_LIMIT: usize = 1000;

/// Default cap on comment nesting inside a field value.
pub const DEFAULT_FIELD_PARSER_COMMENT_DEPTH_LIMIT: usize = 100;

static MAX_CHUNK_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_CHUNK_SIZE);
static FIELD_PARSER_STACK_LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_FIELD_PARSER_STACK_LIMIT);
static FIELD_PARSER_COMMENT_DEPTH_LIMIT: AtomicUsize =
    AtomicUsize::new(DEFAULT_FIELD_PARSER_COMMENT_DEPTH_LIMIT);

/// Returns the current upper bound on a single chunk size.
pub fn max_chunk_size() -> usize {
    MAX_CHUNK_SIZE.load(Ordering::Relaxed)
}

/// Sets the upper bound on a single chunk size.
pub fn set_max_chunk_size(limit: usize) {
    MAX_CHUNK_SIZE.store(limit, Ordering::Relaxed);
}

/// Returns the cap on the field-value parser's escape stack.
pub fn field_parser_stack_limit() -> usize {
    FIELD_PARSER_STACK_LIMIT.load(Ordering::Relaxed)
}

/// Sets the cap on the field-value parser's escape stack.
pub fn set_field_parser_stack_limit(limit: usize) {
    FIELD_PARSER_STACK_LIMIT.store(limit, Ordering::Relaxed);
}

/// Returns the cap on comment nesting inside a field value.
pub fn field_parser_comment_depth_limit() -> usize {
    FIELD_PARSER_COMMENT_DEPTH_LIMIT.load(Ordering::Relaxed)
}

/// Sets the cap on comment nesting inside a field value.
pub fn set_field_parser_comment_depth_limit(limit: usize) {
    FIELD_PARSER_COMMENT_DEPTH_LIMIT.store(limit, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults() {
        assert_eq!(max_chunk_size(), DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(field_parser_stack_limit(), DEFAULT_FIELD_PARSER_STACK_LIMIT);
        assert_eq!(
            field_parser_comment_depth_limit(),
            DEFAULT_FIELD_PARSER_COMMENT_DEPTH_LIMIT
        );
    }

    #[test]
    #[serial]
    fn knobs_round_trip() {
        set_max_chunk_size(1024);
        assert_eq!(max_chunk_size(), 1024);
        set_max_chunk_size(DEFAULT_MAX_CHUNK_SIZE);

        set_field_parser_stack_limit(4);
        assert_eq!(field_parser_stack_limit(), 4);
        set_field_parser_stack_limit(DEFAULT_FIELD_PARSER_STACK_LIMIT);

        set_field_parser_comment_depth_limit(2);
        assert_eq!(field_parser_comment_depth_limit(), 2);
        set_field_parser_comment_depth_limit(DEFAULT_FIELD_PARSER_COMMENT_DEPTH_LIMIT);
    }
}
