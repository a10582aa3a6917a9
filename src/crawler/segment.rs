//! Id range partitioning
//!
//! Splits `[first_id, last_id)` into one contiguous segment per worker. Every
//! segment but the last spans `(last_id - first_id) / pool_size` ids; the last
//! one always ends at `last_id` and absorbs the division remainder.

use crate::models::{ItemId, Segment};
use crate::utils::error::ConfigError;

/// Partition `[first_id, last_id)` into `pool_size` segments
///
/// # Errors
///
/// Returns `ConfigError` if `pool_size` is zero or the range is empty
pub fn partition(
    first_id: ItemId,
    last_id: ItemId,
    pool_size: usize,
) -> Result<Vec<Segment>, ConfigError> {
    if pool_size == 0 {
        return Err(ConfigError::InvalidPoolSize(pool_size));
    }
    if last_id <= first_id {
        return Err(ConfigError::InvalidRange { first_id, last_id });
    }

    let pool = pool_size as u64;
    let offset_space = (last_id - first_id) / pool;

    let segments = (0..pool)
        .map(|i| {
            let begin = first_id + offset_space * i;
            let end = if i < pool - 1 {
                first_id + offset_space * (i + 1)
            } else {
                last_id
            };
            Segment::new(begin, end)
        })
        .collect();

    Ok(segments)
}
