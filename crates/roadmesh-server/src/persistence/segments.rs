//! Saved path segment persistence.

use anyhow::Result;
use roadmesh_core::{decode_segment_records, encode_segment_records, PathSegment};
use sqlx::SqlitePool;

use super::kv;

pub const PATH_SEGMENTS_KEY: &str = "path_segments";

/// Load the saved segment list. A missing key is an empty list.
pub async fn load_segments(pool: &SqlitePool) -> Result<Vec<PathSegment>> {
    match kv::get_value(pool, PATH_SEGMENTS_KEY).await? {
        Some(json) => Ok(decode_segment_records(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Replace the stored list with `segments`.
pub async fn save_segments(pool: &SqlitePool, segments: &[PathSegment]) -> Result<()> {
    let json = encode_segment_records(segments)?;
    kv::put_value(pool, PATH_SEGMENTS_KEY, &json).await
}

pub async fn clear_segments(pool: &SqlitePool) -> Result<()> {
    kv::delete_value(pool, PATH_SEGMENTS_KEY).await?;
    Ok(())
}
