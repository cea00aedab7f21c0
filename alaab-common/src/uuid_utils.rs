//! UUID utilities

use uuid::Uuid;

/// Order two ids so that the smaller one comes first
///
/// Similarity records are stored under this canonical ordering so that
/// (A, B) and (B, A) name the same row.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
