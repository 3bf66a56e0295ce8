//! Record selection: bounded, order-preserving.

/// The first `limit` items of `candidates`, in their original order.
///
/// Caller order (recency from the store, or the user's title list) is
/// trusted as relevance order; nothing is scored or reordered.
pub fn select<T>(candidates: &[T], limit: usize) -> &[T] {
    &candidates[..candidates.len().min(limit)]
}
