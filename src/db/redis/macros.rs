/// Read-through caching for catalog lookups.
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for storage with `$ttl` seconds to live, and
/// returns it. Must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let genres: Vec<Genre> = cached!(self.cache, CacheKey::Genres, GENRE_CACHE_TTL, async move {
///     self.fetch_genres_uncached().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
