use std::collections::HashSet;

/// Trim, drop blanks and dedupe keywords, keeping the first occurrence order.
pub fn dedupe<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let keywords: Vec<S> = keywords.into_iter().collect();
    let mut seen = HashSet::with_capacity(keywords.len());
    let mut out = Vec::with_capacity(keywords.len());

    for keyword in keywords.iter() {
        let keyword = keyword.as_ref().trim();
        if !keyword.is_empty() && seen.insert(keyword) {
            out.push(keyword.to_string());
        }
    }

    out
}

/// Number of batches of at most `size` for `len` keywords.
pub fn batch_count(len: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    len.div_ceil(size)
}

/// Split keywords into order preserving batches of at most `size`.
pub fn partition(keywords: &[String], size: usize) -> Vec<Vec<String>> {
    if size == 0 {
        return Vec::new();
    }
    keywords.chunks(size).map(|c| c.to_vec()).collect()
}
