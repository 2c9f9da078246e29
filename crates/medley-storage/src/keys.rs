//! Collision-free file names for backends that copy bytes.
//!
//! Name format: `{stored_file_id}-{slug}.{ext}`. The primary key makes the
//! name unique, the slug keeps it readable.

use medley_core::models::file_extension;

const MAX_SLUG_LEN: usize = 64;

/// Lower-cased, filesystem-safe version of a file stem.
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len().min(MAX_SLUG_LEN));
    let mut last_dash = false;
    for c in stem.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "file".to_string()
    } else {
        slug
    }
}

/// Build the stored name for `original` (a file name or URL).
pub fn stored_file_name(stored_file_id: i64, original: &str) -> String {
    let path = original.split(['?', '#']).next().unwrap_or(original);
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let slug = slugify(stem);
    match file_extension(base) {
        Some(ext) => format!("{}-{}.{}", stored_file_id, slug, ext),
        None => format!("{}-{}", stored_file_id, slug),
    }
}
