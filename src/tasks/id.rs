//! Task ID generation.
//!
//! The store assigns each task an opaque id at creation: a slug of the
//! task text (lowercased words joined by hyphens, capped in length) plus a
//! 6-character random hex suffix. Tests can switch to a counter-based
//! suffix for stable assertions.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const SLUG_MAX_LEN: usize = 40;

static SUFFIX_COUNTER: AtomicU64 = AtomicU64::new(0);
static DETERMINISTIC_SUFFIXES: AtomicBool = AtomicBool::new(false);

/// Switch id suffixes between random hex and a process-wide counter.
///
/// Enabling also resets the counter. Tests that enable this must not run
/// concurrently with other id-generating tests.
pub fn set_deterministic_ids(enabled: bool) {
    DETERMINISTIC_SUFFIXES.store(enabled, Ordering::SeqCst);
    if enabled {
        SUFFIX_COUNTER.store(0, Ordering::SeqCst);
    }
}

/// Reduce task text to a slug: lowercase ASCII words joined by hyphens,
/// truncated at a word boundary to at most 40 characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let words = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty());

    for word in words {
        // +1 for the joining hyphen
        if !slug.is_empty() && slug.len() + word.len() + 1 > SLUG_MAX_LEN {
            break;
        }
        if slug.len() + word.len() > SLUG_MAX_LEN {
            break;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.extend(word.chars().map(|c| c.to_ascii_lowercase()));
    }

    slug
}

#[allow(clippy::cast_possible_truncation)]
fn random_suffix() -> String {
    if DETERMINISTIC_SUFFIXES.load(Ordering::SeqCst) {
        let n = SUFFIX_COUNTER.fetch_add(1, Ordering::SeqCst);
        return format!("{n:06x}");
    }

    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    // Entropy only; truncation is fine.
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos()),
    );
    format!("{:06x}", hasher.finish() & 0xFF_FFFF)
}

/// Generate a task id from the task text.
#[must_use]
pub fn generate_task_id(text: &str) -> String {
    let slug = slugify(text);
    let suffix = random_suffix();
    if slug.is_empty() {
        format!("task-{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}
