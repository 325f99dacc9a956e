//! `quire sample`: fill the content directory with placeholder posts.
//!
//! Each post gets a lorem title, a date within the past year, one to three
//! tags from a fixed pool, a lorem excerpt and one of a few Markdown bodies.
//! Existing posts are left alone and their slugs are never reused.

use crate::draft::{month_dir, post_source, write_post};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const TAG_POOL: &[&str] = &[
    "programming",
    "coding",
    "engineering",
    "life",
    "thoughts",
    "random",
    "opinion",
    "DIY",
    "stuff",
];

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "magna", "aliqua", "enim", "ad",
    "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
    "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum",
];

const BODIES: &[&str] = &[
    "## Getting started\n\nSome *emphasis*, some **strong** text and a [link](https://example.com).\n\n\
     - first item\n- second item\n- third item\n",
    "## A code sample\n\n```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n\n\
     > Quoted text to close things off.\n",
    "## Notes\n\n1. One\n2. Two\n3. Three\n\n| Key | Value |\n|-----|-------|\n| a   | 1     |\n",
];

const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

/// Write `count` sample posts to `<content>/<YYYY>/<MM>/<slug>.md`.
pub fn generate_samples(
    content: &Path,
    separator: &str,
    count: usize,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    let mut used = existing_stems(content);
    let mut paths = Vec::with_capacity(count);

    for _ in 0..count {
        let title = sentence(rng, 3, 8);
        let stem = unique_stem(&title.to_lowercase().replace(' ', "-"), &mut used);

        let ago = rng.gen_range(60..=SECONDS_PER_YEAR);
        let published = DateTime::from_timestamp(now.timestamp() - ago, 0)
            .context("sample date out of range")?;

        let tag_count = rng.gen_range(1..=3);
        let tags: Vec<&str> = TAG_POOL.choose_multiple(rng, tag_count).copied().collect();
        let excerpt = format!("{}.", sentence(rng, 20, 35));
        let body = BODIES.choose(rng).copied().unwrap_or_default();

        let path = month_dir(content, published)?.join(format!("{stem}.md"));
        write_post(&path, &post_source(separator, &title, published, &tags, &excerpt, body))?;
        paths.push(path);
    }

    Ok(paths)
}

/// `min..=max` lorem words, first one capitalized, no final period.
fn sentence(rng: &mut impl Rng, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    let words: Vec<&str> = (0..len).filter_map(|_| WORDS.choose(rng).copied()).collect();
    let mut sentence = words.join(" ");
    if let Some(first) = sentence.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    sentence
}

fn existing_stems(content: &Path) -> FxHashSet<String> {
    WalkDir::new(content)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_lowercase())
        })
        .collect()
}

/// `base`, or `base-N` for the first `N` not yet in `used`. Records the pick.
fn unique_stem(base: &str, used: &mut FxHashSet<String>) -> String {
    let stem = if used.contains(base) {
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !used.contains(candidate))
            .unwrap_or_else(|| base.to_owned())
    } else {
        base.to_owned()
    };
    used.insert(stem.clone());
    stem
}
