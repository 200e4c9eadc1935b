//! Marker-delimited block management for user-owned text files.
//!
//! A managed block looks like this inside e.g. `~/.zshrc`:
//!
//! ```text
//! # >>> sc managed start >>>
//! export ANTHROPIC_AUTH_TOKEN="..."
//! export ANTHROPIC_BASE_URL="..."
//! # <<< sc managed end <<<
//! ```
//!
//! Everything between the markers belongs to sc and is rewritten wholesale.
//! Everything outside belongs to the user and is preserved byte for byte.
//!
//! Markers are found with plain substring search, not by parsing shell
//! syntax, so the editor works on any file. The flip side: a user line that
//! happens to contain the marker text is treated as a marker.
//!
//! All functions here are pure `&str -> String` transformations; reading and
//! writing the actual file is the caller's job.

use std::ops::Range;

/// A start/end sentinel line pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    pub start: &'static str,
    pub end: &'static str,
}

/// Block holding the exported credentials
pub const PROFILE_MARKERS: Markers = Markers {
    start: "# >>> sc managed start >>>",
    end: "# <<< sc managed end <<<",
};

/// Marker pair written by older releases. Recognized and rewritten to
/// [`PROFILE_MARKERS`] on the next update.
pub const LEGACY_PROFILE_MARKERS: Markers = Markers {
    start: "# >>> sc >>>",
    end: "# <<< sc <<<",
};

/// Block holding the shell completion hook
pub const COMPLETION_MARKERS: Markers = Markers {
    start: "# >>> sc completion >>>",
    end: "# <<< sc completion <<<",
};

/// The full block text: start marker, body, end marker. No trailing newline.
pub fn render_block(body: &str, markers: &Markers) -> String {
    format!("{}\n{}\n{}", markers.start, body, markers.end)
}

/// Byte range of the managed block, from the first byte of the start marker
/// to the last byte of the end marker.
///
/// The end is the first end marker that has a start marker somewhere before
/// it; the start is the last start marker before that end. On a well-formed
/// file this is simply the first start and the first end. A lone start or a
/// lone end is a partial block and yields `None`.
pub fn find(content: &str, markers: &Markers) -> Option<Range<usize>> {
    for (end_idx, _) in content.match_indices(markers.end) {
        if let Some(start_idx) = content[..end_idx].rfind(markers.start) {
            return Some(start_idx..end_idx + markers.end.len());
        }
    }
    None
}

pub fn contains(content: &str, markers: &Markers) -> bool {
    find(content, markers).is_some()
}

/// Result of an [`upsert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub content: String,
    pub action: UpsertAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// An existing block with the current markers was rewritten
    Replaced,
    /// A legacy block was rewritten in place using the current markers
    Migrated,
    /// No block was found; a new one was appended
    Appended,
}

/// Insert or replace the managed block and return the new file content.
///
/// The current marker pair is searched first, then `legacy` if given. A found
/// block is replaced in place; the written block always uses `markers`. If
/// nothing is found the block is appended after a blank line.
///
/// Idempotent: applying the same body twice yields the same content as
/// applying it once.
pub fn upsert(content: &str, body: &str, markers: &Markers, legacy: Option<&Markers>) -> Upserted {
    let block = render_block(body, markers);

    let found = find(content, markers)
        .map(|range| (range, UpsertAction::Replaced))
        .or_else(|| {
            legacy
                .and_then(|legacy| find(content, legacy))
                .map(|range| (range, UpsertAction::Migrated))
        });

    if let Some((range, action)) = found {
        let mut out = String::with_capacity(content.len() - range.len() + block.len());
        out.push_str(&content[..range.start]);
        out.push_str(&block);
        out.push_str(&content[range.end..]);
        return Upserted {
            content: out,
            action,
        };
    }

    let mut out = String::with_capacity(content.len() + block.len() + 3);
    out.push_str(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&block);
    out.push('\n');

    Upserted {
        content: out,
        action: UpsertAction::Appended,
    }
}

/// Remove the managed block and return the new content.
///
/// Whole lines are removed, from the line holding the start marker through
/// the line holding the end marker. Blank lines bordering the removed range
/// collapse so no stack of empty lines is left behind. Content without a
/// block is returned unchanged.
pub fn remove(content: &str, markers: &Markers) -> String {
    let Some(range) = find(content, markers) else {
        return content.to_string();
    };

    let line_start = content[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = content[range.end..]
        .find('\n')
        .map_or(content.len(), |i| range.end + i + 1);

    let before = &content[..line_start];
    let after = &content[line_end..];

    let before_trimmed = before.trim_end_matches('\n');
    let after_trimmed = after.trim_start_matches('\n');

    let mut out = String::with_capacity(before.len() + after.len());
    out.push_str(before_trimmed);
    if !before_trimmed.is_empty() && before_trimmed.len() != before.len() {
        out.push('\n');
    }
    if after_trimmed.len() != after.len() && !out.is_empty() {
        out.push('\n');
    }
    out.push_str(after_trimmed);
    out
}
