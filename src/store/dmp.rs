//! Applying diff-match-patch text patches.
//!
//! Patches use the textual format produced by `patch_toText`:
//!
//! ```text
//! @@ -1,5 +1,6 @@
//!  hel
//! -lo
//! +p me
//! ```
//!
//! Body lines are URI-encoded. Each hunk must match exactly, either at its
//! expected location or anywhere in the text; fuzzy matching is not done.

use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@$").expect("valid hunk header regex")
});

#[derive(Debug, Default)]
struct Hunk {
    start: usize,
    before: Vec<char>,
    after: Vec<char>,
}

/// Apply a patch to `text`. Fails when the patch is malformed or a hunk's
/// context is not found.
pub fn apply_patch_text(text: &str, patch: &str) -> Result<String, String> {
    let hunks = parse_hunks(patch)?;
    let mut chars: Vec<char> = text.chars().collect();
    let mut delta: isize = 0;

    for (n, hunk) in hunks.iter().enumerate() {
        let expected = (hunk.start as isize + delta).max(0) as usize;
        let found = if matches_at(&chars, &hunk.before, expected) {
            expected
        } else {
            find(&chars, &hunk.before)
                .ok_or_else(|| format!("hunk {} does not match the current text", n + 1))?
        };
        // Hunk starts are in post-edit coordinates; only drift carries over.
        delta = found as isize - hunk.start as isize;
        chars.splice(found..found + hunk.before.len(), hunk.after.iter().copied());
    }

    Ok(chars.into_iter().collect())
}

fn parse_hunks(patch: &str) -> Result<Vec<Hunk>, String> {
    let mut hunks = Vec::new();
    let mut current: Option<Hunk> = None;

    for line in patch.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = HUNK_HEADER.captures(line) {
            if let Some(done) = current.take() {
                hunks.push(done);
            }
            let start2: usize = caps[3].parse().map_err(|_| "bad hunk start".to_string())?;
            let len2 = caps.get(4).map_or("1", |m| m.as_str());
            let start = if len2 == "0" {
                start2
            } else {
                start2.saturating_sub(1)
            };
            current = Some(Hunk {
                start,
                ..Hunk::default()
            });
            continue;
        }

        let hunk = current
            .as_mut()
            .ok_or_else(|| format!("patch line outside a hunk: '{line}'"))?;
        let mut rest = line.chars();
        let sign = rest.next();
        let body: Vec<char> = percent_decode(rest.as_str())?.chars().collect();
        match sign {
            Some(' ') => {
                hunk.before.extend(&body);
                hunk.after.extend(&body);
            }
            Some('-') => hunk.before.extend(&body),
            Some('+') => hunk.after.extend(&body),
            _ => return Err(format!("invalid patch line: '{line}'")),
        }
    }

    if let Some(done) = current {
        hunks.push(done);
    }
    if hunks.is_empty() {
        return Err("patch contains no hunks".to_string());
    }
    Ok(hunks)
}

fn matches_at(text: &[char], needle: &[char], at: usize) -> bool {
    at + needle.len() <= text.len() && text[at..at + needle.len()] == *needle
}

fn find(text: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    text.windows(needle.len()).position(|w| w == needle)
}

fn percent_decode(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| format!("truncated escape in '{raw}'"))?;
            let byte =
                u8::from_str_radix(hex, 16).map_err(|_| format!("bad escape '%{hex}'"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| format!("escape sequence is not UTF-8 in '{raw}'"))
}
