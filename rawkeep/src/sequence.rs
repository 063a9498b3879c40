//! Sequence detection (§4.2): given one detected file and its siblings,
//! recognize a numeric suffix and group consecutively-numbered files that
//! share a prefix, digit width, and extension into one logical stream.
//! Natural sort (never lexical) is grounded on the `alphanumeric-sort`
//! crate, used the same way the examples that depend on it order release
//! track lists.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// `prefix%0Nd.ext`, e.g. `scan%06d.dpx`.
    pub template: String,
    pub start: u64,
    pub end: u64,
    /// File names in ascending numeric order.
    pub files: Vec<String>,
}

/// Sort `names` using natural (alphanumeric) order: `a2 < a10`, never the
/// lexical `a10 < a2`.
pub fn natural_sort(names: &mut [String]) {
    names.sort_by(|a, b| alphanumeric_sort::compare_str(a, b));
}

struct NumberedName {
    prefix: String,
    digits: String,
    extension: String,
    number: u64,
}

fn split_numbered(name: &str) -> Option<NumberedName> {
    let (stem, extension) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => (name, ""),
    };
    let digit_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let digits = &stem[digit_start..];
    if digits.is_empty() {
        return None;
    }
    Some(NumberedName {
        prefix: stem[..digit_start].to_string(),
        digits: digits.to_string(),
        extension: extension.to_string(),
        number: digits.parse().ok()?,
    })
}

/// Find the longest contiguous run of `siblings` (including `target`) that
/// share `target`'s prefix, digit width, and extension. Returns `None` when
/// no run of at least 2 files exists, meaning the stream stays single-file.
pub fn detect_sequence(target: &str, siblings: &[String]) -> Option<Sequence> {
    let target_parsed = split_numbered(target)?;
    let width = target_parsed.digits.len();

    let mut matching: Vec<NumberedName> = siblings
        .iter()
        .filter_map(|name| split_numbered(name))
        .filter(|n| {
            n.prefix == target_parsed.prefix
                && n.extension == target_parsed.extension
                && n.digits.len() == width
        })
        .collect();
    matching.sort_by_key(|n| n.number);
    matching.dedup_by_key(|n| n.number);

    let target_pos = matching.iter().position(|n| n.number == target_parsed.number)?;

    let mut lo = target_pos;
    while lo > 0 && matching[lo - 1].number + 1 == matching[lo].number {
        lo -= 1;
    }
    let mut hi = target_pos;
    while hi + 1 < matching.len() && matching[hi].number + 1 == matching[hi + 1].number {
        hi += 1;
    }

    if hi == lo {
        return None;
    }

    let files = matching[lo..=hi]
        .iter()
        .map(|n| format!("{}{}.{}", n.prefix, n.digits, n.extension))
        .collect();
    let template = if target_parsed.extension.is_empty() {
        format!("{}%0{}d", target_parsed.prefix, width)
    } else {
        format!("{}%0{}d.{}", target_parsed.prefix, width, target_parsed.extension)
    };

    Some(Sequence {
        template,
        start: matching[lo].number,
        end: matching[hi].number,
        files,
    })
}
