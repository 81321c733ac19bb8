//! Page-number parsing for the table-of-contents lookup reply.

/// Widest range accepted from a single `a-b` part
const MAX_RANGE_SPAN: u32 = 500;

/// Parse the model's page reply into sorted, unique 1-based page numbers.
///
/// Everything except digits, `,` and `-` is discarded first, so replies like
/// `"Pages 42-46."` or `"p. 12, 14"` still parse. En and em dashes count as
/// range separators. Any malformed part makes the whole reply unusable and
/// yields an empty list.
pub fn parse_page_numbers(reply: &str) -> Vec<u32> {
    let cleaned: String = reply
        .chars()
        .map(|c| if matches!(c, '–' | '—') { '-' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut pages = Vec::new();
    for part in cleaned.split(',').filter(|p| !p.is_empty()) {
        match parse_part(part) {
            Some(range) => pages.extend(range),
            None => return Vec::new(),
        }
    }

    pages.sort_unstable();
    pages.dedup();
    pages
}

fn parse_part(part: &str) -> Option<std::ops::RangeInclusive<u32>> {
    match part.split_once('-') {
        Some((start, end)) => {
            let start: u32 = start.parse().ok()?;
            let end: u32 = end.parse().ok()?;
            if end.saturating_sub(start) > MAX_RANGE_SPAN {
                return None;
            }
            Some(start..=end)
        }
        None => {
            let page: u32 = part.parse().ok()?;
            Some(page..=page)
        }
    }
}

/// Compact display form, e.g. `[3, 4, 5, 9]` → `"3-5, 9"`.
pub fn format_pages(pages: &[u32]) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut iter = pages.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(next) = end.checked_add(1).filter(|n| iter.peek() == Some(n)) {
            end = next;
            iter.next();
        }
        if start == end {
            out.push(start.to_string());
        } else {
            out.push(format!("{}-{}", start, end));
        }
    }
    out.join(", ")
}
