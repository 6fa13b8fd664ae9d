/// Every JSON object assigned to `marker` inside a page, in page order.
///
/// Accepts `marker = {`, `"marker"] = {` and similar spellings. Occurrences of the marker
/// not followed by an assignment are skipped. Each slice spans the balanced braces;
/// braces inside JSON strings are ignored.
pub fn json_objects<'a>(html: &'a str, marker: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    html.match_indices(marker).filter_map(move |(index, _)| {
        let rest = &html[index + marker.len()..];
        let rest = rest.trim_start_matches(|c: char| c == '"' || c == '\'' || c == ']');
        let rest = rest.trim_start().strip_prefix('=')?.trim_start();
        if !rest.starts_with('{') {
            return None;
        }
        balanced_object(rest)
    })
}

/// Return the prefix of `text` (which starts with `{`) up to its matching `}`
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }

    None
}
