//! Decoder for the dictionary-grid map text format.
//!
//! A map file is a header line, a dictionary section and one grid block
//! per z level:
//!
//! ```text
//! //DMM2 size=(3,3,1) keylen=1
//! "a" = (/turf/floor{dir = 4; name = "east hall"},/area/hall)
//! "b" = (/turf/space)
//!
//! (1,1,1) = {"
//! aab
//! bab
//! aaa
//! "}
//! ```
//!
//! Grid rows run top to bottom (y = height down to 1), `keylen` characters
//! per field, short keys padded with trailing spaces and trimmed again on
//! read. The declared header size is authoritative: content beyond it is a
//! `DimensionMismatch`, content short of it loads as gaps. Decoding is
//! all-or-nothing; nothing partial escapes on error.

use std::sync::Arc;

use log::{debug, warn};

use crate::model::{Coord, Key, MapError, MapFragment, MapSize, Prefab, TypeEnvironment, VarSet};

/// Decode `src` into a fragment. Prefab variable sets come out parentless;
/// use [`decode_with_env`] to link environment defaults.
pub fn decode(src: &str) -> Result<MapFragment, MapError> {
    let mut cursor = Cursor::new(src);
    let header = cursor
        .next_line()
        .ok_or_else(|| corrupt(1, "empty input, expected //DMM2 header"))?;
    let (size, keylen) = parse_header(header)?;

    let mut fragment = MapFragment::new(size);
    let mut seen_z: Vec<i32> = Vec::new();

    loop {
        cursor.skip_blank();
        let Some(line) = cursor.peek_line() else {
            break;
        };
        let line_no = cursor.next_no();
        if line.starts_with('"') {
            cursor.next_line();
            parse_dictionary_row(line, line_no, keylen, &mut fragment)?;
        } else if line.starts_with('(') {
            cursor.next_line();
            parse_grid_block(line, line_no, &mut cursor, keylen, &mut fragment, &mut seen_z)?;
        } else {
            return Err(corrupt(
                line_no,
                format!("expected a dictionary row or a grid block, got {line:?}"),
            ));
        }
    }

    let gaps = fragment.gap_count();
    if gaps > 0 {
        warn!("decoded map has {gaps} grid gaps, loaded as empty tiles");
    }
    debug!(
        "decoded {} map: {} dictionary rows, {} grid entries",
        fragment.size,
        fragment.dictionary.len(),
        fragment.grid.len()
    );
    Ok(fragment)
}

/// Decode, then link every resolvable prefab's variables to its type's
/// default set. Unresolvable paths keep a parentless set; deciding what to
/// do about them is the reconciler's job, not the codec's.
pub fn decode_with_env(src: &str, env: &dyn TypeEnvironment) -> Result<MapFragment, MapError> {
    let mut fragment = decode(src)?;
    for stack in fragment.dictionary.values_mut() {
        for slot in stack.iter_mut() {
            let Some(defaults) = env.default_vars(slot.path()) else {
                continue;
            };
            let path = slot.path().to_string();
            let locals: Vec<(String, String)> = slot
                .vars()
                .local_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            let vars = VarSet::from_pairs(locals).with_parent(defaults);
            *slot = Arc::new(Prefab::new(path, Arc::new(vars)));
        }
    }
    Ok(fragment)
}

fn corrupt(line: usize, msg: impl Into<String>) -> MapError {
    MapError::CorruptFormat {
        line,
        msg: msg.into(),
    }
}

/// Line cursor over the input. Line numbers are 1-based.
struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lines: src.lines().collect(),
            pos: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn peek_line(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// Number of the line `next_line` would return.
    fn next_no(&self) -> usize {
        self.pos + 1
    }

    fn skip_blank(&mut self) {
        while self.peek_line().is_some_and(|line| line.trim().is_empty()) {
            self.pos += 1;
        }
    }
}

fn parse_header(line: &str) -> Result<(MapSize, usize), MapError> {
    let bad = |msg: &str| corrupt(1, format!("{msg} in header {line:?}"));

    let rest = line
        .strip_prefix("//DMM2")
        .ok_or_else(|| bad("missing //DMM2 marker"))?;

    let mut size = None;
    let mut keylen = None;
    for token in rest.split_whitespace() {
        if let Some(spec) = token.strip_prefix("size=") {
            let dims = spec
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| bad("malformed size field"))?;
            let parts: Vec<&str> = dims.split(',').collect();
            if parts.len() != 3 {
                return Err(bad("size needs three components"));
            }
            let mut values = [0i32; 3];
            for (slot, part) in values.iter_mut().zip(&parts) {
                *slot = part
                    .trim()
                    .parse()
                    .map_err(|_| bad("non-numeric size component"))?;
                if *slot < 1 {
                    return Err(bad("size components must be at least 1"));
                }
            }
            size = Some(MapSize::new(values[0], values[1], values[2]));
        } else if let Some(spec) = token.strip_prefix("keylen=") {
            let parsed: usize = spec.parse().map_err(|_| bad("non-numeric keylen"))?;
            if parsed < 1 {
                return Err(bad("keylen must be at least 1"));
            }
            keylen = Some(parsed);
        } else {
            return Err(bad("unknown header field"));
        }
    }
    match (size, keylen) {
        (Some(size), Some(keylen)) => Ok((size, keylen)),
        _ => Err(bad("header needs size=(w,h,d) and keylen=n")),
    }
}

fn parse_dictionary_row(
    line: &str,
    line_no: usize,
    keylen: usize,
    fragment: &mut MapFragment,
) -> Result<(), MapError> {
    let rest = &line[1..]; // caller checked the opening quote
    let close = rest
        .find('"')
        .ok_or_else(|| corrupt(line_no, "unterminated key"))?;
    let key_text = &rest[..close];
    if key_text.is_empty() || !key_text.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(corrupt(
            line_no,
            format!("key {key_text:?} must be lowercase a-z"),
        ));
    }
    if key_text.len() > keylen {
        return Err(corrupt(
            line_no,
            format!("key {key_text:?} is longer than the declared keylen {keylen}"),
        ));
    }
    let key = Key::new(key_text);
    if fragment.dictionary.contains_key(&key) {
        return Err(corrupt(line_no, format!("duplicate key {key_text:?}")));
    }

    let rest = rest[close + 1..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .ok_or_else(|| corrupt(line_no, "expected = after the key"))?;
    let body = rest
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| corrupt(line_no, "prefab list must be wrapped in parentheses"))?;

    let mut stack = Vec::new();
    if !body.trim().is_empty() {
        for part in split_nested(body, ',') {
            stack.push(Arc::new(parse_prefab(part, line_no)?));
        }
    }
    fragment.dictionary.insert(key, stack);
    Ok(())
}

fn parse_prefab(text: &str, line_no: usize) -> Result<Prefab, MapError> {
    let text = text.trim();
    let (path, vars) = match find_nested(text, '{') {
        Some(open) => {
            let inner = text[open + 1..].strip_suffix('}').ok_or_else(|| {
                corrupt(line_no, format!("unterminated variable block in {text:?}"))
            })?;
            (text[..open].trim_end(), parse_var_block(inner, line_no)?)
        }
        None => (text, VarSet::new()),
    };
    if path.is_empty() || !path.starts_with('/') {
        return Err(corrupt(line_no, format!("invalid type path {path:?}")));
    }
    Ok(Prefab::new(path.to_string(), Arc::new(vars)))
}

fn parse_var_block(inner: &str, line_no: usize) -> Result<VarSet, MapError> {
    let mut pairs = Vec::new();
    for assignment in split_nested(inner, ';') {
        let assignment = assignment.trim();
        if assignment.is_empty() {
            continue;
        }
        let eq = find_nested(assignment, '=').ok_or_else(|| {
            corrupt(
                line_no,
                format!("variable assignment {assignment:?} is missing ="),
            )
        })?;
        let name = assignment[..eq].trim();
        let value = assignment[eq + 1..].trim();
        if name.is_empty() {
            return Err(corrupt(
                line_no,
                format!("variable assignment {assignment:?} has an empty name"),
            ));
        }
        pairs.push((name.to_string(), value.to_string()));
    }
    Ok(VarSet::from_pairs(pairs))
}

/// Split `text` on `sep` at nesting depth zero, outside quoted runs.
/// Values are opaque, so a `,` or `;` inside quotes or inside `(`/`[`
/// nesting never terminates a piece.
fn split_nested(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == sep && depth == 0 && !in_quotes {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' | '[' | '{' if !in_quotes => depth += 1,
            ')' | ']' | '}' if !in_quotes => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the first `target` at nesting depth zero outside quotes.
fn find_nested(text: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == target && depth == 0 && !in_quotes {
            return Some(i);
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' | '[' | '{' if !in_quotes => depth += 1,
            ')' | ']' | '}' if !in_quotes => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn parse_grid_block(
    header: &str,
    header_no: usize,
    cursor: &mut Cursor<'_>,
    keylen: usize,
    fragment: &mut MapFragment,
    seen_z: &mut Vec<i32>,
) -> Result<(), MapError> {
    let size = fragment.size;
    let close = header
        .find(')')
        .ok_or_else(|| corrupt(header_no, "unterminated block coordinate"))?;
    let coords: Vec<&str> = header[1..close].split(',').collect();
    if coords.len() != 3 {
        return Err(corrupt(
            header_no,
            "block coordinate needs three components",
        ));
    }
    let mut values = [0i32; 3];
    for (slot, part) in values.iter_mut().zip(&coords) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| corrupt(header_no, format!("non-numeric block coordinate {part:?}")))?;
    }
    let [x, y, z] = values;
    if x != 1 || y != 1 {
        return Err(corrupt(
            header_no,
            format!("grid blocks must start at (1,1,z), got ({x},{y},{z})"),
        ));
    }
    let rest = header[close + 1..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .map(str::trim_start)
        .ok_or_else(|| corrupt(header_no, "expected = after the block coordinate"))?;
    if rest != "{\"" {
        return Err(corrupt(header_no, "expected {\" to open the grid block"));
    }
    if z < 1 || z > size.depth {
        return Err(MapError::DimensionMismatch {
            declared: size,
            detail: format!(
                "grid block for z {z} outside the declared depth {}",
                size.depth
            ),
        });
    }
    if seen_z.contains(&z) {
        return Err(MapError::DimensionMismatch {
            declared: size,
            detail: format!("duplicate grid block for z {z}"),
        });
    }
    seen_z.push(z);

    let mut row_index = 0i32;
    loop {
        let line_no = cursor.next_no();
        let Some(line) = cursor.next_line() else {
            return Err(corrupt(line_no, "unterminated grid block, expected \"}"));
        };
        if line.starts_with('"') {
            if line.trim_end() == "\"}" {
                // a block may end early; the remaining rows stay gaps
                return Ok(());
            }
            return Err(corrupt(
                line_no,
                format!("unexpected line {line:?} inside a grid block"),
            ));
        }
        if row_index >= size.height {
            return Err(MapError::DimensionMismatch {
                declared: size,
                detail: format!("more than {} rows in the block for z {z}", size.height),
            });
        }
        let row_y = size.height - row_index;
        parse_grid_row(line, line_no, row_y, z, keylen, fragment)?;
        row_index += 1;
    }
}

fn parse_grid_row(
    line: &str,
    line_no: usize,
    y: i32,
    z: i32,
    keylen: usize,
    fragment: &mut MapFragment,
) -> Result<(), MapError> {
    if !line.is_ascii() {
        return Err(corrupt(line_no, "grid rows must be ascii"));
    }
    let size = fragment.size;
    if line.len() > size.width as usize * keylen {
        return Err(MapError::DimensionMismatch {
            declared: size,
            detail: format!("row at line {line_no} is wider than the declared width"),
        });
    }

    let mut x = 1i32;
    let mut offset = 0usize;
    while offset < line.len() {
        let end = (offset + keylen).min(line.len());
        let field = &line[offset..end];
        let key_text = field.trim_end_matches(' ');
        if !key_text.is_empty() {
            if !key_text.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(corrupt(line_no, format!("invalid key field {field:?}")));
            }
            let key = Key::new(key_text);
            if !fragment.dictionary.contains_key(&key) {
                return Err(corrupt(
                    line_no,
                    format!("grid key {key_text:?} has no dictionary row"),
                ));
            }
            fragment.grid.insert(Coord::new(x, y, z), key);
        }
        x += 1;
        offset = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_MAP: &str = "\
//DMM2 size=(3,3,1) keylen=1
\"a\" = (/turf/floor{dir = 4; name = \"east hall\"},/area/hall)
\"b\" = (/turf/space)
\"c\" = ()

(1,1,1) = {\"
aab
bab
aaa
\"}
";

    #[test]
    fn test_decode_small_map() {
        let fragment = decode(SMALL_MAP).unwrap();

        assert_eq!(fragment.size, MapSize::new(3, 3, 1));
        assert_eq!(fragment.dictionary.len(), 3);
        assert_eq!(fragment.gap_count(), 0);

        // the top row of the text is y = 3
        let top_left = fragment.prefabs_at(Coord::new(1, 3, 1));
        assert_eq!(top_left.len(), 2);
        assert_eq!(top_left[0].path(), "/turf/floor");
        assert_eq!(top_left[0].vars().get("dir"), Some("4"));
        assert_eq!(top_left[0].vars().get("name"), Some("\"east hall\""));
        assert_eq!(top_left[1].path(), "/area/hall");

        let mid = fragment.prefabs_at(Coord::new(2, 2, 1));
        assert_eq!(mid.len(), 2);

        // "c" never shows up in the grid but still decodes
        assert!(fragment.dictionary[&Key::new("c")].is_empty());
    }

    #[test]
    fn test_decode_quoted_and_nested_values() {
        let src = "\
//DMM2 size=(1,1,1) keylen=1
\"a\" = (/obj/sign{name = \"a,b;c\"; tags = list(\"x\",\"y\"); pixel_w = -3})

(1,1,1) = {\"
a
\"}
";
        let fragment = decode(src).unwrap();
        let stack = fragment.prefabs_at(Coord::new(1, 1, 1));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].vars().get("name"), Some("\"a,b;c\""));
        assert_eq!(stack[0].vars().get("tags"), Some("list(\"x\",\"y\")"));
        assert_eq!(stack[0].vars().get("pixel_w"), Some("-3"));
    }

    #[test]
    fn test_decode_short_content_loads_as_gaps() {
        // one row cut short, the second row and the whole z=2 block missing
        let src = "\
//DMM2 size=(3,2,2) keylen=1
\"a\" = (/turf/floor)

(1,1,1) = {\"
a
\"}
";
        let fragment = decode(src).unwrap();
        // only (1,2,1) got content: the single row is the top row (y = 2)
        assert_eq!(fragment.grid.len(), 1);
        assert_eq!(fragment.prefabs_at(Coord::new(1, 2, 1)).len(), 1);
        assert!(fragment.prefabs_at(Coord::new(1, 1, 1)).is_empty());
        assert_eq!(fragment.gap_count(), 11);
    }

    #[test]
    fn test_decode_corrupt_inputs_carry_line_numbers() {
        let test_cases = vec![
            ("", 1, "header"),
            ("//DMM size=(1,1,1) keylen=1", 1, "marker"),
            ("//DMM2 size=(1,1) keylen=1", 1, "three components"),
            ("//DMM2 size=(0,1,1) keylen=1", 1, "at least 1"),
            ("//DMM2 size=(1,1,1)", 1, "keylen"),
            ("//DMM2 size=(1,1,1) keylen=1\n\"A\" = ()", 2, "lowercase"),
            ("//DMM2 size=(1,1,1) keylen=1\n\"ab\" = ()", 2, "keylen"),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = ()\n\"a\" = ()",
                3,
                "duplicate",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = (turf/floor)",
                2,
                "type path",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = (/obj{dir})",
                2,
                "missing =",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = ()\nwhat is this",
                3,
                "expected",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = ()\n\n(1,1,1) = {\"\nq\n\"}",
                5,
                "no dictionary row",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = ()\n\n(2,2,1) = {\"\na\n\"}",
                4,
                "(1,1,z)",
            ),
            (
                "//DMM2 size=(1,1,1) keylen=1\n\"a\" = ()\n\n(1,1,1) = {\"\na",
                6,
                "unterminated",
            ),
        ];

        for (src, expected_line, expected_msg) in test_cases {
            match decode(src) {
                Err(MapError::CorruptFormat { line, msg }) => {
                    assert_eq!(line, expected_line, "line for {src:?}: {msg}");
                    assert!(
                        msg.contains(expected_msg),
                        "msg {msg:?} should mention {expected_msg:?}"
                    );
                }
                other => panic!("expected CorruptFormat for {src:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_oversize_content_is_dimension_mismatch() {
        let test_cases = vec![
            // a fourth row in a 3-high block
            "//DMM2 size=(3,3,1) keylen=1\n\"a\" = (/turf/space)\n\n(1,1,1) = {\"\naaa\naaa\naaa\naaa\n\"}",
            // a row wider than width * keylen
            "//DMM2 size=(3,3,1) keylen=1\n\"a\" = (/turf/space)\n\n(1,1,1) = {\"\naaaa\n\"}",
            // a block for a z level past the declared depth
            "//DMM2 size=(1,1,1) keylen=1\n\"a\" = (/turf/space)\n\n(1,1,2) = {\"\na\n\"}",
            // the same z level twice
            "//DMM2 size=(1,1,1) keylen=1\n\"a\" = (/turf/space)\n\n(1,1,1) = {\"\na\n\"}\n\n(1,1,1) = {\"\na\n\"}",
        ];

        for src in test_cases {
            match decode(src) {
                Err(MapError::DimensionMismatch { .. }) => {}
                other => panic!("expected DimensionMismatch for {src:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_padded_fields_trim() {
        let src = "\
//DMM2 size=(2,1,1) keylen=2
\"z\" = (/turf/space)
\"aa\" = (/turf/floor)

(1,1,1) = {\"
z aa
\"}
";
        let fragment = decode(src).unwrap();
        assert_eq!(
            fragment.prefabs_at(Coord::new(1, 1, 1))[0].path(),
            "/turf/space"
        );
        assert_eq!(
            fragment.prefabs_at(Coord::new(2, 1, 1))[0].path(),
            "/turf/floor"
        );
    }

    #[test]
    fn test_decode_with_env_links_parents() {
        let env = crate::model::StaticEnvironment::new()
            .with_type("/turf/floor", VarSet::from_pairs([("icon", "'floors.dmi'")]));

        let src = "\
//DMM2 size=(2,1,1) keylen=1
\"a\" = (/turf/floor{dir = 8})
\"b\" = (/turf/chasm)

(1,1,1) = {\"
ab
\"}
";
        let fragment = decode_with_env(src, &env).unwrap();

        let linked = &fragment.prefabs_at(Coord::new(1, 1, 1))[0];
        assert_eq!(linked.vars().get("dir"), Some("8"));
        assert_eq!(linked.vars().get("icon"), Some("'floors.dmi'"));

        // the unresolvable path stays parentless
        let bare = &fragment.prefabs_at(Coord::new(2, 1, 1))[0];
        assert_eq!(bare.vars().get("icon"), None);
    }
}
