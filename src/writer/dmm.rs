//! Encoder: fragment to dictionary-grid text.
//!
//! Encoding serialises the fragment it is given verbatim; it never re-keys.
//! Fresh snapshots get their keys from `keys::DictionaryBuilder` before
//! they arrive here, which is what makes re-encoding a previously encoded
//! file reproduce it byte for byte.

use std::fmt::{self, Write};

use crate::model::{Coord, MapFragment, Prefab};

/// Render `fragment` in the persistent text form: header, dictionary rows
/// in numeric key order, one grid block per z level, trailing newline.
pub fn encode(fragment: &MapFragment) -> String {
    let mut out = String::new();
    write_fragment(&mut out, fragment).expect("formatting into a String");
    out
}

fn write_fragment(out: &mut String, fragment: &MapFragment) -> fmt::Result {
    let keylen = fragment.max_key_len();
    let size = fragment.size;
    writeln!(
        out,
        "//DMM2 size=({},{},{}) keylen={keylen}",
        size.width, size.height, size.depth
    )?;

    for (key, stack) in &fragment.dictionary {
        write!(out, "\"{key}\" = (")?;
        for (i, prefab) in stack.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_prefab(out, prefab)?;
        }
        out.push_str(")\n");
    }

    for z in 1..=size.depth {
        out.push('\n');
        writeln!(out, "(1,1,{z}) = {{\"")?;
        // rows top to bottom, short keys padded to keylen
        for y in (1..=size.height).rev() {
            let mut row = String::with_capacity(size.width as usize * keylen);
            for x in 1..=size.width {
                match fragment.grid.get(&Coord::new(x, y, z)) {
                    Some(key) => {
                        row.push_str(key.as_str());
                        for _ in key.len()..keylen {
                            row.push(' ');
                        }
                    }
                    None => {
                        for _ in 0..keylen {
                            row.push(' ');
                        }
                    }
                }
            }
            out.push_str(row.trim_end_matches(' '));
            out.push('\n');
        }
        out.push_str("\"}\n");
    }
    Ok(())
}

fn write_prefab(out: &mut String, prefab: &Prefab) -> fmt::Result {
    out.push_str(prefab.path());
    if prefab.vars().local_len() > 0 {
        out.push('{');
        for (i, (name, value)) in prefab.vars().local_iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            write!(out, "{name} = {value}")?;
        }
        out.push('}');
    }
    Ok(())
}
