//! Directory-listing line parsing.
//!
//! Two grammars coexist in the wild: machine-parsable MLSx "facts" lines
//! (`key=value;` pairs, a space, the entry name) and classic Unix `ls -l`
//! text with no fixed grammar at all. The facts grammar is tried first; the
//! fallback is positional and intentionally simple -- the name is whatever
//! follows the last space, which misparses names containing spaces. That
//! matches the servers this engine was calibrated against, so it stays.

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub is_directory: bool,
    /// Size in bytes; 0 for directories and whenever the line does not say.
    pub size: u32,
}

/// Which listing command to issue and how to treat the returned lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// `MLSD`: machine-readable listing, lines returned as raw text.
    Standard,
    /// `LIST`: legacy listing, every line run through the parser.
    WithFacts,
}

/// Parse one listing line, trying facts first, then the heuristic fallback.
pub fn parse_list_line(raw: &str) -> ListEntry {
    let line = raw.strip_suffix('\r').unwrap_or(raw);

    if let Some(entry) = parse_facts(line) {
        return entry;
    }

    let is_directory = matches!(line.bytes().next(), Some(b'd') | Some(b'D'));
    let name = match line.rfind(' ') {
        Some(idx) => &line[idx + 1..],
        None => line,
    };
    ListEntry {
        name: name.to_string(),
        is_directory,
        size: 0,
    }
}

/// Facts grammar: `key=value;` tokens, one space, entry name. Succeeds only
/// when every token is well-formed and a recognizable `type` fact is present.
fn parse_facts(line: &str) -> Option<ListEntry> {
    let (facts, name) = line.split_once(' ')?;
    if name.is_empty() {
        return None;
    }

    let mut entry_type: Option<String> = None;
    let mut size: u32 = 0;
    for fact in facts.split(';').filter(|f| !f.is_empty()) {
        let (key, value) = fact.split_once('=')?;
        match key.to_ascii_lowercase().as_str() {
            "type" => entry_type = Some(value.to_ascii_lowercase()),
            "size" => size = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    let entry_type = entry_type?;
    let is_directory = matches!(entry_type.as_str(), "dir" | "cdir" | "pdir");
    if !is_directory && entry_type != "file" {
        return None;
    }
    Some(ListEntry {
        name: name.to_string(),
        is_directory,
        size: if is_directory { 0 } else { size },
    })
}
