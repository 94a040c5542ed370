//! Non-game filter - decides whether a crawled file is worth asking the
//! metadata provider about.

/// Lowercased terms that mark a file as something other than a game dump:
/// documentation, firmware, track sheets, loose data files.
const NON_GAME_TERMS: &[&str] = &[
    "manual",
    "update",
    "bios",
    "soundtrack",
    "ost",
    "bin",
    "cue",
    "txt",
    "nfo",
];

/// Whether a filename is eligible for enrichment.
///
/// A filename is rejected when, for any vocabulary term, it ends with
/// `.<term>`, contains `(<term>)` or `[<term>]`, or ends with ` <term>`.
pub fn is_enrichable(filename: &str) -> bool {
    let lowered = filename.to_lowercase();
    for term in NON_GAME_TERMS {
        if lowered.ends_with(&format!(".{term}"))
            || lowered.contains(&format!("({term})"))
            || lowered.contains(&format!("[{term}]"))
            || lowered.ends_with(&format!(" {term}"))
        {
            return false;
        }
    }
    true
}
