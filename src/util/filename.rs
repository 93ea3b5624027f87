//! Sanitation for user-supplied upload filenames.

/// Maximum length of the sanitized base name, extension excluded.
const MAX_BASE_LEN: usize = 50;

/// Fallback base name when sanitation strips everything.
const DEFAULT_BASE: &str = "receipt";

/// Clean up a caller-supplied filename: keep only ASCII alphanumerics,
/// spaces, hyphens and underscores in the base name, collapse runs of
/// whitespace into single spaces, cap the base at [`MAX_BASE_LEN`]
/// characters, and preserve the original extension. An empty base falls
/// back to [`DEFAULT_BASE`]. Idempotent.
pub fn sanitize_filename(filename: &str) -> String {
    let (raw_base, ext) = split_extension(filename);

    let mut base = String::with_capacity(raw_base.len());
    let mut pending_space = false;
    for c in raw_base.chars() {
        if c.is_whitespace() {
            // Collapses runs and drops leading whitespace in one go.
            pending_space = !base.is_empty();
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_space {
                base.push(' ');
                pending_space = false;
            }
            base.push(c);
        }
    }

    let mut base: String = base.chars().take(MAX_BASE_LEN).collect();
    while base.ends_with(' ') {
        base.pop();
    }
    if base.is_empty() {
        base = DEFAULT_BASE.to_string();
    }

    format!("{base}{ext}")
}

/// Split off the extension starting at the final dot. A leading dot or a
/// dot-less name yields no extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => filename.split_at(idx),
        _ => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_clean_names() {
        assert_eq!(sanitize_filename("receipt.jpg"), "receipt.jpg");
        assert_eq!(sanitize_filename("My Receipt-2.pdf"), "My Receipt-2.pdf");
        assert_eq!(sanitize_filename("scan_001.png"), "scan_001.png");
    }

    #[test]
    fn strips_special_characters() {
        assert_eq!(sanitize_filename("IMG#42!.jpg"), "IMG42.jpg");
        assert_eq!(sanitize_filename("a/b\\c:d.png"), "abcd.png");
        assert_eq!(sanitize_filename("caffè.pdf"), "caff.pdf");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(sanitize_filename("my    receipt.jpg"), "my receipt.jpg");
        assert_eq!(sanitize_filename("  padded  .jpg"), "padded.jpg");
        assert_eq!(sanitize_filename("a ! b.png"), "a b.png");
    }

    #[test]
    fn caps_base_length_and_preserves_extension() {
        let long = format!("{}.jpeg", "x".repeat(80));
        let out = sanitize_filename(&long);
        assert_eq!(out, format!("{}.jpeg", "x".repeat(50)));
    }

    #[test]
    fn empty_base_falls_back_to_default() {
        assert_eq!(sanitize_filename("!!!.pdf"), "receipt.pdf");
        assert_eq!(sanitize_filename(""), "receipt");
        assert_eq!(sanitize_filename("日本語.heic"), "receipt.heic");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "IMG_0042 (1).HEIC",
            "  spaced   out !! name.pdf",
            &format!("{} y.png", "x".repeat(49)),
            "!!!.jpg",
            ".hidden",
            "no_extension",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn base_never_empty() {
        for input in ["", ".", "..", "...", "!@#$%", " . "] {
            let out = sanitize_filename(input);
            assert!(out.starts_with(DEFAULT_BASE), "{input:?} -> {out:?}");
        }
    }
}
