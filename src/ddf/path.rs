//! OMA-URI path algebra.
//!
//! Every catalog path is rooted at `./` and uses single forward slashes, so
//! paths coming from different DDF files compare as plain strings and can be
//! handed to the management channel unchanged.

/// The canonical root marker all catalog paths start with.
pub const ROOT: &str = "./";

/// Normalize an explicit `<Path>` declaration into canonical form.
///
/// Trims whitespace, converts backslashes, collapses repeated slashes and
/// prefixes the root marker. Trailing slashes and whitespace after the marker
/// are dropped together, so the bare root is the only result ending in `/`.
pub fn normalize_root(path: &str) -> String {
    let rooted = ensure_root(&collapse_slashes(&path.trim().replace('\\', "/")));
    let body = rooted[ROOT.len()..].trim_end_matches(|c: char| c == '/' || c.is_whitespace());
    format!("{ROOT}{body}")
}

/// Append `segment` to `base`, separated by exactly one slash.
///
/// An empty segment returns the base as-is. A blank base is treated as the
/// root.
pub fn combine(base: &str, segment: &str) -> String {
    let segment = segment.trim();
    if segment.is_empty() {
        return collapse_slashes(base);
    }

    let mut combined = if base.trim().is_empty() {
        ROOT.to_string()
    } else {
        ensure_root(base)
    };
    if !combined.ends_with('/') {
        combined.push('/');
    }
    combined.push_str(segment);
    collapse_slashes(&combined)
}

/// Prefix the root marker if `path` does not already carry it.
pub(crate) fn ensure_root(path: &str) -> String {
    let p = path.trim();
    if p.is_empty() {
        return ROOT.to_string();
    }
    if p.starts_with(ROOT) {
        p.to_string()
    } else if let Some(rest) = p.strip_prefix('.') {
        format!("{ROOT}{rest}")
    } else if p.starts_with('/') {
        format!(".{p}")
    } else {
        format!("{ROOT}{p}")
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize_root("./Device/Vendor/MSFT"), "./Device/Vendor/MSFT");
        assert_eq!(normalize_root("  Device/Vendor/MSFT/  "), "./Device/Vendor/MSFT");
        assert_eq!(normalize_root("/Vendor/MSFT"), "./Vendor/MSFT");
        assert_eq!(normalize_root(".Vendor"), "./Vendor");
        assert_eq!(normalize_root(r".\Vendor\\MSFT\"), "./Vendor/MSFT");
        assert_eq!(normalize_root("./"), "./");
        assert_eq!(normalize_root("."), "./");
        assert_eq!(normalize_root(""), "./");
        assert_eq!(normalize_root("///"), "./");
    }

    #[test]
    fn whitespace_between_trailing_slashes_is_dropped() {
        assert_eq!(normalize_root("x/ /"), "./x");
        assert_eq!(normalize_root("./a/\t/"), "./a");
        assert_eq!(normalize_root("./ /"), "./");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            " ",
            ".",
            "..",
            "./",
            ".//",
            "/",
            "//x//y//",
            r"\\a\b\",
            "./Device/Vendor/MSFT/Policy/Config",
            ".Device",
            "Vendor/MSFT/",
            "/.",
            "./ /x",
            "a b/c",
            "x/ /",
            "./a/\t/",
        ];
        for s in samples {
            let once = normalize_root(s);
            assert_eq!(normalize_root(&once), once, "input {s:?}");
            assert!(once.starts_with(ROOT), "input {s:?} gave {once:?}");
        }
    }

    #[test]
    fn combine_appends_single_separator() {
        assert_eq!(combine("./Vendor/MSFT", "Policy"), "./Vendor/MSFT/Policy");
        assert_eq!(combine("./Vendor/MSFT/", "Policy"), "./Vendor/MSFT/Policy");
        assert_eq!(combine("./Vendor/MSFT/", "/Policy"), "./Vendor/MSFT/Policy");
        assert_eq!(combine("", "Outer"), "./Outer");
        assert_eq!(combine("./", "Outer"), "./Outer");
    }

    #[test]
    fn combine_with_empty_segment_keeps_base() {
        for s in ["", "./", "/Vendor/MSFT", "Device//Vendor/", r"a\b"] {
            let base = normalize_root(s);
            assert_eq!(combine(&base, ""), base);
            assert_eq!(combine(&base, "   "), base);
        }
    }

    #[test]
    fn combine_never_doubles_separators() {
        let bases = ["", "./", "./a", "./a/", "a//b", "/x/"];
        let segments = ["", "b", "/b", "b/", "//b//", "b//c"];
        for base in bases {
            for seg in segments {
                let out = combine(base, seg);
                assert!(!out.contains("//"), "combine({base:?}, {seg:?}) = {out:?}");
            }
        }
    }
}
