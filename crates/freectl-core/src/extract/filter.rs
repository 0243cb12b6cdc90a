//! File filtering applied before any extraction strategy runs.
//!
//! Curated-list repositories carry a lot of markdown that is not list
//! content: contribution guides, licenses, CI templates. Those files would
//! pollute the index with meta-links, so they are dropped by name, by path
//! component, and (for READMEs) by a link-density gate.

/// File names that never contain list content.
pub const SKIPPED_FILE_NAMES: &[&str] = &[
    "CONTRIBUTING.md",
    "LICENSE.md",
    "CHANGELOG.md",
    "CODE_OF_CONDUCT.md",
    "SECURITY.md",
    "SUPPORT.md",
    "MAINTAINING.md",
    "DEPLOYMENT.md",
    "DEVELOPMENT.md",
    "CONTRIBUTORS.md",
    "AUTHORS.md",
    "ROADMAP.md",
    "VERSION.md",
    "RELEASE.md",
    "PULL_REQUEST_TEMPLATE.md",
    "ISSUE_TEMPLATE.md",
    "CODEOWNERS",
];

/// Path components that mark tooling or vendored trees.
pub const SKIPPED_PATH_COMPONENTS: &[&str] = &[
    ".github",
    ".git",
    "node_modules",
    "vendor",
    "dist",
    "build",
    "coverage",
    "test",
    "tests",
    "examples",
    "scripts",
    "tools",
    "ci",
];

/// Minimum number of link-bearing lines for a README to qualify.
const README_MIN_LINK_LINES: usize = 10;
/// Minimum ratio of link-bearing lines to non-empty lines for a README.
const README_MIN_LINK_RATIO: f64 = 0.20;

/// Whether a file at `path` with the given contents should be skipped.
///
/// `README.md` gets special treatment: it is only accepted when it is
/// link-heavy, because most READMEs describe the repository rather than
/// carry the list itself.
#[must_use]
pub fn should_skip(path: &str, text: &str) -> bool {
    let file_name = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);

    if SKIPPED_FILE_NAMES
        .iter()
        .any(|skip| file_name.eq_ignore_ascii_case(skip))
    {
        return true;
    }

    if path
        .split(['/', '\\'])
        .any(|component| {
            SKIPPED_PATH_COMPONENTS
                .iter()
                .any(|skip| component.eq_ignore_ascii_case(skip))
        })
    {
        return true;
    }

    if file_name.eq_ignore_ascii_case("README.md") {
        return !is_link_heavy(text);
    }

    false
}

/// A document is link-heavy when at least [`README_MIN_LINK_LINES`] non-empty
/// lines contain a URL marker and those lines make up at least
/// [`README_MIN_LINK_RATIO`] of all non-empty lines.
#[must_use]
pub fn is_link_heavy(text: &str) -> bool {
    let mut non_empty = 0usize;
    let mut link_lines = 0usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        non_empty += 1;
        if line.contains("http") || line.contains("www.") {
            link_lines += 1;
        }
    }
    if non_empty == 0 || link_lines < README_MIN_LINK_LINES {
        return false;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = link_lines as f64 / non_empty as f64;
    ratio >= README_MIN_LINK_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_meta_files_case_insensitively() {
        assert!(should_skip("CONTRIBUTING.md", ""));
        assert!(should_skip("docs/contributing.md", ""));
        assert!(should_skip("LICENSE.md", ""));
        assert!(should_skip("CODEOWNERS", ""));
        assert!(!should_skip("awesome.md", ""));
    }

    #[test]
    fn skips_tooling_paths_by_component() {
        assert!(should_skip(".github/workflows/list.md", ""));
        assert!(should_skip("a/node_modules/b/list.md", ""));
        assert!(should_skip("test/fixtures.md", ""));
        // Component match, not substring match.
        assert!(!should_skip("contest/list.md", ""));
        assert!(!should_skip("buildings/list.md", ""));
    }

    #[test]
    fn readme_gate_requires_both_thresholds() {
        // 5 non-empty lines, 2 with links: fails the absolute threshold.
        let sparse = "intro\nhttp://a.com\nmore\nhttp://b.com\nend\n";
        assert!(should_skip("README.md", sparse));

        // 12 link lines out of 40 non-empty: passes both thresholds.
        let mut heavy = String::new();
        for i in 0..12 {
            heavy.push_str(&format!("* [x](https://example.com/{i})\n"));
        }
        for i in 0..28 {
            heavy.push_str(&format!("filler line {i}\n"));
        }
        assert!(!should_skip("README.md", &heavy));
    }

    #[test]
    fn readme_gate_requires_ratio() {
        // 10 link lines but 100 non-empty lines: ratio 0.1 fails.
        let mut text = String::new();
        for i in 0..10 {
            text.push_str(&format!("https://example.com/{i}\n"));
        }
        for i in 0..90 {
            text.push_str(&format!("filler {i}\n"));
        }
        assert!(should_skip("README.md", &text));
    }

    #[test]
    fn non_readme_files_skip_the_gate() {
        assert!(!should_skip("links.md", "no links at all\n"));
    }
}
