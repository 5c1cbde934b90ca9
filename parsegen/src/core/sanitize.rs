//! Best-effort cleanup of completion output into plain source.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n").unwrap());
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n```[ \t]*$").unwrap());

/// Strip one leading and one trailing markdown code fence, if present.
///
/// The prompt asks for code-only output but the model may still wrap its
/// reply in a fence (with or without a language tag). Only a single enclosing
/// fence pair is removed; any other malformed wrapping is left untouched and
/// surfaces downstream at the syntax gate or at execution.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(without_leading.as_ref(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let raw = "```python\nimport pandas as pd\n\ndef parse(path):\n    pass\n```";
        assert_eq!(
            strip_code_fences(raw),
            "import pandas as pd\n\ndef parse(path):\n    pass"
        );
    }

    #[test]
    fn strips_bare_fence_and_surrounding_whitespace() {
        let raw = "\n```\ndef parse(path):\n    pass\n```\n";
        assert_eq!(strip_code_fences(raw), "def parse(path):\n    pass");
    }

    #[test]
    fn leaves_unfenced_code_untouched() {
        let raw = "def parse(path):\n    return None";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn keeps_interior_fences() {
        let raw = "```python\ndoc = \"```\"\n```";
        assert_eq!(strip_code_fences(raw), "doc = \"```\"");
    }

    #[test]
    fn tolerates_missing_trailing_fence() {
        let raw = "```python\ndef parse(path):\n    pass";
        assert_eq!(strip_code_fences(raw), "def parse(path):\n    pass");
    }
}
