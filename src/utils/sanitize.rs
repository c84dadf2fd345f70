use std::collections::HashSet;

/// Reduces user-submitted comment text to plain text.
///
/// Every tag is stripped and the contents of `<script>`/`<style>` are dropped
/// entirely; the remaining text is HTML-escaped by ammonia, so clients can
/// render it as-is. Surrounding whitespace is trimmed.
pub fn sanitize_comment(input: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input.trim())
        .to_string()
}
