/// Strip HTML from user-supplied text.
///
/// Post and comment content is plain text; anything tag-shaped is removed
/// before storage as a fail-safe against stored XSS in other clients.
pub fn strip_html(input: &str) -> String {
    ammonia::Builder::empty().clean(input).to_string()
}
