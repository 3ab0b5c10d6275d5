/// Escapes a user-provided value for the openFDA (Lucene-like) search syntax.
///
/// All Lucene special characters are escaped so drug names such as
/// `co-trimoxazole` or `Tylenol (Extra Strength)` search literally.
pub(crate) fn escape_lucene_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '+' | '-' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*'
            | '?' | ':' | '/' | '&' | '|' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
