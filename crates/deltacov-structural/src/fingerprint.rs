use sha2::{Digest, Sha256};

/// Fingerprint a method body: SHA-256 over the body with comments and
/// whitespace stripped, hex-encoded.
///
/// Two bodies that differ only in formatting or comments produce the same
/// fingerprint, so cosmetic edits never count as modifications.
///
/// # Examples
///
/// ```
/// use deltacov_structural::fingerprint;
///
/// let a = fingerprint("{ return x + 1; }");
/// let b = fingerprint("{\n    // add one\n    return x    + 1;\n}");
/// let c = fingerprint("{ return x + 2; }");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
pub fn fingerprint(body: &str) -> String {
    let normalized = normalize(body);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Strip `//` and `/* */` comments and all whitespace.
///
/// String and character literals are kept verbatim so comment markers inside
/// them survive.
fn normalize(body: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        Char,
    }

    let mut out = String::with_capacity(body.len());
    let mut state = State::Code;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                '"' => {
                    out.push(c);
                    state = State::Str;
                }
                '\'' => {
                    out.push(c);
                    state = State::Char;
                }
                c if c.is_whitespace() => {}
                c => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
            State::Str => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '"' {
                    state = State::Code;
                }
            }
            State::Char => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == '\'' {
                    state = State::Code;
                }
            }
        }
    }

    out
}
