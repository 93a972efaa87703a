//! SQL LIKE pattern matching

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    /// `%`: any run of characters
    Any,
    /// `_`: exactly one character
    One,
    Char(char),
}

fn tokenize(pattern: &str, escape: Option<char>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            // A trailing escape matches itself
            tokens.push(Token::Char(chars.next().unwrap_or(c)));
        } else if c == '%' {
            if tokens.last() != Some(&Token::Any) {
                tokens.push(Token::Any);
            }
        } else if c == '_' {
            tokens.push(Token::One);
        } else {
            tokens.push(Token::Char(c));
        }
    }
    tokens
}

/// Match `text` against a LIKE `pattern`
///
/// Backtracks only to the most recent `%`, which keeps matching linear in
/// the common case.
pub fn like_match(text: &str, pattern: &str, escape: Option<char>) -> bool {
    let text: Vec<char> = text.chars().collect();
    let tokens = tokenize(pattern, escape);

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                t += 1;
                p += 1;
            }
            Some(Token::Char(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|tok| *tok == Token::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_basic() {
        assert!(like_match("hello", "hello", None));
        assert!(!like_match("hello", "help", None));
        assert!(like_match("hello", "h%", None));
        assert!(like_match("hello", "%llo", None));
        assert!(like_match("hello", "%ll%", None));
        assert!(like_match("hello", "h_llo", None));
        assert!(!like_match("hello", "h_lo", None));
        assert!(like_match("", "%", None));
        assert!(!like_match("", "_", None));
    }

    #[test]
    fn test_like_backtracking() {
        assert!(like_match("abcabcabd", "%abd", None));
        assert!(like_match("mississippi", "m%iss%pi", None));
        assert!(!like_match("mississippi", "m%iss%pix", None));
        assert!(like_match("aaa", "a%a%a", None));
    }

    #[test]
    fn test_like_escape() {
        assert!(like_match("50%", "50!%", Some('!')));
        assert!(!like_match("500", "50!%", Some('!')));
        assert!(like_match("a_b", "a\\_b", Some('\\')));
        assert!(!like_match("axb", "a\\_b", Some('\\')));
    }
}
