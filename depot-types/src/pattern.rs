//! Wildcard matching for the `glob` and `like` search operators.
//!
//! `glob` follows shell conventions: `*` matches any run of characters,
//! `?` exactly one, `[abc]`, `[a-z]` and `[^abc]` a character class. It is
//! case-sensitive.
//!
//! `like` follows SQL: `%` matches any run, `_` exactly one character, and
//! ASCII letters compare case-insensitively.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
    fn accepts(&self, c: char, fold_case: bool) -> bool {
        match self {
            Self::AnyRun => false,
            Self::AnyOne => true,
            Self::Literal(l) if fold_case => l.eq_ignore_ascii_case(&c),
            Self::Literal(l) => *l == c,
            Self::Class { negated, ranges } => {
                ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != *negated
            }
        }
    }
}

fn parse_glob(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => tokens.push(Token::AnyRun),
            '?' => tokens.push(Token::AnyOne),
            '[' => {
                if let Some((class, next)) = parse_class(&chars, i + 1) {
                    tokens.push(class);
                    i = next;
                    continue;
                }
                tokens.push(Token::Literal('['));
            }
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }
    tokens
}

/// Parses a class body starting after `[`. Returns the token and the index
/// just past the closing `]`, or `None` when the class is unterminated.
fn parse_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start;
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    // A `]` right after the opening bracket is a literal member.
    if chars.get(i) == Some(&']') {
        ranges.push((']', ']'));
        i += 1;
    }
    while let Some(&c) = chars.get(i) {
        if c == ']' {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        match (chars.get(i + 1), chars.get(i + 2)) {
            (Some('-'), Some(&hi)) if hi != ']' => {
                ranges.push((c, hi));
                i += 3;
            }
            _ => {
                ranges.push((c, c));
                i += 1;
            }
        }
    }
    None
}

fn parse_like(pattern: &str) -> Vec<Token> {
    pattern
        .chars()
        .map(|c| match c {
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            c => Token::Literal(c),
        })
        .collect()
}

/// Greedy matcher with single-point backtracking on the last `AnyRun`.
fn run(tokens: &[Token], text: &str, fold_case: bool) -> bool {
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::AnyRun) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(tok) if tok.accepts(text[t], fold_case) => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, mark)) => {
                    p = star + 1;
                    t = mark + 1;
                    backtrack = Some((star, mark + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|tok| *tok == Token::AnyRun)
}

/// Matches `text` against a shell-style glob pattern.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    run(&parse_glob(pattern), text, false)
}

/// Matches `text` against an SQL `LIKE` pattern.
#[must_use]
pub fn like_match(pattern: &str, text: &str) -> bool {
    run(&parse_like(pattern), text, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_wildcards() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*.txt", "notes.txt"));
        assert!(!glob_match("*.txt", "notes.txt.bak"));
        assert!(glob_match("*a*b*", "xxaxxbxx"));
    }

    #[test]
    fn glob_is_case_sensitive() {
        assert!(!glob_match("abc", "ABC"));
    }

    #[test]
    fn glob_classes() {
        assert!(glob_match("[abc]x", "bx"));
        assert!(!glob_match("[abc]x", "dx"));
        assert!(glob_match("[a-f]1", "e1"));
        assert!(glob_match("[^a-f]1", "z1"));
        assert!(!glob_match("[^a-f]1", "c1"));
        assert!(glob_match("[]]", "]"));
        assert!(glob_match("[a-]", "-"));
    }

    #[test]
    fn glob_unterminated_class_is_literal() {
        assert!(glob_match("[ab", "[ab"));
        assert!(!glob_match("[ab", "a"));
    }

    #[test]
    fn like_wildcards() {
        assert!(like_match("%", ""));
        assert!(like_match("J%n", "Jan"));
        assert!(like_match("j%N", "Jan"));
        assert!(like_match("_an", "Dan"));
        assert!(!like_match("_an", "an"));
        assert!(like_match("%oo%", "foobar"));
        assert!(!like_match("%oo%", "fobar"));
    }

    #[test]
    fn like_treats_glob_characters_literally() {
        assert!(like_match("a*b", "a*b"));
        assert!(!like_match("a*b", "axb"));
    }
}
