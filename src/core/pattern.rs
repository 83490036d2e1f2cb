//! Restricted pattern dialect for key-path masking
//!
//! Patterns are matched against the full dotted key path (`payment.cardNumber`)
//! and are always anchored at both ends. The grammar is a small subset of
//! regular expressions:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `c`    | the literal character `c` |
//! | `.`    | any single character |
//! | `\c`   | the literal character `c`, for `c` in `.*+?^$\` |
//! | `x*`   | zero or more of `x` |
//! | `x+`   | one or more of `x` |
//! | `x?`   | zero or one of `x` |
//! | `^`    | accepted as the first character, no effect |
//! | `$`    | accepted as the last character, no effect |
//!
//! A `*` with nothing before it (at the start, or right after `^`) is the glob
//! form and means "any run of characters", so `*password` equals `.*password`.
//!
//! Character classes, groups, alternation and counted repetition are rejected
//! when the pattern is compiled.
//!
//! ```
//! use rust_secure_logger::MaskPattern;
//!
//! let pattern = MaskPattern::compile(".*cardNumber$").unwrap();
//! assert!(pattern.is_match("payment.cardNumber"));
//! assert!(!pattern.is_match("payment.cardNumberLast4"));
//! ```

use super::error::{LoggerError, Result};
use std::fmt;

/// Upper bound on compiled program size; keeps the matcher's state set on the stack
pub const MAX_PATTERN_NODES: usize = 255;

const STATE_WORDS: usize = (MAX_PATTERN_NODES + 1).div_ceil(64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    Literal(char),
    Any,
}

impl Atom {
    #[inline]
    fn matches(self, c: char) -> bool {
        match self {
            Atom::Literal(l) => l == c,
            Atom::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    One,
    ZeroOrMore,
    ZeroOrOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    atom: Atom,
    repeat: Repeat,
}

#[derive(Debug, Clone)]
enum Program {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Nfa(Vec<Node>),
}

/// A compiled mask pattern
#[derive(Clone)]
pub struct MaskPattern {
    source: String,
    program: Program,
}

impl MaskPattern {
    /// Compile a pattern, failing with `InvalidConfiguration` when malformed
    pub fn compile(source: &str) -> Result<Self> {
        let nodes = parse(source)?;
        let program = specialize(nodes);
        Ok(Self {
            source: source.to_string(),
            program,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the full path matches this pattern
    pub fn is_match(&self, path: &str) -> bool {
        match &self.program {
            Program::Exact(lit) => path == lit,
            Program::Prefix(lit) => path.starts_with(lit.as_str()),
            Program::Suffix(lit) => path.ends_with(lit.as_str()),
            Program::Contains(lit) => path.contains(lit.as_str()),
            Program::Nfa(nodes) => run_nfa(nodes, path),
        }
    }
}

impl fmt::Debug for MaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MaskPattern").field(&self.source).finish()
    }
}

impl fmt::Display for MaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(source: &str, message: impl fmt::Display) -> LoggerError {
    LoggerError::config("MaskPattern", format!("'{}': {}", source, message))
}

fn parse(source: &str) -> Result<Vec<Node>> {
    if source.is_empty() {
        return Err(invalid(source, "pattern is empty"));
    }

    let mut nodes: Vec<Node> = Vec::new();
    // whether the last node may still take a quantifier
    let mut quantifiable = false;
    let mut chars = source.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '^' => {
                if idx != 0 {
                    return Err(invalid(source, "'^' is only allowed at the start"));
                }
            }
            '$' => {
                if chars.peek().is_some() {
                    return Err(invalid(source, "'$' is only allowed at the end"));
                }
            }
            '*' | '+' | '?' => {
                if !quantifiable {
                    if c == '*' && nodes.is_empty() {
                        // glob form: leading '*' is any run of characters
                        nodes.push(Node {
                            atom: Atom::Any,
                            repeat: Repeat::ZeroOrMore,
                        });
                        continue;
                    }
                    return Err(invalid(
                        source,
                        format!("quantifier '{}' at offset {} has nothing to repeat", c, idx),
                    ));
                }
                let Some(last) = nodes.last_mut() else {
                    return Err(invalid(source, "quantifier has nothing to repeat"));
                };
                match c {
                    '*' => last.repeat = Repeat::ZeroOrMore,
                    '?' => last.repeat = Repeat::ZeroOrOne,
                    _ => {
                        // x+ is x followed by x*
                        let atom = last.atom;
                        nodes.push(Node {
                            atom,
                            repeat: Repeat::ZeroOrMore,
                        });
                    }
                }
                quantifiable = false;
            }
            '.' => {
                nodes.push(Node {
                    atom: Atom::Any,
                    repeat: Repeat::One,
                });
                quantifiable = true;
            }
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(invalid(source, "dangling '\\' at end of pattern"));
                };
                if !matches!(escaped, '.' | '*' | '+' | '?' | '^' | '$' | '\\') {
                    return Err(invalid(
                        source,
                        format!("unsupported escape '\\{}'", escaped),
                    ));
                }
                nodes.push(Node {
                    atom: Atom::Literal(escaped),
                    repeat: Repeat::One,
                });
                quantifiable = true;
            }
            '[' | ']' | '(' | ')' | '|' | '{' | '}' => {
                return Err(invalid(
                    source,
                    format!("'{}' is not supported by the mask pattern dialect", c),
                ));
            }
            literal => {
                nodes.push(Node {
                    atom: Atom::Literal(literal),
                    repeat: Repeat::One,
                });
                quantifiable = true;
            }
        }

        if nodes.len() > MAX_PATTERN_NODES {
            return Err(invalid(
                source,
                format!("pattern exceeds {} elements", MAX_PATTERN_NODES),
            ));
        }
    }

    if nodes.is_empty() {
        return Err(invalid(source, "pattern has no elements besides anchors"));
    }
    Ok(nodes)
}

fn is_any_run(node: &Node) -> bool {
    node.atom == Atom::Any && node.repeat == Repeat::ZeroOrMore
}

fn literal_run(nodes: &[Node]) -> Option<String> {
    nodes
        .iter()
        .map(|n| match (n.atom, n.repeat) {
            (Atom::Literal(c), Repeat::One) => Some(c),
            _ => None,
        })
        .collect()
}

/// Pick a string-search fast path for the common pattern shapes
fn specialize(nodes: Vec<Node>) -> Program {
    let leading = nodes.first().is_some_and(is_any_run);
    let trailing = nodes.len() > 1 && nodes.last().is_some_and(is_any_run);
    let start = usize::from(leading);
    let end = nodes.len() - usize::from(trailing);

    if start <= end {
        if let Some(lit) = literal_run(&nodes[start..end]) {
            return match (leading, trailing) {
                (false, false) => Program::Exact(lit),
                (true, false) => Program::Suffix(lit),
                (false, true) => Program::Prefix(lit),
                (true, true) => Program::Contains(lit),
            };
        }
    }
    Program::Nfa(nodes)
}

#[derive(Clone, Copy)]
struct StateSet([u64; STATE_WORDS]);

impl StateSet {
    const EMPTY: StateSet = StateSet([0; STATE_WORDS]);

    #[inline]
    fn insert(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }

    #[inline]
    fn contains(&self, i: usize) -> bool {
        self.0[i / 64] & (1 << (i % 64)) != 0
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Follow the epsilon edges of optional nodes
    fn close(&mut self, nodes: &[Node]) {
        for (i, node) in nodes.iter().enumerate() {
            if self.contains(i) && node.repeat != Repeat::One {
                self.insert(i + 1);
            }
        }
    }
}

fn run_nfa(nodes: &[Node], path: &str) -> bool {
    let accept = nodes.len();
    let mut current = StateSet::EMPTY;
    current.insert(0);
    current.close(nodes);

    for c in path.chars() {
        let mut next = StateSet::EMPTY;
        for (i, node) in nodes.iter().enumerate() {
            if current.contains(i) && node.atom.matches(c) {
                if node.repeat == Repeat::ZeroOrMore {
                    next.insert(i);
                } else {
                    next.insert(i + 1);
                }
            }
        }
        next.close(nodes);
        if next.is_empty() {
            return false;
        }
        current = next;
    }

    current.contains(accept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        MaskPattern::compile(pattern).unwrap().is_match(path)
    }

    #[test]
    fn test_anchored_suffix() {
        assert!(matches(".*cardNumber$", "payment.cardNumber"));
        assert!(!matches(".*cardNumber$", "payment.cardNumberLast4"));
        assert!(matches(".*cardNumber$", "cardNumber"));
    }

    #[test]
    fn test_always_anchored() {
        // without .* the pattern must cover the whole path
        assert!(!matches("password", "user.password"));
        assert!(matches("password", "password"));
        assert!(matches("^password$", "password"));
    }

    #[test]
    fn test_glob_leading_star() {
        assert!(matches("*password", "db.password"));
        assert!(matches("^*token", "auth.token"));
        assert!(!matches("*password", "password_hint"));
    }

    #[test]
    fn test_fast_paths_selected() {
        let p = MaskPattern::compile("secret").unwrap();
        assert!(matches!(p.program, Program::Exact(_)));
        let p = MaskPattern::compile("user\\..*").unwrap();
        assert!(matches!(p.program, Program::Prefix(_)));
        let p = MaskPattern::compile(".*key.*").unwrap();
        assert!(matches!(p.program, Program::Contains(_)));
        let p = MaskPattern::compile("a.c").unwrap();
        assert!(matches!(p.program, Program::Nfa(_)));
    }

    #[test]
    fn test_nfa_quantifiers() {
        assert!(matches("ab*c", "ac"));
        assert!(matches("ab*c", "abbbc"));
        assert!(!matches("ab+c", "ac"));
        assert!(matches("ab+c", "abc"));
        assert!(matches("colou?r", "color"));
        assert!(matches("colou?r", "colour"));
        assert!(!matches("colou?r", "colouur"));
        assert!(matches("user\\..*\\.token", "user.session.token"));
        assert!(!matches("user\\..*\\.token", "userXsession.token"));
        assert!(matches(".*\\.api_?key", "svc.apikey"));
        assert!(matches(".*\\.api_?key", "svc.api_key"));
    }

    #[test]
    fn test_escaped_metacharacters() {
        assert!(matches("a\\*b", "a*b"));
        assert!(!matches("a\\*b", "aab"));
        assert!(matches("cost\\$", "cost$"));
    }

    #[test]
    fn test_unicode_paths() {
        assert!(matches(".*пароль", "user.пароль"));
        assert!(matches("us.r", "usär"));
    }

    #[test]
    fn test_malformed_patterns() {
        for bad in ["", "a**", "+a", "x^y", "a$b", "a\\", "[a-z]+", "(a|b)", "a{2}", "\\d+", "?"] {
            let err = MaskPattern::compile(bad).unwrap_err();
            assert!(err.is_config(), "expected config error for {:?}", bad);
        }
    }

    #[test]
    fn test_anchor_only_patterns_rejected() {
        for bad in ["^", "$", "^$"] {
            let err = MaskPattern::compile(bad).unwrap_err();
            assert!(err.is_config(), "expected config error for {:?}", bad);
            assert!(err.to_string().contains("no elements"));
        }
        assert!(MaskPattern::compile("^a$").unwrap().is_match("a"));
    }

    #[test]
    fn test_pattern_size_limit() {
        let long = "a".repeat(MAX_PATTERN_NODES + 1);
        assert!(MaskPattern::compile(&long).is_err());
        let ok = format!(".{}", "a?".repeat(MAX_PATTERN_NODES / 2));
        assert!(MaskPattern::compile(&ok).is_ok());
    }
}
