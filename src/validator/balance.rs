//! Bracket balance over JS/TS text, skipping strings, templates and comments.
//!
//! Regex literals are not recognised. A `(` inside `/[(]/` counts, but it
//! counts the same way before and after a transform, which is all the
//! validator compares.

use std::fmt;

/// Result of scanning one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balance {
    /// Openers never closed, outermost first.
    pub unclosed: String,
    /// Closers with nothing to close.
    pub stray: usize,
    /// Closers that did not match the innermost opener.
    pub mismatched: usize,
    /// Input ended inside a block comment or template literal.
    pub unterminated: bool,
}

impl Balance {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unclosed.is_empty() && self.stray == 0 && self.mismatched == 0 && !self.unterminated
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.unclosed.is_empty() {
            parts.push(format!("unclosed '{}'", self.unclosed));
        }
        if self.stray > 0 {
            parts.push(format!("{} stray closer(s)", self.stray));
        }
        if self.mismatched > 0 {
            parts.push(format!("{} mismatched closer(s)", self.mismatched));
        }
        if self.unterminated {
            parts.push("unterminated comment or template".to_string());
        }
        if parts.is_empty() {
            write!(f, "balanced")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Open(char),
    TemplateExpr,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Template,
}

/// Scans `text` and reports its bracket balance.
#[must_use]
pub fn scan(text: &str) -> Balance {
    let mut out = Balance::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut mode = Mode::Code;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if mode == Mode::Template {
            match c {
                '\\' => {
                    chars.next();
                }
                '`' => mode = Mode::Code,
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    stack.push(Frame::TemplateExpr);
                    mode = Mode::Code;
                }
                _ => {}
            }
            continue;
        }

        match c {
            '/' if chars.peek() == Some(&'/') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                if !skip_block_comment(&mut chars) {
                    out.unterminated = true;
                }
            }
            '\'' | '"' => skip_quoted(&mut chars, c),
            '`' => mode = Mode::Template,
            '(' | '[' | '{' => stack.push(Frame::Open(c)),
            '}' if stack.last() == Some(&Frame::TemplateExpr) => {
                stack.pop();
                mode = Mode::Template;
            }
            ')' | ']' | '}' => close(&mut stack, c, &mut out),
            _ => {}
        }
    }

    if mode == Mode::Template {
        out.unterminated = true;
    }
    out.unclosed = stack
        .iter()
        .map(|f| match f {
            Frame::Open(c) => *c,
            Frame::TemplateExpr => '$',
        })
        .collect();
    out
}

fn close(stack: &mut Vec<Frame>, closer: char, out: &mut Balance) {
    let opener = match closer {
        ')' => '(',
        ']' => '[',
        _ => '{',
    };
    match stack.last() {
        None => out.stray += 1,
        Some(Frame::Open(top)) if *top == opener => {
            stack.pop();
        }
        Some(_) => {
            out.mismatched += 1;
            // Resynchronise on the nearest matching opener, if any.
            if let Some(pos) = stack.iter().rposition(|f| *f == Frame::Open(opener)) {
                stack.truncate(pos);
            }
        }
    }
}

fn skip_block_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let mut prev = '\0';
    for c in chars.by_ref() {
        if prev == '*' && c == '/' {
            return true;
        }
        prev = c;
    }
    false
}

/// Quoted strings cannot span lines, so a stray apostrophe in JSX text
/// swallows at most the rest of its line.
fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' => return,
            c if c == quote => return,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_code_is_clean() {
        let b = scan("function f(a) { return [a, { b: (1) }]; }");
        assert!(b.is_clean(), "{b}");
    }

    #[test]
    fn strings_and_comments_are_ignored() {
        let b = scan("const s = '(('; // ))\n/* { */ const t = \"]\";");
        assert!(b.is_clean(), "{b}");
    }

    #[test]
    fn template_expressions_nest() {
        let b = scan("const s = `a ${fn({ x: 1 })} b ${`inner ${y}`}`;");
        assert!(b.is_clean(), "{b}");
    }

    #[test]
    fn reports_unclosed_and_stray() {
        let b = scan("function f( { ");
        assert_eq!(b.unclosed, "({");
        let b = scan("a)}");
        assert_eq!(b.stray, 2);
    }

    #[test]
    fn reports_mismatch() {
        let b = scan("f(a]");
        assert_eq!(b.mismatched, 1);
        assert!(!b.is_clean());
    }

    #[test]
    fn unterminated_block_comment() {
        assert!(scan("/* never closed").unterminated);
    }

    #[test]
    fn apostrophe_in_jsx_text_is_contained() {
        let b = scan("const a = <p>Don't</p>;\nfunction g() { return 1; }");
        assert!(b.is_clean(), "{b}");
    }
}
