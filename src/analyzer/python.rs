// Python checks work on a lightly lexed copy of the source: comments are
// dropped and string contents blanked, so quotes and brackets inside
// literals never look like code.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Severity, StaticIssue};

const MAX_LINE_LENGTH: usize = 79;
const MAX_COMPLEXITY: usize = 10;
const MAX_NESTING: usize = 4;

static OPERATOR_NO_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9][=+\-*/][a-zA-Z0-9]").expect("valid operator regex"));
static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(async\s+)?(if|elif|else|for|while|try|except|finally|with|def|class)\b")
        .expect("valid block header regex")
});
static DECISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(async\s+)?(if|elif|for|while|try|with)\b").expect("valid decision regex")
});
static BOOL_OP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(and|or)\b").expect("valid bool regex"));
static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid def regex")
});

/// A source line with comments removed and string contents blanked.
#[derive(Debug)]
struct CodeLine {
    number: usize,
    indent: usize,
    code: String,
}

impl CodeLine {
    fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }

    fn stmt(&self) -> &str {
        self.code.trim()
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Byte offset of the closing quote, honoring backslash escapes.
fn closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(i);
        }
    }
    None
}

fn lex(code: &str) -> Vec<CodeLine> {
    let mut lines = Vec::new();
    let mut in_triple: Option<&'static str> = None;

    for (idx, raw) in code.lines().enumerate() {
        let mut cleaned = String::new();
        let mut rest = raw;

        loop {
            if let Some(delim) = in_triple {
                match rest.find(delim) {
                    Some(pos) => {
                        rest = &rest[pos + 3..];
                        in_triple = None;
                        cleaned.push_str("\"\"");
                    }
                    None => break,
                }
            }

            let Some(pos) = rest.find(['"', '\'', '#']) else {
                cleaned.push_str(rest);
                break;
            };
            cleaned.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with('#') {
                break;
            }
            let quote = if tail.starts_with('"') { '"' } else { '\'' };
            let triple = if quote == '"' { "\"\"\"" } else { "'''" };
            if tail.starts_with(triple) {
                in_triple = Some(triple);
                rest = &tail[3..];
                continue;
            }

            cleaned.push(quote);
            cleaned.push(quote);
            match closing_quote(&tail[1..], quote) {
                Some(end) => rest = &tail[1 + end + 1..],
                None => break,
            }
        }

        lines.push(CodeLine {
            number: idx + 1,
            indent: indent_width(raw),
            code: cleaned,
        });
    }

    lines
}

fn syntax_issue(line: usize, message: &str) -> StaticIssue {
    StaticIssue {
        line_number: Some(line),
        description: format!("Syntax error: {}", message),
        suggestion: "Fix the syntax error to make the code runnable".to_string(),
        severity: Severity::High,
    }
}

fn check_brackets(lines: &[CodeLine]) -> Option<StaticIssue> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for line in lines {
        for c in line.code.chars() {
            match c {
                '(' | '[' | '{' => stack.push((c, line.number)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        Some((open, _)) => {
                            return Some(syntax_issue(
                                line.number,
                                &format!(
                                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                    c, open
                                ),
                            ))
                        }
                        None => {
                            return Some(syntax_issue(line.number, &format!("unmatched '{}'", c)))
                        }
                    }
                }
                _ => {}
            }
        }
    }
    stack
        .first()
        .map(|(open, line)| syntax_issue(*line, &format!("'{}' was never closed", open)))
}

fn bracket_delta(c: char) -> i32 {
    match c {
        '(' | '[' | '{' => 1,
        ')' | ']' | '}' => -1,
        _ => 0,
    }
}

/// Block headers need a ':' outside brackets before the logical line ends.
/// Returns the line number of the first header without one.
/// Assumes brackets are balanced.
fn first_missing_colon(lines: &[CodeLine]) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if depth == 0 && BLOCK_HEADER.is_match(line.stmt()) {
            let start = line.number;
            let mut found_colon = false;
            loop {
                for c in lines[i].code.chars() {
                    if c == ':' && depth == 0 {
                        found_colon = true;
                    }
                    depth += bracket_delta(c);
                }
                if depth <= 0 || i + 1 >= lines.len() {
                    break;
                }
                i += 1;
            }
            depth = 0;
            if !found_colon {
                return Some(start);
            }
        } else {
            depth += line.code.chars().map(bracket_delta).sum::<i32>();
            depth = depth.max(0);
        }
        i += 1;
    }
    None
}

fn check_colons(lines: &[CodeLine]) -> Option<StaticIssue> {
    first_missing_colon(lines).map(|number| syntax_issue(number, "expected ':'"))
}

/// Line number and keyword of the first block header missing its ':'.
/// One-line bodies (`if x: return 1`) and headers continued inside
/// brackets are accepted.
pub(crate) fn missing_colon(code: &str) -> Option<(usize, String)> {
    let lines = lex(code);
    let number = first_missing_colon(&lines)?;
    let caps = BLOCK_HEADER.captures(lines[number - 1].stmt())?;
    Some((number, caps[2].to_string()))
}

pub(super) fn check_syntax(code: &str) -> Vec<StaticIssue> {
    let lines = lex(code);
    check_brackets(&lines)
        .or_else(|| check_colons(&lines))
        .into_iter()
        .collect()
}

pub(super) fn check_style(code: &str) -> Vec<StaticIssue> {
    let mut issues = Vec::new();

    for (idx, line) in code.lines().enumerate() {
        let number = Some(idx + 1);
        let length = line.chars().count();

        if length > MAX_LINE_LENGTH {
            issues.push(StaticIssue {
                line_number: number,
                description: format!(
                    "Line too long ({} > {} characters)",
                    length, MAX_LINE_LENGTH
                ),
                suggestion: "Break long lines to improve readability".to_string(),
                severity: Severity::Low,
            });
        }

        if OPERATOR_NO_SPACES.is_match(line) {
            issues.push(StaticIssue {
                line_number: number,
                description: "Missing spaces around operator".to_string(),
                suggestion: "Add spaces around operators (e.g., 'a = b + c')".to_string(),
                severity: Severity::Low,
            });
        }

        if line.ends_with(' ') || line.ends_with('\t') {
            issues.push(StaticIssue {
                line_number: number,
                description: "Trailing whitespace".to_string(),
                suggestion: "Remove trailing whitespace".to_string(),
                severity: Severity::Low,
            });
        }
    }

    issues
}

/// Lines belonging to the block opened at `lines[start]`.
fn block_body(lines: &[CodeLine], start: usize) -> &[CodeLine] {
    let header_indent = lines[start].indent;
    let mut end = start + 1;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent > header_indent) {
        end += 1;
    }
    &lines[start + 1..end]
}

fn cyclomatic_complexity(header: &CodeLine, body: &[CodeLine]) -> usize {
    let decisions = body
        .iter()
        .filter(|l| DECISION.is_match(l.stmt()))
        .count();
    let bool_ops: usize = std::iter::once(header)
        .chain(body.iter())
        .map(|l| BOOL_OP.find_iter(&l.code).count())
        .sum();
    1 + decisions + bool_ops
}

pub(super) fn check_complexity(code: &str) -> Vec<StaticIssue> {
    let lines = lex(code);
    let mut issues = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = FUNCTION_DEF.captures(line.stmt()) else {
            continue;
        };
        let complexity = cyclomatic_complexity(line, block_body(&lines, i));
        if complexity > MAX_COMPLEXITY {
            issues.push(StaticIssue {
                line_number: Some(line.number),
                description: format!(
                    "Function '{}' has high complexity ({})",
                    &caps[2], complexity
                ),
                suggestion: "Consider breaking this function into smaller functions".to_string(),
                severity: Severity::Medium,
            });
        }
    }

    // Depth counts enclosing block headers; one report per top-level block
    let mut open: Vec<usize> = Vec::new();
    let mut group: Option<(usize, usize)> = None;
    let flush = |group: &mut Option<(usize, usize)>, issues: &mut Vec<StaticIssue>| {
        if let Some((line, depth)) = group.take() {
            if depth > MAX_NESTING {
                issues.push(StaticIssue {
                    line_number: Some(line),
                    description: format!("Deep nesting detected (depth: {})", depth),
                    suggestion: "Consider reducing nesting depth".to_string(),
                    severity: Severity::Medium,
                });
            }
        }
    };

    for line in lines.iter().filter(|l| !l.is_blank()) {
        while open.last().is_some_and(|&indent| indent >= line.indent) {
            open.pop();
        }
        if open.is_empty() {
            flush(&mut group, &mut issues);
        }
        if BLOCK_HEADER.is_match(line.stmt()) {
            open.push(line.indent);
            let depth = open.len();
            match group.as_mut() {
                Some((_, max)) => *max = (*max).max(depth),
                None => group = Some((line.number, depth)),
            }
        }
    }
    flush(&mut group, &mut issues);

    issues
}
