//! Entry-point discovery for submitted JavaScript.
//!
//! A submission is either a top-level function (declaration or a
//! `const/let/var` binding to a function expression) or a `class Solution`
//! whose first public instance method is the entry point. The source is
//! tokenized with a small lexer that skips comments, strings, template and
//! regular-expression literals, so names inside those never count, and only
//! declarations at nesting depth zero are considered.

use serde::Serialize;

use crate::error::ExecutionError;

pub const SOLUTION_CLASS: &str = "Solution";

/// The callable shape detected in a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Function { name: String },
    ClassMethod { class_name: String, method: String },
}

impl Entry {
    /// Name the judge sees: the function name or the method name.
    pub fn callable_name(&self) -> &str {
        match self {
            Entry::Function { name } => name,
            Entry::ClassMethod { method, .. } => method,
        }
    }
}

/// Executable source plus the entry point to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub source: String,
    pub entry: Entry,
}

pub fn analyze(source: &str) -> Result<Program, ExecutionError> {
    let tokens = tokenize(source);

    let entry = find_solution_method(&tokens)
        .or_else(|| find_function(&tokens))
        .ok_or(ExecutionError::CallableNotFound)?;

    Ok(Program {
        source: source.to_string(),
        entry,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind<'a> {
    Ident(&'a str),
    Private,
    Punct(char),
    Arrow,
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: Kind<'a>,
    /// Nesting depth of `(`, `[` and `{` before this token.
    depth: usize,
    newline_before: bool,
}

const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void",
    "throw", "yield", "await", "of",
];

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "return", "super", "switch", "this", "throw", "try", "typeof",
    "var", "void", "while", "with", "yield", "await", "async", "static",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_part(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    newline: bool,
    tokens: Vec<Token<'a>>,
}

fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        depth: 0,
        newline: false,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

impl<'a> Lexer<'a> {
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: Kind<'a>) {
        self.tokens.push(Token {
            kind,
            depth: self.depth,
            newline_before: self.newline,
        });
        self.newline = false;
    }

    fn run(&mut self) {
        while let Some(b) = self.peek(0) {
            match b {
                b'\n' => {
                    self.newline = true;
                    self.pos += 1;
                }
                _ if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'\'' | b'"' => {
                    self.skip_string(b);
                    self.push(Kind::Literal);
                }
                b'`' => {
                    self.skip_template();
                    self.push(Kind::Literal);
                }
                b'/' if self.regex_allowed() => {
                    self.skip_regex();
                    self.push(Kind::Literal);
                }
                _ if b.is_ascii_digit()
                    || (b == b'.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    while self.peek(0).is_some_and(|c| is_ident_part(c) || c == b'.') {
                        self.pos += 1;
                    }
                    self.push(Kind::Literal);
                }
                _ if is_ident_start(b) => {
                    let start = self.pos;
                    while self.peek(0).is_some_and(is_ident_part) {
                        self.pos += 1;
                    }
                    let ident = &self.src[start..self.pos];
                    self.push(Kind::Ident(ident));
                }
                b'#' if self.peek(1).is_some_and(is_ident_start) => {
                    self.pos += 1;
                    while self.peek(0).is_some_and(is_ident_part) {
                        self.pos += 1;
                    }
                    self.push(Kind::Private);
                }
                b'=' if self.peek(1) == Some(b'>') => {
                    self.pos += 2;
                    self.push(Kind::Arrow);
                }
                b'(' | b'[' | b'{' => {
                    self.push(Kind::Punct(b as char));
                    self.depth += 1;
                    self.pos += 1;
                }
                b')' | b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.push(Kind::Punct(b as char));
                    self.pos += 1;
                }
                _ => {
                    self.push(Kind::Punct(b as char));
                    self.pos += 1;
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(b) = self.peek(0) {
            if b == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            if b == b'\n' {
                self.newline = true;
            }
            self.pos += 1;
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'\n' => return,
                _ if b == quote => return,
                _ => {}
            }
        }
    }

    fn skip_template(&mut self) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_substitution();
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Skips the body of a `${ ... }` substitution, including nested
    /// literals, up to and including its closing brace.
    fn skip_substitution(&mut self) {
        let mut braces = 1usize;
        while let Some(b) = self.peek(0) {
            match b {
                b'\'' | b'"' => self.skip_string(b),
                b'`' => self.skip_template(),
                b'{' => {
                    braces += 1;
                    self.pos += 1;
                }
                b'}' => {
                    self.pos += 1;
                    braces -= 1;
                    if braces == 0 {
                        return;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| t.kind) {
            None => true,
            Some(Kind::Punct(c)) => !matches!(c, ')' | ']' | '}'),
            Some(Kind::Arrow) => true,
            Some(Kind::Ident(word)) => REGEX_PRECEDING_KEYWORDS.contains(&word),
            Some(Kind::Private) | Some(Kind::Literal) => false,
        }
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'\n' => return,
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => break,
                _ => {}
            }
        }
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
    }
}

fn ident_at<'a>(tokens: &[Token<'a>], idx: usize) -> Option<&'a str> {
    match tokens.get(idx)?.kind {
        Kind::Ident(name) => Some(name),
        _ => None,
    }
}

fn punct_at(tokens: &[Token<'_>], idx: usize, ch: char) -> bool {
    tokens.get(idx).is_some_and(|t| t.kind == Kind::Punct(ch))
}

fn is_binding_name(name: &str) -> bool {
    !RESERVED.contains(&name)
}

/// Index just past the bracket that closes the one opened at `open`.
fn skip_group(tokens: &[Token<'_>], open: usize) -> usize {
    let depth = tokens[open].depth;
    tokens[open + 1..]
        .iter()
        .position(|t| t.depth == depth && matches!(t.kind, Kind::Punct(')' | ']' | '}')))
        .map(|offset| open + 1 + offset + 1)
        .unwrap_or(tokens.len())
}

/// Does the expression starting at `idx` evaluate to a function?
fn is_function_expression(tokens: &[Token<'_>], idx: usize) -> bool {
    match tokens.get(idx).map(|t| t.kind) {
        Some(Kind::Ident("function")) => true,
        Some(Kind::Ident("async")) => {
            ident_at(tokens, idx + 1) == Some("function") || is_function_expression(tokens, idx + 1)
        }
        Some(Kind::Punct('(')) => {
            let after = skip_group(tokens, idx);
            tokens.get(after).is_some_and(|t| t.kind == Kind::Arrow)
        }
        Some(Kind::Ident(_)) => tokens.get(idx + 1).is_some_and(|t| t.kind == Kind::Arrow),
        _ => false,
    }
}

fn find_function(tokens: &[Token<'_>]) -> Option<Entry> {
    for (idx, token) in tokens.iter().enumerate() {
        if token.depth != 0 {
            continue;
        }
        match token.kind {
            Kind::Ident("function") => {
                let name_idx = if punct_at(tokens, idx + 1, '*') { idx + 2 } else { idx + 1 };
                if let Some(name) = ident_at(tokens, name_idx).filter(|n| is_binding_name(n)) {
                    if punct_at(tokens, name_idx + 1, '(') {
                        return Some(Entry::Function {
                            name: name.to_string(),
                        });
                    }
                }
            }
            Kind::Ident("const" | "let" | "var") => {
                let Some(name) = ident_at(tokens, idx + 1).filter(|n| is_binding_name(n)) else {
                    continue;
                };
                if punct_at(tokens, idx + 2, '=')
                    && !punct_at(tokens, idx + 3, '=')
                    && is_function_expression(tokens, idx + 3)
                {
                    return Some(Entry::Function {
                        name: name.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    None
}

fn find_solution_method(tokens: &[Token<'_>]) -> Option<Entry> {
    let class_idx = tokens.iter().enumerate().position(|(idx, t)| {
        t.depth == 0
            && t.kind == Kind::Ident("class")
            && ident_at(tokens, idx + 1) == Some(SOLUTION_CLASS)
    })?;

    let body_open = (class_idx + 2..tokens.len()).find(|&i| punct_at(tokens, i, '{'))?;
    let member_depth = tokens[body_open].depth + 1;
    // Exclusive end of the member tokens; an unterminated body runs to EOF.
    let body_end = skip_group(tokens, body_open);
    let members_end = if punct_at(tokens, body_end - 1, '}') && body_end - 1 > body_open {
        body_end - 1
    } else {
        body_end
    };

    let method = first_public_method(&tokens[body_open + 1..members_end], member_depth)?;
    Some(Entry::ClassMethod {
        class_name: SOLUTION_CLASS.to_string(),
        method: method.to_string(),
    })
}

/// Walks class members at `member_depth` and returns the first instance
/// method (or function-valued field) that is not the constructor, static,
/// private, or an accessor.
fn first_public_method<'a>(body: &[Token<'a>], member_depth: usize) -> Option<&'a str> {
    let mut modifiers: Vec<&str> = Vec::new();
    let mut in_initializer = false;
    let mut idx = 0;

    while idx < body.len() {
        let token = body[idx];
        if token.depth != member_depth {
            idx += 1;
            continue;
        }

        if in_initializer {
            match token.kind {
                Kind::Punct(';') => in_initializer = false,
                _ if token.newline_before => in_initializer = false,
                _ => {
                    idx += 1;
                    continue;
                }
            }
            if token.kind == Kind::Punct(';') {
                idx += 1;
                continue;
            }
        }

        match token.kind {
            Kind::Punct(';') | Kind::Punct('}') => modifiers.clear(),
            Kind::Ident(word @ ("static" | "async" | "get" | "set"))
                if !punct_at(body, idx + 1, '(') && !punct_at(body, idx + 1, '=') =>
            {
                modifiers.push(word);
            }
            Kind::Punct('*') => modifiers.push("*"),
            Kind::Ident(name) if punct_at(body, idx + 1, '(') => {
                let accessor = modifiers.iter().any(|m| matches!(*m, "get" | "set"));
                if name != "constructor" && !modifiers.contains(&"static") && !accessor {
                    return Some(name);
                }
                modifiers.clear();
                idx = skip_group(body, idx + 1);
                continue;
            }
            Kind::Ident(name) if punct_at(body, idx + 1, '=') => {
                if !modifiers.contains(&"static") && is_function_expression(body, idx + 2) {
                    return Some(name);
                }
                modifiers.clear();
                in_initializer = true;
                idx += 2;
                continue;
            }
            Kind::Private => {
                modifiers.clear();
                if punct_at(body, idx + 1, '=') {
                    in_initializer = true;
                    idx += 2;
                    continue;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str) -> Entry {
        analyze(source).expect("entry point").entry
    }

    fn function(name: &str) -> Entry {
        Entry::Function { name: name.to_string() }
    }

    fn method(name: &str) -> Entry {
        Entry::ClassMethod {
            class_name: "Solution".to_string(),
            method: name.to_string(),
        }
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            entry("function twoSum(nums, target) { return [0,1]; }"),
            function("twoSum")
        );
        assert_eq!(entry("async function fetchIt() {}"), function("fetchIt"));
        assert_eq!(entry("function* gen() { yield 1; }"), function("gen"));
    }

    #[test]
    fn test_function_expression_bindings() {
        assert_eq!(entry("const multiply = (a, b) => a * b;"), function("multiply"));
        assert_eq!(entry("let double = x => x * 2;"), function("double"));
        assert_eq!(entry("var f = function (n) { return n; };"), function("f"));
        assert_eq!(entry("const g = async (n) => n;"), function("g"));
    }

    #[test]
    fn test_plain_value_binding_is_not_callable() {
        assert_eq!(
            analyze("// No valid function, just an assignment\nconst x = 5;"),
            Err(ExecutionError::CallableNotFound)
        );
        assert_eq!(analyze("const same = x == y;"), Err(ExecutionError::CallableNotFound));
        assert_eq!(analyze("this is not code"), Err(ExecutionError::CallableNotFound));
    }

    #[test]
    fn test_first_top_level_candidate_wins() {
        let source = r#"
            const MOD = 1_000_000_007;
            function helper(a) { function inner() {} return a; }
            function solve(n) { return helper(n); }
        "#;
        assert_eq!(entry(source), function("helper"));
    }

    #[test]
    fn test_nested_functions_are_ignored() {
        let source = "(function () { function hidden() {} })();\nconst run = () => 1;";
        assert_eq!(entry(source), function("run"));
    }

    #[test]
    fn test_names_in_comments_and_strings_are_ignored() {
        let source = r#"
            // function commented(a) {}
            /* class Solution { fake() {} } */
            const banner = "function quoted() {}";
            const tpl = `class Solution { ${"x"} nope() {} }`;
            const re = /function regexed\(/g;
            function real(a) { return a; }
        "#;
        assert_eq!(entry(source), function("real"));
    }

    #[test]
    fn test_class_solution_method() {
        let source = r#"
            class Solution {
                constructor() { this.memo = new Map(); }
                twoSum(nums, target) {
                    if (nums.length) { return [0, 1]; }
                    for (let i = 0; i < 2; i++) {}
                }
            }
        "#;
        assert_eq!(entry(source), method("twoSum"));
    }

    #[test]
    fn test_class_skips_static_private_and_accessors() {
        let source = r#"
            class Solution {
                static create() { return new Solution(); }
                #cache = new Map();
                #secret() {}
                get size() { return 0; }
                limit = Math.max(1, 2);
                maxArea(height) { return 0; }
            }
        "#;
        assert_eq!(entry(source), method("maxArea"));
    }

    #[test]
    fn test_class_arrow_field() {
        let source = "class Solution {\n  climbStairs = (n) => n;\n}";
        assert_eq!(entry(source), method("climbStairs"));
    }

    #[test]
    fn test_class_wins_over_helper_functions() {
        let source = "function gcd(a, b) { return b ? gcd(b, a % b) : a; }\nclass Solution { lcm(a, b) { return a * b / gcd(a, b); } }";
        assert_eq!(entry(source), method("lcm"));
    }

    #[test]
    fn test_empty_class_falls_back_to_function() {
        let source = "class Solution {}\nfunction solve() { return 1; }";
        assert_eq!(entry(source), function("solve"));
    }

    #[test]
    fn test_other_classes_are_not_entry_points() {
        let source = "class ListNode { constructor(val) { this.val = val; } next() {} }";
        assert_eq!(analyze(source), Err(ExecutionError::CallableNotFound));
    }

    #[test]
    fn test_callable_name() {
        assert_eq!(function("removeElement").callable_name(), "removeElement");
        assert_eq!(method("maxArea").callable_name(), "maxArea");
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_value(method("twoSum")).unwrap();
        assert_eq!(json["kind"], "class_method");
        assert_eq!(json["class_name"], "Solution");
        assert_eq!(json["method"], "twoSum");
    }
}
