//! Extraction of dependency names from the text of a callable's declaration.
//!
//! Supported shapes:
//! - closures: `|s1, s2: Arc<u32>| ...`, `move |s1| ...`, `|| ...`
//! - functions: `fn name(s1: u32, s2: u32)`, `function (s1, s2) { ... }`
//! - arrows: `(s1, s2) => ...` and the bare single-parameter form `s1 => ...`
//!
//! Block (`/* */`) and line (`//`) comments are ignored anywhere in the declaration.

use alloc::{string::String, sync::Arc, vec::Vec};

use crate::{
    errors::ParseErrorKind,
    names::{is_identifier_char, is_parameter_name},
};

const PRELUDE_KEYWORDS: [&str; 4] = ["async", "move", "fn", "function"];

/// Parses the ordered parameter names of `declaration`.
///
/// # Errors
/// - Returns [`ParseErrorKind::NoParameterList`] if neither a delimited parameter list nor a `=>` arrow is found
/// - Returns [`ParseErrorKind::InvalidParameter`] if a parameter isn't a plain name (a destructuring pattern, for example)
pub fn parse_parameter_names(declaration: &str) -> Result<Vec<Arc<str>>, ParseErrorKind> {
    let source = strip_comments(declaration);
    let rest = skip_prelude(&source);

    let list = match rest.chars().next() {
        Some('(') => delimited(rest),
        Some('|') => rest[1..].find('|').map(|end| &rest[1..=end]),
        _ => None,
    };

    match list {
        Some(list) => split_parameters(declaration, list),
        None => arrow_parameter(declaration, rest),
    }
}

fn strip_comments(declaration: &str) -> String {
    let mut source = String::with_capacity(declaration.len());
    let mut rest = declaration;

    loop {
        let block = rest.find("/*");
        let line = rest.find("//");
        match (block, line) {
            (Some(start), line) if line.map_or(true, |line| start < line) => {
                source.push_str(&rest[..start]);
                // Comments separate tokens the same way whitespace does
                source.push(' ');
                rest = match rest[start + 2..].find("*/") {
                    Some(end) => &rest[start + 2 + end + 2..],
                    None => "",
                };
            }
            (_, Some(start)) => {
                source.push_str(&rest[..start]);
                source.push(' ');
                rest = match rest[start..].find('\n') {
                    Some(end) => &rest[start + end..],
                    None => "",
                };
            }
            (_, None) => {
                source.push_str(rest);
                return source;
            }
        }
    }
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if is_identifier_char(c) || c == '$' => None,
        _ => Some(rest),
    }
}

/// Skips `async`, `move`, `fn`/`function`, the function name and its generic parameters.
fn skip_prelude(source: &str) -> &str {
    let mut rest = source.trim_start();

    while let Some((keyword, after)) = PRELUDE_KEYWORDS
        .iter()
        .find_map(|keyword| strip_keyword(rest, keyword).map(|after| (*keyword, after)))
    {
        rest = after.trim_start();
        if keyword == "fn" || keyword == "function" {
            let name_len = rest.find(|c: char| !(is_identifier_char(c) || c == '$')).unwrap_or(rest.len());
            rest = rest[name_len..].trim_start();
            if rest.starts_with('<') {
                rest = skip_generics(rest).trim_start();
            }
        }
    }

    rest
}

fn skip_generics(text: &str) -> &str {
    let mut depth = 0usize;
    let mut previous = ' ';
    for (index, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            // `Fn() -> T` in a bound
            '>' if previous == '-' => {}
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[index + 1..];
                }
            }
            _ => {}
        }
        previous = c;
    }
    text
}

/// Returns the contents of the parenthesized group `text` starts with.
fn delimited(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[1..index]);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_parameters(declaration: &str, list: &str) -> Result<Vec<Arc<str>>, ParseErrorKind> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut previous = ' ';

    for (index, c) in list.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            // `->` and `=>` inside a type or a default value aren't closing brackets
            '>' if previous == '-' || previous == '=' => {}
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
        previous = c;
    }
    tokens.push(&list[start..]);

    if tokens.last().is_some_and(|token| token.trim().is_empty()) {
        tokens.pop();
    }

    tokens.into_iter().map(|token| parameter_name(declaration, token)).collect()
}

fn parameter_name(declaration: &str, token: &str) -> Result<Arc<str>, ParseErrorKind> {
    let mut name = token.trim();
    if let Some(rest) = strip_keyword(name, "mut") {
        name = rest.trim_start();
    }
    if let Some((pattern, _annotation)) = name.split_once(':') {
        name = pattern.trim_end();
    }
    if let Some((pattern, _default)) = name.split_once('=') {
        name = pattern.trim_end();
    }

    if is_parameter_name(name) {
        Ok(Arc::from(name))
    } else {
        Err(ParseErrorKind::InvalidParameter {
            declaration: Arc::from(declaration),
            parameter: Arc::from(token.trim()),
        })
    }
}

/// Recovers the single parameter of an arrow written without parentheses: `s1 => ...`.
///
/// `source` has its comments and leading keywords already removed.
fn arrow_parameter(declaration: &str, source: &str) -> Result<Vec<Arc<str>>, ParseErrorKind> {
    let Some(arrow) = source.find("=>") else {
        return Err(ParseErrorKind::NoParameterList {
            declaration: Arc::from(declaration),
        });
    };

    let name = source[..arrow].trim();
    if name.is_empty() {
        return Err(ParseErrorKind::NoParameterList {
            declaration: Arc::from(declaration),
        });
    }
    if !is_parameter_name(name) {
        return Err(ParseErrorKind::InvalidParameter {
            declaration: Arc::from(declaration),
            parameter: Arc::from(name),
        });
    }

    Ok(alloc::vec![Arc::from(name)])
}
