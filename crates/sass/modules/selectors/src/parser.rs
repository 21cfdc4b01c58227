//! Hand-rolled parser for selector text.
//!
//! Turns text like `.a > .b:hover, #c` into a [`CommaSequence`]. This is a
//! selector-list parser only; it knows nothing about Sass source syntax.

use crate::SelectorError;
use crate::comma::CommaSequence;
use crate::compound::Compound;
use crate::sequence::{Combinator, Sequence, SequenceItem};
use crate::simple::{PseudoKind, SimpleSelector};
use core::iter::Peekable;
use core::str::Chars;

/// Pseudo-classes whose argument is itself a selector list.
const SELECTOR_PSEUDOS: &[&str] = &["not", "matches", "is", "where", "has", "any"];

/// Parse a comma-separated selector list.
pub fn parse_comma_sequence(text: &str) -> Result<CommaSequence, SelectorError> {
    let mut chars = text.chars().peekable();
    let mut sequences = Vec::new();
    loop {
        let (sequence, saw_comma) = parse_sequence(&mut chars)?;
        if sequence.compounds().next().is_none() {
            return Err(SelectorError::new(format!("Invalid selector: \"{text}\"")));
        }
        sequences.push(sequence);
        if !saw_comma {
            break;
        }
    }
    Ok(CommaSequence::new(sequences))
}

/// Parse one sequence, up to a comma or the end of input. Returns the
/// sequence and whether a comma was consumed.
fn parse_sequence(
    chars: &mut Peekable<Chars<'_>>,
) -> Result<(Sequence, bool), SelectorError> {
    let mut members: Vec<SequenceItem> = Vec::new();
    let mut saw_comma = false;
    loop {
        let Some(&character) = chars.peek() else {
            break;
        };
        match character {
            ',' => {
                chars.next();
                saw_comma = true;
                break;
            }
            '>' => {
                chars.next();
                members.push(SequenceItem::Combinator(Combinator::Child));
            }
            '+' => {
                chars.next();
                members.push(SequenceItem::Combinator(Combinator::NextSibling));
            }
            '~' => {
                chars.next();
                members.push(SequenceItem::Combinator(Combinator::FollowingSibling));
            }
            white if white.is_whitespace() => {
                if consume_whitespace(chars) {
                    members.push(SequenceItem::Newline);
                }
            }
            _ => {
                let compound = parse_compound(chars)?;
                members.push(SequenceItem::Compound(compound));
            }
        }
    }
    // A trailing newline marker carries no information.
    while matches!(members.last(), Some(SequenceItem::Newline)) {
        members.pop();
    }
    if matches!(members.last(), Some(SequenceItem::Combinator(_))) {
        return Err(SelectorError::new(
            "Invalid selector: expected a selector after the trailing combinator",
        ));
    }
    Ok((Sequence::new(members), saw_comma))
}

/// Consume a whitespace run, reporting whether it contained a line break.
fn consume_whitespace(chars: &mut Peekable<Chars<'_>>) -> bool {
    let mut saw_newline = false;
    while let Some(&character) = chars.peek() {
        if !character.is_whitespace() {
            break;
        }
        saw_newline |= character == '\n';
        chars.next();
    }
    saw_newline
}

/// Consume an identifier: alphanumerics, `-`, `_`, and `\`-escaped characters.
fn consume_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&character) = chars.peek() {
        let acceptable =
            character.is_alphanumeric() || character == '-' || character == '_';
        if !acceptable {
            break;
        }
        out.push(character);
        chars.next();
    }
    out
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<Compound, SelectorError> {
    let mut members: Vec<SimpleSelector> = Vec::new();
    let mut subject = false;
    loop {
        let Some(&character) = chars.peek() else {
            break;
        };
        match character {
            '&' => {
                chars.next();
                members.push(SimpleSelector::Parent);
            }
            '.' => {
                chars.next();
                members.push(SimpleSelector::Class(expect_ident(chars, "class")?));
            }
            '#' => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    members.push(parse_interpolation(chars)?);
                } else {
                    members.push(SimpleSelector::Id(expect_ident(chars, "id")?));
                }
            }
            '%' => {
                chars.next();
                members.push(SimpleSelector::Placeholder(expect_ident(
                    chars,
                    "placeholder",
                )?));
            }
            '[' => {
                members.push(parse_attribute(chars)?);
            }
            ':' => {
                members.push(parse_pseudo(chars)?);
            }
            '!' => {
                chars.next();
                subject = true;
            }
            '*' | '|' => {
                members.push(parse_namespaced_element(chars)?);
            }
            other if other.is_alphanumeric() || other == '-' || other == '_' => {
                members.push(parse_namespaced_element(chars)?);
            }
            _ => break,
        }
    }
    if members.is_empty() {
        return Err(SelectorError::new("Invalid selector: expected a selector"));
    }
    Ok(Compound::new(members, subject))
}

/// Parse `*`, `elem`, `ns|elem`, `*|*`, `|elem`, and friends.
fn parse_namespaced_element(
    chars: &mut Peekable<Chars<'_>>,
) -> Result<SimpleSelector, SelectorError> {
    let first = match chars.peek() {
        Some(&'*') => {
            chars.next();
            None
        }
        Some(&'|') => Some(String::new()),
        _ => Some(consume_ident(chars)),
    };
    if chars.peek() == Some(&'|') {
        chars.next();
        let namespace = first.unwrap_or_else(|| "*".to_owned());
        let namespace = Some(namespace);
        if chars.peek() == Some(&'*') {
            chars.next();
            return Ok(SimpleSelector::Universal { namespace });
        }
        let name = expect_ident(chars, "element")?;
        return Ok(SimpleSelector::Element { name, namespace });
    }
    match first {
        None => Ok(SimpleSelector::Universal { namespace: None }),
        Some(name) if name.is_empty() => {
            Err(SelectorError::new("Invalid selector: expected an element name"))
        }
        Some(name) => Ok(SimpleSelector::Element {
            name,
            namespace: None,
        }),
    }
}

fn expect_ident(
    chars: &mut Peekable<Chars<'_>>,
    what: &str,
) -> Result<String, SelectorError> {
    let ident = consume_ident(chars);
    if ident.is_empty() {
        return Err(SelectorError::new(format!(
            "Invalid selector: expected a {what} name"
        )));
    }
    Ok(ident)
}

/// Parse `#{...}` into an opaque interpolation member. The leading `#` has
/// already been consumed.
fn parse_interpolation(
    chars: &mut Peekable<Chars<'_>>,
) -> Result<SimpleSelector, SelectorError> {
    chars.next(); // consume '{'
    let mut depth = 1usize;
    let mut body = String::new();
    for character in chars.by_ref() {
        match character {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(SimpleSelector::Interpolation(body));
                }
            }
            _ => {}
        }
        body.push(character);
    }
    Err(SelectorError::new(
        "Invalid selector: unterminated interpolation",
    ))
}

fn parse_attribute(chars: &mut Peekable<Chars<'_>>) -> Result<SimpleSelector, SelectorError> {
    chars.next(); // consume '['
    consume_whitespace(chars);
    let mut namespace = None;
    let mut name;
    if chars.peek() == Some(&'*') {
        chars.next();
        if chars.next() != Some('|') {
            return Err(SelectorError::new(
                "Invalid selector: expected '|' after '*' in an attribute selector",
            ));
        }
        namespace = Some("*".to_owned());
        name = expect_ident(chars, "attribute")?;
    } else {
        name = expect_ident(chars, "attribute")?;
        if chars.peek() == Some(&'|') {
            chars.next();
            if chars.peek() == Some(&'=') {
                // `name|=value`: the '|' belonged to the operator.
                chars.next();
                return finish_attribute(chars, namespace, name, Some("|=".to_owned()));
            }
            namespace = Some(name);
            name = expect_ident(chars, "attribute")?;
        }
    }
    consume_whitespace(chars);
    let operator = match chars.peek() {
        Some(&'=') => {
            chars.next();
            Some("=".to_owned())
        }
        Some(&(prefix @ ('~' | '|' | '^' | '$' | '*'))) => {
            chars.next();
            if chars.next() != Some('=') {
                return Err(SelectorError::new(
                    "Invalid selector: expected '=' in an attribute operator",
                ));
            }
            Some(format!("{prefix}="))
        }
        _ => None,
    };
    finish_attribute(chars, namespace, name, operator)
}

fn finish_attribute(
    chars: &mut Peekable<Chars<'_>>,
    namespace: Option<String>,
    name: String,
    operator: Option<String>,
) -> Result<SimpleSelector, SelectorError> {
    consume_whitespace(chars);
    let value = if operator.is_some() {
        Some(parse_attribute_value(chars)?)
    } else {
        None
    };
    consume_whitespace(chars);
    let flags = {
        let flag_text = consume_ident(chars);
        if flag_text.is_empty() {
            None
        } else {
            Some(flag_text)
        }
    };
    consume_whitespace(chars);
    if chars.next() != Some(']') {
        return Err(SelectorError::new(
            "Invalid selector: unterminated attribute selector",
        ));
    }
    Ok(SimpleSelector::Attribute {
        name,
        namespace,
        operator,
        value,
        flags,
    })
}

/// An attribute value, quoted (kept verbatim, quotes included) or a bare
/// identifier.
fn parse_attribute_value(chars: &mut Peekable<Chars<'_>>) -> Result<String, SelectorError> {
    match chars.peek() {
        Some(&(quote @ ('"' | '\''))) => {
            chars.next();
            let mut out = String::new();
            out.push(quote);
            for character in chars.by_ref() {
                out.push(character);
                if character == quote {
                    return Ok(out);
                }
            }
            Err(SelectorError::new(
                "Invalid selector: unterminated attribute value",
            ))
        }
        _ => expect_ident(chars, "attribute value"),
    }
}

fn parse_pseudo(chars: &mut Peekable<Chars<'_>>) -> Result<SimpleSelector, SelectorError> {
    chars.next(); // consume ':'
    let kind = if chars.peek() == Some(&':') {
        chars.next();
        PseudoKind::Element
    } else {
        PseudoKind::Class
    };
    let name = expect_ident(chars, "pseudo-class")?;
    if chars.peek() != Some(&'(') {
        return Ok(SimpleSelector::Pseudo {
            kind,
            name,
            arg: None,
        });
    }
    let arg = consume_balanced_parens(chars)?;
    if kind == PseudoKind::Class && SELECTOR_PSEUDOS.contains(&name.as_str()) {
        let selector = parse_comma_sequence(&arg)?;
        return Ok(SimpleSelector::SelectorPseudo {
            name,
            selector: Box::new(selector),
        });
    }
    Ok(SimpleSelector::Pseudo {
        kind,
        name,
        arg: Some(arg.trim().to_owned()),
    })
}

/// Consume a balanced-parenthesis group, returning its contents without the
/// outer parentheses.
fn consume_balanced_parens(chars: &mut Peekable<Chars<'_>>) -> Result<String, SelectorError> {
    chars.next(); // consume '('
    let mut depth = 1usize;
    let mut body = String::new();
    for character in chars.by_ref() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
            }
            _ => {}
        }
        body.push(character);
    }
    Err(SelectorError::new(
        "Invalid selector: unbalanced parentheses",
    ))
}
