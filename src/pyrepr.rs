//! Reader for the `Dimensions` cells of older dataset files.
//!
//! Older harvests stored the dimensions list as a Python literal:
//! `[{'Dimensions_mm': '600\xa0x\xa0600', 'Code_IMP': "l'X1"}]`. Strings use
//! either quote style and the usual backslash escapes, so this is a small
//! recursive-descent parser rather than a quote swap feeding a JSON parser.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::DimensionsError;
use crate::models::Dimension;

/// Parse a Python list of `{'Dimensions_mm': .., 'Code_IMP': ..}` dicts.
///
/// Also accepts the JSON form, which is the same grammar with double quotes.
pub fn parse_dimension_list(raw: &str) -> Result<Vec<Dimension>, DimensionsError> {
    let mut p = Parser {
        chars: raw.char_indices().peekable(),
        len: raw.len(),
    };
    let dims = p.list()?;
    p.skip_ws();
    match p.chars.peek() {
        None => Ok(dims),
        Some(&(pos, _)) => Err(DimensionsError::new(pos, "trailing characters after list")),
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
}

impl Parser<'_> {
    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.len, |&(i, _)| i)
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, want: char, what: &'static str) -> Result<(), DimensionsError> {
        self.skip_ws();
        let pos = self.pos();
        match self.chars.next() {
            Some((_, c)) if c == want => Ok(()),
            _ => Err(DimensionsError::new(pos, what)),
        }
    }

    /// Consume `close` if it is next, otherwise require a `,`.
    fn separator_or_end(&mut self, close: char, what: &'static str) -> Result<bool, DimensionsError> {
        self.skip_ws();
        let pos = self.pos();
        match self.chars.next() {
            Some((_, c)) if c == close => Ok(true),
            Some((_, ',')) => Ok(false),
            _ => Err(DimensionsError::new(pos, what)),
        }
    }

    fn peek_is(&mut self, want: char) -> bool {
        self.skip_ws();
        matches!(self.chars.peek(), Some(&(_, c)) if c == want)
    }

    fn list(&mut self) -> Result<Vec<Dimension>, DimensionsError> {
        self.expect('[', "expected '['")?;
        let mut dims = Vec::new();
        if self.peek_is(']') {
            self.chars.next();
            return Ok(dims);
        }
        loop {
            dims.push(self.dict()?);
            if self.separator_or_end(']', "expected ',' or ']'")? {
                return Ok(dims);
            }
        }
    }

    fn dict(&mut self) -> Result<Dimension, DimensionsError> {
        self.skip_ws();
        let start = self.pos();
        self.expect('{', "expected '{'")?;
        let mut dimensions_mm = None;
        let mut code_imp = None;
        if !self.peek_is('}') {
            loop {
                self.skip_ws();
                let key_pos = self.pos();
                let key = self.string()?;
                self.expect(':', "expected ':'")?;
                let value = self.string()?;
                match key.as_str() {
                    "Dimensions_mm" => dimensions_mm = Some(value),
                    "Code_IMP" => code_imp = Some(value),
                    _ => return Err(DimensionsError::new(key_pos, "unknown key")),
                }
                if self.separator_or_end('}', "expected ',' or '}'")? {
                    break;
                }
            }
        } else {
            self.chars.next();
        }
        match (dimensions_mm, code_imp) {
            (Some(dimensions_mm), Some(code_imp)) => Ok(Dimension {
                dimensions_mm,
                code_imp,
            }),
            _ => Err(DimensionsError::new(start, "entry lacks Dimensions_mm or Code_IMP")),
        }
    }

    fn string(&mut self) -> Result<String, DimensionsError> {
        self.skip_ws();
        let pos = self.pos();
        let quote = match self.chars.next() {
            Some((_, q @ ('\'' | '"'))) => q,
            _ => return Err(DimensionsError::new(pos, "expected a quoted string")),
        };
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(DimensionsError::new(pos, "unterminated string")),
                Some((_, c)) if c == quote => return Ok(out),
                Some((esc_pos, '\\')) => out.push(self.escape(esc_pos)?),
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn escape(&mut self, pos: usize) -> Result<char, DimensionsError> {
        let c = match self.chars.next() {
            Some((_, c)) => c,
            None => return Err(DimensionsError::new(pos, "dangling backslash")),
        };
        let digits = match c {
            '\\' | '\'' | '"' => return Ok(c),
            'n' => return Ok('\n'),
            't' => return Ok('\t'),
            'r' => return Ok('\r'),
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => return Err(DimensionsError::new(pos, "unknown escape")),
        };
        let hex: String = (0..digits)
            .filter_map(|_| self.chars.next().map(|(_, c)| c))
            .collect();
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|_| hex.len() == digits)
            .and_then(char::from_u32)
            .ok_or_else(|| DimensionsError::new(pos, "invalid hex escape"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(size: &str, code: &str) -> Dimension {
        Dimension {
            dimensions_mm: size.to_string(),
            code_imp: code.to_string(),
        }
    }

    #[test]
    fn test_single_quoted_list() {
        let dims = parse_dimension_list(
            "[{'Dimensions_mm': '750 x 750', 'Code_IMP': '1234'}, {'Dimensions_mm': '900 x 900', 'Code_IMP': '5678'}]",
        )
        .unwrap();
        assert_eq!(dims, vec![dim("750 x 750", "1234"), dim("900 x 900", "5678")]);
    }

    #[test]
    fn test_hex_escape_for_non_breaking_space() {
        let dims =
            parse_dimension_list(r"[{'Dimensions_mm': '600\xa0x\xa0600', 'Code_IMP': 'X1'}]").unwrap();
        assert_eq!(dims, vec![dim("600\u{a0}x\u{a0}600", "X1")]);
    }

    #[test]
    fn test_double_quoted_value_with_apostrophe() {
        let dims =
            parse_dimension_list(r#"[{'Dimensions_mm': "600 x 600 (l'unité)", 'Code_IMP': 'X1'}]"#)
                .unwrap();
        assert_eq!(dims[0].dimensions_mm, "600 x 600 (l'unité)");
    }

    #[test]
    fn test_backslash_and_unicode_escapes() {
        let dims =
            parse_dimension_list(r"[{'Dimensions_mm': 'a\\b \'c\' é', 'Code_IMP': 'Z'}]").unwrap();
        assert_eq!(dims[0].dimensions_mm, "a\\b 'c' é");
    }

    #[test]
    fn test_json_form_and_empty_list() {
        let dims = parse_dimension_list(r#"[{"Dimensions_mm":"1","Code_IMP":"2"}]"#).unwrap();
        assert_eq!(dims, vec![dim("1", "2")]);
        assert!(parse_dimension_list(" [ ] ").unwrap().is_empty());
    }

    #[test]
    fn test_errors_report_position() {
        let err = parse_dimension_list("[{'Dimensions_mm': '1'}]").unwrap_err();
        assert_eq!(err.pos, 1);

        let err = parse_dimension_list("[{'Dimensions_mm': '1', 'Code_IMP': '2'").unwrap_err();
        assert!(err.to_string().contains("expected ',' or '}'"));

        assert!(parse_dimension_list(r"[{'Dimensions_mm': '\xZZ', 'Code_IMP': '2'}]").is_err());
        assert!(parse_dimension_list("600 x 600").is_err());
        assert!(parse_dimension_list("[] extra").is_err());
    }
}
