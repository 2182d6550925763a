//! Processes character streams into tokens.
//!
//! This is the lowest-level scanner in the tag layer (§4.2 of the design spec's line grammar).
//! It is deliberately dialect-agnostic: it recognizes the universal shape of a GEDCOM line
//! (`LEVEL DELIM (@XREF@ DELIM)? TAG (DELIM (@POINTER@ | PAYLOAD))? LINESEP`) one token at a
//! time. Dialect-specific alphabet and line-length constraints are enforced one layer up, in
//! [`crate::tag::parse`], which is what actually knows whether it is parsing 5.x or 7 text.
use crate::GedcomError;
use std::str::Chars;

/// The base enum of Token types making use of the GEDCOM line grammar: `level + delim +
/// [optional_xref_ID] + tag + [optional_line_value] + terminator`.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// The `level`, denoting the depth within the tree.
    Level(u8),
    /// The `tag`, identifying the structure kind on this line.
    Tag(String),
    /// The value of the data: `optional_line_value`.
    LineValue(String),
    /// The `optional_xref_ID` used throughout the file to refer to a particular structure.
    Pointer(String),
    /// A user-defined/extension tag (conventionally begins with an underscore).
    CustomTag(String),
    /// End-of-file indicator.
    EOF,
    /// The initial token value, indicating nothing has been scanned yet.
    None,
}

/// The tokenizer that turns GEDCOM characters into a stream of tokens.
pub struct Tokenizer<'a> {
    /// The active token.
    pub current_token: Token,
    /// Current character the tokenizer is examining.
    current_char: char,
    /// An iterator over the characters of the GEDCOM source text.
    chars: Chars<'a>,
    /// The current line number of the file being parsed (1-based once scanning begins).
    pub line: u32,
    /// Whether the level number just scanned carried a leading zero (e.g. `00 HEAD`). Checked
    /// by the tag layer against `Dialect::zeros`.
    pub last_level_had_leading_zero: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a new tokenizer over a character iterator, consuming a leading BOM if present.
    #[must_use]
    pub fn new(mut chars: Chars<'a>) -> Tokenizer<'a> {
        // A BOM surfaces to a `Chars` iterator as U+FEFF; drop it before scanning begins.
        let mut peek = chars.clone();
        if peek.next() == Some('\u{feff}') {
            chars = peek;
        }
        Tokenizer {
            current_char: '\n',
            current_token: Token::None,
            chars,
            line: 0,
            last_level_had_leading_zero: false,
        }
    }

    /// Ends the tokenization.
    #[must_use]
    pub fn done(&self) -> bool {
        self.current_token == Token::EOF
    }

    /// Loads the next token into state.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    pub fn next_token(&mut self) -> Result<(), GedcomError> {
        if self.current_char == '\0' {
            self.current_token = Token::EOF;
            return Ok(());
        }

        // level number is at the start of each line; CRLF, bare CR, and bare LF all terminate a
        // line.
        if self.current_char == '\r' {
            self.next_char();
            if self.current_char == '\n' {
                self.next_char();
            }
            self.current_token = Token::Level(self.extract_number()?);
            self.line += 1;
            return Ok(());
        }
        if self.current_char == '\n' {
            self.next_char();

            self.current_token = Token::Level(self.extract_number()?);
            self.line += 1;
            return Ok(());
        }

        self.skip_whitespace();

        // handle tag with trailing whitespace
        if self.current_char == '\n' || self.current_char == '\r' {
            self.next_token()?;
            return Ok(());
        }

        self.current_token = match self.current_token {
            Token::Level(_) => {
                if self.current_char == '@' {
                    Token::Pointer(self.extract_word())
                } else if self.current_char == '_' {
                    Token::CustomTag(self.extract_word())
                } else {
                    Token::Tag(self.extract_word())
                }
            }
            Token::Pointer(_) => Token::Tag(self.extract_word()),
            Token::Tag(_) | Token::CustomTag(_) => Token::LineValue(self.extract_value()),
            _ => {
                return Err(GedcomError::InvalidToken {
                    line: self.line,
                    token: format!("{:?}", self.current_token),
                });
            }
        };
        Ok(())
    }

    /// Like `next_token`, but returns a clone of the token it pops.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if tokenization fails.
    pub fn take_token(&mut self) -> Result<Token, GedcomError> {
        let current_token = self.current_token.clone();
        self.next_token()?;
        Ok(current_token)
    }

    fn next_char(&mut self) {
        self.current_char = self.chars.next().unwrap_or('\0');
    }

    fn extract_number(&mut self) -> Result<u8, GedcomError> {
        self.skip_whitespace();
        let mut digits: Vec<char> = Vec::new();
        while self.current_char.is_ascii_digit() {
            digits.push(self.current_char);
            self.next_char();
        }

        self.last_level_had_leading_zero = digits.len() > 1 && digits[0] == '0';

        digits
            .iter()
            .collect::<String>()
            .parse::<u8>()
            .map_err(|_| GedcomError::InvalidValueFormat {
                line: self.line,
                tag: format!("{:?}", self.current_token),
                value: digits.iter().collect::<String>(),
            })
    }

    fn extract_word(&mut self) -> String {
        let mut letters: Vec<char> = Vec::new();
        while !self.current_char.is_whitespace() && self.current_char != '\0' {
            letters.push(self.current_char);
            self.next_char();
        }

        letters.iter().collect::<String>()
    }

    fn extract_value(&mut self) -> String {
        let mut letters: Vec<char> = Vec::new();
        while self.current_char != '\n' && self.current_char != '\r' && self.current_char != '\0'
        {
            letters.push(self.current_char);
            self.next_char();
        }

        letters.iter().collect::<String>()
    }

    fn skip_whitespace(&mut self) {
        while self.is_nonnewline_whitespace() {
            self.next_char();
        }
    }

    fn is_nonnewline_whitespace(&self) -> bool {
        let is_zero_width_space = self.current_char as u32 == 0xFEFF;
        let not_a_newline = self.current_char != '\n' && self.current_char != '\r';
        (self.current_char.is_whitespace() || is_zero_width_space) && not_a_newline
    }

    /// Debug function displaying the GEDCOM line number for error messages.
    #[must_use]
    pub fn debug(&self) -> String {
        format!("line {}:", self.line)
    }

    /// Grabs and returns the rest of the current line as a `String`.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if an unexpected line value is encountered.
    pub fn take_line_value(&mut self) -> Result<String, GedcomError> {
        let mut value = String::new();
        self.next_token()?;

        match &self.current_token {
            Token::LineValue(val) => {
                value = val.to_string();
                self.next_token()?;
            }
            // gracefully handle an attempt to take a value from a valueless line
            Token::Level(_) | Token::EOF => (),
            _ => {
                return Err(GedcomError::InvalidToken {
                    line: self.line,
                    token: format!("{:?}", self.current_token),
                });
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_leading_bom() {
        let source = "\u{feff}0 HEAD";
        let mut tokenizer = Tokenizer::new(source.chars());
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(0));
    }

    #[test]
    fn accepts_bare_cr_line_endings() {
        let source = "0 HEAD\r1 GEDC";
        let mut tokenizer = Tokenizer::new(source.chars());
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(0));
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Tag("HEAD".to_string()));
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(1));
    }

    #[test]
    fn flags_leading_zero_on_level() {
        let source = "00 HEAD";
        let mut tokenizer = Tokenizer::new(source.chars());
        tokenizer.next_token().unwrap();
        assert_eq!(tokenizer.current_token, Token::Level(0));
        assert!(tokenizer.last_level_had_leading_zero);
    }
}
