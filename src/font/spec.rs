//! Font specifications in CSS `font` shorthand form.
//!
//! The same string format is used to request a font load, to check whether a
//! face is available, and to select the face a canvas draws with, e.g.
//! `500 90px "Zen Maru Gothic", sans-serif`.

use std::fmt;
use std::str::FromStr;

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};

use crate::{Error, Result};

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
];

/// Returns true for CSS generic family keywords such as `sans-serif`.
pub fn is_generic_family(name: &str) -> bool {
    GENERIC_FAMILIES
        .iter()
        .any(|g| g.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// A parsed font shorthand: style, weight, pixel size and an ordered family list.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub style: FontStyle,
    pub weight: u16,
    pub size_px: f32,
    pub families: Vec<String>,
}

impl FontSpec {
    pub fn new(weight: u16, size_px: f32, family: impl Into<String>) -> Self {
        Self {
            style: FontStyle::Normal,
            weight,
            size_px,
            families: vec![family.into()],
        }
    }

    /// Append a fallback family to the end of the family list.
    pub fn with_fallback(mut self, family: impl Into<String>) -> Self {
        self.families.push(family.into());
        self
    }

    /// Same face at a different size.
    pub fn with_size(&self, size_px: f32) -> Self {
        Self {
            size_px,
            ..self.clone()
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let mut css = ParserInput::new(input);
        let mut parser = Parser::new(&mut css);
        parser.parse_entirely(parse_shorthand).map_err(|e| {
            let why = match e.kind {
                ParseErrorKind::Custom(why) => why,
                ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "missing family",
                ParseErrorKind::Basic(_) => "unexpected token",
            };
            Error::InvalidFontSpec(format!("{why}: {input:?}"))
        })
    }
}

impl FromStr for FontSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.style == FontStyle::Italic {
            write!(f, "italic ")?;
        }
        if self.size_px.fract() == 0.0 {
            write!(f, "{} {}px ", self.weight, self.size_px as i64)?;
        } else {
            write!(f, "{} {}px ", self.weight, self.size_px)?;
        }
        for (i, family) in self.families.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if is_generic_family(family) {
                write!(f, "{family}")?;
            } else {
                write!(f, "\"{family}\"")?;
            }
        }
        Ok(())
    }
}

type ParseResult<'i, T> = std::result::Result<T, ParseError<'i, &'static str>>;

// [style] [weight] <size>[/<line-height>] <family>[, <family>]*
fn parse_shorthand<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, FontSpec> {
    let mut style = FontStyle::Normal;
    let mut weight = 400u16;

    let size_px = loop {
        let token = parser.next()?.clone();
        match token {
            Token::Dimension { value, ref unit, .. } if unit.eq_ignore_ascii_case("px") => {
                break value;
            }
            Token::Number {
                int_value: Some(n), ..
            } if (1..=1000).contains(&n) => weight = n as u16,
            Token::Ident(ref name) => match name.to_ascii_lowercase().as_str() {
                "normal" | "small-caps" => {}
                "italic" | "oblique" => style = FontStyle::Italic,
                "bold" => weight = 700,
                _ => return Err(parser.new_custom_error("unexpected token before size")),
            },
            _ => return Err(parser.new_custom_error("unexpected token before size")),
        }
    };
    if !(size_px > 0.0) {
        return Err(parser.new_custom_error("size must be positive"));
    }

    // Line height has no effect on a single line of canvas text.
    if parser.try_parse(|p| p.expect_delim('/')).is_ok() {
        let token = parser.next()?.clone();
        match token {
            Token::Number { .. } | Token::Dimension { .. } | Token::Percentage { .. } => {}
            Token::Ident(ref name) if name.eq_ignore_ascii_case("normal") => {}
            _ => return Err(parser.new_custom_error("invalid line height")),
        }
    }

    let families = parser.parse_comma_separated(parse_family)?;
    Ok(FontSpec {
        style,
        weight,
        size_px,
        families,
    })
}

// A quoted name, or a run of identifiers joined by single spaces.
fn parse_family<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, String> {
    let start = parser.position();
    if let Ok(name) = parser.try_parse(|p| p.expect_string_cloned()) {
        if !is_terminated(parser.slice_from(start)) {
            return Err(parser.new_custom_error("unterminated family name"));
        }
        return Ok(name.to_string());
    }

    let mut words = vec![parser.expect_ident()?.to_string()];
    while let Ok(word) = parser.try_parse(|p| p.expect_ident_cloned()) {
        words.push(word.to_string());
    }
    Ok(words.join(" "))
}

// The tokenizer closes strings at end of input; the source must not.
fn is_terminated(raw: &str) -> bool {
    let raw = raw.trim_start();
    match (raw.chars().next(), raw.chars().last()) {
        (Some(open), Some(close)) => raw.len() >= 2 && open == close,
        _ => false,
    }
}
