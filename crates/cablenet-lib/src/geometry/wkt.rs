//! Well-Known Text reading and writing for the network geometry types
//!
//! Supported inputs:
//! - `POINT (x y)`, `POINT Z (x y z)`, `POINT EMPTY`
//! - `LINESTRING [Z] (x y [z], ...)`, `LINESTRING EMPTY`
//! - `MULTILINESTRING [Z] ((x y [z], ...), ...)`, `MULTILINESTRING EMPTY`
//!
//! Keywords are case-insensitive. Planar coordinates get a zero height, and a geometry may not
//! mix planar and 3D coordinates. Output is always written with the `Z` tag.

use super::{Coord3, LineGeometry, LineString3, MultiLineString3};
use std::fmt::Write as _;
use std::str::FromStr;

/// WKT parse errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WktError {
    #[error("Unexpected end of input")]
    UnexpectedEnd,

    #[error("Expected {expected} at offset {offset}, found '{found}'")]
    Unexpected {
        found: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Expected a {expected}, found a {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Geometry mixes 2D and 3D coordinates")]
    MixedDimensions,
}

/// Any geometry that can be read from WKT
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry3 {
    Point(Option<Coord3>),
    LineString(LineString3),
    MultiLineString(MultiLineString3),
}

impl Geometry3 {
    fn kind(&self) -> &'static str {
        match self {
            Geometry3::Point(_) => "POINT",
            Geometry3::LineString(_) => "LINESTRING",
            Geometry3::MultiLineString(_) => "MULTILINESTRING",
        }
    }
}

impl FromStr for Geometry3 {
    type Err = WktError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse any supported geometry
pub fn parse(input: &str) -> Result<Geometry3, WktError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        dimensions: None,
    };
    let geometry = parser.geometry()?;
    parser.finish()?;
    Ok(geometry)
}

/// Parse a `POINT`, `None` for `POINT EMPTY`
pub fn parse_point(input: &str) -> Result<Option<Coord3>, WktError> {
    match parse(input)? {
        Geometry3::Point(point) => Ok(point),
        other => Err(WktError::WrongType {
            expected: "POINT",
            found: other.kind(),
        }),
    }
}

pub fn parse_line_string(input: &str) -> Result<LineString3, WktError> {
    match parse(input)? {
        Geometry3::LineString(line) => Ok(line),
        other => Err(WktError::WrongType {
            expected: "LINESTRING",
            found: other.kind(),
        }),
    }
}

/// Parse a `MULTILINESTRING`, a single `LINESTRING` is promoted to a one-part collection
pub fn parse_multi_line_string(input: &str) -> Result<MultiLineString3, WktError> {
    match parse(input)? {
        Geometry3::MultiLineString(multi) => Ok(multi),
        Geometry3::LineString(line) => Ok(MultiLineString3::from(line)),
        other => Err(WktError::WrongType {
            expected: "MULTILINESTRING",
            found: other.kind(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Number(f64),
    Open,
    Close,
    Comma,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Word(word) => (*word).to_string(),
            Token::Number(value) => value.to_string(),
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token<'_>, usize)>, WktError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'(' => {
                tokens.push((Token::Open, i));
                i += 1;
            }
            b')' => {
                tokens.push((Token::Close, i));
                i += 1;
            }
            b',' => {
                tokens.push((Token::Comma, i));
                i += 1;
            }
            b'0'..=b'9' | b'-' | b'+' | b'.' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i], b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
                {
                    i += 1;
                }
                let text = &input[start..i];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| WktError::InvalidNumber(text.to_string()))?;
                tokens.push((Token::Number(value), start));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push((Token::Word(&input[start..i]), start));
            }
            _ => {
                // Report the full (possibly multi-byte) character
                let found = input[i..].chars().next().map(String::from).unwrap_or_default();
                return Err(WktError::Unexpected {
                    found,
                    offset: i,
                    expected: "a keyword, number or delimiter",
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, usize)>,
    pos: usize,
    /// Coordinate dimension fixed by the `Z` tag or by the first coordinate
    dimensions: Option<usize>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn next(&mut self) -> Result<(Token<'a>, usize), WktError> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or(WktError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token<'static>, name: &'static str) -> Result<(), WktError> {
        let (token, offset) = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(WktError::Unexpected {
                found: token.describe(),
                offset,
                expected: name,
            })
        }
    }

    /// Consume `word` if it is the next token
    fn eat_keyword(&mut self, word: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(word) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn finish(&self) -> Result<(), WktError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some((token, offset)) => Err(WktError::Unexpected {
                found: token.describe(),
                offset: *offset,
                expected: "end of input",
            }),
        }
    }

    fn geometry(&mut self) -> Result<Geometry3, WktError> {
        let (token, offset) = self.next()?;
        let keyword = match token {
            Token::Word(word) => word.to_ascii_uppercase(),
            other => {
                return Err(WktError::Unexpected {
                    found: other.describe(),
                    offset,
                    expected: "a geometry keyword",
                });
            }
        };

        if self.eat_keyword("Z") {
            self.dimensions = Some(3);
        }

        match keyword.as_str() {
            "POINT" => {
                if self.eat_keyword("EMPTY") {
                    return Ok(Geometry3::Point(None));
                }
                self.expect(Token::Open, "'('")?;
                let coord = self.coord()?;
                self.expect(Token::Close, "')'")?;
                Ok(Geometry3::Point(Some(coord)))
            }
            "LINESTRING" => Ok(Geometry3::LineString(self.line_body()?)),
            "MULTILINESTRING" => {
                if self.eat_keyword("EMPTY") {
                    return Ok(Geometry3::MultiLineString(MultiLineString3::default()));
                }
                self.expect(Token::Open, "'('")?;
                let mut parts = vec![self.line_body()?];
                while self.peek() == Some(Token::Comma) {
                    self.pos += 1;
                    parts.push(self.line_body()?);
                }
                self.expect(Token::Close, "')' or ','")?;
                Ok(Geometry3::MultiLineString(MultiLineString3::new(parts)))
            }
            _ => Err(WktError::Unexpected {
                found: keyword,
                offset,
                expected: "POINT, LINESTRING or MULTILINESTRING",
            }),
        }
    }

    fn line_body(&mut self) -> Result<LineString3, WktError> {
        if self.eat_keyword("EMPTY") {
            return Ok(LineString3::default());
        }
        self.expect(Token::Open, "'('")?;
        let mut coords = vec![self.coord()?];
        while self.peek() == Some(Token::Comma) {
            self.pos += 1;
            coords.push(self.coord()?);
        }
        self.expect(Token::Close, "')' or ','")?;
        Ok(LineString3::new(coords))
    }

    fn coord(&mut self) -> Result<Coord3, WktError> {
        let mut values = [0.0; 3];
        let mut count = 0;
        while let Some(Token::Number(value)) = self.peek() {
            if count == 3 {
                let (token, offset) = self.tokens[self.pos];
                return Err(WktError::Unexpected {
                    found: token.describe(),
                    offset,
                    expected: "at most three ordinates",
                });
            }
            values[count] = value;
            count += 1;
            self.pos += 1;
        }

        if count < 2 {
            let (token, offset) = self.next()?;
            return Err(WktError::Unexpected {
                found: token.describe(),
                offset,
                expected: "a number",
            });
        }
        match self.dimensions {
            Some(dimensions) if dimensions != count => return Err(WktError::MixedDimensions),
            Some(_) => {}
            None => self.dimensions = Some(count),
        }

        Ok(Coord3::new(values[0], values[1], values[2]))
    }
}

/// Serialization to WKT
pub trait ToWkt {
    fn to_wkt(&self) -> String;
}

fn write_coords(out: &mut String, coords: &[Coord3]) {
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {} {}", c.x, c.y, c.z);
    }
    out.push(')');
}

impl ToWkt for Coord3 {
    fn to_wkt(&self) -> String {
        format!("POINT Z ({} {} {})", self.x, self.y, self.z)
    }
}

impl ToWkt for LineString3 {
    fn to_wkt(&self) -> String {
        if self.is_empty() {
            return "LINESTRING Z EMPTY".to_string();
        }
        let mut out = String::from("LINESTRING Z ");
        write_coords(&mut out, self.coords());
        out
    }
}

impl ToWkt for MultiLineString3 {
    fn to_wkt(&self) -> String {
        if self.is_empty() {
            return "MULTILINESTRING Z EMPTY".to_string();
        }
        let mut out = String::from("MULTILINESTRING Z (");
        for (i, part) in self.parts().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_coords(&mut out, part.coords());
        }
        out.push(')');
        out
    }
}

impl ToWkt for LineGeometry {
    fn to_wkt(&self) -> String {
        match self {
            LineGeometry::Line(line) => line.to_wkt(),
            LineGeometry::MultiLine(multi) => multi.to_wkt(),
        }
    }
}
