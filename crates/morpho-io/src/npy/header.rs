//! Parser for the Python dict literal in a `.npy` header.

use std::iter::Peekable;
use std::str::Chars;

/// A parsed header: one descriptor per record field, plus layout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Header {
    pub(crate) fields: Vec<FieldDescr>,
    pub(crate) fortran_order: bool,
    pub(crate) shape: Vec<usize>,
}

/// A `(name, dtype)` entry of a record `descr`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldDescr {
    pub(crate) name: String,
    pub(crate) dtype: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Seq(Vec<Literal>),
    Dict(Vec<(String, Literal)>),
}

/// Parse the header text. The error is a human-readable reason.
pub(crate) fn parse(text: &str) -> Result<Header, String> {
    let mut parser = Parser {
        chars: text.chars().peekable(),
    };
    let value = parser.value()?;
    parser.skip_ws();
    if let Some(c) = parser.chars.peek() {
        return Err(format!("trailing character {c:?} after header dict"));
    }
    let Literal::Dict(entries) = value else {
        return Err("header is not a dict".into());
    };
    let lookup = |key: &str| {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| format!("missing key '{key}'"))
    };

    let fields = match lookup("descr")? {
        Literal::Seq(items) => items.iter().map(field_descr).collect::<Result<Vec<_>, _>>()?,
        Literal::Str(plain) => return Err(format!("expected a structured dtype, found plain dtype '{plain}'")),
        _ => return Err("'descr' must be a list of fields".into()),
    };
    if fields.is_empty() {
        return Err("structured dtype has no fields".into());
    }

    let Literal::Bool(fortran_order) = lookup("fortran_order")? else {
        return Err("'fortran_order' must be True or False".into());
    };

    let shape = match lookup("shape")? {
        Literal::Seq(dims) => dims
            .iter()
            .map(|d| match d {
                Literal::Int(n) => usize::try_from(*n).map_err(|_| format!("negative dimension {n}")),
                _ => Err("'shape' must hold integers".into()),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err("'shape' must be a tuple".into()),
    };

    Ok(Header {
        fields,
        fortran_order: *fortran_order,
        shape,
    })
}

fn field_descr(item: &Literal) -> Result<FieldDescr, String> {
    let Literal::Seq(parts) = item else {
        return Err("each field must be a (name, dtype) tuple".into());
    };
    let name = match parts.first() {
        Some(Literal::Str(name)) => name.clone(),
        // (title, name) pairs
        Some(Literal::Seq(titled)) => match titled.as_slice() {
            [_, Literal::Str(name)] => name.clone(),
            _ => return Err("malformed titled field name".into()),
        },
        _ => return Err("field name must be a string".into()),
    };
    match parts.as_slice() {
        [_, Literal::Str(dtype)] => Ok(FieldDescr {
            name,
            dtype: dtype.clone(),
        }),
        [_, _, _] => Err(format!("subarray field '{name}' is not supported")),
        [_, _] => Err(format!("nested dtype in field '{name}' is not supported")),
        _ => Err(format!("field '{name}' must be a (name, dtype) tuple")),
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        self.skip_ws();
        match self.chars.next() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!("expected {want:?}, found {c:?}")),
            None => Err(format!("expected {want:?}, found end of header")),
        }
    }

    fn value(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('\'' | '"') => self.string().map(Literal::Str),
            Some('(') => self.sequence('(', ')'),
            Some('[') => self.sequence('[', ']'),
            Some('{') => self.dict(),
            Some(c) if c.is_ascii_digit() || c == '-' => self.int(),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(c) => Err(format!("unexpected character {c:?}")),
            None => Err("unexpected end of header".into()),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let Some(quote) = self.chars.next() else {
            return Err("unexpected end of header".into());
        };
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => return Err("unterminated string".into()),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err("unterminated string".into()),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Literal, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if_eq(&close).is_some() {
                break;
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.chars.next() {
                Some(',') => {}
                Some(c) if c == close => break,
                Some(c) => return Err(format!("expected ',' or {close:?}, found {c:?}")),
                None => return Err(format!("unclosed {open:?}")),
            }
        }
        Ok(Literal::Seq(items))
    }

    fn dict(&mut self) -> Result<Literal, String> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if_eq(&'}').is_some() {
                break;
            }
            let Literal::Str(key) = self.value()? else {
                return Err("dict keys must be strings".into());
            };
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.chars.next() {
                Some(',') => {}
                Some('}') => break,
                Some(c) => return Err(format!("expected ',' or '}}', found {c:?}")),
                None => return Err("unclosed '{'".into()),
            }
        }
        Ok(Literal::Dict(entries))
    }

    fn int(&mut self) -> Result<Literal, String> {
        let mut digits = String::new();
        if let Some(sign) = self.chars.next_if_eq(&'-') {
            digits.push(sign);
        }
        while let Some(d) = self.chars.next_if(char::is_ascii_digit) {
            digits.push(d);
        }
        // Python 2 long suffix
        self.chars.next_if(|c| matches!(c, 'L' | 'l'));
        digits
            .parse()
            .map(Literal::Int)
            .map_err(|_| format!("invalid integer '{digits}'"))
    }

    fn word(&mut self) -> Result<Literal, String> {
        let mut word = String::new();
        while let Some(c) = self.chars.next_if(char::is_ascii_alphanumeric) {
            word.push(c);
        }
        match word.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            other => Err(format!("unknown identifier '{other}'")),
        }
    }
}
