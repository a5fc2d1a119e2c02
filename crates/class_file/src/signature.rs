// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7.9.1

use std::fmt;

use crate::{descriptor::BaseType, ClassFileError, Result};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TypeSignature {
    Base(BaseType),
    /// `Outer<A>.Inner<B>` is stored as one entry per `.` separated segment.
    Class(Vec<SimpleClassType>),
    TypeVariable(String),
    Array(Box<TypeSignature>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SimpleClassType {
    /// Internal form name, `java/util/Map` or just `Entry` for an inner segment.
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TypeArgument {
    Any,
    Extends(TypeSignature),
    Super(TypeSignature),
    Exact(TypeSignature),
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Base(base) => f.write_str(base.name()),
            TypeSignature::TypeVariable(name) => f.write_str(name),
            TypeSignature::Array(component) => write!(f, "{}[]", component),
            TypeSignature::Class(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for SimpleClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name.replace('/', "."))?;
        if !self.type_arguments.is_empty() {
            f.write_str("<")?;
            write_joined(f, &self.type_arguments)?;
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Any => f.write_str("?"),
            TypeArgument::Extends(bound) => write!(f, "? extends {}", bound),
            TypeArgument::Super(bound) => write!(f, "? super {}", bound),
            TypeArgument::Exact(t) => write!(f, "{}", t),
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

struct SignatureParser<'a> {
    input: &'a str,
    pos: usize,
}
impl<'a> SignatureParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn invalid(&self) -> ClassFileError {
        ClassFileError::InvalidSignature(self.input.to_owned())
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn next(&mut self) -> Result<u8> {
        let c = self.peek().ok_or_else(|| self.invalid())?;
        self.pos += 1;
        Ok(c)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        match self.next()? {
            c if c == expected => Ok(()),
            _ => Err(self.invalid()),
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        match self.next()? {
            b'[' => Ok(TypeSignature::Array(Box::new(self.parse_type()?))),
            b'L' => self.parse_class_type(),
            b'T' => {
                let name = self.parse_identifier()?;
                self.expect(b';')?;
                Ok(TypeSignature::TypeVariable(name.to_owned()))
            }
            c => BaseType::from_char(c)
                .map(TypeSignature::Base)
                .ok_or_else(|| self.invalid()),
        }
    }

    /// Everything after the `L` of `Lpkg/Outer<..>.Inner<..>;`.
    fn parse_class_type(&mut self) -> Result<TypeSignature> {
        let mut segments = vec![self.parse_simple_class_type()?];
        loop {
            match self.next()? {
                b';' => return Ok(TypeSignature::Class(segments)),
                b'.' => segments.push(self.parse_simple_class_type()?),
                _ => return Err(self.invalid()),
            }
        }
    }

    fn parse_simple_class_type(&mut self) -> Result<SimpleClassType> {
        let name = self.parse_identifier()?.to_owned();
        let mut type_arguments = Vec::new();
        if self.peek() == Some(b'<') {
            self.pos += 1;
            while self.peek() != Some(b'>') {
                type_arguments.push(self.parse_type_argument()?);
            }
            self.pos += 1;
            if type_arguments.is_empty() {
                return Err(self.invalid());
            }
        }

        Ok(SimpleClassType {
            name,
            type_arguments,
        })
    }

    fn parse_type_argument(&mut self) -> Result<TypeArgument> {
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(TypeArgument::Any)
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(TypeArgument::Extends(self.parse_type()?))
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(TypeArgument::Super(self.parse_type()?))
            }
            _ => Ok(TypeArgument::Exact(self.parse_type()?)),
        }
    }

    /// Consumes a non-empty run of characters up to the next delimiter.
    fn parse_identifier(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let len = self.input.as_bytes()[start..]
            .iter()
            .take_while(|&&b| !b"<>;.:".contains(&b))
            .count();
        if len == 0 {
            return Err(self.invalid());
        }
        self.pos += len;
        Ok(&self.input[start..start + len])
    }
}

/// Parses a field or type signature such as `Ljava/util/Map<TK;[I>;`.
pub fn parse_signature(signature: &str) -> Result<TypeSignature> {
    let mut parser = SignatureParser::new(signature);
    let parsed = parser.parse_type()?;
    if !parser.is_at_end() {
        return Err(parser.invalid());
    }
    Ok(parsed)
}

/// Renders a signature the way Java source spells it.
///
/// `Ljava/util/HashMap<Ljava/lang/String;Ljava/lang/Integer;>;` becomes
/// `java.util.HashMap<java.lang.String, java.lang.Integer>`. Several types written back to back
/// are rendered as a comma separated list. Array brackets follow the whole element type, so
/// `[Ljava/util/List<Ljava/lang/String;>;` becomes `java.util.List<java.lang.String>[]`.
pub fn render_signature(signature: &str) -> Result<String> {
    let mut parser = SignatureParser::new(signature);
    let mut types = Vec::new();
    while !parser.is_at_end() {
        types.push(parser.parse_type()?);
    }
    if types.is_empty() {
        return Err(parser.invalid());
    }

    Ok(types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", "))
}
