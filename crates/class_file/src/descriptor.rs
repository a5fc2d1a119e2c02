// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.3

use std::{fmt, str::FromStr};

use crate::{ClassFileError, Result};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}
impl BaseType {
    pub fn from_char(c: u8) -> Option<Self> {
        Some(match c {
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'D' => BaseType::Double,
            b'F' => BaseType::Float,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'S' => BaseType::Short,
            b'Z' => BaseType::Boolean,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Base(BaseType),
    /// A class or interface, by its internal form name (`java/lang/Object`).
    Object(String),
    Array(Box<FieldType>),
}
impl FieldType {
    /// Reads one field type from the front of `input` and returns it with the unread rest.
    pub fn parse_prefix(input: &str) -> Result<(FieldType, &str)> {
        let invalid = || ClassFileError::InvalidDescriptor(input.to_owned());

        let dimensions = input.bytes().take_while(|b| *b == b'[').count();
        let rest = &input[dimensions..];
        let (mut field_type, rest) = match rest.as_bytes().first() {
            Some(b'L') => {
                let end = rest.find(';').ok_or_else(invalid)?;
                let class_name = &rest[1..end];
                if class_name.is_empty() {
                    return Err(invalid());
                }
                (FieldType::Object(class_name.to_owned()), &rest[end + 1..])
            }
            Some(c) => {
                let base = BaseType::from_char(*c).ok_or_else(invalid)?;
                (FieldType::Base(base), &rest[1..])
            }
            None => return Err(invalid()),
        };

        for _ in 0..dimensions {
            field_type = FieldType::Array(Box::new(field_type));
        }
        Ok((field_type, rest))
    }
}
impl FromStr for FieldType {
    type Err = ClassFileError;

    fn from_str(s: &str) -> Result<Self> {
        match FieldType::parse_prefix(s)? {
            (field_type, "") => Ok(field_type),
            _ => Err(ClassFileError::InvalidDescriptor(s.to_owned())),
        }
    }
}

/// Renders the type as Java source spells it: `int`, `java.lang.String`, `double[][]`.
impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => f.write_str(base.name()),
            FieldType::Object(class_name) => f.write_str(&class_name.replace('/', ".")),
            FieldType::Array(component) => write!(f, "{}[]", component),
        }
    }
}

/// Decodes every field type packed into `descriptor`, in order.
///
/// `"I[[DLjava/lang/String;"` yields `["int", "double[][]", "java.lang.String"]`.
pub fn types_from_descriptor(descriptor: &str) -> Result<Vec<String>> {
    let mut types = Vec::new();
    let mut rest = descriptor;
    while !rest.is_empty() {
        let (field_type, tail) = FieldType::parse_prefix(rest)?;
        types.push(field_type.to_string());
        rest = tail;
    }
    Ok(types)
}

/// Decodes a descriptor that must hold exactly one field type.
pub fn type_from_descriptor(descriptor: &str) -> Option<String> {
    match types_from_descriptor(descriptor) {
        Ok(mut types) if types.len() == 1 => types.pop(),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    /// `None` for `void`.
    pub return_type: Option<FieldType>,
}
impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let invalid = || ClassFileError::InvalidDescriptor(descriptor.to_owned());

        let params = descriptor.strip_prefix('(').ok_or_else(invalid)?;
        let close = params.find(')').ok_or_else(invalid)?;
        let (mut rest, return_descriptor) = (&params[..close], &params[close + 1..]);

        let mut parameters = Vec::new();
        while !rest.is_empty() {
            let (field_type, tail) = FieldType::parse_prefix(rest).map_err(|_| invalid())?;
            parameters.push(field_type);
            rest = tail;
        }

        let return_type = match return_descriptor {
            "V" => None,
            other => Some(other.parse().map_err(|_| invalid())?),
        };

        Ok(Self {
            parameters,
            return_type,
        })
    }

    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(ToString::to_string).collect()
    }

    pub fn return_type_name(&self) -> String {
        self.return_type
            .as_ref()
            .map_or_else(|| "void".to_owned(), ToString::to_string)
    }
}
impl FromStr for MethodDescriptor {
    type Err = ClassFileError;

    fn from_str(s: &str) -> Result<Self> {
        MethodDescriptor::parse(s)
    }
}
