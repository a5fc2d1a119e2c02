// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.4.7

use std::borrow::Cow;

use crate::{ClassFileError, Result};

/// Decodes the bytes of a `CONSTANT_Utf8_info` into UTF-16 code units.
///
/// Each one, two or three byte group is mapped to exactly one code unit. Supplementary
/// characters stay as the two surrogate units the compiler wrote, and `0xC0 0x80` decodes to
/// NUL like any other two byte group.
pub fn decode_units(bytes: &[u8]) -> Result<Vec<u16>> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i] as u16;
        let unit = if x & 0b1111_0000 == 0b1110_0000 {
            let [y, z] = continuation::<2>(bytes, i)?;
            i += 3;
            ((x & 0x0f) << 12) | ((y & 0x3f) << 6) | (z & 0x3f)
        } else if x & 0b1110_0000 == 0b1100_0000 {
            let [y] = continuation::<1>(bytes, i)?;
            i += 2;
            ((x & 0x1f) << 6) | (y & 0x3f)
        } else {
            i += 1;
            x
        };
        units.push(unit);
    }

    Ok(units)
}

/// Decodes modified UTF-8 into a `String`.
///
/// Surrogate pairs are joined into the character they encode. A surrogate without its partner
/// cannot live in a `String` and becomes U+FFFD; `JavaString` keeps it.
pub fn decode(bytes: &[u8]) -> Result<String> {
    Ok(JavaString::from_units(decode_units(bytes)?).text)
}

/// The text of a `CONSTANT_Utf8_info`.
///
/// Most constants are valid Unicode and are kept as a `String` only. A constant holding a lone
/// surrogate also keeps its UTF-16 code units, since `text` can only show it as U+FFFD.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct JavaString {
    text: String,
    units: Option<Vec<u16>>,
}
impl JavaString {
    pub fn from_units(units: Vec<u16>) -> Self {
        let text = char::decode_utf16(units.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>();
        let units = if text.encode_utf16().eq(units.iter().copied()) {
            None
        } else {
            Some(units)
        };

        Self { text, units }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The code units exactly as the class file encodes them.
    pub fn units(&self) -> Cow<'_, [u16]> {
        match &self.units {
            Some(units) => Cow::Borrowed(units),
            None => Cow::Owned(self.text.encode_utf16().collect()),
        }
    }

    /// Whether `as_str` replaced a lone surrogate.
    pub fn is_lossy(&self) -> bool {
        self.units.is_some()
    }
}
impl From<String> for JavaString {
    fn from(text: String) -> Self {
        Self { text, units: None }
    }
}
impl From<&str> for JavaString {
    fn from(text: &str) -> Self {
        text.to_owned().into()
    }
}

fn continuation<const N: usize>(bytes: &[u8], lead: usize) -> Result<[u16; N]> {
    let tail = bytes
        .get(lead + 1..lead + 1 + N)
        .ok_or(ClassFileError::TruncatedUtf8 { offset: lead })?;

    let mut res = [0u16; N];
    for (r, b) in res.iter_mut().zip(tail) {
        *r = *b as u16;
    }
    Ok(res)
}
