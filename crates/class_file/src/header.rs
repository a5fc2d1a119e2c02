use std::fmt::{self, Write};

use crate::{
    constant_pool::CpInfo, descriptor::MethodDescriptor, ClassFile, ConstantPool, FieldInfo,
    MethodInfo, Result,
};

impl ClassFile {
    /// The Java-like declaration of the class, its fields and its methods, without bodies.
    pub fn header(&self) -> Result<String> {
        let mut header = String::new();
        self.write_header(&mut header)?;
        Ok(header)
    }

    pub fn write_header(&self, w: &mut impl Write) -> Result<()> {
        let flags = self.access_flags;
        if flags.is_synthetic() {
            writeln!(w, "// This class is auto-generated by compiler.")?;
        }

        write_modifiers(
            w,
            &[
                (flags.is_public(), "public"),
                (flags.is_final(), "final"),
                (flags.is_abstract() && !flags.is_interface(), "abstract"),
            ],
        )?;
        // Annotation types carry the interface flag too.
        let kind = if flags.is_annotation() {
            "@interface"
        } else if flags.is_interface() {
            "interface"
        } else if flags.is_enum() {
            "enum"
        } else if flags.is_module() {
            "module"
        } else {
            "class"
        };
        let class_name = java_name(self.class_name()?);
        write!(w, "{} {}", kind, class_name)?;

        if let Some(super_class) = self.super_class()? {
            let super_class = java_name(super_class);
            if super_class != "java.lang.Object" && super_class != "java.lang.Enum" {
                write!(w, " extends {}", super_class)?;
            }
        }

        let interfaces = self.interface_names()?;
        if !interfaces.is_empty() {
            write!(w, " implements {}", join(interfaces))?;
        }
        writeln!(w, " {{")?;

        if !self.fields.is_empty() {
            writeln!(w, "    // fields")?;
            for (i, field) in self.fields.iter().enumerate() {
                let next_is_enum = self
                    .fields
                    .get(i + 1)
                    .map_or(false, |next| next.access_flags.is_enum());
                self.write_field(w, field, next_is_enum)?;
            }
        }

        if !self.fields.is_empty() && !self.methods.is_empty() {
            writeln!(w)?;
        }

        if !self.methods.is_empty() {
            writeln!(w, "    // methods")?;
            for method in &self.methods {
                self.write_method(w, method, &class_name)?;
            }
        }

        write!(w, "}}")?;
        Ok(())
    }

    fn write_field(&self, w: &mut impl Write, field: &FieldInfo, next_is_enum: bool) -> Result<()> {
        let flags = field.access_flags;
        let name = self.field_name(field)?;
        w.write_str("    ")?;

        if flags.is_enum() {
            writeln!(w, "{}{}", name, if next_is_enum { "," } else { "" })?;
            return Ok(());
        }

        write_modifiers(
            w,
            &[
                (flags.is_public(), "public"),
                (flags.is_protected(), "protected"),
                (flags.is_private(), "private"),
                (flags.is_static(), "static"),
                (flags.is_final(), "final"),
                (flags.is_transient(), "transient"),
                (flags.is_volatile(), "volatile"),
            ],
        )?;
        write!(w, "{} {}", java_name(&self.field_generic_type(field)?), name)?;

        // Only compile-time constants keep their value in the class file.
        if flags.is_static() && flags.is_final() {
            if let Some(constant_value) = field.attributes.constant_value() {
                let value = constant_value.constant_value(&self.constant_pool)?;
                let descriptor = self.field_descriptor(field)?;
                if let Some(literal) = literal(&self.constant_pool, value, descriptor)? {
                    write!(w, " = {}", literal)?;
                }
            }
        }
        w.write_str(";")?;

        if flags.is_synthetic() {
            w.write_str(" // This synthetic field is auto-generated by compiler.")?;
        }
        writeln!(w)?;
        Ok(())
    }

    fn write_method(&self, w: &mut impl Write, method: &MethodInfo, class_name: &str) -> Result<()> {
        let flags = method.access_flags;
        let name = self.method_name(method)?;
        let descriptor = MethodDescriptor::parse(self.method_descriptor(method)?)?;
        w.write_str("    ")?;

        write_modifiers(
            w,
            &[
                (flags.is_public(), "public"),
                (flags.is_protected(), "protected"),
                (flags.is_private(), "private"),
                (flags.is_abstract(), "abstract"),
                (flags.is_static(), "static"),
                (flags.is_final(), "final"),
                (flags.is_synchronized(), "synchronized"),
                (flags.is_native(), "native"),
                (flags.is_strict(), "strictfp"),
            ],
        )?;
        match name {
            "<init>" | "<clinit>" => w.write_str(class_name)?,
            _ => write!(w, "{} {}", java_name(&descriptor.return_type_name()), name)?,
        }
        write!(w, "({});", join(descriptor.parameter_types()))?;

        if flags.is_bridge() {
            w.write_str(" // This bridge method is auto-generated by compiler.")?;
        }
        if flags.is_synthetic() {
            w.write_str(" // This synthetic method is auto-generated by compiler.")?;
        }
        if name == "<clinit>" {
            w.write_str(
                " // This static method is used by JVM to initialize static fields in this class.",
            )?;
        }
        writeln!(w)?;
        Ok(())
    }
}

fn write_modifiers(w: &mut impl Write, modifiers: &[(bool, &str)]) -> fmt::Result {
    for (_, keyword) in modifiers.iter().filter(|(set, _)| *set) {
        write!(w, "{} ", keyword)?;
    }
    Ok(())
}

/// `java/util/Map$Entry` and `java.util.Map$Entry` both become `java.util.Map.Entry`.
fn java_name(name: &str) -> String {
    name.replace(['/', '$'], ".")
}

fn join<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> String {
    names
        .into_iter()
        .map(|name| java_name(name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The source literal of a `ConstantValue`, or `None` for entries that have no literal form.
fn literal(constant_pool: &ConstantPool, value: &CpInfo, descriptor: &str) -> Result<Option<String>> {
    Ok(Some(match value {
        CpInfo::String { string_index } => {
            quote(constant_pool.utf16(*string_index)?.iter().copied(), '"')
        }
        // boolean, char, byte and short constants are all stored as CONSTANT_Integer.
        CpInfo::Integer(i) if descriptor == "Z" => (*i != 0).to_string(),
        CpInfo::Integer(i) if descriptor == "C" => quote([*i as u16], '\''),
        CpInfo::Integer(i) => i.to_string(),
        CpInfo::Long(l) => format!("{}L", l),
        CpInfo::Float(f) if f.is_finite() => format!("{:?}f", f),
        CpInfo::Float(f) => non_finite("Float", f.is_nan(), f.is_sign_positive()),
        CpInfo::Double(d) if d.is_finite() => format!("{:?}", d),
        CpInfo::Double(d) => non_finite("Double", d.is_nan(), d.is_sign_positive()),
        _ => return Ok(None),
    }))
}

fn non_finite(class: &str, is_nan: bool, is_positive: bool) -> String {
    let constant = match (is_nan, is_positive) {
        (true, _) => "NaN",
        (false, true) => "POSITIVE_INFINITY",
        (false, false) => "NEGATIVE_INFINITY",
    };
    format!("{}.{}", class, constant)
}

/// Escapes UTF-16 code units the way they would be written inside a Java literal.
fn quote(units: impl IntoIterator<Item = u16>, delimiter: char) -> String {
    let mut quoted = String::new();
    quoted.push(delimiter);
    for unit in units {
        let escaped = match unit {
            0x08 => "\\b",
            0x09 => "\\t",
            0x0a => "\\n",
            0x0c => "\\f",
            0x0d => "\\r",
            0x22 => "\\\"",
            0x27 => "\\'",
            0x5c => "\\\\",
            0x20..=0x7e => {
                quoted.push(unit as u8 as char);
                continue;
            }
            _ => {
                quoted.push_str(&format!("\\u{:04x}", unit));
                continue;
            }
        };
        quoted.push_str(escaped);
    }
    quoted.push(delimiter);
    quoted
}
