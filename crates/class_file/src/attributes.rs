// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7

use std::{fmt, ops::Deref};

use crate::{constant_pool::CpInfo, parser::Parser, signature, ConstantPool, Result};

/// An `attribute_info` as it appears in the class file: a name and an uninterpreted payload.
pub struct RawAttribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}
impl fmt::Debug for RawAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAttribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}
impl RawAttribute {
    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.attribute_name_index)
    }

    /// Runs `f` over the payload and keeps the result only if it consumed every byte.
    fn parse_exact<T>(&self, f: impl FnOnce(&mut Parser<&[u8]>) -> Result<T>) -> Option<T> {
        let mut parser = Parser::new(self.info.as_slice());
        let value = f(&mut parser).ok()?;
        match parser.is_exhausted() {
            Ok(true) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum AttributeKind {
    ConstantValue,
    Code,
    StackMapTable,
    Exceptions,
    InnerClasses,
    EnclosingMethod,
    Synthetic,
    Signature,
    SourceFile,
    SourceDebugExtension,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    Deprecated,
    RuntimeVisibleAnnotations,
    RuntimeInvisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
    RuntimeInvisibleParameterAnnotations,
    AnnotationDefault,
    BootstrapMethods,
    MethodParameters,
    Module,
    NestHost,
    NestMembers,
    Record,
    PermittedSubclasses,
}

const ATTRIBUTE_NAMES: [(&str, AttributeKind); 26] = [
    ("ConstantValue", AttributeKind::ConstantValue),
    ("Code", AttributeKind::Code),
    ("StackMapTable", AttributeKind::StackMapTable),
    ("Exceptions", AttributeKind::Exceptions),
    ("InnerClasses", AttributeKind::InnerClasses),
    ("EnclosingMethod", AttributeKind::EnclosingMethod),
    ("Synthetic", AttributeKind::Synthetic),
    ("Signature", AttributeKind::Signature),
    ("SourceFile", AttributeKind::SourceFile),
    ("SourceDebugExtension", AttributeKind::SourceDebugExtension),
    ("LineNumberTable", AttributeKind::LineNumberTable),
    ("LocalVariableTable", AttributeKind::LocalVariableTable),
    ("LocalVariableTypeTable", AttributeKind::LocalVariableTypeTable),
    ("Deprecated", AttributeKind::Deprecated),
    ("RuntimeVisibleAnnotations", AttributeKind::RuntimeVisibleAnnotations),
    ("RuntimeInvisibleAnnotations", AttributeKind::RuntimeInvisibleAnnotations),
    (
        "RuntimeVisibleParameterAnnotations",
        AttributeKind::RuntimeVisibleParameterAnnotations,
    ),
    (
        "RuntimeInvisibleParameterAnnotations",
        AttributeKind::RuntimeInvisibleParameterAnnotations,
    ),
    ("AnnotationDefault", AttributeKind::AnnotationDefault),
    ("BootstrapMethods", AttributeKind::BootstrapMethods),
    ("MethodParameters", AttributeKind::MethodParameters),
    ("Module", AttributeKind::Module),
    ("NestHost", AttributeKind::NestHost),
    ("NestMembers", AttributeKind::NestMembers),
    ("Record", AttributeKind::Record),
    ("PermittedSubclasses", AttributeKind::PermittedSubclasses),
];

impl AttributeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIBUTE_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        ATTRIBUTE_NAMES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(n, _)| *n)
            .unwrap_or_default()
    }

    /// The exact `attribute_length` of kinds whose payload never varies.
    pub fn fixed_length(&self) -> Option<usize> {
        match self {
            AttributeKind::Synthetic | AttributeKind::Deprecated => Some(0),
            AttributeKind::ConstantValue
            | AttributeKind::Signature
            | AttributeKind::SourceFile
            | AttributeKind::NestHost => Some(2),
            AttributeKind::EnclosingMethod => Some(4),
            _ => None,
        }
    }
}

/// A typed reading of an attribute payload.
pub trait AttributeView: Sized {
    const KIND: AttributeKind;

    fn read(parser: &mut Parser<&[u8]>, constant_pool: &ConstantPool) -> Result<Self>;
}

/// A `RawAttribute` together with the typed view read from its payload.
#[derive(Debug)]
pub struct Refined<T> {
    raw: RawAttribute,
    value: T,
}
impl<T: AttributeView> Refined<T> {
    /// Fails, handing `raw` back untouched, when the name is not `T`'s or the payload does not
    /// have exactly the shape `T` expects.
    pub fn try_refine(
        raw: RawAttribute,
        constant_pool: &ConstantPool,
    ) -> std::result::Result<Self, RawAttribute> {
        if raw.name(constant_pool).ok() != Some(T::KIND.name()) {
            return Err(raw);
        }
        if let Some(length) = T::KIND.fixed_length() {
            if raw.info.len() != length {
                return Err(raw);
            }
        }

        match raw.parse_exact(|p| T::read(p, constant_pool)) {
            Some(value) => Ok(Refined { raw, value }),
            None => Err(raw),
        }
    }
}
impl<T> Refined<T> {
    pub fn raw(&self) -> &RawAttribute {
        &self.raw
    }

    pub fn into_raw(self) -> RawAttribute {
        self.raw
    }
}
impl<T> Deref for Refined<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[derive(Debug)]
pub enum Attribute {
    Raw(RawAttribute),
    ConstantValue(Refined<ConstantValueAttribute>),
    Code(Refined<CodeAttribute>),
    Exceptions(Refined<ExceptionsAttribute>),
    EnclosingMethod(Refined<EnclosingMethodAttribute>),
    Synthetic(Refined<SyntheticAttribute>),
    Signature(Refined<SignatureAttribute>),
    SourceFile(Refined<SourceFileAttribute>),
    Deprecated(Refined<DeprecatedAttribute>),
}
impl Attribute {
    /// Turns a raw attribute into the typed variant its name announces.
    ///
    /// Unknown names, names without a typed variant and payloads of the wrong shape all leave
    /// the attribute as `Attribute::Raw`.
    pub fn refine(raw: RawAttribute, constant_pool: &ConstantPool) -> Self {
        let kind = match raw.name(constant_pool) {
            Ok(name) => AttributeKind::from_name(name),
            Err(e) => {
                log::warn!(
                    "Cannot resolve attribute name #{}: {}",
                    raw.attribute_name_index,
                    e
                );
                None
            }
        };
        let Some(kind) = kind else {
            return Attribute::Raw(raw);
        };

        let refined = match kind {
            AttributeKind::ConstantValue => {
                Refined::try_refine(raw, constant_pool).map(Attribute::ConstantValue)
            }
            AttributeKind::Code => Refined::try_refine(raw, constant_pool).map(Attribute::Code),
            AttributeKind::Exceptions => {
                Refined::try_refine(raw, constant_pool).map(Attribute::Exceptions)
            }
            AttributeKind::EnclosingMethod => {
                Refined::try_refine(raw, constant_pool).map(Attribute::EnclosingMethod)
            }
            AttributeKind::Synthetic => {
                Refined::try_refine(raw, constant_pool).map(Attribute::Synthetic)
            }
            AttributeKind::Signature => {
                Refined::try_refine(raw, constant_pool).map(Attribute::Signature)
            }
            AttributeKind::SourceFile => {
                Refined::try_refine(raw, constant_pool).map(Attribute::SourceFile)
            }
            AttributeKind::Deprecated => {
                Refined::try_refine(raw, constant_pool).map(Attribute::Deprecated)
            }
            _ => return Attribute::Raw(raw),
        };

        refined.unwrap_or_else(|raw| {
            log::debug!(
                "{} attribute with {} bytes does not fit its layout, keeping it raw",
                kind.name(),
                raw.info.len()
            );
            Attribute::Raw(raw)
        })
    }

    pub fn raw(&self) -> &RawAttribute {
        match self {
            Attribute::Raw(raw) => raw,
            Attribute::ConstantValue(a) => a.raw(),
            Attribute::Code(a) => a.raw(),
            Attribute::Exceptions(a) => a.raw(),
            Attribute::EnclosingMethod(a) => a.raw(),
            Attribute::Synthetic(a) => a.raw(),
            Attribute::Signature(a) => a.raw(),
            Attribute::SourceFile(a) => a.raw(),
            Attribute::Deprecated(a) => a.raw(),
        }
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        self.raw().name(constant_pool)
    }

    pub fn is_refined(&self) -> bool {
        !matches!(self, Attribute::Raw(_))
    }
}

#[derive(Debug, Default)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| a.name(constant_pool).map_or(false, |n| n == name))
    }

    pub fn constant_value(&self) -> Option<&ConstantValueAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::ConstantValue(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Code(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn exceptions(&self) -> Option<&ExceptionsAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Exceptions(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn enclosing_method(&self) -> Option<&EnclosingMethodAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::EnclosingMethod(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&SignatureAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Signature(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn source_file(&self) -> Option<&SourceFileAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::SourceFile(a) => Some(&**a),
            _ => None,
        })
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.iter().any(|a| matches!(a, Attribute::Synthetic(_)))
    }

    pub fn is_deprecated(&self) -> bool {
        self.0.iter().any(|a| matches!(a, Attribute::Deprecated(_)))
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug)]
pub struct ConstantValueAttribute {
    pub constant_value_index: u16,
}
impl ConstantValueAttribute {
    pub fn constant_value<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a CpInfo> {
        constant_pool.get(self.constant_value_index)
    }
}
impl AttributeView for ConstantValueAttribute {
    const KIND: AttributeKind = AttributeKind::ConstantValue;

    fn read(parser: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        Ok(Self {
            constant_value_index: parser.read_u16()?,
        })
    }
}

#[derive(Debug)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}
impl AttributeView for CodeAttribute {
    const KIND: AttributeKind = AttributeKind::Code;

    fn read(parser: &mut Parser<&[u8]>, constant_pool: &ConstantPool) -> Result<Self> {
        parser.parse_code_attribute(constant_pool)
    }
}

#[derive(Debug)]
pub struct ExceptionsAttribute {
    pub exception_index_table: Vec<u16>,
}
impl ExceptionsAttribute {
    pub fn exception_class_names<'a>(&self, constant_pool: &'a ConstantPool) -> Result<Vec<&'a str>> {
        self.exception_index_table
            .iter()
            .map(|index| constant_pool.class_name(*index))
            .collect()
    }
}
impl AttributeView for ExceptionsAttribute {
    const KIND: AttributeKind = AttributeKind::Exceptions;

    fn read(parser: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        let number_of_exceptions = parser.read_u16()?;
        let exception_index_table = (0..number_of_exceptions)
            .map(|_| parser.read_u16())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            exception_index_table,
        })
    }
}

#[derive(Debug)]
pub struct EnclosingMethodAttribute {
    pub class_index: u16,
    pub method_index: u16,
}
impl EnclosingMethodAttribute {
    pub fn class_name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.class_name(self.class_index)
    }

    /// The enclosing method's `(name, descriptor)`, or `None` if the class is not immediately
    /// enclosed by a method or constructor.
    pub fn method<'a>(&self, constant_pool: &'a ConstantPool) -> Result<Option<(&'a str, &'a str)>> {
        if self.method_index == 0 {
            return Ok(None);
        }
        constant_pool
            .name_and_type_strings(self.method_index)
            .map(Some)
    }
}
impl AttributeView for EnclosingMethodAttribute {
    const KIND: AttributeKind = AttributeKind::EnclosingMethod;

    fn read(parser: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        let class_index = parser.read_u16()?;
        let method_index = parser.read_u16()?;

        Ok(Self {
            class_index,
            method_index,
        })
    }
}

#[derive(Debug)]
pub struct SyntheticAttribute;
impl AttributeView for SyntheticAttribute {
    const KIND: AttributeKind = AttributeKind::Synthetic;

    fn read(_: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        Ok(Self)
    }
}

#[derive(Debug)]
pub struct DeprecatedAttribute;
impl AttributeView for DeprecatedAttribute {
    const KIND: AttributeKind = AttributeKind::Deprecated;

    fn read(_: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        Ok(Self)
    }
}

#[derive(Debug)]
pub struct SignatureAttribute {
    pub signature_index: u16,
}
impl SignatureAttribute {
    pub fn signature<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.signature_index)
    }

    /// The signature as Java source would spell the type, e.g. `java.util.List<java.lang.String>`.
    pub fn rendered(&self, constant_pool: &ConstantPool) -> Result<String> {
        signature::render_signature(self.signature(constant_pool)?)
    }
}
impl AttributeView for SignatureAttribute {
    const KIND: AttributeKind = AttributeKind::Signature;

    fn read(parser: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        Ok(Self {
            signature_index: parser.read_u16()?,
        })
    }
}

#[derive(Debug)]
pub struct SourceFileAttribute {
    pub sourcefile_index: u16,
}
impl SourceFileAttribute {
    pub fn source_file<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.sourcefile_index)
    }
}
impl AttributeView for SourceFileAttribute {
    const KIND: AttributeKind = AttributeKind::SourceFile;

    fn read(parser: &mut Parser<&[u8]>, _: &ConstantPool) -> Result<Self> {
        Ok(Self {
            sourcefile_index: parser.read_u16()?,
        })
    }
}

#[cfg(test)]
mod refine_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("Deprecated".into()),
            CpInfo::Utf8("ConstantValue".into()),
            CpInfo::Integer(7),
            CpInfo::Utf8("EnclosingMethod".into()),
            CpInfo::Class(crate::constant_pool::ClassInfo { name_index: 6 }),
            CpInfo::Utf8("my/Outer".into()),
            CpInfo::Utf8("Exceptions".into()),
            CpInfo::Utf8("Code".into()),
            CpInfo::Utf8("MyCustomAttribute".into()),
            CpInfo::Utf8("Signature".into()),
            CpInfo::Utf8("Ljava/util/List<Ljava/lang/String;>;".into()),
        ])
    }

    fn raw(attribute_name_index: u16, info: &[u8]) -> RawAttribute {
        RawAttribute {
            attribute_name_index,
            info: info.to_vec(),
        }
    }

    #[test]
    fn it_should_refine_an_empty_deprecated_attribute() {
        let attribute = Attribute::refine(raw(1, &[]), &pool());
        assert!(matches!(attribute, Attribute::Deprecated(_)));
    }

    #[test]
    fn it_should_keep_a_non_empty_deprecated_attribute_raw() {
        let attribute = Attribute::refine(raw(1, &[0x00]), &pool());

        let Attribute::Raw(raw) = &attribute else {
            panic!("expected a raw attribute, got {:?}", attribute);
        };
        assert_eq!(raw.attribute_name_index, 1);
        assert_eq!(raw.info, vec![0x00u8]);
    }

    #[test]
    fn it_should_resolve_a_constant_value() {
        let pool = pool();
        let attribute = Attribute::refine(raw(2, &[0x00, 0x03]), &pool);

        let Attribute::ConstantValue(constant_value) = &attribute else {
            panic!("expected a ConstantValue attribute, got {:?}", attribute);
        };
        assert_eq!(
            constant_value.constant_value(&pool).unwrap(),
            &CpInfo::Integer(7)
        );
        assert_eq!(constant_value.raw().info, vec![0x00, 0x03]);
    }

    #[test]
    fn it_should_keep_a_constant_value_of_the_wrong_length_raw() {
        assert!(!Attribute::refine(raw(2, &[0x00, 0x03, 0x00]), &pool()).is_refined());
        assert!(!Attribute::refine(raw(2, &[0x00]), &pool()).is_refined());
    }

    #[test]
    fn it_should_treat_a_zero_method_index_as_no_enclosing_method() {
        let pool = pool();
        let attribute = Attribute::refine(raw(4, &[0x00, 0x05, 0x00, 0x00]), &pool);

        let Attribute::EnclosingMethod(enclosing) = &attribute else {
            panic!("expected an EnclosingMethod attribute, got {:?}", attribute);
        };
        assert_eq!(enclosing.class_name(&pool).unwrap(), "my/Outer");
        assert_eq!(enclosing.method(&pool).unwrap(), None);
    }

    #[test]
    fn it_should_check_the_length_of_a_variable_sized_attribute() {
        let pool = pool();
        let exceptions = Attribute::refine(raw(7, &[0x00, 0x01, 0x00, 0x05]), &pool);
        assert_eq!(
            Attributes(vec![exceptions])
                .exceptions()
                .unwrap()
                .exception_class_names(&pool)
                .unwrap(),
            vec!["my/Outer"]
        );

        assert!(!Attribute::refine(raw(7, &[0x00, 0x02, 0x00, 0x05]), &pool).is_refined());
        assert!(!Attribute::refine(raw(7, &[0x00, 0x01, 0x00, 0x05, 0x00]), &pool).is_refined());
    }

    #[test]
    fn it_should_refine_a_code_attribute_with_nested_attributes() {
        let pool = pool();
        let info = [
            0x00, 0x01, // max_stack
            0x00, 0x02, // max_locals
            0x00, 0x00, 0x00, 0x01, 0xb1, // code: return
            0x00, 0x00, // exception_table_length
            0x00, 0x01, // attributes_count
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // Deprecated
        ];
        let attributes = Attributes(vec![Attribute::refine(raw(8, &info), &pool)]);

        let code = attributes.code().unwrap();
        assert_eq!(code.max_stack, 1);
        assert_eq!(code.max_locals, 2);
        assert_eq!(code.code, vec![0xb1]);
        assert!(code.attributes.is_deprecated());
    }

    #[test]
    fn it_should_keep_a_truncated_code_attribute_raw() {
        assert!(!Attribute::refine(raw(8, &[0x00, 0x01, 0x00]), &pool()).is_refined());
    }

    #[test]
    fn it_should_keep_unknown_attributes_raw() {
        let pool = pool();
        let attribute = Attribute::refine(raw(9, &[0xde, 0xad]), &pool);

        assert!(!attribute.is_refined());
        assert_eq!(attribute.name(&pool).unwrap(), "MyCustomAttribute");
    }

    #[test]
    fn it_should_keep_attributes_with_an_unresolvable_name_raw() {
        assert!(!Attribute::refine(raw(0, &[]), &pool()).is_refined());
        assert!(!Attribute::refine(raw(3, &[]), &pool()).is_refined());
    }

    #[test]
    fn it_should_render_a_signature() {
        let pool = pool();
        let attributes = Attributes(vec![Attribute::refine(raw(10, &[0x00, 0x0b]), &pool)]);

        assert_eq!(
            attributes.signature().unwrap().rendered(&pool).unwrap(),
            "java.util.List<java.lang.String>"
        );
    }

    #[test]
    fn it_should_not_refine_under_another_name() {
        let refined = Refined::<SyntheticAttribute>::try_refine(raw(1, &[]), &pool());

        assert_eq!(refined.unwrap_err().attribute_name_index, 1);
    }

    #[test]
    fn it_should_hand_back_the_raw_payload() {
        let refined = Refined::<SignatureAttribute>::try_refine(raw(10, &[0x00, 0x0b]), &pool());

        assert_eq!(refined.unwrap().into_raw().info, vec![0x00, 0x0b]);
    }

    #[test]
    fn it_should_find_attributes_by_name() {
        let pool = pool();
        let attributes = Attributes(vec![
            Attribute::refine(raw(9, &[]), &pool),
            Attribute::refine(raw(1, &[]), &pool),
        ]);

        assert!(attributes.find_by_name("Deprecated", &pool).is_some());
        assert!(attributes.find_by_name("Synthetic", &pool).is_none());
        assert!(attributes.is_deprecated());
        assert!(!attributes.is_synthetic());
    }

    #[test]
    fn it_should_map_names_both_ways() {
        for (name, kind) in ATTRIBUTE_NAMES {
            assert_eq!(AttributeKind::from_name(name), Some(kind));
            assert_eq!(kind.name(), name);
        }
        assert_eq!(AttributeKind::from_name("deprecated"), None);
    }
}
