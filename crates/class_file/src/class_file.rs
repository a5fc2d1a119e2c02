use std::io::{BufReader, Read};

use crate::{
    attributes::Attributes,
    constant_pool::ClassInfo,
    descriptor::{self, MethodDescriptor},
    matches_cp_info,
    parser::{self, Parser},
    ClassAccessFlags, ClassFileError, ConstantPool, FieldAccessFlags, MethodAccessFlags, Result,
};

#[derive(Debug, Default)]
pub struct ClassFile {
    pub(crate) valid: bool,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl ClassFile {
    /// Parses a class file from `bytes`.
    ///
    /// The magic identifier is read straight from `bytes`. When it is wrong, the returned
    /// `ClassFile` is not valid and `bytes` is left just past those four bytes.
    pub fn parse(mut bytes: impl Read) -> Result<ClassFile> {
        if !parser::has_magic_identifier(&mut bytes)? {
            log::debug!("Not a class file, skipping");
            return Ok(ClassFile::default());
        }
        Parser::new(BufReader::new(bytes)).parse_contents()
    }

    /// Whether the input started with `0xCAFEBABE`. Nothing else is populated when it did not.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn class_name(&self) -> Result<&str> {
        // The value of the this_class item must be a valid index into the constant_pool table.
        // The constant_pool entry at that index must be a CONSTANT_Class_info structure (§4.4.1)
        // representing the class or interface defined by this class file.

        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.this_class, Class)?;

        self.constant_pool.utf8(*name_index)
    }

    pub fn super_class(&self) -> Result<Option<&str>> {
        // If the value of the super_class item is zero, then this class file must represent the
        // class Object, the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<&str> {
        field.name(&self.constant_pool)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<&str> {
        field.descriptor(&self.constant_pool)
    }

    /// The declared type of `field`, e.g. `java.util.HashMap`.
    pub fn field_type(&self, field: &FieldInfo) -> Result<String> {
        let descriptor = self.field_descriptor(field)?;
        descriptor::type_from_descriptor(descriptor)
            .ok_or_else(|| ClassFileError::InvalidDescriptor(descriptor.to_owned()))
    }

    /// Like `field_type`, but with the type arguments of a `Signature` attribute when the field
    /// has one, e.g. `java.util.HashMap<java.lang.String, java.lang.Integer>`.
    pub fn field_generic_type(&self, field: &FieldInfo) -> Result<String> {
        match field.attributes.signature() {
            Some(signature) => signature.rendered(&self.constant_pool),
            None => self.field_type(field),
        }
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str> {
        method.name(&self.constant_pool)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str> {
        method.descriptor(&self.constant_pool)
    }

    pub fn method_parameter_types(&self, method: &MethodInfo) -> Result<Vec<String>> {
        Ok(MethodDescriptor::parse(self.method_descriptor(method)?)?.parameter_types())
    }

    pub fn method_return_type(&self, method: &MethodInfo) -> Result<String> {
        Ok(MethodDescriptor::parse(self.method_descriptor(method)?)?.return_type_name())
    }

    pub fn source_file(&self) -> Result<Option<&str>> {
        self.attributes
            .source_file()
            .map(|source_file| source_file.source_file(&self.constant_pool))
            .transpose()
    }
}

/// A `field_info` or `method_info`; the two share a layout and differ in which access flags apply.
#[derive(Debug)]
pub struct MemberInfo<F> {
    pub access_flags: F,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl<F> MemberInfo<F> {
    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.descriptor_index)
    }
}

pub type FieldInfo = MemberInfo<FieldAccessFlags>;
pub type MethodInfo = MemberInfo<MethodAccessFlags>;
