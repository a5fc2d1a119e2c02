use std::{borrow::Cow, convert::TryFrom, io::BufRead};

use crate::{mutf8::JavaString, parser::Parser, ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index)? {
            $crate::constant_pool::CpInfo::$i(ref n) => Ok(n),
            c => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
        }
    };
}

/// The `constant_pool` table of a class file, indexed from 1 to `constant_pool_count - 1`.
///
/// Entries only hold indices into the pool. Nothing is resolved while the pool is read, so an
/// entry may refer to one that appears later; the accessors below do the lookups on demand.
#[derive(Debug, Default)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// Reads `declared_count - 1` slots from `r`, the way `constant_pool_count` declares them.
    ///
    /// Nothing after the last entry is consumed.
    pub fn build(r: impl BufRead, declared_count: u16) -> Result<Self> {
        Parser::new(r).parse_cp_infos(declared_count)
    }

    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        let slot = (index as usize)
            .checked_sub(1)
            .ok_or(ClassFileError::InvalidIndex(index))?;

        match self.cp_infos.get(slot) {
            None => Err(ClassFileError::InvalidIndex(index)),
            Some(CpInfo::Unusable) => Err(ClassFileError::UnusableSlot(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    /// Iterates over the usable entries together with their 1-based index.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.cp_infos.iter().enumerate(),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(JavaString::as_str)
    }

    /// The UTF-16 code units of a `CONSTANT_Utf8_info`, lone surrogates included.
    pub fn utf16(&self, index: u16) -> Result<Cow<'_, [u16]>> {
        matches_cp_info!(self, index, Utf8).map(JavaString::units)
    }

    pub fn integer(&self, index: u16) -> Result<i32> {
        matches_cp_info!(self, index, Integer).copied()
    }

    pub fn float(&self, index: u16) -> Result<f32> {
        matches_cp_info!(self, index, Float).copied()
    }

    pub fn long(&self, index: u16) -> Result<i64> {
        matches_cp_info!(self, index, Long).copied()
    }

    pub fn double(&self, index: u16) -> Result<f64> {
        matches_cp_info!(self, index, Double).copied()
    }

    pub fn class(&self, index: u16) -> Result<&ClassInfo> {
        matches_cp_info!(self, index, Class)
    }

    pub fn string_index(&self, index: u16) -> Result<u16> {
        match self.get(index)? {
            CpInfo::String { string_index } => Ok(*string_index),
            c => Err(ClassFileError::UnexpectedConstantPoolEntry(
                "String",
                c.clone(),
            )),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<&NameAndTypeInfo> {
        matches_cp_info!(self, index, NameAndType)
    }

    /// Any of `Fieldref`, `Methodref` or `InterfaceMethodref`.
    pub fn member_ref(&self, index: u16) -> Result<&RefInfo> {
        match self.get(index)? {
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => Ok(r),
            c => Err(ClassFileError::UnexpectedConstantPoolEntry(
                "member reference",
                c.clone(),
            )),
        }
    }

    pub fn method_handle(&self, index: u16) -> Result<&MethodHandleInfo> {
        matches_cp_info!(self, index, MethodHandle)
    }

    pub fn method_type(&self, index: u16) -> Result<&MethodTypeInfo> {
        matches_cp_info!(self, index, MethodType)
    }

    pub fn dynamic(&self, index: u16) -> Result<&DynamicInfo> {
        matches_cp_info!(self, index, Dynamic)
    }

    pub fn invoke_dynamic(&self, index: u16) -> Result<&DynamicInfo> {
        matches_cp_info!(self, index, InvokeDynamic)
    }

    pub fn module(&self, index: u16) -> Result<&ModuleInfo> {
        matches_cp_info!(self, index, Module)
    }

    pub fn package(&self, index: u16) -> Result<&PackageInfo> {
        matches_cp_info!(self, index, Package)
    }

    /// The internal form name of the `CONSTANT_Class_info` at `index`, e.g. `java/lang/Object`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = self.class(index)?;
        self.utf8(*name_index)
    }

    /// The text of the `CONSTANT_String_info` at `index`.
    pub fn string(&self, index: u16) -> Result<&str> {
        self.utf8(self.string_index(index)?)
    }

    /// The `(name, descriptor)` pair of the `CONSTANT_NameAndType_info` at `index`.
    pub fn name_and_type_strings(&self, index: u16) -> Result<(&str, &str)> {
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = self.name_and_type(index)?;

        Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
    }

    /// The `(class name, member name, descriptor)` triple of a member reference at `index`.
    pub fn member_ref_strings(&self, index: u16) -> Result<(&str, &str, &str)> {
        let RefInfo {
            class_index,
            name_and_type_index,
        } = self.member_ref(index)?;
        let (name, descriptor) = self.name_and_type_strings(*name_and_type_index)?;

        Ok((self.class_name(*class_index)?, name, descriptor))
    }

    pub fn module_name(&self, index: u16) -> Result<&str> {
        self.utf8(self.module(index)?.name_index)
    }

    pub fn package_name(&self, index: u16) -> Result<&str> {
        self.utf8(self.package(index)?.name_index)
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = (u16, &'a CpInfo);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, CpInfo>>,
}
impl<'a> Iterator for Iter<'a> {
    type Item = (u16, &'a CpInfo);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                (_, CpInfo::Unusable) => continue,
                (slot, cp_info) => return Some((slot as u16 + 1, cp_info)),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CpTag {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
}
impl CpTag {
    /// `Long` and `Double` take up two slots of the pool.
    pub fn slot_size(&self) -> usize {
        match self {
            CpTag::Long | CpTag::Double => 2,
            _ => 1,
        }
    }
}

impl TryFrom<u8> for CpTag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(CpTag::Utf8),
            3 => Ok(CpTag::Integer),
            4 => Ok(CpTag::Float),
            5 => Ok(CpTag::Long),
            6 => Ok(CpTag::Double),
            7 => Ok(CpTag::Class),
            8 => Ok(CpTag::String),
            9 => Ok(CpTag::FieldRef),
            10 => Ok(CpTag::MethodRef),
            11 => Ok(CpTag::InterfaceMethodRef),
            12 => Ok(CpTag::NameAndType),
            15 => Ok(CpTag::MethodHandle),
            16 => Ok(CpTag::MethodType),
            17 => Ok(CpTag::Dynamic),
            18 => Ok(CpTag::InvokeDynamic),
            19 => Ok(CpTag::Module),
            20 => Ok(CpTag::Package),
            _ => Err(value),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    MethodRef(RefInfo),
    FieldRef(RefInfo),
    Float(f32),
    InterfaceMethodRef(RefInfo),
    Class(ClassInfo),
    NameAndType(NameAndTypeInfo),
    Utf8(JavaString),
    String { string_index: u16 },
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Integer(i32),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Long(i64),
    Double(f64),
    Module(ModuleInfo),
    Package(PackageInfo),
    /// The slot following a `Long` or `Double`.
    Unusable,
}
impl CpInfo {
    pub fn tag(&self) -> Option<CpTag> {
        Some(match self {
            CpInfo::MethodRef(_) => CpTag::MethodRef,
            CpInfo::FieldRef(_) => CpTag::FieldRef,
            CpInfo::Float(_) => CpTag::Float,
            CpInfo::InterfaceMethodRef(_) => CpTag::InterfaceMethodRef,
            CpInfo::Class(_) => CpTag::Class,
            CpInfo::NameAndType(_) => CpTag::NameAndType,
            CpInfo::Utf8(_) => CpTag::Utf8,
            CpInfo::String { .. } => CpTag::String,
            CpInfo::Dynamic(_) => CpTag::Dynamic,
            CpInfo::InvokeDynamic(_) => CpTag::InvokeDynamic,
            CpInfo::Integer(_) => CpTag::Integer,
            CpInfo::MethodHandle(_) => CpTag::MethodHandle,
            CpInfo::MethodType(_) => CpTag::MethodType,
            CpInfo::Long(_) => CpTag::Long,
            CpInfo::Double(_) => CpTag::Double,
            CpInfo::Module(_) => CpTag::Module,
            CpInfo::Package(_) => CpTag::Package,
            CpInfo::Unusable => return None,
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Shared by `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`.
#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}
impl MethodHandleInfo {
    pub fn kind(&self) -> Result<ReferenceKind, u8> {
        ReferenceKind::try_from(self.reference_kind)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ModuleInfo {
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct PackageInfo {
    pub name_index: u16,
}

// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-5.html#jvms-5.4.3.5
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReferenceKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferenceKind::GetField),
            2 => Ok(ReferenceKind::GetStatic),
            3 => Ok(ReferenceKind::PutField),
            4 => Ok(ReferenceKind::PutStatic),
            5 => Ok(ReferenceKind::InvokeVirtual),
            6 => Ok(ReferenceKind::InvokeStatic),
            7 => Ok(ReferenceKind::InvokeSpecial),
            8 => Ok(ReferenceKind::NewInvokeSpecial),
            9 => Ok(ReferenceKind::InvokeInterface),
            _ => Err(value),
        }
    }
}

#[cfg(test)]
mod constant_pool_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Class(ClassInfo { name_index: 2 }),
            CpInfo::Utf8("java/lang/Object".into()),
            CpInfo::Long(42),
            CpInfo::Unusable,
            CpInfo::String { string_index: 6 },
            CpInfo::Utf8("hello".into()),
            CpInfo::FieldRef(RefInfo {
                class_index: 1,
                name_and_type_index: 8,
            }),
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index: 9,
                descriptor_index: 10,
            }),
            CpInfo::Utf8("count".into()),
            CpInfo::Utf8("I".into()),
        ])
    }

    #[test]
    fn it_should_use_one_based_indices() {
        assert_eq!(
            pool().get(1).unwrap(),
            &CpInfo::Class(ClassInfo { name_index: 2 })
        );
        assert_eq!(pool().get(10).unwrap(), &CpInfo::Utf8("I".into()));
    }

    #[test]
    fn it_should_reject_index_zero() {
        assert!(matches!(pool().get(0), Err(ClassFileError::InvalidIndex(0))));
    }

    #[test]
    fn it_should_reject_an_index_past_the_end() {
        assert!(matches!(
            pool().get(11),
            Err(ClassFileError::InvalidIndex(11))
        ));
    }

    #[test]
    fn it_should_reject_the_slot_after_a_long() {
        assert_eq!(pool().long(3).unwrap(), 42);
        assert!(matches!(pool().get(4), Err(ClassFileError::UnusableSlot(4))));
    }

    #[test]
    fn it_should_report_a_type_mismatch() {
        assert!(matches!(
            pool().class(2),
            Err(ClassFileError::UnexpectedConstantPoolEntry("Class", CpInfo::Utf8(_)))
        ));
        assert!(pool().utf8(1).is_err());
    }

    #[test]
    fn it_should_resolve_chains_on_demand() {
        let pool = pool();
        assert_eq!(pool.class_name(1).unwrap(), "java/lang/Object");
        assert_eq!(pool.string(5).unwrap(), "hello");
        assert_eq!(
            pool.member_ref_strings(7).unwrap(),
            ("java/lang/Object", "count", "I")
        );
    }

    #[test]
    fn it_should_skip_unusable_slots_when_iterating() {
        let pool = pool();
        let indices = pool.iter().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(indices, vec![1, 2, 3, 5, 6, 7, 8, 9, 10]);
        assert_eq!((&pool).into_iter().count(), 9);
    }

    #[test]
    fn it_should_map_every_known_tag() {
        for tag in [1u8, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 15, 16, 17, 18, 19, 20] {
            assert!(CpTag::try_from(tag).is_ok(), "tag {}", tag);
        }
        for tag in [0u8, 2, 13, 14, 21, 255] {
            assert_eq!(CpTag::try_from(tag), Err(tag));
        }
    }

    #[test]
    fn it_should_convert_reference_kinds() {
        let handle = MethodHandleInfo {
            reference_kind: 6,
            reference_index: 1,
        };
        assert_eq!(handle.kind(), Ok(ReferenceKind::InvokeStatic));
        assert_eq!(ReferenceKind::try_from(10u8), Err(10));
    }

    #[test]
    fn it_should_build_from_a_reader() {
        let bytes = [
            0x07, 0x00, 0x02, // #1 Class
            0x01, 0x00, 0x02, b'm', b'y', // #2 Utf8
            0x06, 0x3f, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // #3 Double
        ];
        let pool = ConstantPool::build(&bytes[..], 5).unwrap();

        assert_eq!(pool.class_name(1).unwrap(), "my");
        assert_eq!(pool.double(3).unwrap(), 0.5);
        assert_eq!(
            pool.iter().map(|(_, c)| c.tag()).collect::<Vec<_>>(),
            vec![Some(CpTag::Class), Some(CpTag::Utf8), Some(CpTag::Double)]
        );
        assert_eq!(CpInfo::Unusable.tag(), None);
    }

    #[test]
    fn it_should_leave_the_reader_after_the_last_entry() {
        let mut cursor = std::io::Cursor::new(vec![
            0x01, 0x00, 0x01, b'x', // #1 Utf8
            0x00, 0x21, 0x00, 0x07, // access_flags, this_class
        ]);
        let pool = ConstantPool::build(&mut cursor, 2).unwrap();

        assert_eq!(pool.utf8(1).unwrap(), "x");
        assert_eq!(cursor.position(), 4);
        assert_eq!(&cursor.get_ref()[4..], &[0x00, 0x21, 0x00, 0x07]);
    }

    #[test]
    fn it_should_keep_the_units_of_a_lone_surrogate() {
        let pool = ConstantPool::build(&[0x01, 0x00, 0x03, 0xed, 0xb0, 0x80][..], 2).unwrap();

        assert_eq!(pool.utf8(1).unwrap(), "\u{fffd}");
        assert_eq!(&*pool.utf16(1).unwrap(), &[0xdc00]);
        assert!(pool.utf16(2).is_err());
    }
}
