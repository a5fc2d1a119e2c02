use std::{
    convert::TryFrom,
    io::{self, BufRead, Read},
};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{Attribute, Attributes, CodeAttribute, ExceptionTableEntry, RawAttribute},
    class_file::MemberInfo,
    constant_pool::{
        ClassInfo, CpInfo, CpTag, DynamicInfo, MethodHandleInfo, MethodTypeInfo, ModuleInfo,
        NameAndTypeInfo, PackageInfo, RefInfo,
    },
    mutf8::{self, JavaString},
};

use super::*;

type Endian = BigEndian;

const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;

/// Reads exactly four bytes from `r` and checks them against `0xCAFEBABE`.
pub(crate) fn has_magic_identifier(r: &mut impl Read) -> Result<bool> {
    Ok(r.read_u32::<Endian>()? == MAGIC_IDENTIFIER)
}

/// Reads class file structures from `r`.
///
/// The parser does no buffering of its own and never reads past the structure it was asked for,
/// so `r` is left positioned right after it.
pub struct Parser<R> {
    r: R,
}
impl<R: BufRead> Parser<R> {
    pub fn new(r: R) -> Self {
        Self { r }
    }

    /// Parses a whole class file.
    ///
    /// A wrong magic identifier is not an error: the returned `ClassFile` reports
    /// `is_valid() == false` and nothing after the identifier is read.
    pub fn parse(&mut self) -> Result<ClassFile> {
        if !self.parse_magic_identifier()? {
            log::debug!("Not a class file, skipping");
            return Ok(ClassFile::default());
        }
        self.parse_contents()
    }

    /// Parses everything that follows the magic identifier.
    pub(crate) fn parse_contents(&mut self) -> Result<ClassFile> {
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool_count = self.read_u16()?;
        let constant_pool = self.parse_cp_infos(constant_pool_count)?;
        let access_flags = ClassAccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;
        let interfaces_count = self.read_u16()?;

        let mut interfaces = vec![0u16; interfaces_count as usize];
        self.r.read_u16_into::<Endian>(&mut interfaces)?;

        let fields_count = self.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_member_info(&constant_pool, FieldAccessFlags::from_bits_truncate))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| {
                self.parse_member_info(&constant_pool, MethodAccessFlags::from_bits_truncate)
            })
            .collect::<Result<Vec<_>>>()?;

        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, &constant_pool)?;

        log::debug!(
            "Parsed class file {}.{}: {} constants, {} fields, {} methods, {} attributes",
            major_version,
            minor_version,
            constant_pool.len(),
            fields.len(),
            methods.len(),
            attributes.len()
        );

        Ok(ClassFile {
            valid: true,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_member_info<F>(
        &mut self,
        constant_pool: &ConstantPool,
        access_flags: fn(u16) -> F,
    ) -> Result<MemberInfo<F>> {
        let access_flags = access_flags(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<bool> {
        has_magic_identifier(&mut self.r)
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    /// Reads the `constant_pool_count - 1` slots of a constant pool.
    ///
    /// `Long` and `Double` entries are followed by an `Unusable` slot, unless they sit in the
    /// last slot, so the pool always ends up with exactly `constant_pool_count - 1` slots.
    pub(crate) fn parse_cp_infos(&mut self, constant_pool_count: u16) -> Result<ConstantPool> {
        let count = (constant_pool_count as usize).saturating_sub(1);
        let mut res = Vec::with_capacity(count);
        while res.len() < count {
            let (cp_info, slot_size) = self.parse_cp_info()?;
            log::trace!("#{} = {:?}", res.len() + 1, cp_info);
            res.push(cp_info);
            if slot_size == 2 && res.len() < count {
                res.push(CpInfo::Unusable);
            }
        }
        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<(CpInfo, usize)> {
        let tag = CpTag::try_from(self.read_u8()?).map_err(ClassFileError::InvalidCpInfoTag)?;
        let cp_info = match tag {
            CpTag::Utf8 => self.parse_utf8()?,
            CpTag::Integer => CpInfo::Integer(self.read_i32()?),
            CpTag::Float => CpInfo::Float(self.r.read_f32::<Endian>()?),
            CpTag::Long => CpInfo::Long(self.r.read_i64::<Endian>()?),
            CpTag::Double => CpInfo::Double(self.r.read_f64::<Endian>()?),
            CpTag::Class => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            CpTag::String => CpInfo::String {
                string_index: self.read_u16()?,
            },
            CpTag::FieldRef => CpInfo::FieldRef(self.parse_ref_info()?),
            CpTag::MethodRef => CpInfo::MethodRef(self.parse_ref_info()?),
            CpTag::InterfaceMethodRef => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            CpTag::NameAndType => self.parse_name_and_type_info()?,
            CpTag::MethodHandle => self.parse_method_handle()?,
            CpTag::MethodType => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            CpTag::Dynamic => CpInfo::Dynamic(self.parse_dynamic_info()?),
            CpTag::InvokeDynamic => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            CpTag::Module => CpInfo::Module(ModuleInfo {
                name_index: self.read_u16()?,
            }),
            CpTag::Package => CpInfo::Package(PackageInfo {
                name_index: self.read_u16()?,
            }),
        };

        Ok((cp_info, tag.slot_size()))
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        Ok(CpInfo::Utf8(JavaString::from_units(
            mutf8::decode_units(&bytes)?,
        )))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    pub(crate) fn parse_raw_attribute(&mut self) -> Result<RawAttribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()? as usize;

        // Grown as bytes arrive so a bogus length fails on EOF instead of allocating it upfront.
        let mut info = Vec::new();
        (&mut self.r)
            .take(attribute_length as u64)
            .read_to_end(&mut info)?;
        if info.len() != attribute_length {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        Ok(RawAttribute {
            attribute_name_index,
            info,
        })
    }

    pub fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let mut code = Vec::new();
        (&mut self.r).take(code_length as u64).read_to_end(&mut code)?;
        if code.len() != code_length as usize {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    pub fn parse_attributes(
        &mut self,
        attributes_count: u16,
        constant_pool: &ConstantPool,
    ) -> Result<Attributes> {
        (0..attributes_count)
            .map(|_| {
                self.parse_raw_attribute()
                    .map(|raw| Attribute::refine(raw, constant_pool))
            })
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    /// Whether every byte of the underlying reader has been consumed.
    pub(crate) fn is_exhausted(&mut self) -> Result<bool> {
        Ok(self.r.fill_buf()?.is_empty())
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.r.read_i32::<Endian>()?)
    }
}

#[cfg(test)]
fn parser(bytes: &[u8]) -> Parser<&[u8]> {
    Parser::new(bytes)
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_accept_the_correct_identifier() {
        assert!(parser(&[0xca, 0xfe, 0xba, 0xbe])
            .parse_magic_identifier()
            .unwrap());
    }

    #[test]
    fn it_should_reject_an_incorrect_identifier() {
        assert!(!parser(&[0xca, 0xfe, 0xda, 0xda])
            .parse_magic_identifier()
            .unwrap());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(parser(&[0xca, 0xfe, 0xba])
            .parse_magic_identifier()
            .is_err());
    }

    #[test]
    fn it_should_stop_after_a_bad_identifier() {
        let bytes = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x00, 0x00, 0x34];
        let mut p = parser(&bytes);
        let class_file = p.parse().unwrap();

        assert!(!class_file.is_valid());
        assert_eq!(class_file.major_version, 0);
        assert!(class_file.constant_pool.is_empty());
        assert_eq!(p.r, &bytes[4..]);
    }

    #[test]
    fn it_should_read_only_the_identifier_from_an_unbuffered_reader() {
        let mut cursor = std::io::Cursor::new(vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02]);

        assert!(!has_magic_identifier(&mut cursor).unwrap());
        assert_eq!(cursor.position(), 4);
    }
}


#[cfg(test)]
mod parse_cp_infos_tests {
    use super::*;

    #[test]
    fn it_should_parse_every_entry_shape() {
        let bytes = [
            0x01, 0x00, 0x03, b'a', b'b', b'c', // #1 Utf8
            0x03, 0xff, 0xff, 0xff, 0xfe, // #2 Integer
            0x04, 0x3f, 0x80, 0x00, 0x00, // #3 Float
            0x07, 0x00, 0x01, // #4 Class
            0x08, 0x00, 0x01, // #5 String
            0x0a, 0x00, 0x04, 0x00, 0x07, // #6 Methodref
            0x0c, 0x00, 0x01, 0x00, 0x01, // #7 NameAndType
            0x0f, 0x06, 0x00, 0x06, // #8 MethodHandle
            0x10, 0x00, 0x01, // #9 MethodType
            0x11, 0x00, 0x00, 0x00, 0x07, // #10 Dynamic
            0x12, 0x00, 0x01, 0x00, 0x07, // #11 InvokeDynamic
            0x13, 0x00, 0x01, // #12 Module
            0x14, 0x00, 0x01, // #13 Package
        ];
        let pool = parser(&bytes).parse_cp_infos(14).unwrap();

        assert_eq!(pool.len(), 13);
        assert_eq!(pool.utf8(1).unwrap(), "abc");
        assert_eq!(pool.integer(2).unwrap(), -2);
        assert_eq!(pool.float(3).unwrap(), 1.0);
        assert_eq!(pool.class_name(4).unwrap(), "abc");
        assert_eq!(pool.string(5).unwrap(), "abc");
        assert_eq!(pool.member_ref_strings(6).unwrap(), ("abc", "abc", "abc"));
        assert_eq!(pool.method_handle(8).unwrap().reference_index, 6);
        assert_eq!(pool.method_type(9).unwrap().descriptor_index, 1);
        assert_eq!(pool.dynamic(10).unwrap().bootstrap_method_attr_index, 0);
        assert_eq!(pool.invoke_dynamic(11).unwrap().name_and_type_index, 7);
        assert_eq!(pool.module_name(12).unwrap(), "abc");
        assert_eq!(pool.package_name(13).unwrap(), "abc");
    }

    #[test]
    fn it_should_leave_an_unusable_slot_after_wide_entries() {
        let bytes = [
            0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, // #1 Long, #2 unusable
            0x06, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18, // #3 Double, #4 unusable
            0x01, 0x00, 0x01, b'x', // #5 Utf8
        ];
        let pool = parser(&bytes).parse_cp_infos(6).unwrap();

        assert_eq!(pool.len(), 5);
        assert_eq!(pool.long(1).unwrap(), 0x1_0000_0002);
        assert!(matches!(pool.get(2), Err(ClassFileError::UnusableSlot(2))));
        assert_eq!(pool.double(3).unwrap(), std::f64::consts::PI);
        assert!(matches!(pool.get(4), Err(ClassFileError::UnusableSlot(4))));
        assert_eq!(pool.utf8(5).unwrap(), "x");
    }

    #[test]
    fn it_should_not_write_past_the_end_for_a_trailing_wide_entry() {
        let bytes = [
            0x01, 0x00, 0x01, b'x', // #1 Utf8
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, // #2 Long
        ];
        let pool = parser(&bytes).parse_cp_infos(3).unwrap();

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.long(2).unwrap(), 7);
        assert!(matches!(pool.get(3), Err(ClassFileError::InvalidIndex(3))));
    }

    #[test]
    fn it_should_read_non_finite_floats() {
        let bytes = [
            0x04, 0x7f, 0x80, 0x00, 0x00, // +inf
            0x04, 0x7f, 0xc0, 0x00, 0x00, // NaN
        ];
        let pool = parser(&bytes).parse_cp_infos(3).unwrap();

        assert_eq!(pool.float(1).unwrap(), f32::INFINITY);
        assert!(pool.float(2).unwrap().is_nan());
    }

    #[test]
    fn it_should_fail_on_an_unknown_tag() {
        assert!(matches!(
            parser(&[0x02, 0x00]).parse_cp_infos(2),
            Err(ClassFileError::InvalidCpInfoTag(2))
        ));
    }

    #[test]
    fn it_should_fail_on_a_truncated_entry() {
        assert!(matches!(
            parser(&[0x07, 0x00]).parse_cp_infos(2),
            Err(ClassFileError::IOError(_))
        ));
    }

    #[test]
    fn it_should_build_an_empty_pool() {
        assert!(parser(&[]).parse_cp_infos(0).unwrap().is_empty());
        assert!(parser(&[]).parse_cp_infos(1).unwrap().is_empty());
    }
}
