// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
pub mod constant_pool;
mod access_flags;
pub mod attributes;
mod class_file;
pub mod descriptor;
mod error;
mod header;
pub mod mutf8;
mod parser;
pub mod signature;

pub use self::class_file::{ClassFile, FieldInfo, MemberInfo, MethodInfo};
pub use access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
pub use attributes::{Attribute, Attributes, RawAttribute};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::ClassFileError;
pub use parser::Parser;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
