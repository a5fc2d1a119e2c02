use bitflags::bitflags;

bitflags! {
    /// `access_flags` of a `ClassFile`.
    #[derive(Default)]
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// `access_flags` of a `field_info`.
    #[derive(Default)]
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// `access_flags` of a `method_info`.
    #[derive(Default)]
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

macro_rules! predicates {
    ($flags:ty { $($name:ident => $flag:ident),* $(,)? }) => {
        impl $flags {
            $(
                pub fn $name(&self) -> bool {
                    self.contains(Self::$flag)
                }
            )*
        }
    };
}

predicates!(ClassAccessFlags {
    is_public => PUBLIC,
    is_final => FINAL,
    is_super => SUPER,
    is_interface => INTERFACE,
    is_abstract => ABSTRACT,
    is_synthetic => SYNTHETIC,
    is_annotation => ANNOTATION,
    is_enum => ENUM,
    is_module => MODULE,
});

predicates!(FieldAccessFlags {
    is_public => PUBLIC,
    is_private => PRIVATE,
    is_protected => PROTECTED,
    is_static => STATIC,
    is_final => FINAL,
    is_volatile => VOLATILE,
    is_transient => TRANSIENT,
    is_synthetic => SYNTHETIC,
    is_enum => ENUM,
});

predicates!(MethodAccessFlags {
    is_public => PUBLIC,
    is_private => PRIVATE,
    is_protected => PROTECTED,
    is_static => STATIC,
    is_final => FINAL,
    is_synchronized => SYNCHRONIZED,
    is_bridge => BRIDGE,
    is_varargs => VARARGS,
    is_native => NATIVE,
    is_abstract => ABSTRACT,
    is_strict => STRICT,
    is_synthetic => SYNTHETIC,
});

#[cfg(test)]
mod access_flags_tests {
    use super::*;

    #[test]
    fn it_should_expose_each_bit_as_a_predicate() {
        let flags = ClassAccessFlags::from_bits_truncate(0x0421);

        assert!(flags.is_public());
        assert!(flags.is_super());
        assert!(flags.is_abstract());
        assert!(!flags.is_interface());
        assert!(!flags.is_final());
    }

    #[test]
    fn it_should_drop_bits_that_do_not_apply_to_the_entity() {
        // 0x0020 is SYNCHRONIZED on a method but means nothing on a field
        assert!(MethodAccessFlags::from_bits_truncate(0x0020).is_synchronized());
        assert!(FieldAccessFlags::from_bits_truncate(0x0020).is_empty());
    }

    #[test]
    fn it_should_share_bit_values_across_entities() {
        let field = FieldAccessFlags::from_bits_truncate(0x0040);
        let method = MethodAccessFlags::from_bits_truncate(0x0040);

        assert!(field.is_volatile());
        assert!(method.is_bridge());
    }
}
