//! JVM access flags (JVMS §4.1, §4.5, §4.6).

use std::fmt;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    #[must_use]
    pub const fn with(self, flag: u16) -> Self {
        Self(self.0 | flag)
    }

    #[must_use]
    pub const fn without(self, flag: u16) -> Self {
        Self(self.0 & !flag)
    }

    pub const fn is_public(self) -> bool {
        self.contains(ACC_PUBLIC)
    }

    pub const fn is_private(self) -> bool {
        self.contains(ACC_PRIVATE)
    }

    pub const fn is_static(self) -> bool {
        self.contains(ACC_STATIC)
    }

    pub const fn is_final(self) -> bool {
        self.contains(ACC_FINAL)
    }

    pub const fn is_interface(self) -> bool {
        self.contains(ACC_INTERFACE)
    }

    pub const fn is_abstract(self) -> bool {
        self.contains(ACC_ABSTRACT)
    }

    pub const fn is_synthetic(self) -> bool {
        self.contains(ACC_SYNTHETIC)
    }

    pub const fn is_enum(self) -> bool {
        self.contains(ACC_ENUM)
    }

    pub const fn is_bridge(self) -> bool {
        self.contains(ACC_BRIDGE)
    }

    /// Flags for compiler-generated helper classes and methods.
    pub const fn public_synthetic() -> Self {
        Self(ACC_PUBLIC | ACC_SYNTHETIC)
    }

    pub const fn public_static_synthetic() -> Self {
        Self(ACC_PUBLIC | ACC_STATIC | ACC_SYNTHETIC)
    }

    pub const fn public_final_synthetic() -> Self {
        Self(ACC_PUBLIC | ACC_FINAL | ACC_SYNTHETIC)
    }

    pub const fn private_synthetic() -> Self {
        Self(ACC_PRIVATE | ACC_SYNTHETIC)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(u16, &str)] = &[
            (ACC_PUBLIC, "public"),
            (ACC_PRIVATE, "private"),
            (ACC_PROTECTED, "protected"),
            (ACC_STATIC, "static"),
            (ACC_FINAL, "final"),
            (ACC_BRIDGE, "bridge"),
            (ACC_VARARGS, "varargs"),
            (ACC_INTERFACE, "interface"),
            (ACC_ABSTRACT, "abstract"),
            (ACC_SYNTHETIC, "synthetic"),
            (ACC_ENUM, "enum"),
        ];
        let mut list = f.debug_list();
        for (bit, name) in NAMES {
            if self.0 & bit != 0 {
                list.entry(&format_args!("{name}"));
            }
        }
        list.finish()
    }
}
