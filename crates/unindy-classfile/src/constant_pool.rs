use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mutf8;
use crate::reader::{Reader, Writer};

/// One `cp_info` structure.
///
/// `Unusable` fills index 0 and the slot following every `Long`/`Double`. Floating point
/// constants keep their raw bits so that equality and hashing are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CpInfo {
    Unusable,
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

impl CpInfo {
    pub fn kind(&self) -> &'static str {
        match self {
            CpInfo::Unusable => "Unusable",
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::Fieldref { .. } => "Fieldref",
            CpInfo::Methodref { .. } => "Methodref",
            CpInfo::InterfaceMethodref { .. } => "InterfaceMethodref",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle { .. } => "MethodHandle",
            CpInfo::MethodType { .. } => "MethodType",
            CpInfo::Dynamic { .. } => "Dynamic",
            CpInfo::InvokeDynamic { .. } => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }

    fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let tag = reader.read_u1()?;
        let info = match tag {
            1 => {
                let len = reader.read_u2()? as usize;
                CpInfo::Utf8(reader.read_bytes(len)?.to_vec())
            }
            3 => CpInfo::Integer(reader.read_i4()?),
            4 => CpInfo::Float(reader.read_u4()?),
            5 => {
                let high = reader.read_u4()? as u64;
                let low = reader.read_u4()? as u64;
                CpInfo::Long(((high << 32) | low) as i64)
            }
            6 => {
                let high = reader.read_u4()? as u64;
                let low = reader.read_u4()? as u64;
                CpInfo::Double((high << 32) | low)
            }
            7 => CpInfo::Class {
                name_index: reader.read_u2()?,
            },
            8 => CpInfo::String {
                string_index: reader.read_u2()?,
            },
            9 => CpInfo::Fieldref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            10 => CpInfo::Methodref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            11 => CpInfo::InterfaceMethodref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            12 => CpInfo::NameAndType {
                name_index: reader.read_u2()?,
                descriptor_index: reader.read_u2()?,
            },
            15 => CpInfo::MethodHandle {
                reference_kind: reader.read_u1()?,
                reference_index: reader.read_u2()?,
            },
            16 => CpInfo::MethodType {
                descriptor_index: reader.read_u2()?,
            },
            17 => CpInfo::Dynamic {
                bootstrap_method_attr_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            18 => CpInfo::InvokeDynamic {
                bootstrap_method_attr_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            19 => CpInfo::Module {
                name_index: reader.read_u2()?,
            },
            20 => CpInfo::Package {
                name_index: reader.read_u2()?,
            },
            other => return Err(Error::InvalidConstantPoolTag(other)),
        };
        Ok(info)
    }

    fn write(&self, out: &mut Writer) -> Result<()> {
        match self {
            CpInfo::Unusable => {}
            CpInfo::Utf8(bytes) => {
                out.put_u1(1);
                out.put_count(bytes.len(), "Utf8 constant length")?;
                out.put_bytes(bytes);
            }
            CpInfo::Integer(v) => {
                out.put_u1(3);
                out.put_u4(*v as u32);
            }
            CpInfo::Float(bits) => {
                out.put_u1(4);
                out.put_u4(*bits);
            }
            CpInfo::Long(v) => {
                out.put_u1(5);
                out.put_bytes(&v.to_be_bytes());
            }
            CpInfo::Double(bits) => {
                out.put_u1(6);
                out.put_bytes(&bits.to_be_bytes());
            }
            CpInfo::Class { name_index } => {
                out.put_u1(7);
                out.put_u2(*name_index);
            }
            CpInfo::String { string_index } => {
                out.put_u1(8);
                out.put_u2(*string_index);
            }
            CpInfo::Fieldref {
                class_index,
                name_and_type_index,
            } => {
                out.put_u1(9);
                out.put_u2(*class_index);
                out.put_u2(*name_and_type_index);
            }
            CpInfo::Methodref {
                class_index,
                name_and_type_index,
            } => {
                out.put_u1(10);
                out.put_u2(*class_index);
                out.put_u2(*name_and_type_index);
            }
            CpInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => {
                out.put_u1(11);
                out.put_u2(*class_index);
                out.put_u2(*name_and_type_index);
            }
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => {
                out.put_u1(12);
                out.put_u2(*name_index);
                out.put_u2(*descriptor_index);
            }
            CpInfo::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                out.put_u1(15);
                out.put_u1(*reference_kind);
                out.put_u2(*reference_index);
            }
            CpInfo::MethodType { descriptor_index } => {
                out.put_u1(16);
                out.put_u2(*descriptor_index);
            }
            CpInfo::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                out.put_u1(17);
                out.put_u2(*bootstrap_method_attr_index);
                out.put_u2(*name_and_type_index);
            }
            CpInfo::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                out.put_u1(18);
                out.put_u2(*bootstrap_method_attr_index);
                out.put_u2(*name_and_type_index);
            }
            CpInfo::Module { name_index } => {
                out.put_u1(19);
                out.put_u2(*name_index);
            }
            CpInfo::Package { name_index } => {
                out.put_u1(20);
                out.put_u2(*name_index);
            }
        }
        Ok(())
    }
}

/// A symbolic field or method reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Whether the owner is an interface (`InterfaceMethodref`).
    pub interface: bool,
}

impl MemberRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            interface: false,
        }
    }

    pub fn interface(mut self, interface: bool) -> Self {
        self.interface = interface;
        self
    }
}

/// The `CONSTANT_MethodHandle` reference kinds (JVMS 5.4.3.5).
pub mod ref_kind {
    pub const GET_FIELD: u8 = 1;
    pub const GET_STATIC: u8 = 2;
    pub const PUT_FIELD: u8 = 3;
    pub const PUT_STATIC: u8 = 4;
    pub const INVOKE_VIRTUAL: u8 = 5;
    pub const INVOKE_STATIC: u8 = 6;
    pub const INVOKE_SPECIAL: u8 = 7;
    pub const NEW_INVOKE_SPECIAL: u8 = 8;
    pub const INVOKE_INTERFACE: u8 = 9;
}

/// A resolved `CONSTANT_MethodHandle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandleRef {
    pub reference_kind: u8,
    pub member: MemberRef,
}

/// A resolved `CONSTANT_InvokeDynamic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeDynamicRef {
    pub bootstrap_method_attr_index: u16,
    pub name: String,
    pub descriptor: String,
}

/// Constant pool with append-only, de-duplicating interning.
///
/// Existing indices never move, so code that was already encoded against the pool stays
/// valid after new constants are added.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<CpInfo>,
    interned: HashMap<CpInfo, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![CpInfo::Unusable],
            interned: HashMap::new(),
        }
    }

    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut pool = Self::new();
        pool.entries.reserve(count);
        while pool.entries.len() < count {
            let info = CpInfo::parse(reader)?;
            let index = pool.entries.len() as u16;
            let wide = info.is_wide();
            pool.interned.entry(info.clone()).or_insert(index);
            pool.entries.push(info);
            if wide {
                pool.entries.push(CpInfo::Unusable);
            }
        }
        if pool.entries.len() > count {
            // A trailing Long/Double claimed a slot past `constant_pool_count`.
            return Err(Error::InvalidConstantPoolIndex(count as u16));
        }
        Ok(pool)
    }

    pub(crate) fn write(&self, out: &mut Writer) -> Result<()> {
        out.put_count(self.entries.len(), "constant pool")?;
        for entry in &self.entries {
            entry.write(out)?;
        }
        Ok(())
    }

    /// The `constant_pool_count` value (number of slots including index 0).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match self.entries.get(index as usize) {
            Some(CpInfo::Unusable) | None => Err(Error::InvalidConstantPoolIndex(index)),
            Some(info) => Ok(info),
        }
    }

    pub fn get_utf8(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Utf8(bytes) => mutf8::decode(bytes),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub fn get_class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Class { name_index } => self.get_utf8(*name_index),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub fn get_name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.get_utf8(*name_index)?, self.get_utf8(*descriptor_index)?)),
            other => Err(mismatch(index, "NameAndType", other)),
        }
    }

    /// Resolves a `Fieldref`, `Methodref` or `InterfaceMethodref`.
    pub fn get_member_ref(&self, index: u16) -> Result<MemberRef> {
        let (class_index, nat_index, interface) = match self.get(index)? {
            CpInfo::Fieldref {
                class_index,
                name_and_type_index,
            }
            | CpInfo::Methodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false),
            CpInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true),
            other => return Err(mismatch(index, "Fieldref/Methodref", other)),
        };
        let owner = self.get_class_name(class_index)?;
        let (name, descriptor) = self.get_name_and_type(nat_index)?;
        Ok(MemberRef {
            owner,
            name,
            descriptor,
            interface,
        })
    }

    pub fn get_method_handle(&self, index: u16) -> Result<MethodHandleRef> {
        match self.get(index)? {
            CpInfo::MethodHandle {
                reference_kind,
                reference_index,
            } => Ok(MethodHandleRef {
                reference_kind: *reference_kind,
                member: self.get_member_ref(*reference_index)?,
            }),
            other => Err(mismatch(index, "MethodHandle", other)),
        }
    }

    pub fn get_method_type(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::MethodType { descriptor_index } => self.get_utf8(*descriptor_index),
            other => Err(mismatch(index, "MethodType", other)),
        }
    }

    pub fn get_invoke_dynamic(&self, index: u16) -> Result<InvokeDynamicRef> {
        match self.get(index)? {
            CpInfo::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                let (name, descriptor) = self.get_name_and_type(*name_and_type_index)?;
                Ok(InvokeDynamicRef {
                    bootstrap_method_attr_index: *bootstrap_method_attr_index,
                    name,
                    descriptor,
                })
            }
            other => Err(mismatch(index, "InvokeDynamic", other)),
        }
    }

    /// Returns the index of `info`, appending it when it is not present yet.
    pub fn intern(&mut self, info: CpInfo) -> Result<u16> {
        if let Some(index) = self.interned.get(&info) {
            return Ok(*index);
        }
        let slots = if info.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow);
        }
        let index = self.entries.len() as u16;
        let wide = info.is_wide();
        self.interned.insert(info.clone(), index);
        self.entries.push(info);
        if wide {
            self.entries.push(CpInfo::Unusable);
        }
        Ok(index)
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.intern(CpInfo::Utf8(mutf8::encode(value)))
    }

    pub fn class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.utf8(name)?;
        self.intern(CpInfo::Class { name_index })
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.utf8(value)?;
        self.intern(CpInfo::String { string_index })
    }

    pub fn integer(&mut self, value: i32) -> Result<u16> {
        self.intern(CpInfo::Integer(value))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.utf8(name)?;
        let descriptor_index = self.utf8(descriptor)?;
        self.intern(CpInfo::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn field_ref(&mut self, member: &MemberRef) -> Result<u16> {
        let class_index = self.class(&member.owner)?;
        let name_and_type_index = self.name_and_type(&member.name, &member.descriptor)?;
        self.intern(CpInfo::Fieldref {
            class_index,
            name_and_type_index,
        })
    }

    /// Interns a `Methodref`, or an `InterfaceMethodref` when `member.interface` is set.
    pub fn method_ref(&mut self, member: &MemberRef) -> Result<u16> {
        let class_index = self.class(&member.owner)?;
        let name_and_type_index = self.name_and_type(&member.name, &member.descriptor)?;
        if member.interface {
            self.intern(CpInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            })
        } else {
            self.intern(CpInfo::Methodref {
                class_index,
                name_and_type_index,
            })
        }
    }
}

fn mismatch(index: u16, expected: &'static str, found: &CpInfo) -> Error {
    Error::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}
