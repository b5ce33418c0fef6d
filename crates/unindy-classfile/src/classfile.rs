use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::{Reader, Writer};

pub const MAGIC: u32 = 0xCAFEBABE;

/// Access flag bits shared by classes, fields and methods.
pub mod access {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

/// An attribute kept as raw bytes; only the ones the rewriter needs are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn name(&self, cp: &ConstantPool) -> Result<String> {
        cp.get_utf8(self.name_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MemberInfo {
    pub fn name(&self, cp: &ConstantPool) -> Result<String> {
        cp.get_utf8(self.name_index)
    }

    pub fn descriptor(&self, cp: &ConstantPool) -> Result<String> {
        cp.get_utf8(self.descriptor_index)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & access::ACC_STATIC != 0
    }

    /// Position of the `Code` attribute in `attributes`, if the member has one.
    pub fn code_attribute_index(&self, cp: &ConstantPool) -> Result<Option<usize>> {
        find_attribute(&self.attributes, cp, "Code")
    }
}

/// A `bootstrap_methods` entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

/// Mutable in-memory form of a classfile.
///
/// Only the constant pool, member tables and `Code` attributes are modelled; every other
/// attribute round-trips as raw bytes.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let constant_pool = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(reader.read_u2()?);
        }

        let fields = parse_members(&mut reader)?;
        let methods = parse_members(&mut reader)?;
        let attributes = parse_attributes(&mut reader)?;

        reader.ensure_empty()?;

        Ok(Self {
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

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Writer::new();
        out.put_u4(MAGIC);
        out.put_u2(self.minor_version);
        out.put_u2(self.major_version);
        self.constant_pool.write(&mut out)?;
        out.put_u2(self.access_flags);
        out.put_u2(self.this_class);
        out.put_u2(self.super_class);
        out.put_count(self.interfaces.len(), "interfaces")?;
        for interface in &self.interfaces {
            out.put_u2(*interface);
        }
        write_members(&mut out, &self.fields, "fields")?;
        write_members(&mut out, &self.methods, "methods")?;
        write_attributes(&mut out, &self.attributes)?;
        Ok(out.into_bytes())
    }

    pub fn this_class_name(&self) -> Result<String> {
        self.constant_pool.get_class_name(self.this_class)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access::ACC_INTERFACE != 0
    }

    /// Decodes the class-level `BootstrapMethods` attribute (empty when absent).
    pub fn bootstrap_methods(&self) -> Result<Vec<BootstrapMethod>> {
        let Some(idx) = find_attribute(&self.attributes, &self.constant_pool, "BootstrapMethods")?
        else {
            return Ok(Vec::new());
        };

        let mut reader = Reader::new(&self.attributes[idx].info);
        let count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(count);
        for _ in 0..count {
            let method_ref = reader.read_u2()?;
            let num_arguments = reader.read_u2()? as usize;
            let mut arguments = Vec::with_capacity(num_arguments);
            for _ in 0..num_arguments {
                arguments.push(reader.read_u2()?);
            }
            methods.push(BootstrapMethod {
                method_ref,
                arguments,
            });
        }
        reader
            .ensure_empty()
            .map_err(|_| Error::MalformedAttribute("BootstrapMethods"))?;
        Ok(methods)
    }
}

pub(crate) fn find_attribute(
    attributes: &[AttributeInfo],
    cp: &ConstantPool,
    name: &str,
) -> Result<Option<usize>> {
    for (idx, attr) in attributes.iter().enumerate() {
        if attr.name(cp)? == name {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

fn parse_members(reader: &mut Reader<'_>) -> Result<Vec<MemberInfo>> {
    let count = reader.read_u2()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes = parse_attributes(reader)?;
        members.push(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
    }
    Ok(members)
}

pub(crate) fn parse_attributes(reader: &mut Reader<'_>) -> Result<Vec<AttributeInfo>> {
    let count = reader.read_u2()? as usize;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?.to_vec();
        attributes.push(AttributeInfo { name_index, info });
    }
    Ok(attributes)
}

fn write_members(out: &mut Writer, members: &[MemberInfo], what: &'static str) -> Result<()> {
    out.put_count(members.len(), what)?;
    for member in members {
        out.put_u2(member.access_flags);
        out.put_u2(member.name_index);
        out.put_u2(member.descriptor_index);
        write_attributes(out, &member.attributes)?;
    }
    Ok(())
}

pub(crate) fn write_attributes(out: &mut Writer, attributes: &[AttributeInfo]) -> Result<()> {
    out.put_count(attributes.len(), "attributes")?;
    for attr in attributes {
        out.put_u2(attr.name_index);
        let len = u32::try_from(attr.info.len()).map_err(|_| Error::LimitExceeded("attribute"))?;
        out.put_u4(len);
        out.put_bytes(&attr.info);
    }
    Ok(())
}
