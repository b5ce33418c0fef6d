use crate::classfile::{parse_attributes, write_attributes, AttributeInfo};
use crate::error::{Error, Result};
use crate::reader::{Reader, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Decoded `Code` attribute body. Nested attributes (line numbers, local variable
/// tables, stack map frames) stay raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn parse(info: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(info);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()? as usize;
        if code_length == 0 || code_length > u16::MAX as usize {
            return Err(Error::MalformedAttribute("Code"));
        }
        let code = reader.read_bytes(code_length)?.to_vec();

        let handlers = reader.read_u2()? as usize;
        let mut exception_table = Vec::with_capacity(handlers);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: reader.read_u2()?,
                end_pc: reader.read_u2()?,
                handler_pc: reader.read_u2()?,
                catch_type: reader.read_u2()?,
            });
        }

        let attributes = parse_attributes(&mut reader)?;
        reader
            .ensure_empty()
            .map_err(|_| Error::MalformedAttribute("Code"))?;

        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.code.is_empty() || self.code.len() > u16::MAX as usize {
            return Err(Error::LimitExceeded("code length"));
        }
        let mut out = Writer::new();
        out.put_u2(self.max_stack);
        out.put_u2(self.max_locals);
        out.put_u4(self.code.len() as u32);
        out.put_bytes(&self.code);
        out.put_count(self.exception_table.len(), "exception table")?;
        for handler in &self.exception_table {
            out.put_u2(handler.start_pc);
            out.put_u2(handler.end_pc);
            out.put_u2(handler.handler_pc);
            out.put_u2(handler.catch_type);
        }
        write_attributes(&mut out, &self.attributes)?;
        Ok(out.into_bytes())
    }
}
