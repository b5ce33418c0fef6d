use std::collections::HashSet;

use unindy_classfile::{
    access, assemble, compute_max_locals, compute_max_stack, decode_instructions,
    opcodes::{INVOKEDYNAMIC, INVOKESTATIC, NOP},
    parse_method_descriptor, AttributeInfo, ClassFile, CodeAttribute, MemberInfo, MemberRef,
    Operand,
};

use crate::bootstrap::BootstrapSpec;
use crate::error::{DesugarError, Result};
use crate::synth::{helper_name, sanitize_method_name, synthesize_helper, CallSite, GeneratedHelper};

/// Access flags of every synthesized helper.
pub const HELPER_ACCESS: u16 = access::ACC_PRIVATE | access::ACC_STATIC | access::ACC_SYNTHETIC;

/// What [`desugar_class`] did to one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesugarReport {
    pub class_name: String,
    /// Names of the helpers appended to the class, in creation order.
    pub helpers: Vec<String>,
}

impl DesugarReport {
    pub fn call_sites(&self) -> usize {
        self.helpers.len()
    }
}

/// Parses a classfile, desugars it and encodes it again.
///
/// Classes without `invokedynamic` are returned unchanged.
pub fn desugar_class_bytes(bytes: &[u8]) -> Result<(Vec<u8>, DesugarReport)> {
    let mut class = ClassFile::parse(bytes)?;
    let report = desugar_class(&mut class)?;
    if report.helpers.is_empty() {
        return Ok((bytes.to_vec(), report));
    }
    Ok((class.to_bytes()?, report))
}

/// Replaces every `invokedynamic` in `class` with an `invokestatic` of a synthesized
/// helper.
///
/// The 5-byte instruction is overwritten in place by a 3-byte `invokestatic` and two
/// `nop`s, so no offset in the method moves. When at least one call site was rewritten,
/// `max_stack` and `max_locals` of every method with code are recomputed.
pub fn desugar_class(class: &mut ClassFile) -> Result<DesugarReport> {
    let class_name = class.this_class_name()?;
    let _span = tracing::debug_span!("desugar_class", class = %class_name).entered();

    let bootstrap_methods = class.bootstrap_methods()?;
    let is_interface = class.is_interface();
    let mut taken = class
        .methods
        .iter()
        .map(|method| method.name(&class.constant_pool))
        .collect::<unindy_classfile::Result<HashSet<_>>>()?;

    let mut report = DesugarReport {
        class_name: class_name.clone(),
        helpers: Vec::new(),
    };
    let mut helpers = Vec::new();

    for method_idx in 0..class.methods.len() {
        let cp = &class.constant_pool;
        let method = &class.methods[method_idx];
        let Some(code_idx) = method.code_attribute_index(cp)? else {
            continue;
        };
        let mut code = CodeAttribute::parse(&method.attributes[code_idx].info)?;
        let method_name = method.name(cp)?;
        let base_name = sanitize_method_name(&method_name).to_string();

        let mut sites = Vec::new();
        for insn in decode_instructions(&code.code)? {
            if insn.opcode != INVOKEDYNAMIC {
                continue;
            }
            let Operand::Dynamic(index) = insn.operand else {
                continue;
            };
            let indy = cp.get_invoke_dynamic(index)?;
            let bsm = bootstrap_methods
                .get(indy.bootstrap_method_attr_index as usize)
                .ok_or(DesugarError::MissingBootstrapMethod {
                    offset: insn.offset,
                    index: indy.bootstrap_method_attr_index,
                })?;
            let call_site = CallSite {
                name: indy.name,
                descriptor: indy.descriptor,
                bootstrap: BootstrapSpec::resolve(cp, bsm)?,
            };
            sites.push((insn.offset, call_site));
        }
        if sites.is_empty() {
            continue;
        }

        let mut counter = 0u32;
        for (offset, call_site) in sites {
            while taken.contains(&helper_name(&base_name, counter)) {
                counter += 1;
            }
            let helper = synthesize_helper(&class_name, &base_name, counter, &call_site)?;
            let name = helper.name();
            tracing::debug!(
                method = %method_name,
                offset,
                helper = %name,
                descriptor = %helper.descriptor,
                "desugared invokedynamic"
            );

            let target = MemberRef::new(&class_name, &name, &helper.descriptor)
                .interface(is_interface);
            let [hi, lo] = class.constant_pool.method_ref(&target)?.to_be_bytes();
            let at = offset as usize;
            code.code[at..at + 5].copy_from_slice(&[INVOKESTATIC, hi, lo, NOP, NOP]);

            taken.insert(name.clone());
            report.helpers.push(name);
            helpers.push(helper);
            counter += 1;
        }

        class.methods[method_idx].attributes[code_idx].info = code.encode()?;
    }

    if helpers.is_empty() {
        return Ok(report);
    }

    for helper in &helpers {
        let member = emit_helper(class, helper)?;
        class.methods.push(member);
    }
    recompute_max_values(class)?;

    Ok(report)
}

fn emit_helper(class: &mut ClassFile, helper: &GeneratedHelper) -> Result<MemberInfo> {
    let cp = &mut class.constant_pool;
    let code = assemble(&helper.body, cp, helper.layout.max_locals())?;
    Ok(MemberInfo {
        access_flags: HELPER_ACCESS,
        name_index: cp.utf8(&helper.name())?,
        descriptor_index: cp.utf8(&helper.descriptor)?,
        attributes: vec![AttributeInfo {
            name_index: cp.utf8("Code")?,
            info: code.encode()?,
        }],
    })
}

fn recompute_max_values(class: &mut ClassFile) -> Result<()> {
    let cp = &class.constant_pool;
    for method in &mut class.methods {
        let Some(code_idx) = method.code_attribute_index(cp)? else {
            continue;
        };
        let descriptor = parse_method_descriptor(&method.descriptor(cp)?)?;
        let mut code = CodeAttribute::parse(&method.attributes[code_idx].info)?;
        code.max_stack = compute_max_stack(&code, cp)?;
        code.max_locals = compute_max_locals(&code.code, &descriptor, method.is_static())?;
        method.attributes[code_idx].info = code.encode()?;
    }
    Ok(())
}
