use unindy_classfile::{
    decode_instructions, ClassFile, CodeAttribute, CpInfo, Error, Operand,
};

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_utf8(out: &mut Vec<u8>, s: &str) {
    out.push(1); // CONSTANT_Utf8
    push_u16(out, s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}

/// `class Sum { static int sum(int a, int b) { return a + b; } }` plus a `SourceFile`
/// attribute, laid out by hand.
fn sum_class_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    push_u32(&mut bytes, 0xCAFEBABE);
    push_u16(&mut bytes, 0);
    push_u16(&mut bytes, 52);

    // 1: Utf8 Sum, 2: Class #1, 3: Utf8 java/lang/Object, 4: Class #3,
    // 5: Utf8 sum, 6: Utf8 (II)I, 7: Utf8 Code, 8: Long 42 (+ unusable 9),
    // 10: Utf8 SourceFile, 11: Utf8 Sum.java
    push_u16(&mut bytes, 12);
    push_utf8(&mut bytes, "Sum");
    bytes.push(7);
    push_u16(&mut bytes, 1);
    push_utf8(&mut bytes, "java/lang/Object");
    bytes.push(7);
    push_u16(&mut bytes, 3);
    push_utf8(&mut bytes, "sum");
    push_utf8(&mut bytes, "(II)I");
    push_utf8(&mut bytes, "Code");
    bytes.push(5);
    bytes.extend_from_slice(&42i64.to_be_bytes());
    push_utf8(&mut bytes, "SourceFile");
    push_utf8(&mut bytes, "Sum.java");

    push_u16(&mut bytes, 0x0021);
    push_u16(&mut bytes, 2);
    push_u16(&mut bytes, 4);
    push_u16(&mut bytes, 0); // interfaces
    push_u16(&mut bytes, 0); // fields

    push_u16(&mut bytes, 1); // methods
    push_u16(&mut bytes, 0x0008);
    push_u16(&mut bytes, 5);
    push_u16(&mut bytes, 6);
    push_u16(&mut bytes, 1);
    push_u16(&mut bytes, 7);
    let code = [0x1a, 0x1b, 0x60, 0xac]; // iload_0 iload_1 iadd ireturn
    push_u32(&mut bytes, 12 + code.len() as u32);
    push_u16(&mut bytes, 2);
    push_u16(&mut bytes, 2);
    push_u32(&mut bytes, code.len() as u32);
    bytes.extend_from_slice(&code);
    push_u16(&mut bytes, 0); // exception table
    push_u16(&mut bytes, 0); // code attributes

    push_u16(&mut bytes, 1); // class attributes
    push_u16(&mut bytes, 10);
    push_u32(&mut bytes, 2);
    push_u16(&mut bytes, 11);
    bytes
}

#[test]
fn parses_members_and_code() {
    let class = ClassFile::parse(&sum_class_bytes()).unwrap();
    assert_eq!(class.major_version, 52);
    assert_eq!(class.this_class_name().unwrap(), "Sum");
    assert!(!class.is_interface());
    assert!(class.bootstrap_methods().unwrap().is_empty());
    assert_eq!(class.constant_pool.get(8).unwrap(), &CpInfo::Long(42));
    assert_eq!(class.constant_pool.get(9).unwrap(), &CpInfo::Unusable);

    let method = &class.methods[0];
    let cp = &class.constant_pool;
    assert_eq!(method.name(cp).unwrap(), "sum");
    assert_eq!(method.descriptor(cp).unwrap(), "(II)I");
    assert!(method.is_static());

    let idx = method.code_attribute_index(cp).unwrap().unwrap();
    let code = CodeAttribute::parse(&method.attributes[idx].info).unwrap();
    assert_eq!((code.max_stack, code.max_locals), (2, 2));
    let insns = decode_instructions(&code.code).unwrap();
    assert_eq!(insns.len(), 4);
    assert!(insns.iter().all(|insn| insn.operand == Operand::None));
}

#[test]
fn unchanged_class_writes_back_identically() {
    let bytes = sum_class_bytes();
    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.to_bytes().unwrap(), bytes);
}

#[test]
fn rejects_bad_magic_and_truncation() {
    let mut bytes = sum_class_bytes();
    bytes[0] = 0xCB;
    assert!(matches!(
        ClassFile::parse(&bytes),
        Err(Error::InvalidMagic(0xCBFEBABE))
    ));

    let bytes = sum_class_bytes();
    assert!(matches!(
        ClassFile::parse(&bytes[..bytes.len() - 1]),
        Err(Error::UnexpectedEof)
    ));

    let mut bytes = sum_class_bytes();
    bytes.push(0);
    assert!(matches!(
        ClassFile::parse(&bytes),
        Err(Error::TrailingBytes(1))
    ));
}
