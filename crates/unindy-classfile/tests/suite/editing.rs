use unindy_classfile::{
    access, assemble, compute_max_locals, compute_max_stack, parse_method_descriptor,
    AttributeInfo, ClassFile, CodeAttribute, ConstantPool, Insn, InvokeKind, LocalKind,
    MemberInfo, MemberRef,
};

fn empty_class(name: &str) -> ClassFile {
    let mut constant_pool = ConstantPool::new();
    let this_class = constant_pool.class(name).unwrap();
    let super_class = constant_pool.class("java/lang/Object").unwrap();
    ClassFile {
        minor_version: 0,
        major_version: 52,
        constant_pool,
        access_flags: access::ACC_PUBLIC,
        this_class,
        super_class,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        attributes: Vec::new(),
    }
}

fn add_method(class: &mut ClassFile, flags: u16, name: &str, desc: &str, code: &CodeAttribute) {
    let cp = &mut class.constant_pool;
    let method = MemberInfo {
        access_flags: flags,
        name_index: cp.utf8(name).unwrap(),
        descriptor_index: cp.utf8(desc).unwrap(),
        attributes: vec![AttributeInfo {
            name_index: cp.utf8("Code").unwrap(),
            info: code.encode().unwrap(),
        }],
    };
    class.methods.push(method);
}

#[test]
fn assembled_method_survives_a_write_and_reparse() {
    let mut class = empty_class("demo/Greeter");
    let println = MemberRef::new("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let out = MemberRef::new("java/lang/System", "out", "Ljava/io/PrintStream;");
    let code = assemble(
        &[
            Insn::GetStatic(out),
            Insn::LdcString("hello".to_string()),
            Insn::Invoke(InvokeKind::Virtual, println.clone()),
            Insn::Return(None),
        ],
        &mut class.constant_pool,
        0,
    )
    .unwrap();
    assert_eq!(code.max_stack, 2);
    add_method(
        &mut class,
        access::ACC_PUBLIC | access::ACC_STATIC,
        "greet",
        "()V",
        &code,
    );

    let bytes = class.to_bytes().unwrap();
    let reparsed = ClassFile::parse(&bytes).unwrap();
    assert_eq!(reparsed.this_class_name().unwrap(), "demo/Greeter");
    let method = &reparsed.methods[0];
    assert_eq!(method.name(&reparsed.constant_pool).unwrap(), "greet");
    let idx = method
        .code_attribute_index(&reparsed.constant_pool)
        .unwrap()
        .unwrap();
    let decoded = CodeAttribute::parse(&method.attributes[idx].info).unwrap();
    assert_eq!(decoded, code);
    assert_eq!(
        compute_max_stack(&decoded, &reparsed.constant_pool).unwrap(),
        2
    );
}

#[test]
fn interning_reuses_existing_constants() {
    let mut class = empty_class("demo/Reuse");
    let before = class.constant_pool.len();
    assert_eq!(
        class.constant_pool.class("demo/Reuse").unwrap(),
        class.this_class
    );
    assert_eq!(class.constant_pool.len(), before);

    let a = class
        .constant_pool
        .method_ref(&MemberRef::new("demo/Reuse", "m", "()V"))
        .unwrap();
    let b = class
        .constant_pool
        .method_ref(&MemberRef::new("demo/Reuse", "m", "()V"))
        .unwrap();
    let c = class
        .constant_pool
        .method_ref(&MemberRef::new("demo/Reuse", "m", "()V").interface(true))
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn locals_cover_receiver_parameters_and_body() {
    let mut cp = ConstantPool::new();
    let code = assemble(
        &[
            Insn::Load(LocalKind::Double, 1),
            Insn::Store(LocalKind::Double, 3),
            Insn::Return(None),
        ],
        &mut cp,
        5,
    )
    .unwrap();
    let desc = parse_method_descriptor("(D)V").unwrap();
    assert_eq!(compute_max_locals(&code.code, &desc, false).unwrap(), 5);
    assert_eq!(compute_max_locals(&[0xb1], &desc, false).unwrap(), 3);
}
