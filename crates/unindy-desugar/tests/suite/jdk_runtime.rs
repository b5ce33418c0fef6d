//! Runs desugared classes on a real JVM. Skipped when `javac`/`java` are not on `PATH`.

use std::fs;
use std::path::Path;
use std::process::Command;

use unindy_classfile::{access, decode_instructions, ClassFile, CodeAttribute, MemberRef};
use unindy_desugar::{desugar_class_bytes, DesugarError};

use super::fixture::{invokedynamic, Fixture};

fn jdk_available() -> bool {
    Command::new("javac")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
        && Command::new("java")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
}

fn javac(dir: &Path, file_name: &str, source: &str) {
    let source_path = dir.join(file_name);
    fs::write(&source_path, source).unwrap();
    let out = Command::new("javac")
        .arg("-d")
        .arg(dir)
        .arg(&source_path)
        .output()
        .expect("failed to run javac");
    assert!(
        out.status.success(),
        "javac failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

fn run_java(dir: &Path, main_class: &str) -> Vec<String> {
    let out = Command::new("java")
        .arg("-cp")
        .arg(dir)
        .arg(main_class)
        .output()
        .expect("failed to run java");
    assert!(
        out.status.success(),
        "java failed (exit {}): stderr={}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn assert_no_invokedynamic(bytes: &[u8]) {
    let class = ClassFile::parse(bytes).unwrap();
    let cp = &class.constant_pool;
    for method in &class.methods {
        let Some(idx) = method.code_attribute_index(cp).unwrap() else {
            continue;
        };
        let code = CodeAttribute::parse(&method.attributes[idx].info).unwrap();
        for insn in decode_instructions(&code.code).unwrap() {
            assert_ne!(
                insn.opcode,
                0xba,
                "invokedynamic left in {} at {}",
                method.name(cp).unwrap(),
                insn.offset
            );
        }
    }
}

/// Rewrites `dir/<class_name>.class` in place and returns the number of call sites.
fn desugar_in_place(dir: &Path, class_name: &str) -> usize {
    let class_path = dir.join(format!("{class_name}.class"));
    let (rewritten, report) = desugar_class_bytes(&fs::read(&class_path).unwrap()).unwrap();
    assert_no_invokedynamic(&rewritten);
    fs::write(&class_path, rewritten).unwrap();
    report.call_sites()
}

const LAMBDAS: &str = r#"
import java.util.function.*;

public class Lambdas {
    interface IntOp { int apply(int a, int b); }
    interface Mixer { double mix(long a, int b, double c); }

    public static void main(String[] args) {
        IntOp add = (a, b) -> a + b;
        System.out.println(add.apply(40, 2));
        Function<String, Integer> length = String::length;
        System.out.println(length.apply("desugared"));
        int base = args.length + 7;
        long wide = 1L << 40;
        double half = 0.5;
        IntSupplier captured = () -> base * 6;
        System.out.println(captured.getAsInt());
        LongSupplier shifted = () -> wide + base;
        System.out.println(shifted.getAsLong());
        Mixer mixer = (a, b, c) -> a * b + c + half;
        System.out.println(mixer.mix(3L, 4, 0.25));
        Supplier<String> text = () -> "done";
        Runnable done = () -> System.out.println(text.get());
        done.run();
    }
}
"#;

#[test]
fn desugared_lambdas_behave_like_the_originals() {
    if !jdk_available() {
        eprintln!("skipping: javac/java not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    javac(dir.path(), "Lambdas.java", LAMBDAS);
    let expected = run_java(dir.path(), "Lambdas");
    assert_eq!(
        expected,
        vec!["42", "9", "42", "1099511627783", "12.75", "done"]
    );

    assert_eq!(desugar_in_place(dir.path(), "Lambdas"), 7);
    assert_eq!(run_java(dir.path(), "Lambdas"), expected);
}

const CONCAT: &str = r#"
public class Concat {
    public static void main(String[] args) {
        int x = args.length;
        System.out.println("n=" + x);
    }
}
"#;

#[test]
fn javac_string_concatenation_is_rejected_for_its_recipe() {
    if !jdk_available() {
        eprintln!("skipping: javac/java not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    javac(dir.path(), "Concat.java", CONCAT);
    let bytes = fs::read(dir.path().join("Concat.class")).unwrap();

    match desugar_class_bytes(&bytes) {
        Err(err) => assert!(
            matches!(
                err,
                DesugarError::UnsupportedBootstrapArgumentType { kind: "String", .. }
            ),
            "unexpected error: {err:?}"
        ),
        // javac 8 lowers concatenation to StringBuilder calls.
        Ok((_, report)) => assert_eq!(report.call_sites(), 0),
    }
}

const BOOTSTRAPS: &str = r#"
import java.lang.invoke.*;

public class Bootstraps {
    public static CallSite bsm(MethodHandles.Lookup lookup, String name, MethodType type)
            throws ReflectiveOperationException {
        return new ConstantCallSite(lookup.findStatic(Bootstraps.class, name, type));
    }

    public static int add(int a, int b) { return a + b; }
    public static double scale(long a, double b) { return a * b; }
    public static boolean odd(char c, short s, byte b) { return ((c + s + b) & 1) == 1; }
    public static void hello() { System.out.println("hello"); }
}
"#;

/// `Caller.main` prints the results of four call sites bootstrapped by `Bootstraps.bsm`.
fn caller_class() -> Vec<u8> {
    let mut fixture = Fixture::new("Caller", access::ACC_PUBLIC);
    let bsm = fixture.static_bootstrap("Bootstraps", "bsm", Vec::new());
    let add = fixture.indy(bsm, "add", "(II)I");
    let scale = fixture.indy(bsm, "scale", "(JD)D");
    let odd = fixture.indy(bsm, "odd", "(CSB)Z");
    let hello = fixture.indy(bsm, "hello", "()V");

    let out = fixture
        .cp()
        .field_ref(&MemberRef::new("java/lang/System", "out", "Ljava/io/PrintStream;"))
        .unwrap()
        .to_be_bytes();
    let println = |fixture: &mut Fixture, desc: &str| {
        fixture
            .cp()
            .method_ref(&MemberRef::new("java/io/PrintStream", "println", desc))
            .unwrap()
            .to_be_bytes()
    };
    let println_int = println(&mut fixture, "(I)V");
    let println_double = println(&mut fixture, "(D)V");
    let println_boolean = println(&mut fixture, "(Z)V");

    let mut code = Vec::new();
    // System.out.println(add(40, 2))
    code.extend_from_slice(&[0xb2, out[0], out[1], 0x10, 40, 0x05]);
    code.extend_from_slice(&invokedynamic(add));
    code.extend_from_slice(&[0xb6, println_int[0], println_int[1]]);
    // System.out.println(scale(3L, 1.0))
    code.extend_from_slice(&[0xb2, out[0], out[1], 0x06, 0x85, 0x0f]);
    code.extend_from_slice(&invokedynamic(scale));
    code.extend_from_slice(&[0xb6, println_double[0], println_double[1]]);
    // System.out.println(odd('a', 2, 0))
    code.extend_from_slice(&[0xb2, out[0], out[1], 0x10, 97, 0x05, 0x03]);
    code.extend_from_slice(&invokedynamic(odd));
    code.extend_from_slice(&[0xb6, println_boolean[0], println_boolean[1]]);
    // hello()
    code.extend_from_slice(&invokedynamic(hello));
    code.push(0xb1);

    fixture.method(
        access::ACC_PUBLIC | access::ACC_STATIC,
        "main",
        "([Ljava/lang/String;)V",
        code,
    );
    fixture.build().to_bytes().unwrap()
}

#[test]
fn primitive_call_sites_box_and_unbox_exactly() {
    if !jdk_available() {
        eprintln!("skipping: javac/java not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    javac(dir.path(), "Bootstraps.java", BOOTSTRAPS);
    fs::write(dir.path().join("Caller.class"), caller_class()).unwrap();

    let expected = vec!["42", "3.0", "true", "hello"];
    assert_eq!(run_java(dir.path(), "Caller"), expected);

    assert_eq!(desugar_in_place(dir.path(), "Caller"), 4);
    assert_eq!(run_java(dir.path(), "Caller"), expected);
}
