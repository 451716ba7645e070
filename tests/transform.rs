use callsite_redirect::jvm::class_file::{
    Attribute, BytecodeArray, ClassFile, ClassConstantIndex, Code, ConstantIndex, ConstantsPool,
    Method, MethodRef, MethodRefConstantIndex, Version,
};
use callsite_redirect::jvm::{ClassAccessFlags, MethodAccessFlags};
use callsite_redirect::redirect::{
    ClassTransformer, Error, MethodKey, Registry, Settings, TargetTracker, TrackedTypeId,
};
use std::borrow::Cow;

/// In-memory class file builder for call site fixtures
struct TestClass {
    name: String,
    version: Version,
    access_flags: ClassAccessFlags,
    constants: ConstantsPool,
    methods: Vec<Method>,
}

impl TestClass {
    fn new(name: &str) -> TestClass {
        TestClass {
            name: name.to_owned(),
            version: Version::JAVA8,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            constants: ConstantsPool::new(),
            methods: vec![],
        }
    }

    fn interface(name: &str, version: Version) -> TestClass {
        let mut class = TestClass::new(name);
        class.version = version;
        class.access_flags =
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        class
    }

    /// Operand bytes for a method reference
    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> [u8; 2] {
        let idx = self
            .constants
            .get_method_ref(owner, name, descriptor, interface)
            .unwrap();
        (idx.0).0.to_be_bytes()
    }

    /// Operand bytes of `invokevirtual`/`invokeinterface` of a method
    fn call(&mut self, owner: &str, name: &str, descriptor: &str) -> [u8; 2] {
        self.method_ref(owner, name, descriptor, false)
    }

    fn add_static_method(&mut self, name: &str, descriptor: &str, max_locals: u16, code: Vec<u8>) {
        let name_index = self.constants.get_utf8(name).unwrap();
        let descriptor_index = self.constants.get_utf8(descriptor).unwrap();
        let code = self
            .constants
            .get_attribute(Code {
                max_stack: 4,
                max_locals,
                code_array: BytecodeArray(code),
                exception_table: vec![],
                attributes: vec![],
            })
            .unwrap();
        self.methods.push(Method {
            access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            name_index,
            descriptor_index,
            attributes: vec![code],
        });
    }

    fn finish(mut self) -> Vec<u8> {
        let this_class = self.constants.get_class(&self.name).unwrap();
        let super_class = self.constants.get_class("java/lang/Object").unwrap();
        ClassFile {
            version: self.version,
            constants: self.constants,
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: self.methods,
            attributes: vec![],
        }
        .to_bytes()
        .unwrap()
    }
}

/// Placeholder text swapped for an unpaired surrogate by [`with_unpaired_surrogate`]
const SURROGATE_PLACEHOLDER: &str = "@@@";

/// Replace the placeholder `CONSTANT_Utf8_info` with the encoding of `"\uD800"`, as javac would
/// emit it for that string literal
///
/// Both are three bytes long, so nothing else in the class moves.
fn with_unpaired_surrogate(mut bytes: Vec<u8>) -> Vec<u8> {
    let placeholder = [1, 0, 3, b'@', b'@', b'@'];
    let start = bytes
        .windows(placeholder.len())
        .position(|window| window == placeholder)
        .expect("placeholder constant");
    bytes[start + 3..start + 6].copy_from_slice(&[0xED, 0xA0, 0x80]);
    bytes
}

fn find_method<'c>(class: &'c ClassFile, name: &str) -> &'c Method {
    class
        .methods
        .iter()
        .find(|method| class.method_name(method).unwrap() == name)
        .unwrap_or_else(|| panic!("no method {}", name))
}

fn find_attribute<'c>(class: &ClassFile, attributes: &'c [Attribute], name: &str) -> Option<&'c Attribute> {
    attributes
        .iter()
        .find(|attribute| class.constants.utf8(attribute.name_index).unwrap() == name)
}

fn method_code(class: &ClassFile, name: &str) -> Code {
    let method = find_method(class, name);
    find_attribute(class, &method.attributes, "Code")
        .unwrap()
        .decode()
        .unwrap()
}

fn method_ref_at<'c>(class: &'c ClassFile, code: &[u8], offset: usize) -> MethodRef<'c> {
    let idx = u16::from_be_bytes([code[offset + 1], code[offset + 2]]);
    class
        .constants
        .method_ref(MethodRefConstantIndex(ConstantIndex(idx)))
        .unwrap()
}

fn class_at<'c>(class: &'c ClassFile, code: &[u8], offset: usize) -> &'c str {
    let idx = u16::from_be_bytes([code[offset + 1], code[offset + 2]]);
    class
        .constants
        .class_name(ClassConstantIndex(ConstantIndex(idx)))
        .unwrap()
}

fn method(owner: &'static str, name: &'static str, descriptor: &'static str) -> MethodRef<'static> {
    MethodRef {
        owner,
        name,
        descriptor,
        is_interface: false,
    }
}

/// `OwnerX.doThing(I)V` redirected to `Helper.<replacement>` for each tracked type, in order
fn do_thing_registry(tracked: &[(&str, &str)]) -> (Registry, Vec<TrackedTypeId>) {
    let mut registry = Registry::new();
    let mut ids = vec![];
    for (tracked_type, replacement) in tracked {
        let id = registry.register_type(tracked_type).unwrap();
        registry
            .register_redirect(
                MethodKey::parse("owner/OwnerX", "doThing", "(I)V").unwrap(),
                id,
                TargetTracker::parse("helper/Helper", replacement, "(Ljava/lang/Object;I)V")
                    .unwrap(),
            )
            .unwrap();
        ids.push(id);
    }
    (registry, ids)
}

/// Static `run(OwnerX)` calling `doThing(5)` on its argument
fn do_thing_caller(name: &str) -> (Vec<u8>, [u8; 2]) {
    let mut class = TestClass::new(name);
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    (class.finish(), [hi, lo])
}

#[test]
fn unregistered_calls_are_untouched() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [hi, lo] = class.call("owner/OwnerX", "doOtherThing", "(I)V");
    let [hi2, lo2] = class.call("owner/Unrelated", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0x2a, 0x08, 0xb6, hi2, lo2, 0xb1],
    );
    let bytes = class.finish();

    let output = transformer.transform("app.Caller", &bytes).unwrap();
    assert!(matches!(output, Cow::Borrowed(_)));
    assert_eq!(&*output, &bytes[..]);
    assert!(!transformer.has_transformed("app/Caller"));
}

#[test]
fn empty_and_malformed_classes() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let output = transformer.transform("app/Empty", &[]).unwrap();
    assert!(output.is_empty());

    assert!(matches!(
        transformer.transform("app/Bad", &[0xCA, 0xFE, 0xBA, 0xBE, 0, 0]),
        Err(Error::ClassFormat(_))
    ));

    let (bytes, _) = do_thing_caller("app/Caller");
    assert!(matches!(
        transformer.transform("app/Caller", &bytes[..bytes.len() - 1]),
        Err(Error::ClassFormat(_))
    ));

    // Unknown opcode in a method body
    let mut class = TestClass::new("app/Caller");
    class.add_static_method("run", "()V", 0, vec![0xcb, 0xb1]);
    let bytes = class.finish();
    assert!(matches!(
        transformer.transform("app/Caller", &bytes),
        Err(Error::ClassFormat(_))
    ));
}

#[test]
fn dispatcher_for_subtype() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());
    let (bytes, original) = do_thing_caller("app/Caller");

    let output = transformer.transform("app.Caller", &bytes).unwrap();
    assert!(matches!(output, Cow::Owned(_)));
    assert!(transformer.has_transformed("app.Caller"));
    let class = ClassFile::parse_bytes(&output).unwrap();
    assert_eq!(class.methods.len(), 2);

    // Call site now goes to the dispatcher, with nothing else changed
    let run = method_code(&class, "run").code_array.0;
    assert_eq!(run.len(), 6);
    assert_eq!(&run[..3], &[0x2a, 0x08, 0xb8]);
    assert_eq!(run[5], 0xb1);
    assert_eq!(
        method_ref_at(&class, &run, 2),
        method(
            "app/Caller",
            "redirectOwnerX$doThing",
            "(Ljava/lang/Object;I)V"
        )
    );

    let dispatcher = find_method(&class, "redirectOwnerX$doThing");
    assert_eq!(
        dispatcher.access_flags,
        MethodAccessFlags::PRIVATE | MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC
    );
    assert_eq!(
        class.method_descriptor(dispatcher).unwrap(),
        "(Ljava/lang/Object;I)V"
    );

    let code = method_code(&class, "redirectOwnerX$doThing");
    assert_eq!(code.max_stack, 2);
    assert_eq!(code.max_locals, 2);
    assert!(code.exception_table.is_empty());

    let body = &code.code_array.0;
    let opcodes: Vec<(usize, u8)> = [0, 1, 4, 7, 8, 11, 12, 15, 16, 17, 20, 21, 24]
        .iter()
        .map(|offset| (*offset, body[*offset]))
        .collect();
    assert_eq!(
        opcodes,
        vec![
            (0, 0x2a),  // aload_0
            (1, 0xc1),  // instanceof
            (4, 0x99),  // ifeq
            (7, 0x2a),  // aload_0
            (8, 0xc0),  // checkcast
            (11, 0x1b), // iload_1
            (12, 0xb8), // invokestatic
            (15, 0xb1), // return
            (16, 0x2a), // aload_0
            (17, 0xc0), // checkcast
            (20, 0x1b), // iload_1
            (21, 0xb6), // invokevirtual
            (24, 0xb1), // return
        ]
    );
    assert_eq!(body.len(), 25);
    assert_eq!(&body[5..7], &[0, 12]);
    assert_eq!(class_at(&class, body, 1), "owner/OwnerX$Sub");
    assert_eq!(class_at(&class, body, 8), "owner/OwnerX$Sub");
    assert_eq!(
        method_ref_at(&class, body, 12),
        method("helper/Helper", "doThingForSub", "(Ljava/lang/Object;I)V")
    );
    assert_eq!(class_at(&class, body, 17), "owner/OwnerX");

    // Fallback reissues the original call, through the original constant
    assert_eq!(&body[22..24], &original);
    assert_eq!(
        method_ref_at(&class, body, 21),
        method("owner/OwnerX", "doThing", "(I)V")
    );

    // One `same_frame` at the fallback
    let frames = find_attribute(&class, &code.attributes, "StackMapTable").unwrap();
    assert_eq!(frames.info, vec![0, 1, 16]);

    // Rewriting again is a no-op
    let again = transformer.transform("app/Caller", &bytes).unwrap();
    assert!(matches!(again, Cow::Borrowed(_)));
}

#[test]
fn repeated_call_sites_share_a_dispatcher() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0x2a, 0x07, 0xb6, hi, lo, 0xb1],
    );
    class.add_static_method(
        "runAgain",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x06, 0xb6, hi, lo, 0xb1],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    assert_eq!(class.methods.len(), 3);

    let run = method_code(&class, "run").code_array.0;
    let run_again = method_code(&class, "runAgain").code_array.0;
    assert_eq!((run[2], run[7], run_again[2]), (0xb8, 0xb8, 0xb8));
    assert_eq!(&run[3..5], &run[8..10]);
    assert_eq!(&run[3..5], &run_again[3..5]);
}

#[test]
fn registration_order_decides_precedence() {
    // Supertype first: any subtype instance takes the supertype's replacement
    let (registry, _) = do_thing_registry(&[
        ("owner/OwnerX$Sub", "doThingForSub"),
        ("owner/OwnerX$SubSub", "doThingForSubSub"),
    ]);
    let transformer = ClassTransformer::new(&registry, Settings::new());
    let (bytes, _) = do_thing_caller("app/Caller");
    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let body = method_code(&class, "redirectOwnerX$doThing").code_array.0;

    // Two checks of 16 bytes each, then the fallback
    assert_eq!(body.len(), 16 + 16 + 9);
    assert_eq!(class_at(&class, &body, 1), "owner/OwnerX$Sub");
    assert_eq!(method_ref_at(&class, &body, 12).name, "doThingForSub");
    assert_eq!(class_at(&class, &body, 17), "owner/OwnerX$SubSub");
    assert_eq!(method_ref_at(&class, &body, 28).name, "doThingForSubSub");
    assert_eq!(class_at(&class, &body, 33), "owner/OwnerX");
    assert_eq!(body[37], 0xb6);

    let code = method_code(&class, "redirectOwnerX$doThing");
    let frames = find_attribute(&class, &code.attributes, "StackMapTable").unwrap();
    assert_eq!(frames.info, vec![0, 2, 16, 15]);

    // Reversed: the more specific type gets checked first
    let (registry, _) = do_thing_registry(&[
        ("owner/OwnerX$SubSub", "doThingForSubSub"),
        ("owner/OwnerX$Sub", "doThingForSub"),
    ]);
    let transformer = ClassTransformer::new(&registry, Settings::new());
    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let body = method_code(&class, "redirectOwnerX$doThing").code_array.0;
    assert_eq!(class_at(&class, &body, 1), "owner/OwnerX$SubSub");
    assert_eq!(class_at(&class, &body, 17), "owner/OwnerX$Sub");
}

#[test]
fn interface_calls() {
    let mut registry = Registry::new();
    let circle = registry.register_type("shapes/Circle").unwrap();
    registry
        .register_redirect(
            MethodKey::parse("shapes/Shape", "area", "()D").unwrap(),
            circle,
            TargetTracker::parse("shapes/Fast", "circleArea", "(Lshapes/Circle;)D").unwrap(),
        )
        .unwrap();
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [hi, lo] = class.method_ref("shapes/Shape", "area", "()D", true);
    class.add_static_method(
        "measure",
        "(Lshapes/Shape;)D",
        1,
        vec![0x2a, 0xb9, hi, lo, 0x01, 0x00, 0xaf],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();

    // `invokeinterface` becomes `invokestatic` padded with `nop`s
    let measure = method_code(&class, "measure").code_array.0;
    assert_eq!(measure.len(), 7);
    assert_eq!((measure[1], measure[4], measure[5]), (0xb8, 0x00, 0x00));
    assert_eq!(
        method_ref_at(&class, &measure, 1),
        method("app/Caller", "redirectShape$area", "(Ljava/lang/Object;)D")
    );

    let code = method_code(&class, "redirectShape$area");
    assert_eq!((code.max_stack, code.max_locals), (2, 1));
    let body = &code.code_array.0;
    assert_eq!(body.len(), 15 + 10);
    assert_eq!(&body[..8], &[0x2a, 0xc1, body[2], body[3], 0x99, 0, 11, 0x2a]);
    assert_eq!(body[11], 0xb8);
    assert_eq!(body[14], 0xaf);

    // Fallback: aload_0; checkcast; invokeinterface #original 1 0; dreturn
    assert_eq!(class_at(&class, body, 16), "shapes/Shape");
    assert_eq!(&body[19..], &[0xb9, hi, lo, 0x01, 0x00, 0xaf]);
    assert!(method_ref_at(&class, body, 19).is_interface);
}

#[test]
fn wide_arguments_and_returns() {
    let mut registry = Registry::new();
    let fast = registry.register_type("calc/FastCalc").unwrap();
    registry
        .register_redirect(
            MethodKey::parse("calc/Calc", "combine", "(JLjava/lang/String;F)J").unwrap(),
            fast,
            TargetTracker::parse(
                "calc/Helpers",
                "combineFast",
                "(Lcalc/FastCalc;JLjava/lang/String;F)J",
            )
            .unwrap(),
        )
        .unwrap();
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [hi, lo] = class.call("calc/Calc", "combine", "(JLjava/lang/String;F)J");
    // aload_0; lconst_1; aconst_null; fconst_0; invokevirtual; lreturn
    class.add_static_method(
        "run",
        "(Lcalc/Calc;)J",
        1,
        vec![0x2a, 0x0a, 0x01, 0x0b, 0xb6, hi, lo, 0xad],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let code = method_code(&class, "redirectCalc$combine");
    assert_eq!((code.max_stack, code.max_locals), (5, 5));

    // lload_1; aload_3; fload 4
    let body = &code.code_array.0;
    assert_eq!(&body[11..15], &[0x1f, 0x2d, 0x17, 4]);
    assert_eq!(body[18], 0xad);
    assert_eq!(
        class.method_descriptor(find_method(&class, "redirectCalc$combine")).unwrap(),
        "(Ljava/lang/Object;JLjava/lang/String;F)J"
    );
}

#[test]
fn known_subtypes_call_the_replacement_directly() {
    let (mut registry, ids) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    registry.add_known_subtype(ids[0], "owner/OwnerX").unwrap();
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let (bytes, _) = do_thing_caller("app/Caller");
    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();

    assert_eq!(class.methods.len(), 1);
    let run = method_code(&class, "run").code_array.0;
    assert_eq!(run[2], 0xb8);
    assert_eq!(
        method_ref_at(&class, &run, 2),
        method("helper/Helper", "doThingForSub", "(Ljava/lang/Object;I)V")
    );
}

#[test]
fn known_interface_types_call_the_replacement_directly() {
    let mut registry = Registry::new();
    let shape = registry.register_type("shapes/Shape").unwrap();
    registry
        .register_redirect(
            MethodKey::parse("shapes/Shape", "area", "()D").unwrap(),
            shape,
            TargetTracker::parse("shapes/Fast", "shapeArea", "(Lshapes/Shape;)D").unwrap(),
        )
        .unwrap();
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [hi, lo] = class.method_ref("shapes/Shape", "area", "()D", true);
    class.add_static_method(
        "measure",
        "(Lshapes/Shape;)D",
        1,
        vec![0x2a, 0xb9, hi, lo, 0x01, 0x00, 0xaf],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    assert_eq!(class.methods.len(), 1);

    // `invokestatic` of the replacement, padded with `nop`s
    let measure = method_code(&class, "measure").code_array.0;
    assert_eq!(measure.len(), 7);
    assert_eq!(
        (measure[0], measure[1], measure[4], measure[5], measure[6]),
        (0x2a, 0xb8, 0x00, 0x00, 0xaf)
    );
    assert_eq!(
        method_ref_at(&class, &measure, 1),
        method("shapes/Fast", "shapeArea", "(Lshapes/Shape;)D")
    );
}

#[test]
fn dispatcher_names_do_not_clash() {
    let mut registry = Registry::new();
    let sub = registry.register_type("owner/Sub").unwrap();
    for owner in ["a/Owner", "b/Owner"] {
        registry
            .register_redirect(
                MethodKey::parse(owner, "doThing", "(I)V").unwrap(),
                sub,
                TargetTracker::parse("helper/Helper", "doThingForSub", "(Ljava/lang/Object;I)V")
                    .unwrap(),
            )
            .unwrap();
    }
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    let [a_hi, a_lo] = class.call("a/Owner", "doThing", "(I)V");
    let [b_hi, b_lo] = class.call("b/Owner", "doThing", "(I)V");
    class.add_static_method("redirectOwner$doThing", "(Ljava/lang/Object;I)V", 2, vec![0xb1]);
    class.add_static_method(
        "run",
        "(La/Owner;Lb/Owner;)V",
        2,
        vec![0x2a, 0x08, 0xb6, a_hi, a_lo, 0x2b, 0x08, 0xb6, b_hi, b_lo, 0xb1],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    assert_eq!(class.methods.len(), 4);

    let run = method_code(&class, "run").code_array.0;
    assert_eq!(method_ref_at(&class, &run, 2).name, "redirectOwner$doThing$1");
    assert_eq!(method_ref_at(&class, &run, 7).name, "redirectOwner$doThing$2");

    let a_dispatcher = method_code(&class, "redirectOwner$doThing$1").code_array.0;
    assert_eq!(class_at(&class, &a_dispatcher, 17), "a/Owner");
    let b_dispatcher = method_code(&class, "redirectOwner$doThing$2").code_array.0;
    assert_eq!(class_at(&class, &b_dispatcher, 17), "b/Owner");
}

#[test]
fn skipped_classes() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let mut settings = Settings::new();
    settings.exclude_class("app.Excluded").unwrap();
    settings.exclude_prefix("vendor/");
    let transformer = ClassTransformer::new(&registry, settings);

    for name in ["app/Excluded", "vendor/lib/Caller", "helper/Helper"] {
        let (bytes, _) = do_thing_caller(name);
        let output = transformer.transform(name, &bytes).unwrap();
        assert!(matches!(output, Cow::Borrowed(_)), "{}", name);
        assert_eq!(&*output, &bytes[..]);
    }
}

#[test]
fn old_interfaces_only_get_direct_calls() {
    let (mut registry, ids) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);

    let java7 = Version {
        minor_version: 0,
        major_version: 51,
    };
    let mut class = TestClass::interface("app/OldApi", java7);
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    let bytes = class.finish();

    {
        let transformer = ClassTransformer::new(&registry, Settings::new());
        let output = transformer.transform("app/OldApi", &bytes).unwrap();
        assert!(matches!(output, Cow::Borrowed(_)));
    }

    registry.add_known_subtype(ids[0], "owner/OwnerX").unwrap();
    let transformer = ClassTransformer::new(&registry, Settings::new());
    let output = transformer.transform("app/OldApi", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let run = method_code(&class, "run").code_array.0;
    assert_eq!(method_ref_at(&class, &run, 2).name, "doThingForSub");
}

#[test]
fn interface_dispatchers_use_interface_method_refs() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::interface("app/Api", Version::JAVA8);
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Api", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let run = method_code(&class, "run").code_array.0;
    let target = method_ref_at(&class, &run, 2);
    assert_eq!(target.owner, "app/Api");
    assert!(target.is_interface);
}

#[test]
fn old_class_files_have_no_frames() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    class.version = Version::JAVA5;
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    let class = ClassFile::parse_bytes(&output).unwrap();
    let code = method_code(&class, "redirectOwnerX$doThing");
    assert!(code.attributes.is_empty());
}

#[test]
fn concurrent_transforms() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let names: Vec<String> = (0..8).map(|n| format!("app/Caller{}", n)).collect();
    let classes: Vec<Vec<u8>> = names.iter().map(|name| do_thing_caller(name).0).collect();

    std::thread::scope(|scope| {
        for (name, bytes) in names.iter().zip(classes.iter()) {
            let transformer = &transformer;
            scope.spawn(move || {
                let output = transformer.transform(name, bytes).unwrap();
                let class = ClassFile::parse_bytes(&output).unwrap();
                assert_eq!(class.class_name().unwrap(), name.as_str());
                assert_eq!(class.methods.len(), 2);
            });
        }
    });

    for name in &names {
        assert!(transformer.has_transformed(name));
    }
}

#[test]
fn unpaired_surrogates_pass_through() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Plain");
    class.constants.get_utf8(SURROGATE_PLACEHOLDER).unwrap();
    class.add_static_method("run", "()V", 0, vec![0xb1]);
    let bytes = with_unpaired_surrogate(class.finish());

    let output = transformer.transform("app.Plain", &bytes).unwrap();
    assert!(matches!(output, Cow::Borrowed(_)));
    assert_eq!(&*output, &bytes[..]);
}

#[test]
fn unpaired_surrogates_survive_rewriting() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    class.constants.get_utf8(SURROGATE_PLACEHOLDER).unwrap();
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    let bytes = with_unpaired_surrogate(class.finish());

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    assert!(matches!(output, Cow::Owned(_)));
    let surrogate = [1, 0, 3, 0xED, 0xA0, 0x80];
    assert!(output.windows(surrogate.len()).any(|window| window == surrogate));

    let class = ClassFile::parse_bytes(&output).unwrap();
    let run = method_code(&class, "run").code_array.0;
    assert_eq!(method_ref_at(&class, &run, 2).name, "redirectOwnerX$doThing");
}

#[test]
fn unknown_access_flags_survive_rewriting() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());

    let mut class = TestClass::new("app/Caller");
    class.access_flags = ClassAccessFlags::from_bits_retain(0x0023);
    let [hi, lo] = class.call("owner/OwnerX", "doThing", "(I)V");
    class.add_static_method(
        "run",
        "(Lowner/OwnerX;)V",
        1,
        vec![0x2a, 0x08, 0xb6, hi, lo, 0xb1],
    );
    class.methods[0].access_flags = MethodAccessFlags::from_bits_retain(0x0209);
    let bytes = class.finish();

    let output = transformer.transform("app/Caller", &bytes).unwrap();
    assert!(matches!(output, Cow::Owned(_)));
    let class = ClassFile::parse_bytes(&output).unwrap();
    assert_eq!(class.access_flags.bits(), 0x0023);
    assert_eq!(find_method(&class, "run").access_flags.bits(), 0x0209);
}

#[test]
fn concurrent_loads_of_one_class_rewrite_it_once() {
    let (registry, _) = do_thing_registry(&[("owner/OwnerX$Sub", "doThingForSub")]);
    let transformer = ClassTransformer::new(&registry, Settings::new());
    let (bytes, _) = do_thing_caller("app/Caller");

    let rewritten: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let transformer = &transformer;
                let bytes = &bytes;
                scope.spawn(move || {
                    let output = transformer.transform("app/Caller", bytes).unwrap();
                    matches!(output, Cow::Owned(_)) as usize
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).sum()
    });
    assert_eq!(rewritten, 1);
    assert!(transformer.has_transformed("app/Caller"));

    // Later loads of the same class are left alone
    let output = transformer.transform("app/Caller", &bytes).unwrap();
    assert!(matches!(output, Cow::Borrowed(_)));
}
