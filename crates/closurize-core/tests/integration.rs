//! Integration tests for closurize-core
//!
//! These tests validate the full pipeline: parse → bind → annotate or
//! print externs, covering the end-to-end scenarios and boundary
//! behaviors the translator guarantees.

#![allow(clippy::unwrap_used, clippy::expect_used)] // acceptable in tests

use closurize_core::{
    annotate, annotate_source, externs_source, generate_externs, ModuleFormat, Options, Program,
};

fn annotate_one(source: &str) -> String {
    annotate_source("test.ts", source, &Options::new())
        .unwrap()
        .content
}

fn externs_one(source: &str) -> String {
    externs_source("test.d.ts", source, &Options::new())
        .unwrap()
        .content
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_s1_empty_import_gets_forward_declare() {
    let out = annotate_one("import {} from './imported';\nconsole.log('hello');");

    let fd = out
        .find("const tsickle_forward_declare_1 = goog.forwardDeclare('imported');")
        .expect("forward declare missing");
    let import = out.find("import {} from './imported';").unwrap();
    let log = out.find("console.log('hello');").unwrap();
    assert!(fd < import, "forward declare must precede the import:\n{out}");
    assert!(import < log);
}

#[test]
fn test_s2_class_with_parameter_property() {
    let out = annotate_one("class C {\n    constructor(public x: number) {}\n}");

    // The class survives at the runtime level, modifier erased.
    assert!(out.contains("class C"), "{out}");
    assert!(out.contains("constructor(x)"), "{out}");
    assert!(out.contains("this.x = x;"), "{out}");
    assert!(!out.contains("public"), "{out}");
    assert!(!out.contains(": number"), "{out}");

    // Sibling member-type-declaration lists the parameter property.
    assert!(out.contains("if (false) {"), "{out}");
    assert!(out.contains("/** @type {number} */"), "{out}");
    assert!(out.contains("C.prototype.x;"), "{out}");
}

#[test]
fn test_s3_exported_type_alias_union() {
    let out = annotate_one("class X {}\nclass Y {}\nexport type T = X | Y;");

    assert!(out.contains("/** @typedef {(!X|!Y)} */"), "{out}");
    assert!(out.contains("exports.T;"), "{out}");
    assert!(!out.contains("type T"), "{out}");
}

#[test]
fn test_s3_type_alias_through_forward_declared_import() {
    let program = Program::parse(vec![
        (
            "dep.ts".to_string(),
            "export class X {}\nexport class Y {}".to_string(),
        ),
        (
            "app.ts".to_string(),
            "import {X, Y} from './dep';\nexport type T = X | Y;".to_string(),
        ),
    ])
    .unwrap();
    let out = annotate(&program, 1, &Options::new()).unwrap().content;

    assert!(out.contains("goog.forwardDeclare('dep')"), "{out}");
    assert!(
        out.contains("@typedef {(!tsickle_forward_declare_1.X|!tsickle_forward_declare_1.Y)}"),
        "{out}"
    );
    assert!(out.contains("exports.T;"), "{out}");
}

#[test]
fn test_s4_non_null_assertion_cast() {
    let out = annotate_one("let foo: string | null;\nconst y = foo!;");

    assert!(out.contains("(/** @type {string} */ (foo))"), "{out}");
    assert!(!out.contains("foo!"), "{out}");
    // The declared union annotates the variable itself.
    assert!(out.contains("@type {(string|null)}"), "{out}");
}

#[test]
fn test_s5_externs_declared_namespace() {
    let out = externs_one("declare namespace ns { interface I { f(x: number): void; } }");

    let ns = out.find("var ns = {};").expect("namespace object missing");
    assert!(out[..ns].contains("@const"), "{out}");
    let stub = out.find("ns.I = function() {};").expect("stub missing");
    assert!(out[..stub].contains("@record"), "{out}");
    assert!(out[..stub].contains("@struct"), "{out}");
    let method = out
        .find("ns.I.prototype.f = function(x) {};")
        .expect("method stub missing");
    assert!(out[stub..method].contains("@param {number} x"), "{out}");
    assert!(ns < stub && stub < method);
}

#[test]
fn test_s6_overloaded_function_in_externs() {
    let out = externs_one(
        "declare function f(x: number): void;\ndeclare function f(x: string): number;",
    );

    assert_eq!(out.matches("function f(x) {}").count(), 1, "{out}");
    assert!(out.contains("@param {(number|string)} x"), "{out}");
    assert!(out.contains("@return {(void|number)}"), "{out}");
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_no_typed_syntax_survives() {
    let out = annotate_one(
        "interface I { a: string; }\n\
         class C implements I {\n    a: string = 'x';\n    m<T>(v: T): T { return v; }\n}\n\
         const c = new C() as C;\n\
         let n = c.a!;\n",
    );

    assert!(!out.contains("interface "), "{out}");
    assert!(!out.contains(": string"), "{out}");
    assert!(!out.contains("<T>"), "{out}");
    assert!(!out.contains(" as "), "{out}");
    assert!(!out.contains("a!"), "{out}");
    assert!(!out.contains("implements I"), "{out}");
}

#[test]
fn test_every_import_represented() {
    let program = Program::parse(vec![
        ("dep.ts".to_string(), "export class D {}".to_string()),
        (
            "app.ts".to_string(),
            "import {D} from './dep';\nimport './side-effect';\nlet d: D;".to_string(),
        ),
    ])
    .unwrap();
    let out = annotate(&program, 1, &Options::new()).unwrap().content;

    // Runtime import passes through; forward declare keeps the type
    // namespace alive even if the loader later drops it.
    assert!(out.contains("import {D} from './dep';"), "{out}");
    assert!(out.contains("goog.forwardDeclare('dep')"), "{out}");
    assert!(out.contains("import './side-effect';"), "{out}");
    assert!(out.contains("@type {!tsickle_forward_declare_1.D}"), "{out}");
}

#[test]
fn test_type_only_import_leaves_only_forward_declare() {
    let program = Program::parse(vec![
        ("dep.ts".to_string(), "export class D {}".to_string()),
        (
            "app.ts".to_string(),
            "import type {D} from './dep';\nlet d: D | null = null;".to_string(),
        ),
    ])
    .unwrap();
    let out = annotate(&program, 1, &Options::new()).unwrap().content;

    assert!(!out.contains("import type"), "{out}");
    assert!(out.contains("goog.forwardDeclare('dep')"), "{out}");
    assert!(out.contains("?tsickle_forward_declare_1.D"), "{out}");
}

#[test]
fn test_interface_becomes_record_function() {
    let out = annotate_one("interface Point { x: number; y?: number; }");

    assert!(out.contains("function Point() {}"), "{out}");
    assert!(out.contains("@record"), "{out}");
    assert!(out.contains("@struct"), "{out}");
    assert!(out.contains("Point.prototype.x;"), "{out}");
    // Optional member admits undefined.
    assert!(out.contains("@type {(number|undefined)}"), "{out}");
}

#[test]
fn test_interface_methods_in_member_declaration() {
    let out = annotate_one("interface Greeter { greet(name: string): string; }");

    assert!(out.contains("function Greeter() {}"), "{out}");
    assert!(
        out.contains("Greeter.prototype.greet = function(name) {};"),
        "{out}"
    );
    assert!(out.contains("@param {string} name"), "{out}");
    assert!(out.contains("@return {string}"), "{out}");
}

#[test]
fn test_interface_that_is_also_a_value_is_skipped() {
    let out = annotate_one("interface Dual {}\nfunction Dual(): void {}");

    assert!(!out.contains("@record"), "{out}");
    // The runtime function still exists exactly once.
    assert_eq!(out.matches("function Dual()").count(), 1, "{out}");
}

#[test]
fn test_unexported_type_alias_emits_nothing() {
    let out = annotate_one("type Local = string;\nlet x: Local = 'a';");

    assert!(!out.contains("Local"), "{out}");
    // References resolve the alias inline.
    assert!(out.contains("@type {string}"), "{out}");
}

#[test]
fn test_type_alias_skipped_for_other_module_format() {
    let host = Options::new().module_format(ModuleFormat::EsModule);
    let out = annotate_source("test.ts", "export type T = string;", &host)
        .unwrap()
        .content;
    assert!(!out.contains("exports.T"), "{out}");
    assert!(!out.contains("@typedef"), "{out}");
}

// ============================================================================
// Boundary behaviors
// ============================================================================

#[test]
fn test_empty_interface_has_no_member_declaration() {
    let out = annotate_one("interface Empty {}");
    assert!(out.contains("function Empty() {}"), "{out}");
    assert!(out.contains("@record"), "{out}");
    assert!(!out.contains("if (false)"), "{out}");
}

#[test]
fn test_class_with_only_static_members() {
    let out = annotate_one("class S { static count: number = 0; }");

    assert!(out.contains("S.count;"), "{out}");
    assert!(!out.contains("S.prototype.count"), "{out}");
    // The initialized static field stays at runtime.
    assert!(out.contains("static count = 0;"), "{out}");
}

#[test]
fn test_optional_any_property_gets_undefined() {
    let out = annotate_one("class C { foo?: any; }");
    assert!(out.contains("@type {?|undefined}"), "{out}");
    assert!(out.contains("C.prototype.foo;"), "{out}");
}

#[test]
fn test_blacklisted_type_without_initializer_still_annotates() {
    let host = Options::new().blacklist_path("opaque.ts");
    let program = Program::parse(vec![
        ("opaque.ts".to_string(), "export class Op {}".to_string()),
        (
            "app.ts".to_string(),
            "import {Op} from './opaque';\nlet a: Op;\nlet b: Op = new Op();".to_string(),
        ),
    ])
    .unwrap();
    let out = annotate(&program, 1, &host).unwrap().content;

    assert!(out.contains("@type {?}"), "{out}");
    // With an initializer the downstream optimizer infers a better type
    // than the fallback, so no tag is attached.
    assert_eq!(out.matches("@type").count(), 1, "{out}");
}

#[test]
fn test_unresolvable_mixin_heritage_gets_note() {
    let out = annotate_one(
        "function MyMixin(b: any): any { return b; }\nclass Base {}\n\
         class C extends MyMixin(Base) {}",
    );
    assert!(
        out.contains("could not resolve supertype, class definition may be incomplete"),
        "{out}"
    );
    assert!(!out.contains("@extends"), "{out}");
    // Runtime heritage is untouched.
    assert!(out.contains("class C extends MyMixin(Base)"), "{out}");
}

#[test]
fn test_declared_module_name_mangling() {
    let out = externs_one("declare module \"foo-bar/baz\" { let q: number; }");

    assert!(out.contains("var tsickle_declare_module = {};"), "{out}");
    assert!(
        out.contains("tsickle_declare_module.foo_bar_baz = {};"),
        "{out}"
    );
    assert!(
        out.contains("tsickle_declare_module.foo_bar_baz.q;"),
        "{out}"
    );
}

#[test]
fn test_implements_interface_tag() {
    let out = annotate_one("interface I {}\nclass C implements I { }");

    assert!(out.contains("@implements {!I}"), "{out}");
    assert!(!out.contains("implements I"), "{out}");
}

#[test]
fn test_implements_class_maps_to_extends() {
    // One inheritance slot downstream: a class-typed implements becomes
    // extends.
    let out = annotate_one("class Base {}\nclass C implements Base {}");
    assert!(out.contains("@extends {!Base}"), "{out}");
}

#[test]
fn test_abstract_class_and_method() {
    let out = annotate_one(
        "abstract class Shape {\n    abstract area(): number;\n    name: string = 's';\n}",
    );

    assert!(out.contains("@abstract"), "{out}");
    assert!(!out.contains("abstract class"), "{out}");
    assert!(!out.contains("abstract area"), "{out}");
    assert!(
        out.contains("Shape.prototype.area = function() {};"),
        "{out}"
    );
    assert!(out.contains("@return {number}"), "{out}");
}

#[test]
fn test_template_tag_and_blacklisted_type_parameters() {
    let out = annotate_one("class Box<T> {\n    value(v: T): T { return v; }\n}");

    assert!(out.contains("@template T"), "{out}");
    // Inside the scope the parameter renders as unknown.
    assert!(out.contains("@param {?} v"), "{out}");
    assert!(out.contains("@return {?}"), "{out}");
    assert!(!out.contains("<T>"), "{out}");
}

#[test]
fn test_multi_declarator_statement_splits() {
    let out = annotate_one("let a: number = 1, b: string = 'x';");

    assert!(out.contains("let a = 1;"), "{out}");
    assert!(out.contains("let b = 'x';"), "{out}");
    assert!(out.contains("@type {number}"), "{out}");
    assert!(out.contains("@type {string}"), "{out}");
}

#[test]
fn test_destructuring_binding_gets_no_tag() {
    let out = annotate_one("const {a, b} = {a: 1, b: 2};");
    assert!(!out.contains("@type"), "{out}");
    assert!(out.contains("const {a, b} = {a: 1, b: 2};"), "{out}");
}

#[test]
fn test_enum_lowering() {
    let out = annotate_one("export enum Direction { Up, Down = 5, Left }");

    assert!(out.contains("@enum {number}"), "{out}");
    assert!(
        out.contains("export const Direction = {Up: 0, Down: 5, Left: 6};"),
        "{out}"
    );
    assert!(!out.contains("enum Direction"), "{out}");
}

#[test]
fn test_untyped_mode_degrades_everything() {
    let host = Options::new().untyped(true);
    let out = annotate_source("test.ts", "let x: number = 1;\nlet y: string;", &host)
        .unwrap()
        .content;
    assert!(out.contains("@type {?}"), "{out}");
    assert!(!out.contains("@type {number}"), "{out}");
    assert!(!out.contains("@type {string}"), "{out}");
}

// ============================================================================
// Round-trip / idempotence
// ============================================================================

#[test]
fn test_second_run_does_not_duplicate_tags() {
    let source = "let foo: string | null;\nconst y = foo!;\nclass C { constructor(public x: number) {} }";
    let first = annotate_one(source);
    let second = annotate_one(&first);

    // Casts are not re-wrapped.
    assert_eq!(
        first.matches("(/** @type {string} */ (foo))").count(),
        second.matches("(/** @type {string} */ (foo))").count(),
    );
    assert!(!second.contains("@type {?} */ ((/**"), "{second}");
    // One member-type-declaration, not two.
    assert_eq!(second.matches("C.prototype.x;").count(), 1, "{second}");
    // No comment gains a second @param for the same parameter.
    assert_eq!(
        first.matches("@param").count(),
        second.matches("@param").count(),
    );
}

// ============================================================================
// Externs: merging and blacklists
// ============================================================================

#[test]
fn test_externs_class_with_constructor_and_members() {
    let out = externs_one(
        "declare class Animal {\n    constructor(name: string);\n    name: string;\n    speak(volume: number): string;\n}",
    );

    assert!(out.contains("@constructor"), "{out}");
    assert!(out.contains("@struct"), "{out}");
    assert!(out.contains("@param {string} name"), "{out}");
    assert!(out.contains("function Animal(name) {}"), "{out}");
    assert!(out.contains("Animal.prototype.name;"), "{out}");
    assert!(
        out.contains("Animal.prototype.speak = function(volume) {};"),
        "{out}"
    );
}

#[test]
fn test_externs_declaration_merging_emits_one_stub() {
    let out = externs_one(
        "declare interface Merged { a: string; }\ndeclare interface Merged { b: number; }",
    );

    assert_eq!(out.matches("function Merged() {}").count(), 1, "{out}");
    assert!(out.contains("Merged.prototype.a;"), "{out}");
    assert!(out.contains("Merged.prototype.b;"), "{out}");
}

#[test]
fn test_externs_blacklisted_names_skipped() {
    let out = externs_one(
        "declare var exports: any;\ndeclare interface Symbol { x: number; }\ndeclare var keep: number;",
    );

    assert!(!out.contains("var exports;"), "{out}");
    assert!(!out.contains("function Symbol"), "{out}");
    assert!(out.contains("var keep;"), "{out}");
}

#[test]
fn test_externs_enum() {
    let out = externs_one("declare enum Level { Low, High }");

    assert!(out.contains("var Level = {};"), "{out}");
    assert!(out.contains("@const {number}"), "{out}");
    assert!(out.contains("Level.Low;"), "{out}");
    assert!(out.contains("Level.High;"), "{out}");
}

#[test]
fn test_externs_type_alias() {
    let out = externs_one("declare namespace ns { type Pair = string; }");
    assert!(out.contains("@typedef {string}"), "{out}");
    assert!(out.contains("ns.Pair;"), "{out}");
}

#[test]
fn test_externs_global_resets_namespace() {
    let out = externs_one("declare global { interface Shared { x: number; } }");
    assert!(out.contains("function Shared() {}"), "{out}");
    assert!(out.contains("Shared.prototype.x;"), "{out}");
}

#[test]
fn test_diagnostics_do_not_abort_output() {
    let program = Program::parse(vec![(
        "test.ts".to_string(),
        "namespace bad { const x = 1; }\nconst ok = 2;".to_string(),
    )])
    .unwrap();
    let result = annotate(&program, 0, &Options::new()).unwrap();
    assert!(!result.diagnostics.is_empty());
    assert!(result.content.contains("const ok = 2;"));
    assert!(!result.content.contains("namespace"));
}
