//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mu.
//! The Mu project belongs to the Dunimd project team.

use std::fs;
use std::path::{Path, PathBuf};

use mux::errors::MuError;
use mux::executable::MuExecutable;
use mux::module::MuModuleState;
use mux::{parse_module_directory, MuRuntime, MODULE_MANIFEST};

fn write_module(root: &Path, dir_name: &str, manifest: &str) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(MODULE_MANIFEST), manifest).unwrap();
    dir
}

struct Inert;

impl MuExecutable for Inert {
    fn start(&mut self) -> mux::Result<()> {
        Ok(())
    }
}

fn make_inert() -> Box<dyn MuExecutable> {
    Box::new(Inert)
}

#[test]
fn test_repository_walk_skips_directories_without_manifest() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "a", r#"<plugin id="vendor::a"/>"#);
    fs::create_dir_all(root.path().join("not_a_module")).unwrap();

    let runtime = MuRuntime::with_working_path(root.path());
    let registered = runtime.add_modules(root.path()).unwrap();

    assert_eq!(registered, 1);
    let module = runtime.find_module("vendor::a").expect("registered module");
    assert_eq!(module.state(), MuModuleState::Enabled);
    assert!(runtime.find_module("not_a_module").is_none());
}

#[test]
fn test_duplicate_identifiers_first_registered_wins() {
    let root = tempfile::tempdir().unwrap();
    let dir = write_module(root.path(), "first", r#"<plugin id="vendor::dup" priority="7"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    let first = parse_module_directory(&dir, &[]).unwrap();
    let second = parse_module_directory(&dir, &[]).unwrap();

    assert!(runtime.add_module(first).is_some());
    // Second registration is discarded and returns nothing.
    assert!(runtime.add_module(second).is_none());

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.modules.len(), 1);
    assert_eq!(snapshot.modules[0].priority, 7);
}

#[test]
fn test_invalid_descriptor_does_not_abort_walk() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "good", r#"<plugin id="vendor::good"/>"#);
    write_module(root.path(), "bad", r#"<plugin priority="1"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    let registered = runtime.add_modules(root.path()).unwrap();

    assert_eq!(registered, 1);
    assert!(runtime.find_module("vendor::good").is_some());
    assert_eq!(runtime.snapshot().modules.len(), 1);
}

#[test]
fn test_single_module_directory_fallback() {
    let root = tempfile::tempdir().unwrap();
    let dir = write_module(root.path(), "solo", r#"<plugin id="vendor::solo"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    // Pointing straight at one module's directory registers that module.
    let registered = runtime.add_modules(&dir).unwrap();

    assert_eq!(registered, 1);
    assert!(runtime.find_module("vendor::solo").is_some());
}

#[test]
fn test_extensions_queryable_without_activation() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "native",
        r#"<plugin id="vendor::native" library="true">
             <extension id="vendor::native::menu" implements="host::menus">
               <item name="open"/>
               <item name="close"/>
             </extension>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    let extension = runtime
        .find_extension("vendor::native::menu")
        .expect("extension registered at discovery time");
    assert_eq!(extension.point(), "host::menus");
    let items: Vec<&str> = extension
        .config()
        .children_named("item")
        .map(|c| c.attribute("name").unwrap())
        .collect();
    assert_eq!(items, vec!["open", "close"]);

    // Querying data never touches native code.
    let module = runtime.find_module("vendor::native").unwrap();
    assert!(!module.library().unwrap().is_loaded());
    assert!(!module.is_started());
}

#[test]
fn test_extension_point_lookup() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "host",
        r#"<plugin id="vendor::host">
             <extension-point id="vendor::host::views" schema="views.xsd"/>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    let point = runtime
        .find_extension_point("vendor::host::views")
        .expect("point registered");
    assert_eq!(point.module(), "vendor::host");
    assert_eq!(point.schema(), Some("views.xsd"));
    assert!(runtime.find_extension_point("vendor::host::absent").is_none());
}

#[test]
fn test_extensions_for_point_honours_disable_directives() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "contrib",
        r#"<plugin id="vendor::contrib">
             <extension id="vendor::contrib::one" implements="host::tools"/>
             <extension id="vendor::contrib::two" implements="host::tools"/>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    assert_eq!(runtime.extensions_for_point("host::tools").len(), 2);

    runtime.disable_extension("vendor::contrib::one");
    let remaining = runtime.extensions_for_point("host::tools");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), Some("vendor::contrib::two"));
    assert!(!runtime.is_extension_enabled("vendor::contrib::one"));
    // Disabled contributions stay registered.
    assert!(runtime.find_extension("vendor::contrib::one").is_some());

    runtime.disable_extension_point("host::tools");
    assert!(runtime.extensions_for_point("host::tools").is_empty());
    assert!(!runtime.is_extension_point_enabled("host::tools"));
}

#[test]
fn test_executable_factory_duplicate_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let runtime = MuRuntime::with_working_path(root.path());

    runtime
        .add_executable_factory("vendor::a::Plugin", make_inert)
        .unwrap();
    let err = runtime
        .add_executable_factory("vendor::a::Plugin", make_inert)
        .unwrap_err();
    assert!(matches!(err, MuError::DuplicateFactory { .. }));

    assert!(runtime.unregister_executable_factory("vendor::a::Plugin"));
    runtime
        .add_executable_factory("vendor::a::Plugin", make_inert)
        .unwrap();
}

#[test]
fn test_create_executable_instance_without_context_never_loads() {
    let root = tempfile::tempdir().unwrap();
    let runtime = MuRuntime::with_working_path(root.path());

    // Unknown type: no factory, no error, no side effects.
    assert!(runtime.create_executable_instance("vendor::x::Plugin").is_none());

    runtime
        .add_executable_factory("vendor::x::Plugin", make_inert)
        .unwrap();
    assert!(runtime.create_executable_instance("vendor::x::Plugin").is_some());
}

#[test]
fn test_snapshot_serializes() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "a",
        r#"<plugin id="vendor::a" priority="3">
             <extension implements="host::menus"/>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    let json = serde_json::to_value(runtime.snapshot()).unwrap();
    assert_eq!(json["modules"][0]["identifier"], "vendor::a");
    assert_eq!(json["modules"][0]["priority"], 3);
    assert_eq!(json["extension_count"], 1);
}
