//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mu.
//! The Mu project belongs to the Dunimd project team.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use mux::errors::MuError;
use mux::executable::MuExecutable;
use mux::module::MuModuleState;
use mux::{MuRuntime, MODULE_MANIFEST};

// Shared event log. Tests run in parallel inside this binary, so every test
// uses its own module-identifier prefix and filters on it.
static EVENTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn record(event: String) {
    EVENTS.lock().unwrap().push(event);
}

fn recorded(prefix: &str) -> Vec<String> {
    EVENTS
        .lock()
        .unwrap()
        .iter()
        .filter(|event| event.starts_with(prefix))
        .cloned()
        .collect()
}

struct Recorder {
    id: &'static str,
}

impl MuExecutable for Recorder {
    fn configure(&mut self, config: &mux::MuConfigElement) -> mux::Result<()> {
        if let Some(connect) = config.first_child("connect") {
            record(format!(
                "{}:configure:{}",
                self.id,
                connect.attribute("channel").unwrap_or_default()
            ));
        }
        Ok(())
    }

    fn start(&mut self) -> mux::Result<()> {
        record(format!("{}:start", self.id));
        Ok(())
    }

    fn stop(&mut self) -> mux::Result<()> {
        record(format!("{}:stop", self.id));
        Ok(())
    }
}

fn plugin_t1_a() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t1::a" })
}

fn plugin_t3_a() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t3::a" })
}

fn plugin_t3_b() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t3::b" })
}

fn plugin_t3_c() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t3::c" })
}

fn plugin_t6_f() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t6::f" })
}

fn plugin_t8_a() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t8::a" })
}

fn plugin_t9_hi() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t9::hi" })
}

fn plugin_t9_lo() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "t9::lo" })
}

fn plugin_c1_w() -> Box<dyn MuExecutable> {
    Box::new(Recorder { id: "c1::w" })
}

fn write_module(root: &Path, dir_name: &str, manifest: &str) {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(MODULE_MANIFEST), manifest).unwrap();
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "a", r#"<plugin id="t1::a"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    runtime
        .add_executable_factory("t1::a::Plugin", plugin_t1_a)
        .unwrap();

    runtime.start_module("t1::a").unwrap();
    runtime.start_module("t1::a").unwrap();
    assert_eq!(recorded("t1::a:start").len(), 1);

    runtime.stop_module("t1::a").unwrap();
    runtime.stop_module("t1::a").unwrap();
    assert_eq!(recorded("t1::a:stop").len(), 1);
}

#[test]
fn test_requirements_start_depth_first() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "a",
        r#"<plugin id="t3::a"><requirement id="t3::b"/></plugin>"#,
    );
    write_module(
        root.path(),
        "b",
        r#"<plugin id="t3::b"><requirement id="t3::c"/></plugin>"#,
    );
    write_module(root.path(), "c", r#"<plugin id="t3::c"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    for (name, factory) in [
        ("t3::a::Plugin", plugin_t3_a as fn() -> Box<dyn MuExecutable>),
        ("t3::b::Plugin", plugin_t3_b),
        ("t3::c::Plugin", plugin_t3_c),
    ] {
        runtime.add_executable_factory(name, factory).unwrap();
    }

    runtime.start_module("t3::a").unwrap();

    // Transitive requirements run strictly before their dependents' hooks.
    let starts = recorded("t3::");
    assert_eq!(starts, vec!["t3::c:start", "t3::b:start", "t3::a:start"]);
    assert!(runtime.find_module("t3::b").unwrap().is_started());
    assert!(runtime.find_module("t3::c").unwrap().is_started());
}

#[test]
fn test_requirement_cycle_is_detected() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "a",
        r#"<plugin id="t5::a"><requirement id="t5::b"/></plugin>"#,
    );
    write_module(
        root.path(),
        "b",
        r#"<plugin id="t5::b"><requirement id="t5::a"/></plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    match runtime.start_module("t5::a").unwrap_err() {
        MuError::CircularRequirement { chain } => {
            assert!(chain.contains(&"t5::a".to_string()));
            assert!(chain.contains(&"t5::b".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }

    // No module is left dangling in the transient starting state.
    assert_eq!(
        runtime.find_module("t5::a").unwrap().state(),
        MuModuleState::Enabled
    );
    assert_eq!(
        runtime.find_module("t5::b").unwrap().state(),
        MuModuleState::Enabled
    );
}

#[test]
fn test_resolved_type_does_not_activate_owner() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "f",
        r#"<plugin id="t6::f">
             <extension id="t6::f::view" implements="host::views"/>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    runtime
        .add_executable_factory("t6::f::Plugin", plugin_t6_f)
        .unwrap();

    let extension = runtime.find_extension("t6::f::view").unwrap();
    let instance = runtime
        .create_executable_instance_for("t6::f::Plugin", &extension)
        .unwrap();
    drop(instance);

    // A direct factory hit never triggers activation.
    assert_eq!(
        runtime.find_module("t6::f").unwrap().state(),
        MuModuleState::Enabled
    );
    assert!(recorded("t6::f:start").is_empty());
}

#[test]
fn test_unresolved_type_starts_owner_then_reports_resolution_failure() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "g",
        r#"<plugin id="t6::g">
             <extension id="t6::g::view" implements="host::views"/>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    let extension = runtime.find_extension("t6::g::view").unwrap();
    let err = runtime
        .create_executable_instance_for("t6::g::Plugin", &extension)
        .unwrap_err();
    assert!(matches!(err, MuError::PluginResolution { .. }));

    // The lazy protocol started the declarative-only owner before giving up.
    assert!(runtime.find_module("t6::g").unwrap().is_started());
}

#[test]
fn test_configure_receives_extension_payload() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "w",
        r#"<plugin id="c1::w">
             <extension id="c1::w::wiring" implements="host::wiring">
               <connect channel="alpha"/>
             </extension>
           </plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    runtime
        .add_executable_factory("c1::w::Plugin", plugin_c1_w)
        .unwrap();

    let extension = runtime.find_extension("c1::w::wiring").unwrap();
    runtime
        .create_executable_instance_for("c1::w::Plugin", &extension)
        .unwrap();

    assert_eq!(recorded("c1::w:configure"), vec!["c1::w:configure:alpha"]);
}

#[test]
fn test_missing_requirement_fails_start() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "a",
        r#"<plugin id="t7::a"><requirement id="t7::missing"/></plugin>"#,
    );

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();

    match runtime.start_module("t7::a").unwrap_err() {
        MuError::ModuleNotFound { module } => assert_eq!(module, "t7::missing"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        runtime.find_module("t7::a").unwrap().state(),
        MuModuleState::Enabled
    );
}

#[test]
fn test_stop_releases_plugin_and_restart_runs_hooks_again() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "a", r#"<plugin id="t8::a"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    runtime
        .add_executable_factory("t8::a::Plugin", plugin_t8_a)
        .unwrap();

    runtime.start_module("t8::a").unwrap();
    runtime.stop_module("t8::a").unwrap();
    runtime.start_module("t8::a").unwrap();

    assert_eq!(
        recorded("t8::a"),
        vec!["t8::a:start", "t8::a:stop", "t8::a:start"]
    );
    assert!(runtime.find_module("t8::a").unwrap().is_started());
}

#[test]
fn test_start_enabled_modules_follows_priority() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "hi", r#"<plugin id="t9::hi" priority="10"/>"#);
    write_module(root.path(), "lo", r#"<plugin id="t9::lo" priority="1"/>"#);

    let runtime = MuRuntime::with_working_path(root.path());
    runtime.add_modules(root.path()).unwrap();
    runtime
        .add_executable_factory("t9::hi::Plugin", plugin_t9_hi)
        .unwrap();
    runtime
        .add_executable_factory("t9::lo::Plugin", plugin_t9_lo)
        .unwrap();

    runtime.start_enabled_modules().unwrap();

    assert_eq!(recorded("t9::"), vec!["t9::hi:start", "t9::lo:start"]);

    runtime.stop_modules();
    assert_eq!(recorded("t9::lo:stop").len(), 1);
    assert_eq!(recorded("t9::hi:stop").len(), 1);
}

#[test]
fn test_start_unknown_module_fails() {
    let root = tempfile::tempdir().unwrap();
    let runtime = MuRuntime::with_working_path(root.path());

    match runtime.start_module("t0::ghost").unwrap_err() {
        MuError::ModuleNotFound { module } => assert_eq!(module, "t0::ghost"),
        other => panic!("unexpected error: {other}"),
    }
}
