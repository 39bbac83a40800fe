//! Integration tests for sharing the process-wide registry between "modules".
//!
//! Each module is modelled as a function that installs the registry it is
//! handed and then only talks to the free functions, the way a plugin would.

use serial_test::serial;
use singleton_index::{
    get, get_or_create, instance, lookup, register, set_instance, shutdown, teardown, Registry,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Logger {
    lines: Mutex<Vec<String>>,
}

fn load_module(host: &Arc<Registry>) -> Arc<Logger> {
    set_instance(Arc::clone(host));
    get_or_create("app.logger").unwrap()
}

#[test]
#[serial]
fn test_modules_sharing_one_registry_observe_one_instance() {
    let _ = pretty_env_logger::try_init();
    let host = Arc::new(Registry::new());

    let module_1 = load_module(&host);
    module_1.lines.lock().unwrap().push("from module 1".to_string());

    let module_2 = load_module(&host);

    assert!(Arc::ptr_eq(&module_1, &module_2));
    assert_eq!(module_2.lines.lock().unwrap().len(), 1);
    shutdown();
}

#[test]
#[serial]
fn test_switching_registries_switches_contents() {
    let r1 = Arc::new(Registry::new());
    let r2 = Arc::new(Registry::new());

    set_instance(r1.clone());
    register("only.in.r1", Arc::new(1u8)).unwrap();
    let from_r1: Arc<Logger> = get_or_create("app.logger").unwrap();

    set_instance(r2.clone());
    assert!(lookup("only.in.r1").is_none());
    let from_r2: Arc<Logger> = get_or_create("app.logger").unwrap();
    assert!(!Arc::ptr_eq(&from_r1, &from_r2));

    // The replaced registry is untouched.
    assert_eq!(*r1.get::<u8>("only.in.r1").unwrap(), 1);
    assert_eq!(r1.len(), 2);
    shutdown();
}

#[test]
#[serial]
fn test_set_instance_does_not_tear_down_previous() {
    let r1 = Arc::new(Registry::new());
    set_instance(r1.clone());
    register("kept", Arc::new("value".to_string())).unwrap();

    let previous = set_instance(Arc::new(Registry::new())).unwrap();
    assert!(Arc::ptr_eq(&previous, &r1));
    assert!(r1.contains("kept"));
    shutdown();
}

#[test]
#[serial]
fn test_global_teardown_keeps_registry_installed() {
    shutdown();
    let before = instance();
    let a: Arc<Logger> = get_or_create("app.logger").unwrap();

    assert_eq!(teardown(), 1);
    assert!(get::<Logger>("app.logger").is_err());

    let b: Arc<Logger> = get_or_create("app.logger").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&before, &instance()));
    shutdown();
}
