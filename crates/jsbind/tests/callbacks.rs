//! Integration tests for host accessors and host functions.

use jsbind::{Accessors, PropertyAttrs, Runtime, Value};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_getter_and_setter_dispatch() {
    let cx = Runtime::new().new_context();
    let temperature = Arc::new(AtomicI32::new(20));

    let read = temperature.clone();
    let write = temperature.clone();
    let sensor = cx.new_object();
    sensor
        .define_property(
            "celsius",
            &cx.undefined(),
            Accessors::new()
                .getter(move |o| Some(o.context().int(read.load(Ordering::SeqCst))))
                .setter(move |_o, v| {
                    if let Some(n) = v.to_int() {
                        write.store(n, Ordering::SeqCst);
                    }
                }),
            PropertyAttrs::ENUMERATE,
        )
        .unwrap();
    cx.global().set_object("sensor", &sensor).unwrap();

    assert_eq!(cx.eval("sensor.celsius").unwrap().to_int(), Some(20));
    cx.exec("sensor.celsius = 25").unwrap();
    assert_eq!(temperature.load(Ordering::SeqCst), 25);
    assert_eq!(sensor.get_int("celsius"), Some(25));
}

#[test]
fn test_getter_receives_owner() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.set_int("base", 10).unwrap();
    obj.define_property(
        "next",
        &cx.undefined(),
        Accessors::new().getter(|o| {
            let base = o.get_int("base")?;
            Some(o.context().int(base + 1))
        }),
        PropertyAttrs::empty(),
    )
    .unwrap();

    assert_eq!(obj.get_int("next"), Some(11));
    obj.set_int("base", 41).unwrap();
    assert_eq!(obj.get_int("next"), Some(42));
}

#[test]
fn test_setter_only_property_reads_last_written_value() {
    let cx = Runtime::new().new_context();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let obj = cx.new_object();
    obj.define_property(
        "level",
        &cx.string("low"),
        Accessors::new().setter(move |_o, v| {
            if let Some(s) = v.to_string() {
                sink.lock().unwrap().push(s);
            }
        }),
        PropertyAttrs::ENUMERATE,
    )
    .unwrap();

    assert_eq!(obj.get_string("level").as_deref(), Some("low"));
    obj.set_string("level", "high").unwrap();
    assert_eq!(obj.get_string("level").as_deref(), Some("high"));
    assert_eq!(*seen.lock().unwrap(), vec!["high".to_owned()]);
}

#[test]
fn test_getter_only_property_ignores_sloppy_writes() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.define_property(
        "fixed",
        &cx.undefined(),
        Accessors::new().getter(|o| Some(o.context().int(7))),
        PropertyAttrs::empty(),
    )
    .unwrap();
    cx.global().set_object("obj", &obj).unwrap();

    cx.exec("obj.fixed = 99").unwrap();
    assert_eq!(obj.get_int("fixed"), Some(7));
    assert!(cx.exec("'use strict'; obj.fixed = 99").is_err());
}

#[test]
fn test_failing_getter_throws_into_script() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.define_property(
        "broken",
        &cx.undefined(),
        Accessors::new().getter(|_| None),
        PropertyAttrs::empty(),
    )
    .unwrap();
    cx.global().set_object("obj", &obj).unwrap();

    assert!(obj.get_property("broken").is_err());
    let caught = cx
        .eval("try { obj.broken; 'no' } catch (e) { e instanceof TypeError ? 'yes' : 'other' }")
        .unwrap();
    assert_eq!(caught.to_string().as_deref(), Some("yes"));
}

#[test]
fn test_redefining_property_replaces_callbacks() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    let define = |n: i32, attrs| {
        obj.define_property(
            "v",
            &cx.undefined(),
            Accessors::new().getter(move |o| Some(o.context().int(n))),
            attrs,
        )
    };

    define(1, PropertyAttrs::empty()).unwrap();
    assert_eq!(obj.get_int("v"), Some(1));
    define(2, PropertyAttrs::empty()).unwrap();
    assert_eq!(obj.get_int("v"), Some(2));
}

#[test]
fn test_permanent_accessor_cannot_be_redefined() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.define_property(
        "v",
        &cx.undefined(),
        Accessors::new().getter(|o| Some(o.context().int(1))),
        PropertyAttrs::PERMANENT,
    )
    .unwrap();

    let again = obj.define_property(
        "v",
        &cx.undefined(),
        Accessors::new().getter(|o| Some(o.context().int(2))),
        PropertyAttrs::PERMANENT,
    );
    assert!(again.is_err());
    assert_eq!(obj.get_int("v"), Some(1), "old getter stays registered");
}

#[test]
#[should_panic(expected = "getter and setter are both None")]
fn test_define_property_without_accessors_panics() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    let _ = obj.define_property("x", &cx.undefined(), Accessors::new(), PropertyAttrs::empty());
}

#[test]
#[should_panic(expected = "cannot be defined on an array")]
fn test_define_property_on_array_panics() {
    let cx = Runtime::new().new_context();
    let arr = cx.eval("[]").unwrap().to_object().unwrap();
    let _ = arr.define_property(
        "x",
        &cx.undefined(),
        Accessors::new().getter(|o| Some(o.context().int(1))),
        PropertyAttrs::empty(),
    );
}

#[test]
fn test_host_function_receives_exact_arguments() {
    let cx = Runtime::new().new_context();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let sink = counts.clone();

    cx.define_function("count", move |cx, args| {
        sink.lock().unwrap().push(args.len());
        Some(cx.undefined())
    })
    .unwrap();

    cx.exec("count(); count(1); count(1, 'two', [3]);").unwrap();
    assert_eq!(*counts.lock().unwrap(), vec![0, 1, 3]);
}

#[test]
fn test_host_function_failure_throws() {
    let cx = Runtime::new().new_context();
    cx.define_function("refuse", |_, _| None).unwrap();

    assert!(cx.exec("refuse()").is_err());
    let caught = cx
        .eval("try { refuse(); false } catch (e) { e instanceof TypeError }")
        .unwrap();
    assert_eq!(caught.to_boolean(), Some(true));
}

#[test]
fn test_redefining_function_replaces_callback() {
    let cx = Runtime::new().new_context();
    cx.define_function("which", |cx, _| Some(cx.string("first"))).unwrap();
    cx.define_function("which", |cx, _| Some(cx.string("second"))).unwrap();

    assert_eq!(cx.eval("which()").unwrap().to_string().as_deref(), Some("second"));
}

#[test]
fn test_method_on_object_and_call_from_host() {
    let cx = Runtime::new().new_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let math = cx.new_object();
    math.define_function("sum", move |cx, args: &[Value]| {
        counter.fetch_add(1, Ordering::SeqCst);
        let mut total = 0.0;
        for arg in args {
            total += arg.to_number()?;
        }
        Some(cx.number(total))
    })
    .unwrap();
    cx.global().set_object("math", &math).unwrap();

    assert_eq!(cx.eval("math.sum(1, 2, 3.5)").unwrap().to_number(), Some(6.5));
    let r = math.call_method("sum", &[cx.int(4), cx.int(5)]).unwrap();
    assert_eq!(r.to_int(), Some(9));
    assert!(cx.exec("math.sum(1, 'x')").is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_callbacks_on_disposed_object_fail() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.define_function("ping", |cx, _| Some(cx.string("pong"))).unwrap();
    cx.global().set_object("obj", &obj).unwrap();
    assert_eq!(cx.eval("obj.ping()").unwrap().to_string().as_deref(), Some("pong"));

    obj.dispose();
    assert!(cx.exec("obj.ping()").is_err());
}

#[test]
fn test_global_callbacks_survive_dropped_wrapper() {
    let cx = Runtime::new().new_context();
    {
        let global = cx.global();
        global
            .define_property(
                "build",
                &cx.undefined(),
                Accessors::new().getter(|o| Some(o.context().string("1.0"))),
                PropertyAttrs::empty(),
            )
            .unwrap();
    }
    assert_eq!(cx.eval("build").unwrap().to_string().as_deref(), Some("1.0"));
}

#[test]
fn test_setter_can_write_back_into_engine() {
    let cx = Runtime::new().new_context();
    let obj = cx.new_object();
    obj.define_property(
        "mirror",
        &cx.undefined(),
        Accessors::new().setter(|o, v| {
            let _ = o.set_property("shadow", v);
        }),
        PropertyAttrs::empty(),
    )
    .unwrap();
    cx.global().set_object("obj", &obj).unwrap();

    cx.exec("obj.mirror = 'copied'").unwrap();
    assert_eq!(obj.get_string("shadow").as_deref(), Some("copied"));
    assert_eq!(obj.get_string("mirror").as_deref(), Some("copied"));
}
