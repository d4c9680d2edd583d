//! The `host` object scripts see when run through the CLI.
//!
//! - `host.print(...args)`: writes the arguments, string-converted and
//!   space-separated, as one line.
//! - `host.env(name)`: the environment variable `name`, or undefined.
//! - `host.args`: the script arguments, as a fresh array on every read.

use jsbind::{Accessors, Context, Object, PropertyAttrs};
use std::rc::Rc;

/// Install `host` on the global object of `cx`.
///
/// `print` receives each line written by `host.print`. The callbacks stay
/// registered while `cx`, or a clone of it, is alive.
pub fn install<P>(cx: &Context, args: Vec<String>, print: P) -> jsbind::Result<Object>
where
    P: Fn(&str) + 'static,
{
    let host = cx.new_object();

    host.define_function("print", move |cx, values| {
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(value.coerce_string().ok()?);
        }
        print(&parts.join(" "));
        Some(cx.undefined())
    })?;

    host.define_function("env", |cx, values| {
        let name = values.first()?.to_string()?;
        match std::env::var(&name) {
            Ok(value) => Some(cx.string(&value)),
            Err(_) => Some(cx.undefined()),
        }
    })?;

    let args = Rc::new(args);
    host.define_property(
        "args",
        &cx.undefined(),
        Accessors::new().getter(move |o| {
            let array = o.context().new_array();
            for (i, arg) in args.iter().enumerate() {
                array.set_string(u32::try_from(i).ok()?, arg).ok()?;
            }
            array.to_value().ok()
        }),
        PropertyAttrs::ENUMERATE,
    )?;

    cx.global()
        .define_value("host", &host.to_value()?, PropertyAttrs::READONLY | PropertyAttrs::PERMANENT)?;
    tracing::debug!(context = cx.id(), "installed host object");
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbind::Runtime;
    use std::sync::{Arc, Mutex};

    fn setup(args: &[&str]) -> (Context, Object, Arc<Mutex<Vec<String>>>) {
        let cx = Runtime::new().new_context();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let host = install(
            &cx,
            args.iter().map(|s| s.to_string()).collect(),
            move |line| sink.lock().unwrap().push(line.to_owned()),
        )
        .unwrap();
        (cx, host, lines)
    }

    #[test]
    fn test_print_joins_arguments() {
        let (cx, _host, lines) = setup(&[]);
        cx.exec("host.print('total:', 1 + 2, true)").unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["total: 3 true".to_owned()]);
    }

    #[test]
    fn test_args_getter() {
        let (cx, _host, _) = setup(&["one", "two"]);
        let joined = cx.eval("host.args.join(',')").unwrap();
        assert_eq!(joined.to_string().as_deref(), Some("one,two"));

        cx.exec("host.args.push('three')").unwrap();
        assert_eq!(cx.eval("host.args.length").unwrap().to_int(), Some(2));
    }

    #[test]
    fn test_env_lookup() {
        let (cx, _host, _) = setup(&[]);
        let path = cx.eval("host.env('PATH')").unwrap();
        assert_eq!(path.to_string(), std::env::var("PATH").ok());

        let missing = cx.eval("host.env('JSBIND_SURELY_UNSET_VARIABLE')").unwrap();
        assert!(missing.is_undefined());
        assert!(cx.exec("host.env()").is_err());
    }

    #[test]
    fn test_host_binding_is_fixed() {
        let (cx, _host, _) = setup(&[]);
        cx.exec("host = 1; delete globalThis.host;").unwrap();
        let kind = cx.eval("typeof host.print").unwrap();
        assert_eq!(kind.to_string().as_deref(), Some("function"));
    }
}
