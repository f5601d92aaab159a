//! Sandboxed evaluation realm.
//!
//! Each run gets a fresh engine context whose only host capabilities are
//! the ones registered here: console logging, the mock fetch and query
//! layers, `require`, and a few web platform shims (URL, Headers, atob,
//! crypto.randomUUID). A prelude script installs the shims, wires the
//! natives behind friendlier wrappers, and freezes the shared intrinsics
//! so user code cannot poison prototypes for later statements in the
//! same run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use boa_engine::builtins::promise::PromiseState;
use boa_engine::module::{ModuleLoader as JsModuleLoader, Referrer};
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsError, JsNativeError, JsResult, JsString, JsValue, Module,
    NativeFunction, Source,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use pure_sandbox_types::parse_module_specifier;

use crate::errors::RunError;
use crate::logger::PureLogger;
use crate::mock_db::MockQueryLayer;
use crate::mock_fetch::{normalize_request, MockFetchLayer};
use crate::module_loader::{LoadOutcome, LoadedModule, ModuleLoader};

// ============================================================================
// Constants
// ============================================================================

const PRELUDE: &str = include_str!("realm/prelude.js");

/// Hidden global holding the shared exports object for sibling modules.
const SIBLING_EXPORTS_KEY: &str = "__pureSiblingExports";
/// Hidden global mapping evaluated remote module URLs to their values.
const MODULE_REGISTRY_KEY: &str = "__pureModuleRegistry";
/// Marker property on the opaque error thrown when a module is mid-fetch.
const NOT_READY_KEY: &str = "__notReadyModule";

// ============================================================================
// Realm
// ============================================================================

/// Host capabilities handed to a fresh realm.
pub struct RealmBindings {
    pub logger: PureLogger,
    pub fetch: Arc<MockFetchLayer>,
    pub db: Arc<MockQueryLayer>,
    pub loader: Arc<ModuleLoader>,
}

/// A single-use evaluation realm. Construct one per run and discard it;
/// nothing inside the engine context survives across runs.
pub struct Realm {
    context: Context,
    pending: Arc<Mutex<Option<String>>>,
}

impl Realm {
    pub fn new(bindings: RealmBindings) -> Result<Self> {
        let pending = Arc::new(Mutex::new(None));
        let js_loader = Rc::new(CacheModuleLoader {
            loader: bindings.loader.clone(),
            pending: pending.clone(),
            modules: RefCell::new(HashMap::new()),
        });
        let mut context = Context::builder()
            .module_loader(js_loader)
            .build()
            .map_err(|e| anyhow!("failed to build realm context: {e}"))?;

        register_natives(&mut context, &bindings, &pending)
            .map_err(|e| anyhow!("failed to install realm bindings: {e}"))?;
        context
            .eval(Source::from_bytes(PRELUDE))
            .map_err(|e| anyhow!("realm prelude failed: {e}"))?;

        let mut realm = Self { context, pending };
        realm
            .reset_exports()
            .map_err(|e| anyhow!("failed to install exports object: {e}"))?;
        Ok(realm)
    }

    /// Evaluate compiled CommonJS source, draining the job queue so that
    /// settled promises (fetch replays, module bodies) observe their values
    /// before the run is considered finished.
    pub fn evaluate(&mut self, code: &str) -> Result<(), RunError> {
        self.pending.lock().take();
        self.reset_exports()
            .map_err(|e| RunError::evaluation(format!("failed to reset exports: {e}")))?;

        let result = self.context.eval(Source::from_bytes(code));
        self.context.run_jobs();

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(self.classify(err)),
        }
    }

    fn reset_exports(&mut self) -> JsResult<()> {
        let exports = ObjectInitializer::new(&mut self.context).build();
        self.context.global_object().set(
            js_string!("exports"),
            exports,
            false,
            &mut self.context,
        )?;
        Ok(())
    }

    /// Split runtime failures into the ignorable not-ready signal and real
    /// evaluation errors. The not-ready signal only counts when the opaque
    /// marker object itself escaped the run; a caught-and-replaced error
    /// reports as a plain evaluation failure.
    fn classify(&mut self, err: JsError) -> RunError {
        let pending = self.pending.lock().take();
        if let Some(module) = pending {
            if is_not_ready(&err, &mut self.context) {
                return RunError::NotReady { module };
            }
        }
        RunError::Evaluation {
            message: err.to_string(),
            stack: None,
        }
    }
}

fn is_not_ready(err: &JsError, context: &mut Context) -> bool {
    let Some(value) = err.as_opaque() else {
        return false;
    };
    let Some(object) = value.as_object() else {
        return false;
    };
    object
        .get(JsString::from(NOT_READY_KEY), context)
        .map(|marker| !marker.is_undefined())
        .unwrap_or(false)
}

/// Record the pending module and build the opaque throwable that signals
/// a run should be retried once the fetch lands.
fn not_ready_error(
    module: &str,
    pending: &Arc<Mutex<Option<String>>>,
    context: &mut Context,
) -> JsError {
    pending.lock().replace(module.to_string());
    let object = ObjectInitializer::new(context)
        .property(
            js_string!("name"),
            js_string!("SafeEvaluationError"),
            Attribute::all(),
        )
        .property(
            js_string!("message"),
            JsString::from(format!("{module} is not loaded yet.")),
            Attribute::all(),
        )
        .property(
            JsString::from(NOT_READY_KEY),
            JsString::from(module),
            Attribute::all(),
        )
        .build();
    JsError::from_opaque(object.into())
}

// ============================================================================
// Native bindings
// ============================================================================

fn register_natives(
    context: &mut Context,
    bindings: &RealmBindings,
    pending: &Arc<Mutex<Option<String>>>,
) -> JsResult<()> {
    let logger = bindings.logger.clone();
    context.register_global_callable(
        js_string!("__pureLog"),
        2,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let level = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let values = array_to_values(args.get_or_undefined(1), ctx);
            match level.as_str() {
                "warn" => logger.warn(values),
                "error" => logger.error(values, None),
                _ => logger.log(values),
            }
            Ok(JsValue::undefined())
        }) },
    )?;

    let fetch = bindings.fetch.clone();
    context.register_global_callable(
        js_string!("__pureFetch"),
        1,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let raw = json_value_of(args.get_or_undefined(0), ctx);
            let request = normalize_request(raw)
                .map_err(|e| JsNativeError::typ().with_message(e.to_string()))?;
            let response = fetch.fetch(request);
            let payload = json!({
                "status": response.status,
                "statusText": response.status_text,
                "headers": response.headers,
                "body": response.body,
            });
            JsValue::from_json(&payload, ctx)
        }) },
    )?;

    context.register_global_callable(
        js_string!("__pureParseUrl"),
        2,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let input = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let base = args.get_or_undefined(1);
            let parsed = if base.is_undefined() {
                url::Url::parse(&input)
            } else {
                let base = base.to_string(ctx)?.to_std_string_escaped();
                url::Url::parse(&base).and_then(|b| b.join(&input))
            }
            .map_err(|e| JsNativeError::typ().with_message(format!("Invalid URL '{input}': {e}")))?;

            let origin = match parsed.host_str() {
                Some(host) => {
                    let port = parsed
                        .port()
                        .map(|p| format!(":{p}"))
                        .unwrap_or_default();
                    format!("{}://{host}{port}", parsed.scheme())
                }
                None => "null".to_string(),
            };
            let host = match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            let payload = json!({
                "href": parsed.to_string(),
                "protocol": format!("{}:", parsed.scheme()),
                "host": host,
                "hostname": parsed.host_str().unwrap_or(""),
                "port": parsed.port().map(|p| p.to_string()).unwrap_or_default(),
                "pathname": parsed.path(),
                "search": parsed.query().map(|q| format!("?{q}")).unwrap_or_default(),
                "hash": parsed.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
                "origin": origin,
            });
            JsValue::from_json(&payload, ctx)
        }) },
    )?;

    let db = bindings.db.clone();
    context.register_global_callable(
        js_string!("__pureSqlExecute"),
        2,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let sql = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let parameters = match json_value_of(args.get_or_undefined(1), ctx) {
                Value::Array(values) => values,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            let rows = db
                .execute(pure_sandbox_types::CompiledQuery { sql, parameters })
                .map_err(|e| JsNativeError::error().with_message(e.to_string()))?;
            JsValue::from_json(&Value::Array(rows.rows), ctx)
        }) },
    )?;

    let db = bindings.db.clone();
    context.register_global_callable(
        js_string!("__pureSqlLifecycle"),
        1,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let op = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let result = match op.as_str() {
                "begin" => db.begin(),
                "commit" => db.commit(),
                "rollback" => db.rollback(),
                other => {
                    return Err(JsNativeError::typ()
                        .with_message(format!("unknown transaction operation '{other}'"))
                        .into())
                }
            };
            result.map_err(|e| JsNativeError::error().with_message(e.to_string()))?;
            Ok(JsValue::undefined())
        }) },
    )?;

    context.register_global_callable(
        js_string!("__pureRandomUuid"),
        0,
        unsafe { NativeFunction::from_closure(move |_this, _args, _ctx| {
            Ok(JsString::from(uuid::Uuid::new_v4().to_string()).into())
        }) },
    )?;

    context.register_global_callable(
        js_string!("atob"),
        1,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let encoded = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let bytes = BASE64.decode(encoded.trim()).map_err(|_| {
                JsNativeError::typ().with_message("atob: input is not valid base64")
            })?;
            let decoded: String = bytes.iter().map(|&b| b as char).collect();
            Ok(JsString::from(decoded).into())
        }) },
    )?;

    context.register_global_callable(
        js_string!("btoa"),
        1,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let text = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let mut bytes = Vec::with_capacity(text.len());
            for ch in text.chars() {
                if (ch as u32) > 0xFF {
                    return Err(JsNativeError::typ()
                        .with_message("btoa: input contains characters outside the Latin1 range")
                        .into());
                }
                bytes.push(ch as u8);
            }
            Ok(JsString::from(BASE64.encode(bytes)).into())
        }) },
    )?;

    let loader = bindings.loader.clone();
    let pending = pending.clone();
    context.register_global_callable(
        js_string!("require"),
        1,
        unsafe { NativeFunction::from_closure(move |_this, args, ctx| {
            let specifier = args
                .get_or_undefined(0)
                .to_string(ctx)?
                .to_std_string_escaped();
            let outcome = loader
                .load(&specifier)
                .map_err(|e| JsNativeError::error().with_message(e.to_string()))?;
            match outcome {
                LoadOutcome::Pending { module } => Err(not_ready_error(&module, &pending, ctx)),
                LoadOutcome::Ready(LoadedModule::Sibling { name, code }) => {
                    eval_sibling(ctx, &name, &code)
                }
                LoadOutcome::Ready(LoadedModule::Remote { url, source }) => {
                    eval_remote(ctx, &pending, &url, &source)
                }
            }
        }) },
    )?;

    Ok(())
}

// ============================================================================
// Module evaluation
// ============================================================================

/// Evaluate a remote ES module and return its value, preferring the default
/// export when one exists. Evaluated values are memoized per realm so a
/// module required twice in one run observes a single instance.
fn eval_remote(
    context: &mut Context,
    pending: &Arc<Mutex<Option<String>>>,
    url: &str,
    source: &str,
) -> JsResult<JsValue> {
    let registry = hidden_object(context, MODULE_REGISTRY_KEY)?;
    let key = JsString::from(url);
    let cached = registry.get(key.clone(), context)?;
    if !cached.is_undefined() {
        return Ok(cached);
    }

    let module = Module::parse(Source::from_bytes(source.as_bytes()), None, context)?;
    let promise = module.load_link_evaluate(context);
    context.run_jobs();

    match promise.state() {
        PromiseState::Fulfilled(_) => {
            let namespace = module.namespace(context);
            let default = namespace.get(js_string!("default"), context)?;
            let value: JsValue = if default.is_undefined() {
                namespace.into()
            } else {
                default
            };
            registry.set(key, value.clone(), false, context)?;
            Ok(value)
        }
        PromiseState::Rejected(reason) => Err(JsError::from_opaque(reason)),
        PromiseState::Pending => Err(not_ready_error(url, pending, context)),
    }
}

/// Evaluate a compiled sibling function module against the shared sibling
/// exports object and return that object. Siblings run once per realm; a
/// second require observes the already populated exports.
fn eval_sibling(context: &mut Context, name: &str, code: &str) -> JsResult<JsValue> {
    let exports = hidden_object(context, SIBLING_EXPORTS_KEY)?;
    let evaluated_key = JsString::from(format!("__evaluated_{name}"));
    if !exports.get(evaluated_key.clone(), context)?.is_undefined() {
        return Ok(exports.into());
    }
    exports.set(evaluated_key, true, false, context)?;

    let wrapper = format!("(function (exports) {{\n{code}\n}})");
    let function = context.eval(Source::from_bytes(&wrapper))?;
    let function = function.as_callable().cloned().ok_or_else(|| {
        JsNativeError::typ().with_message(format!("module '{name}' did not compile to a function"))
    })?;
    function.call(&JsValue::undefined(), &[exports.clone().into()], context)?;
    Ok(exports.into())
}

/// Fetch-or-create a plain object stored under a hidden global key.
fn hidden_object(context: &mut Context, key: &str) -> JsResult<boa_engine::JsObject> {
    let key = JsString::from(key);
    let existing = context.global_object().get(key.clone(), context)?;
    if let Some(object) = existing.as_object() {
        return Ok(object.clone());
    }
    let object = ObjectInitializer::new(context).build();
    context
        .global_object()
        .set(key, object.clone(), false, context)?;
    Ok(object)
}

// ============================================================================
// Engine module loader (nested static imports)
// ============================================================================

/// Serves the engine's static import requests out of the resolver cache.
/// Misses throw the not-ready signal so the surrounding run ends quietly
/// and is retried when the background fetch completes.
struct CacheModuleLoader {
    loader: Arc<ModuleLoader>,
    pending: Arc<Mutex<Option<String>>>,
    modules: RefCell<HashMap<String, Module>>,
}

impl CacheModuleLoader {
    fn canonical(&self, specifier: &str) -> JsResult<String> {
        if specifier.starts_with("http://") || specifier.starts_with("https://") {
            return Ok(specifier.to_string());
        }
        // CDN bundles reference their own dependencies by absolute path.
        if let Some(path) = specifier.strip_prefix('/') {
            return Ok(format!(
                "{}/{path}",
                self.loader.resolver().cdn_base().trim_end_matches('/')
            ));
        }
        if specifier.starts_with('.') {
            return Err(JsNativeError::typ()
                .with_message(format!(
                    "unsupported relative import '{specifier}' in remote module"
                ))
                .into());
        }
        let spec = parse_module_specifier(specifier).ok_or_else(|| {
            JsNativeError::typ().with_message(format!("invalid module specifier '{specifier}'"))
        })?;
        Ok(self.loader.resolver().canonical_url(&spec))
    }

    fn load_cached(&self, specifier: &str, context: &mut Context) -> JsResult<Module> {
        let url = self.canonical(specifier)?;
        if let Some(module) = self.modules.borrow().get(&url) {
            return Ok(module.clone());
        }
        match self.loader.load_url(&url) {
            LoadOutcome::Ready(LoadedModule::Remote { source, .. }) => {
                let module = Module::parse(Source::from_bytes(source.as_bytes()), None, context)?;
                self.modules.borrow_mut().insert(url, module.clone());
                Ok(module)
            }
            LoadOutcome::Ready(LoadedModule::Sibling { name, .. }) => {
                Err(JsNativeError::typ()
                    .with_message(format!("module '{name}' cannot be statically imported"))
                    .into())
            }
            LoadOutcome::Pending { module } => {
                Err(not_ready_error(&module, &self.pending, context))
            }
        }
    }
}

impl JsModuleLoader for CacheModuleLoader {
    fn load_imported_module(
        &self,
        _referrer: Referrer,
        specifier: JsString,
        finish_load: Box<dyn FnOnce(JsResult<Module>, &mut Context)>,
        context: &mut Context,
    ) {
        let specifier = specifier.to_std_string_escaped();
        let result = self.load_cached(&specifier, context);
        finish_load(result, context);
    }
}

// ============================================================================
// Value conversion
// ============================================================================

fn json_value_of(value: &JsValue, context: &mut Context) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    value
        .to_json(context)
        .unwrap_or_else(|_| Value::String(value.display().to_string()))
}

fn array_to_values(value: &JsValue, context: &mut Context) -> Vec<Value> {
    let Some(object) = value.as_object().cloned() else {
        return vec![json_value_of(value, context)];
    };
    let length = match object
        .get(js_string!("length"), context)
        .and_then(|l| l.to_length(context))
    {
        Ok(length) => length,
        Err(_) => return vec![json_value_of(value, context)],
    };
    (0..length)
        .map(|i| {
            object
                .get(i as u32, context)
                .map(|v| json_value_of(&v, context))
                .unwrap_or(Value::Null)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ModuleResolver;
    use pure_sandbox_types::{EvaluationContext, ExecutionId, StampedMessage};
    use pure_transport::{ModuleFetcher, RequestQueue};
    use std::collections::HashMap as StdHashMap;
    use tokio::sync::mpsc;

    struct StaticFetcher {
        modules: StdHashMap<String, String>,
    }

    impl ModuleFetcher for StaticFetcher {
        fn fetch_module(&self, url: &str) -> anyhow::Result<String> {
            self.modules
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("no module at {url}"))
        }
    }

    fn test_realm(
        context: EvaluationContext,
        modules: StdHashMap<String, String>,
    ) -> (Realm, mpsc::UnboundedReceiver<StampedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let logger = PureLogger::new(ExecutionId(1), tx);
        let resolver = Arc::new(ModuleResolver::new(
            Arc::new(StaticFetcher { modules }),
            Arc::new(RequestQueue::default()),
            event_tx,
            "https://esm.sh".to_string(),
        ));
        let context = Arc::new(context);
        let loader = Arc::new(ModuleLoader::new(resolver, context.clone(), logger.clone()));
        let fetch = Arc::new(MockFetchLayer::new(
            context.fetch_mocks.clone(),
            logger.clone(),
        ));
        let db = Arc::new(MockQueryLayer::new(
            Box::new(crate::mock_db::NoopDriver),
            context.sql_mocks.clone(),
            logger.clone(),
        ));
        let realm = Realm::new(RealmBindings {
            logger,
            fetch,
            db,
            loader,
        })
        .unwrap();
        (realm, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StampedMessage>) -> Vec<StampedMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_console_log_reaches_logger() {
        let (mut realm, mut rx) = test_realm(EvaluationContext::default(), StdHashMap::new());
        tokio::task::spawn_blocking(move || {
            realm.evaluate("console.log(1 + 1, \"two\");").unwrap();
            drop(realm);
        })
        .await
        .unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        match &messages[0].message {
            pure_sandbox_types::ExecutionMessage::Log { messages } => {
                assert_eq!(messages[0].as_i64(), Some(2));
                assert_eq!(messages[1].as_str(), Some("two"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unrecorded_fetch_replays_sentinel() {
        let (mut realm, mut rx) = test_realm(EvaluationContext::default(), StdHashMap::new());
        tokio::task::spawn_blocking(move || {
            realm
                .evaluate(
                    "fetch(\"https://api.example.com/v1\").then((r) => console.log(r.status));",
                )
                .unwrap();
            drop(realm);
        })
        .await
        .unwrap();

        let messages = drain(&mut rx);
        let statuses: Vec<_> = messages
            .iter()
            .filter_map(|m| match &m.message {
                pure_sandbox_types::ExecutionMessage::Log { messages } => messages[0].as_i64(),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![599]);
        assert!(messages
            .iter()
            .any(|m| matches!(m.message, pure_sandbox_types::ExecutionMessage::Fetch { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_undeclared_require_is_validation_error() {
        let (mut realm, _rx) = test_realm(EvaluationContext::default(), StdHashMap::new());
        let err = tokio::task::spawn_blocking(move || {
            realm.evaluate("require(\"lodash\");").unwrap_err()
        })
        .await
        .unwrap();

        match err {
            RunError::Evaluation { message, .. } => {
                assert!(message.contains("is not installed"), "got: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pending_module_surfaces_not_ready() {
        let mut context = EvaluationContext::default();
        context.declared_dependencies.insert("left-pad".to_string());
        let (mut realm, _rx) = test_realm(context, StdHashMap::new());

        let err = tokio::task::spawn_blocking(move || {
            realm.evaluate("require(\"left-pad\");").unwrap_err()
        })
        .await
        .unwrap();

        match err {
            RunError::NotReady { module } => assert!(module.contains("left-pad")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sibling_function_module_evaluates() {
        let mut context = EvaluationContext::default();
        context.functions.insert(
            "shout".to_string(),
            "export const shout = (s: string) => s.toUpperCase();".to_string(),
        );
        let (mut realm, mut rx) = test_realm(context, StdHashMap::new());

        tokio::task::spawn_blocking(move || {
            realm
                .evaluate(
                    "const m = require(\"@pure/functions/shout\");\nconsole.log(m.shout(\"hi\"));",
                )
                .unwrap();
            drop(realm);
        })
        .await
        .unwrap();

        let messages = drain(&mut rx);
        let logged: Vec<_> = messages
            .iter()
            .filter_map(|m| match &m.message {
                pure_sandbox_types::ExecutionMessage::Log { messages } => {
                    messages[0].as_str().map(str::to_string)
                }
                _ => None,
            })
            .collect();
        assert_eq!(logged, vec!["HI".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_frozen_intrinsics_reject_prototype_writes() {
        let (mut realm, _rx) = test_realm(EvaluationContext::default(), StdHashMap::new());
        let err = tokio::task::spawn_blocking(move || {
            realm
                .evaluate("\"use strict\";\nArray.prototype.push = function () {};")
                .unwrap_err()
        })
        .await
        .unwrap();
        assert!(matches!(err, RunError::Evaluation { .. }));
    }
}
