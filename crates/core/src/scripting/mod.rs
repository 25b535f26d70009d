//! Script execution: resolving a script, binding caller values into a fresh
//! scope, evaluating it, and serializing the result.

pub mod engine;
pub mod resolver;
pub mod value;

pub use engine::{EngineConfig, EvalRequest, ScriptEngine};
pub use resolver::resolve;
pub use value::{bind_environment, serialize_result, to_js_value, to_json_value, JsonIntrinsics};
