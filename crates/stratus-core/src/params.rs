//! Resolution of the resource identifier parameter
//!
//! The identifier of a resource can come from several places. Which one wins
//! depends on the [`Precedence`] configured on the lifecycle wrapper:
//!
//! | order | `CallParametersFirst` | `RuntimeStateFirst` |
//! |-------|-----------------------|---------------------|
//! | 1     | call parameters       | runtime properties  |
//! | 2     | node `resource_config`| call parameters     |
//! | 3     | runtime properties    | node `resource_config` |
//! | 4     | node fallback id      | node fallback id    |
//! | 5     | handle identifier     | handle identifier   |

use crate::client::Params;
use crate::runtime::RuntimeProperties;
use serde_json::Value;

/// Which source wins when several carry the identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// Explicit invocation parameters win
    #[default]
    CallParametersFirst,
    /// A value already persisted in the runtime properties wins
    RuntimeStateFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Call,
    Node,
    Runtime,
    Fallback,
    Handle,
}

impl Precedence {
    fn order(self) -> [Source; 5] {
        match self {
            Precedence::CallParametersFirst => [
                Source::Call,
                Source::Node,
                Source::Runtime,
                Source::Fallback,
                Source::Handle,
            ],
            Precedence::RuntimeStateFirst => [
                Source::Runtime,
                Source::Call,
                Source::Node,
                Source::Fallback,
                Source::Handle,
            ],
        }
    }
}

/// Non-runtime sources of an identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamSources<'a> {
    pub call_params: Option<&'a Params>,
    pub node_config: Option<&'a Params>,
    /// Derived from the node itself (its `resource_id` property or instance id)
    pub fallback: Option<&'a str>,
    /// Identifier the resource handle already carries
    pub handle_id: Option<&'a str>,
}

fn non_empty_str<'v>(params: Option<&'v Params>, key: &str) -> Option<&'v str> {
    params?
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Resolve `key` without touching any state
pub fn resolve_param(
    key: &str,
    sources: &ParamSources<'_>,
    runtime: &RuntimeProperties,
    precedence: Precedence,
) -> Option<String> {
    precedence
        .order()
        .into_iter()
        .find_map(|source| match source {
            Source::Call => non_empty_str(sources.call_params, key),
            Source::Node => non_empty_str(sources.node_config, key),
            Source::Runtime => runtime.resource_id(),
            Source::Fallback => sources.fallback.filter(|s| !s.is_empty()),
            Source::Handle => sources.handle_id.filter(|s| !s.is_empty()),
        })
        .map(String::from)
}

/// Resolve `key` and record it.
///
/// The value is written into the runtime properties as the resource identity
/// and into `params` under `key`.
pub fn aws_params(
    key: &str,
    sources: &ParamSources<'_>,
    runtime: &mut RuntimeProperties,
    precedence: Precedence,
    params: &mut Params,
) -> Option<String> {
    let resolved = resolve_param(key, sources, runtime, precedence)?;
    runtime.set_resource_id(resolved.clone());
    params.insert(key.to_string(), Value::String(resolved.clone()));
    Some(resolved)
}
