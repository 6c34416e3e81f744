//! Hook call values and typed results.
//!
//! A [`HookCall`] is what a subscriber receives: the canonical hook name and
//! an ordered argument list. A subscriber answers with a [`HookResult`].
//!
//! # Result Merging
//!
//! Tiers are merged by taking the first result that carries an opinion:
//!
//! ```rust
//! use tether_core::HookResult;
//!
//! let merged = HookResult::first_of([
//!     HookResult::NoOpinion,
//!     HookResult::reject("Banned"),
//!     HookResult::approve(),
//! ]);
//! assert_eq!(merged.rejection_reason(), Some("Banned"));
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::players::UniversalPlayer;
use crate::session::Session;

// =============================================================================
// HookResult
// =============================================================================

/// The value a hook subscriber (or a merged tier chain) produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HookResult {
    /// No opinion; the next tier decides.
    #[default]
    NoOpinion,
    /// Explicit rejection, optionally with a reason shown to the player.
    Reject(Option<String>),
    /// Explicit approval or "handled" marker, optionally with a payload.
    Approve(Option<Value>),
}

impl HookResult {
    /// Rejection with a reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject(Some(reason.into()))
    }

    /// Plain `false`.
    pub fn deny() -> Self {
        Self::Reject(None)
    }

    /// Plain `true`.
    pub fn approve() -> Self {
        Self::Approve(None)
    }

    /// Approval carrying a payload.
    pub fn approve_with(payload: Value) -> Self {
        Self::Approve(Some(payload))
    }

    /// Returns `true` unless this is [`HookResult::NoOpinion`].
    pub fn has_opinion(&self) -> bool {
        !matches!(self, Self::NoOpinion)
    }

    /// Returns `true` for [`HookResult::Reject`].
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Reject(_))
    }

    /// Returns `true` for [`HookResult::Approve`].
    pub fn is_approval(&self) -> bool {
        matches!(self, Self::Approve(_))
    }

    /// The rejection reason, if this is a rejection that carries one.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Reject(Some(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Returns `self` if it has an opinion, otherwise `other`.
    pub fn or(self, other: HookResult) -> HookResult {
        if self.has_opinion() { self } else { other }
    }

    /// Returns the first result with an opinion, or `NoOpinion`.
    pub fn first_of(results: impl IntoIterator<Item = HookResult>) -> HookResult {
        results
            .into_iter()
            .find(HookResult::has_opinion)
            .unwrap_or_default()
    }

    /// Converts a loosely typed plugin return value.
    ///
    /// `null` is no opinion, `false` and strings reject, `true` approves,
    /// and any other value approves carrying itself as payload.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::NoOpinion,
            Value::Bool(false) => Self::Reject(None),
            Value::Bool(true) => Self::Approve(None),
            Value::String(reason) => Self::Reject(Some(reason)),
            other => Self::Approve(Some(other)),
        }
    }

    /// Converts back into the loosely typed form engines expect.
    pub fn to_value(&self) -> Value {
        match self {
            Self::NoOpinion => Value::Null,
            Self::Reject(None) => Value::Bool(false),
            Self::Reject(Some(reason)) => Value::String(reason.clone()),
            Self::Approve(None) => Value::Bool(true),
            Self::Approve(Some(payload)) => payload.clone(),
        }
    }
}

impl fmt::Display for HookResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOpinion => f.write_str("no opinion"),
            Self::Reject(None) => f.write_str("reject"),
            Self::Reject(Some(reason)) => write!(f, "reject({reason})"),
            Self::Approve(None) => f.write_str("approve"),
            Self::Approve(Some(payload)) => write!(f, "approve({payload})"),
        }
    }
}

impl From<Value> for HookResult {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

// =============================================================================
// IntoHookResult
// =============================================================================

/// Conversion of handler return values into a [`HookResult`].
///
/// Lets handlers return whatever reads naturally: `()` for void hooks,
/// `bool`, a reason string, an `Option` of any of those, or a `Result`
/// whose error becomes a handler fault.
pub trait IntoHookResult {
    /// Performs the conversion. `Err` carries a handler fault message.
    fn into_hook_result(self) -> Result<HookResult, String>;
}

impl IntoHookResult for HookResult {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(self)
    }
}

impl IntoHookResult for () {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(HookResult::NoOpinion)
    }
}

impl IntoHookResult for bool {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(if self {
            HookResult::approve()
        } else {
            HookResult::deny()
        })
    }
}

impl IntoHookResult for String {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(HookResult::Reject(Some(self)))
    }
}

impl IntoHookResult for &'static str {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(HookResult::reject(self))
    }
}

impl IntoHookResult for Value {
    fn into_hook_result(self) -> Result<HookResult, String> {
        Ok(HookResult::from_value(self))
    }
}

impl<T: IntoHookResult> IntoHookResult for Option<T> {
    fn into_hook_result(self) -> Result<HookResult, String> {
        match self {
            Some(inner) => inner.into_hook_result(),
            None => Ok(HookResult::NoOpinion),
        }
    }
}

impl<T, E> IntoHookResult for Result<T, E>
where
    T: IntoHookResult,
    E: fmt::Display,
{
    fn into_hook_result(self) -> Result<HookResult, String> {
        match self {
            Ok(inner) => inner.into_hook_result(),
            Err(e) => Err(e.to_string()),
        }
    }
}

// =============================================================================
// HookArg / HookCall
// =============================================================================

/// One positional hook argument.
#[derive(Debug, Clone)]
pub enum HookArg {
    /// An engine session (specific tier).
    Session(Arc<Session>),
    /// A universal player (universal and deprecated tiers).
    Player(Arc<UniversalPlayer>),
    /// A string.
    Str(String),
    /// A list of strings, such as command arguments.
    Strs(Vec<String>),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// Anything else, already in loose form.
    Json(Value),
}

impl HookArg {
    /// Loose representation, for logging and for engines that only take JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Session(s) => serde_json::json!({
                "handle": s.handle().0,
                "id": s.id().get(),
                "name": s.display_name(),
            }),
            Self::Player(p) => serde_json::json!({
                "id": p.id_string(),
                "name": p.name(),
            }),
            Self::Str(s) => Value::String(s.clone()),
            Self::Strs(items) => Value::from(items.clone()),
            Self::Int(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<Arc<Session>> for HookArg {
    fn from(session: Arc<Session>) -> Self {
        Self::Session(session)
    }
}

impl From<Arc<UniversalPlayer>> for HookArg {
    fn from(player: Arc<UniversalPlayer>) -> Self {
        Self::Player(player)
    }
}

impl From<String> for HookArg {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for HookArg {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Vec<String>> for HookArg {
    fn from(items: Vec<String>) -> Self {
        Self::Strs(items)
    }
}

impl From<i64> for HookArg {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for HookArg {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for HookArg {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Value> for HookArg {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

/// A single hook call as delivered to subscribers.
///
/// Cheap to clone; arguments are shared.
#[derive(Debug, Clone)]
pub struct HookCall {
    name: Arc<str>,
    args: Arc<[HookArg]>,
}

impl HookCall {
    /// Creates a call.
    pub fn new(name: &str, args: Vec<HookArg>) -> Self {
        Self {
            name: Arc::from(name),
            args: Arc::from(args),
        }
    }

    /// Same arguments under a different hook name.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: Arc::from(name),
            args: Arc::clone(&self.args),
        }
    }

    /// The hook name this call was made under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All arguments in order.
    pub fn args(&self) -> &[HookArg] {
        &self.args
    }

    /// The argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&HookArg> {
        self.args.get(index)
    }

    /// The first session argument.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.args.iter().find_map(|a| match a {
            HookArg::Session(s) => Some(s),
            _ => None,
        })
    }

    /// The first universal player argument.
    pub fn player(&self) -> Option<&Arc<UniversalPlayer>> {
        self.args.iter().find_map(|a| match a {
            HookArg::Player(p) => Some(p),
            _ => None,
        })
    }

    /// The string argument at `index`.
    pub fn str(&self, index: usize) -> Option<&str> {
        match self.args.get(index)? {
            HookArg::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The string-list argument at `index`.
    pub fn strs(&self, index: usize) -> Option<&[String]> {
        match self.args.get(index)? {
            HookArg::Strs(items) => Some(items),
            _ => None,
        }
    }

    /// The integer argument at `index`.
    pub fn int(&self, index: usize) -> Option<i64> {
        match self.args.get(index)? {
            HookArg::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The float argument at `index`.
    pub fn float(&self, index: usize) -> Option<f64> {
        match self.args.get(index)? {
            HookArg::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean argument at `index`.
    pub fn bool(&self, index: usize) -> Option<bool> {
        match self.args.get(index)? {
            HookArg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The JSON argument at `index`.
    pub fn json(&self, index: usize) -> Option<&Value> {
        match self.args.get(index)? {
            HookArg::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for HookCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} args)", self.name, self.args.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ConnectionHandle, PlayerId};
    use serde_json::json;

    #[test]
    fn test_first_of_skips_no_opinion() {
        let merged = HookResult::first_of([
            HookResult::NoOpinion,
            HookResult::deny(),
            HookResult::reject("late"),
        ]);
        assert_eq!(merged, HookResult::Reject(None));
        assert_eq!(HookResult::first_of([]), HookResult::NoOpinion);
    }

    #[test]
    fn test_loose_value_mapping() {
        assert_eq!(HookResult::from_value(Value::Null), HookResult::NoOpinion);
        assert_eq!(HookResult::from_value(json!(false)), HookResult::deny());
        assert_eq!(HookResult::from_value(json!(true)), HookResult::approve());
        assert_eq!(HookResult::from_value(json!("Banned")), HookResult::reject("Banned"));
        assert_eq!(
            HookResult::from_value(json!({"slot": 3})),
            HookResult::approve_with(json!({"slot": 3}))
        );
        assert_eq!(HookResult::reject("Banned").to_value(), json!("Banned"));
    }

    #[test]
    fn test_into_hook_result_conversions() {
        assert_eq!(().into_hook_result(), Ok(HookResult::NoOpinion));
        assert_eq!(false.into_hook_result(), Ok(HookResult::deny()));
        assert_eq!(Some("Full").into_hook_result(), Ok(HookResult::reject("Full")));
        assert_eq!(None::<bool>.into_hook_result(), Ok(HookResult::NoOpinion));

        let failed: Result<bool, String> = Err("db down".into());
        assert_eq!(failed.into_hook_result(), Err("db down".to_string()));
    }

    #[test]
    fn test_or_keeps_first_opinion() {
        assert_eq!(
            HookResult::NoOpinion.or(HookResult::approve()),
            HookResult::approve()
        );
        assert_eq!(
            HookResult::deny().or(HookResult::approve()),
            HookResult::deny()
        );
    }

    #[test]
    fn test_call_accessors() {
        let session = Arc::new(Session::builder(ConnectionHandle(1), PlayerId(9)).build());
        let call = HookCall::new(
            "OnPlayerCommand",
            vec![
                HookArg::from(Arc::clone(&session)),
                HookArg::from("give"),
                HookArg::from(vec!["wood".to_string(), "5".to_string()]),
            ],
        );

        assert_eq!(call.session().map(|s| s.id()), Some(PlayerId(9)));
        assert!(call.player().is_none());
        assert_eq!(call.str(1), Some("give"));
        assert_eq!(call.strs(2).map(<[String]>::len), Some(2));
        assert_eq!(call.int(1), None);

        let renamed = call.renamed("OnUserCommand");
        assert_eq!(renamed.name(), "OnUserCommand");
        assert_eq!(renamed.args().len(), 3);
    }
}
