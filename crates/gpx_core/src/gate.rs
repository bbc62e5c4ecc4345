//! Session gate: the request filter that runs before the upload flow.
//!
//! The gate is a predicate over a request. It either lets the request through
//! or redirects the caller to the sign-in page, carrying the original URL as
//! the callback target. Nothing in the upload/poll state machine knows about it.

use url::Url;

/// Sign-in entry point of the identity provider.
pub const SIGN_IN_PATH: &str = "/api/auth/signin";

/// Query parameter that carries the originally requested URL.
pub const CALLBACK_PARAM: &str = "callbackUrl";

#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub url: &'a Url,
    pub session_token: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(Url),
}

pub trait SessionGate: Send + Sync {
    fn evaluate(&self, request: &GateRequest<'_>) -> GateDecision;
}

/// Lets everything through. Used when no identity provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGate;

impl SessionGate for OpenGate {
    fn evaluate(&self, _request: &GateRequest<'_>) -> GateDecision {
        GateDecision::Allow
    }
}

/// Decides whether a presented session token is acceptable.
pub trait TokenValidator: Send + Sync {
    fn is_valid(&self, token: &str) -> bool;
}

/// Accepts any token that is not blank.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonEmptyToken;

impl TokenValidator for NonEmptyToken {
    fn is_valid(&self, token: &str) -> bool {
        !token.trim().is_empty()
    }
}

/// Path patterns that bypass the session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowRule {
    Prefix(String),
    Contains(String),
}

impl AllowRule {
    fn matches(&self, path: &str) -> bool {
        match self {
            AllowRule::Prefix(prefix) => path.starts_with(prefix.as_str()),
            AllowRule::Contains(needle) => path.contains(needle.as_str()),
        }
    }
}

/// Requires a valid session token on every path outside the allow-list.
pub struct TokenGate<V = NonEmptyToken> {
    allow: Vec<AllowRule>,
    validator: V,
}

impl TokenGate<NonEmptyToken> {
    /// Gate with the default allow-list: auth callbacks, static assets,
    /// favicon and public assets.
    pub fn new() -> Self {
        Self::with_validator(NonEmptyToken)
    }
}

impl Default for TokenGate<NonEmptyToken> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: TokenValidator> TokenGate<V> {
    pub fn with_validator(validator: V) -> Self {
        Self {
            allow: default_allow_list(),
            validator,
        }
    }

    pub fn allow(mut self, rule: AllowRule) -> Self {
        self.allow.push(rule);
        self
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.allow.iter().any(|rule| rule.matches(path))
    }
}

impl<V: TokenValidator> SessionGate for TokenGate<V> {
    fn evaluate(&self, request: &GateRequest<'_>) -> GateDecision {
        if self.is_public(request.url.path()) {
            return GateDecision::Allow;
        }
        match request.session_token {
            Some(token) if self.validator.is_valid(token) => GateDecision::Allow,
            _ => GateDecision::Redirect(sign_in_url(request.url)),
        }
    }
}

fn default_allow_list() -> Vec<AllowRule> {
    vec![
        AllowRule::Prefix("/api/auth".to_string()),
        AllowRule::Prefix("/_next".to_string()),
        AllowRule::Contains("/favicon.ico".to_string()),
        AllowRule::Prefix("/public".to_string()),
    ]
}

fn sign_in_url(original: &Url) -> Url {
    let mut target = original.join(SIGN_IN_PATH).unwrap_or_else(|_| original.clone());
    target.set_fragment(None);
    target
        .query_pairs_mut()
        .clear()
        .append_pair(CALLBACK_PARAM, original.as_str());
    target
}
