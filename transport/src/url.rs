//! Mutable URL value used to build and compare endpoint addresses.
//!
//! # Design
//! `Url` keeps every component in its *encoded* form: values parsed from text
//! are stored exactly as found, values set through the builder methods are
//! encoded on the way in, and getters decode on the way out. Rendering is
//! therefore a plain concatenation, and `Url::parse(&u.to_string())` yields a
//! value equal to `u`.
//!
//! Grammar: `scheme://[user[:pass]@]host[:port][/path][?params][#fragment]`.
//! A string without `://` is read as `http://` + string.

use std::fmt;
use std::str::FromStr;

use crate::encoding::{self, decode_lossy};
use crate::error::UrlError;

/// Supported schemes, each with its default port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    Ftp,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
            Scheme::Ftp => 21,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ftp => "ftp",
        }
    }
}

impl FromStr for Scheme {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "ftp" => Ok(Scheme::Ftp),
            _ => Err(UrlError::UnknownScheme(s.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `name=value` query parameter, stored encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: String,
}

impl Parameter {
    fn encoded(name: &str, value: &str) -> Self {
        Self {
            name: encoding::encode_form(name),
            value: encoding::encode_form(value),
        }
    }

    fn raw(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Decoded name.
    pub fn name(&self) -> String {
        decode_lossy(&self.name).into_owned()
    }

    /// Decoded value.
    pub fn value(&self) -> String {
        decode_lossy(&self.value).into_owned()
    }

    fn has_name(&self, name: &str) -> bool {
        decode_lossy(&self.name) == name
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            Ok(())
        } else if self.value.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.value)
        }
    }
}

/// A URL with builder-style mutators.
///
/// The port is stored only when it differs from the scheme's default, so a
/// URL written without one follows the scheme when the scheme changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: Scheme,
    username: String,
    password: String,
    host: String,
    port: Option<u16>,
    path: String,
    parameters: Vec<Parameter>,
    fragment: String,
}

impl Url {
    /// Parse a URL, defaulting the scheme to `http` when none is given.
    pub fn parse(text: &str) -> Result<Self, UrlError> {
        if text.is_empty() {
            return Err(UrlError::Empty);
        }
        if text.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(syntax(text, "contains whitespace or control characters"));
        }
        let owned;
        let full = if text.contains("://") {
            text
        } else {
            owned = format!("{}://{text}", Scheme::Http);
            owned.as_str()
        };

        let (scheme, rest) = full
            .split_once("://")
            .ok_or_else(|| syntax(text, "missing scheme separator"))?;
        let scheme: Scheme = scheme.parse()?;

        let (rest, fragment) = match rest.split_once('#') {
            Some((before, fragment)) => (before, fragment),
            None => (rest, ""),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((before, query)) => (before, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };

        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((info, hostport)) => (Some(info), hostport),
            None => (None, authority),
        };
        let (host, port) = split_host_port(text, hostport)?;
        if host.is_empty() {
            return Err(UrlError::MissingHost(text.to_string()));
        }
        if !is_valid_host(host) {
            return Err(syntax(text, "host contains invalid characters"));
        }

        let (username, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, pass)) => (user.to_string(), pass.to_string()),
                None => (info.to_string(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        let port = explicit_port(scheme, port.filter(|p| *p >= 1));

        let mut url = Url {
            scheme,
            username,
            password,
            host: host.to_string(),
            port,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            parameters: Vec::new(),
            fragment: fragment.to_string(),
        };
        if let Some(query) = query {
            url.parse_query(query);
        }
        Ok(url)
    }

    /// Whether `text` parses as a `Url`.
    pub fn is_valid(text: &str) -> bool {
        Url::parse(text).is_ok()
    }

    fn parse_query(&mut self, query: &str) {
        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if !name.is_empty() {
                self.parameters.push(Parameter::raw(name, value));
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The effective port: the explicit one, else the scheme's default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(self.scheme.default_port())
    }

    /// Whether a non-default port was given.
    pub fn has_explicit_port(&self) -> bool {
        self.port.is_some()
    }

    /// The path, encoded, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn username(&self) -> String {
        decode_lossy(&self.username).into_owned()
    }

    pub fn password(&self) -> String {
        decode_lossy(&self.password).into_owned()
    }

    /// The decoded fragment, empty when absent.
    pub fn fragment(&self) -> String {
        decode_lossy(&self.fragment).into_owned()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    // ---------------------------------------------------------------------
    // Component setters
    // ---------------------------------------------------------------------

    /// Change the scheme. An implicit port becomes the new scheme's default;
    /// an explicit port is kept unless it is that default.
    pub fn set_scheme(&mut self, scheme: Scheme) -> &mut Self {
        self.scheme = scheme;
        self.port = explicit_port(scheme, self.port);
        self
    }

    pub fn set_scheme_str(&mut self, scheme: &str) -> Result<&mut Self, UrlError> {
        let scheme = scheme.parse()?;
        Ok(self.set_scheme(scheme))
    }

    /// Replace the host. It must be non-empty and use only host characters,
    /// or be a bracketed IPv6 literal.
    pub fn set_host(&mut self, host: &str) -> Result<&mut Self, UrlError> {
        if host.is_empty() {
            return Err(UrlError::MissingHost(host.to_string()));
        }
        if !is_valid_host(host) {
            return Err(UrlError::InvalidHost(host.to_string()));
        }
        self.host = host.to_string();
        Ok(self)
    }

    /// Set an explicit port; valid ports are 1..=65534. Parsing is looser and
    /// accepts any written `u16` port, reading `0` as absent.
    pub fn set_port(&mut self, port: u16) -> Result<&mut Self, UrlError> {
        if port < 1 || port > 65534 {
            return Err(UrlError::InvalidPort(i64::from(port)));
        }
        self.port = explicit_port(self.scheme, Some(port));
        Ok(self)
    }

    /// Set the path, adding the leading `/` if missing. The path is stored as given.
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn set_username(&mut self, username: &str) -> &mut Self {
        self.username = encoding::encode_form(username);
        self
    }

    pub fn set_password(&mut self, password: &str) -> &mut Self {
        self.password = encoding::encode_form(password);
        self
    }

    /// Set the fragment, encoding it; an empty string clears it.
    pub fn set_fragment(&mut self, fragment: &str) -> &mut Self {
        self.fragment = encoding::encode_fragment(fragment);
        self
    }

    pub fn remove_fragment(&mut self) -> &mut Self {
        self.fragment.clear();
        self
    }

    // ---------------------------------------------------------------------
    // Parameter algebra
    // ---------------------------------------------------------------------

    /// Append `name=value`, encoding both. Duplicate names are kept; an empty
    /// name is ignored.
    pub fn add_parameter(&mut self, name: &str, value: impl ToString) -> &mut Self {
        if !name.is_empty() {
            self.parameters
                .push(Parameter::encoded(name, &value.to_string()));
        }
        self
    }

    /// Replace every `name` entry with a single `name=value` at the end.
    pub fn set_parameter(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.remove_parameter(name);
        self.add_parameter(name, value)
    }

    /// Remove every entry called `name`.
    pub fn remove_parameter(&mut self, name: &str) -> &mut Self {
        self.remove_parameters(&[name])
    }

    /// Remove every entry whose name matches any of `names`.
    pub fn remove_parameters(&mut self, names: &[&str]) -> &mut Self {
        for name in names.iter().filter(|n| !n.is_empty()) {
            self.parameters.retain(|p| !p.has_name(name));
        }
        self
    }

    /// First decoded value of `name`.
    pub fn parameter(&self, name: &str) -> Option<String> {
        self.parameters
            .iter()
            .find(|p| p.has_name(name))
            .map(Parameter::value)
    }

    /// First decoded value of `name`, or `default`.
    pub fn get_parameter(&self, name: &str, default: &str) -> String {
        self.parameter(name).unwrap_or_else(|| default.to_string())
    }

    /// First value of `name` that parses as an integer, or `default`.
    pub fn get_parameter_int(&self, name: &str, default: i64) -> i64 {
        self.numeric_parameter(name).unwrap_or(default)
    }

    /// Every decoded value of `name`, in order.
    pub fn get_parameters(&self, name: &str) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| p.has_name(name))
            .map(Parameter::value)
            .collect()
    }

    fn numeric_parameter(&self, name: &str) -> Option<i64> {
        self.parameters
            .iter()
            .filter(|p| p.has_name(name))
            .find_map(|p| p.value().parse::<i64>().ok())
    }

    /// Add one to the numeric `name` parameter. When there is none, the
    /// parameter is set to `2`, the successor of the implicit `1`. A value at
    /// `i64::MAX` counts as non-numeric.
    pub fn increment_parameter(&mut self, name: &str) -> &mut Self {
        let next = self
            .parameters
            .iter()
            .filter(|p| p.has_name(name))
            .filter_map(|p| p.value().parse::<i64>().ok())
            .find_map(|n| n.checked_add(1));
        self.set_parameter(name, next.unwrap_or(2))
    }

    /// Subtract one from the numeric `name` parameter, removing it when the
    /// result is the implicit `1`. Absent or non-numeric values, and a value
    /// at `i64::MIN`, are left alone.
    pub fn decrement_parameter(&mut self, name: &str) -> &mut Self {
        match self.numeric_parameter(name).and_then(|n| n.checked_sub(1)) {
            Some(1) => self.remove_parameter(name),
            Some(n) => self.set_parameter(name, n),
            None => self,
        }
    }

    // ---------------------------------------------------------------------
    // Rendering
    // ---------------------------------------------------------------------

    /// `scheme://[user[:pass]@]host[:port]`, the port only when not the default.
    pub fn origin(&self) -> String {
        let mut out = format!("{}://", self.scheme);
        if !self.username.is_empty() || !self.password.is_empty() {
            out.push_str(&self.username);
            if !self.password.is_empty() {
                out.push(':');
                out.push_str(&self.password);
            }
            out.push('@');
        }
        out.push_str(&self.authority());
        out
    }

    /// `host[:port]`, the port only when not the default.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }

    /// `?a=1&b` or empty. Blank parameters are skipped.
    pub fn query_string(&self) -> String {
        if self.parameters.is_empty() {
            return String::new();
        }
        let joined = self
            .parameters
            .iter()
            .map(Parameter::to_string)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }

    /// `#fragment` or empty.
    pub fn fragment_string(&self) -> String {
        if self.fragment.is_empty() {
            String::new()
        } else {
            format!("#{}", self.fragment)
        }
    }

    /// Path, query and fragment without the origin.
    pub fn to_string_full(&self) -> String {
        format!("{}{}{}", self.path, self.query_string(), self.fragment_string())
    }

    /// Render this URL relative to `base`.
    ///
    /// Returns the full URL when scheme, host, credentials or port differ.
    /// Otherwise walks up with `../` out of the non-shared part of `base`'s
    /// path and down into this path, then appends the query and fragment
    /// only when they differ from `base`'s. When this URL has no query but
    /// `base` does, the absolute path is returned so the parameters are
    /// dropped.
    pub fn to_string_relative(&self, base: &Url) -> String {
        if self.scheme != base.scheme
            || self.host != base.host
            || self.username() != base.username()
            || self.password() != base.password()
            || self.port() != base.port()
        {
            return self.to_string();
        }

        let target = self.path.strip_prefix('/').unwrap_or(&self.path);
        let source = base.path.strip_prefix('/').unwrap_or(&base.path);
        let target_segments = split_segments(target);
        let source_segments = split_segments(source);

        let common = source_segments
            .iter()
            .zip(&target_segments)
            .take_while(|(s, t)| s == t)
            .count();

        let mut relative = "../".repeat(source_segments.len() - common);
        for segment in &target_segments[common..] {
            if !(relative.is_empty() || relative.ends_with("../")) {
                relative.push('/');
            }
            relative.push_str(segment);
        }
        if target.ends_with('/') && !relative.is_empty() {
            relative.push('/');
        }

        let query = self.query_string();
        let base_query = base.query_string();
        if query.is_empty() && !base_query.is_empty() {
            return self.path.clone();
        }
        if query != base_query {
            relative.push_str(&query);
            relative.push_str(&self.fragment_string());
        } else if self.fragment_string() != base.fragment_string() {
            relative.push_str(&self.fragment_string());
        }
        relative
    }

    /// Resolve a reference (absolute, `//host`, `/abs` or relative path)
    /// against this URL per RFC 3986 §5.2.
    pub fn resolve(&self, reference: &str) -> Result<Url, UrlError> {
        let reference = reference.trim();
        if reference.contains("://") {
            return Url::parse(reference);
        }
        if let Some(network) = reference.strip_prefix("//") {
            return Url::parse(&format!("{}://{network}", self.scheme));
        }

        let (rest, fragment) = match reference.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment)),
            None => (reference, None),
        };
        let (ref_path, ref_query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let (path, query) = if ref_path.is_empty() {
            let query = match ref_query {
                Some(q) => Some(q.to_string()),
                None => self.query_string().strip_prefix('?').map(str::to_string),
            };
            (self.path.clone(), query)
        } else if ref_path.starts_with('/') {
            (remove_dot_segments(ref_path), ref_query.map(str::to_string))
        } else {
            let dir = match self.path.rfind('/') {
                Some(pos) => &self.path[..=pos],
                None => "/",
            };
            (
                remove_dot_segments(&format!("{dir}{ref_path}")),
                ref_query.map(str::to_string),
            )
        };

        let mut text = format!("{}{path}", self.origin());
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            text.push('?');
            text.push_str(&query);
        }
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            text.push('#');
            text.push_str(fragment);
        }
        Url::parse(&text)
    }

    // ---------------------------------------------------------------------
    // Host and path helpers
    // ---------------------------------------------------------------------

    fn host_labels(&self) -> Vec<&str> {
        split_segments_by(&self.host, '.')
    }

    /// Number of dot-separated host labels.
    pub fn authority_size(&self) -> usize {
        self.host_labels().len()
    }

    /// The rightmost `count` host labels; empty for `count <= 0`, the whole
    /// host when `count` exceeds the label count.
    pub fn authority_suffix(&self, count: i32) -> String {
        if count <= 0 {
            return String::new();
        }
        let labels = self.host_labels();
        let keep = (count as usize).min(labels.len());
        labels[labels.len() - keep..].join(".")
    }

    /// Exact host match, or the host is a subdomain of `candidate`. A leading
    /// dot on `candidate` is ignored.
    pub fn matches_authority(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        if self.host == candidate {
            return true;
        }
        let candidate = candidate.strip_prefix('.').unwrap_or(candidate);
        self.host.ends_with(&format!(".{candidate}"))
    }

    pub fn matches_any_authority(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|c| self.matches_authority(c))
    }

    pub fn matches_authority_of(&self, other: &Url) -> bool {
        self.matches_authority(&other.host)
    }

    /// Path segments with empty segments collapsed; empty for the root.
    pub fn path_elements(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// The segment following `segment`, if any.
    pub fn child_directory(&self, segment: &str) -> Option<&str> {
        let elements = self.path_elements();
        let pos = elements.iter().position(|e| *e == segment)?;
        elements.get(pos + 1).copied()
    }

    /// The segment preceding `segment`, if any.
    pub fn parent_directory(&self, segment: &str) -> Option<&str> {
        let elements = self.path_elements();
        let pos = elements.iter().position(|e| *e == segment)?;
        pos.checked_sub(1).map(|i| elements[i])
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.to_string_full())
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl<'a> IntoIterator for &'a Url {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

/// Join a server root (which may carry its own path and query) with a path
/// relative to it, e.g. `https://h/v1?key=k` + `reads/search` gives
/// `https://h/v1/reads/search?key=k`.
pub fn make_url(root: &str, path: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(root.trim())?;
    let mut joined = url.path().to_string();
    if !joined.ends_with('/') {
        joined.push('/');
    }
    joined.push_str(path.trim_matches('/'));
    url.set_path(&joined);
    Ok(url.to_string())
}

/// `port` as stored for `scheme`: `None` when absent or the default.
fn explicit_port(scheme: Scheme, port: Option<u16>) -> Option<u16> {
    port.filter(|p| *p != scheme.default_port())
}

fn syntax(url: &str, reason: &str) -> UrlError {
    UrlError::Syntax {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn split_host_port<'a>(text: &str, hostport: &'a str) -> Result<(&'a str, Option<u16>), UrlError> {
    let (host, port) = if hostport.starts_with('[') {
        let end = hostport
            .find(']')
            .ok_or_else(|| syntax(text, "unterminated IPv6 literal"))?;
        let (host, rest) = hostport.split_at(end + 1);
        match rest.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if rest.is_empty() => (host, None),
            None => return Err(syntax(text, "unexpected text after IPv6 literal")),
        }
    } else {
        match hostport.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (hostport, None),
        }
    };
    let port = match port {
        None | Some("") => None,
        Some(port) => Some(
            port.parse::<u16>()
                .map_err(|_| syntax(text, "port is not a number in 0..=65535"))?,
        ),
    };
    Ok((host, port))
}

fn is_valid_host(host: &str) -> bool {
    if host.starts_with('[') {
        return host.ends_with(']');
    }
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '%'))
}

/// Split on `/`, dropping trailing empty segments.
fn split_segments(s: &str) -> Vec<&str> {
    split_segments_by(s, '/')
}

fn split_segments_by(s: &str, sep: char) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<&str> = s.split(sep).collect();
    while parts.last() == Some(&"") {
        parts.pop();
    }
    parts
}

fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);
    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {
                if i == last {
                    output.push("");
                }
            }
            ".." => {
                if output.len() > 1 {
                    output.pop();
                }
                if i == last {
                    output.push("");
                }
            }
            other => output.push(other),
        }
    }
    let joined = output.join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}
