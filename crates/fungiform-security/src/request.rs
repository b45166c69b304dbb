//! What a form needs to know about the current request.
//!
//! Forms never see the request itself. Integrations describe it with a
//! [`RequestInfo`], which is enough to rebuild the current URL, pick the
//! host for redirect checks and pass the client address to the captcha
//! service.

use fungiform_core::error::{FormError, FormResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone when quoting path segments of the current URL.
const PATH_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'/');

/// A description of the request a form is bound to.
///
/// # Examples
///
/// ```
/// use fungiform_security::RequestInfo;
///
/// let info = RequestInfo::new("http", "localhost")
///     .with_host("localhost")
///     .with_script_name("/script")
///     .with_path_info("/")
///     .with_query_string("param=foo");
/// assert_eq!(info.current_url(false), "http://localhost/script/?param=foo");
/// assert_eq!(info.current_url(true), "http://localhost/script/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub scheme: String,
    /// The `Host` header.
    pub host: Option<String>,
    /// The `X-Forwarded-Host` header.
    pub forwarded_host: Option<String>,
    pub server_name: String,
    pub server_port: u16,
    /// The mount point of the application, without quoting.
    pub script_name: String,
    /// The path below the mount point, without quoting.
    pub path_info: String,
    pub query_string: String,
    pub referer: Option<String>,
    pub remote_addr: Option<String>,
}

impl RequestInfo {
    /// Creates a request description for a server. The port defaults to the
    /// scheme's default port.
    pub fn new(scheme: impl Into<String>, server_name: impl Into<String>) -> Self {
        let scheme = scheme.into();
        let server_port = default_port(&scheme);
        Self {
            scheme,
            host: None,
            forwarded_host: None,
            server_name: server_name.into(),
            server_port,
            script_name: String::new(),
            path_info: String::new(),
            query_string: String::new(),
            referer: None,
            remote_addr: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_forwarded_host(mut self, host: impl Into<String>) -> Self {
        self.forwarded_host = Some(host.into());
        self
    }

    #[must_use]
    pub const fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    #[must_use]
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    #[must_use]
    pub fn with_path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = path_info.into();
        self
    }

    #[must_use]
    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = Some(remote_addr.into());
        self
    }

    /// Describes an `http` request.
    ///
    /// The server name and port come from the request URI when it is
    /// absolute, otherwise from the `Host` header. A [`std::net::SocketAddr`]
    /// in the request extensions becomes the remote address.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        let headers = request.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let uri = request.uri();
        let scheme = uri.scheme_str().unwrap_or("http").to_string();
        let host = header("host");
        let (server_name, server_port) = match (uri.host(), host.as_deref()) {
            (Some(name), _) => (name.to_string(), uri.port_u16()),
            (None, Some(host)) => split_host_port(host),
            (None, None) => ("localhost".to_string(), None),
        };

        let mut info = Self::new(scheme, server_name);
        if let Some(port) = server_port {
            info.server_port = port;
        }
        info.host = host;
        info.forwarded_host = header("x-forwarded-host");
        info.path_info = percent_decode_str(uri.path()).decode_utf8_lossy().into_owned();
        info.query_string = uri.query().unwrap_or_default().to_string();
        info.referer = header("referer");
        info.remote_addr = request
            .extensions()
            .get::<std::net::SocketAddr>()
            .map(|addr| addr.ip().to_string());
        info
    }

    /// Describes a request for an absolute URL.
    pub fn from_url(url: &str) -> FormResult<Self> {
        let parsed = url::Url::parse(url).map_err(|e| FormError::InvalidUrl(format!("{url}: {e}")))?;
        let server_name = parsed
            .host_str()
            .ok_or_else(|| FormError::InvalidUrl(format!("{url}: missing host")))?
            .to_string();

        let mut info = Self::new(parsed.scheme(), server_name.clone());
        if let Some(port) = parsed.port_or_known_default() {
            info.server_port = port;
        }
        info.host = Some(match parsed.port() {
            Some(port) => format!("{server_name}:{port}"),
            None => server_name,
        });
        info.path_info = percent_decode_str(parsed.path())
            .decode_utf8_lossy()
            .into_owned();
        info.query_string = parsed.query().unwrap_or_default().to_string();
        Ok(info)
    }

    /// The host the client addressed, honoring `X-Forwarded-Host`.
    pub fn host(&self) -> String {
        if let Some(host) = self.forwarded_host.as_ref().or(self.host.as_ref()) {
            return host.clone();
        }
        if self.server_port == default_port(&self.scheme) {
            self.server_name.clone()
        } else {
            format!("{}:{}", self.server_name, self.server_port)
        }
    }

    /// Rebuilds the URL of the current request, or of the application root
    /// if `root_only` is set.
    pub fn current_url(&self, root_only: bool) -> String {
        let mut url = format!("{}://{}", self.scheme, self.host());
        url.extend(utf8_percent_encode(
            self.script_name.trim_end_matches('/'),
            PATH_QUOTE,
        ));
        if root_only {
            url.push('/');
        } else {
            let path = format!("/{}", self.path_info.trim_start_matches('/'));
            url.extend(utf8_percent_encode(&path, PATH_QUOTE));
            if !self.query_string.is_empty() {
                url.push('?');
                url.push_str(&self.query_string);
            }
        }
        url
    }
}

fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

fn split_host_port(host: &str) -> (String, Option<u16>) {
    host.rsplit_once(':')
        .and_then(|(name, port)| Some((name.to_string(), Some(port.parse().ok()?))))
        .unwrap_or_else(|| (host.to_string(), None))
}
