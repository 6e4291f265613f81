//! Server endpoints derived from the dashboard page URL

use url::Url;

use crate::error::{ClientError, Result};

/// WebSocket sub-protocol the Sai web server speaks
pub const SUBPROTOCOL: &str = "com-warmcat-sai";

fn require_http(page: &Url) -> Result<()> {
    match page.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ClientError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// The browse endpoint for a page
///
/// `https` pages get `wss`, anything else `ws`, on the page's host. Pages
/// embedded in a git browser under `/git/<project>` are scoped to that
/// project and forward their query; task pages use the task sub-path.
pub fn browse_url(page: &Url) -> Result<Url> {
    require_http(page)?;
    let host = page
        .host_str()
        .ok_or_else(|| ClientError::InvalidUrl("page URL has no host".into()))?;
    let scheme = if page.scheme() == "https" { "wss" } else { "ws" };
    let authority = match page.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut path = String::from("/sai/browse");
    let mut query = None;
    let project = page
        .path()
        .split_once("/git/")
        .map(|(_, rest)| rest.split('/').next().unwrap_or(rest));
    if let Some(project) = project {
        path.push_str("/specific/");
        path.push_str(project);
        query = page.query();
    } else if page.query_pairs().any(|(k, _)| k == "task") {
        path.push_str("/task");
    }

    let mut url = Url::parse(&format!("{scheme}://{authority}{path}"))?;
    url.set_query(query);
    Ok(url)
}

/// Where the login form posts: the page path without a trailing
/// `index.html`, plus `login`
pub fn login_url(page: &Url) -> Result<Url> {
    require_http(page)?;
    let mut url = page.clone();
    url.set_query(None);
    url.set_fragment(None);
    let base = url.path().trim_end_matches("index.html");
    let path = if base.ends_with('/') {
        format!("{base}login")
    } else {
        format!("{base}/login")
    };
    url.set_path(&path);
    Ok(url)
}
