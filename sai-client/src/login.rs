//! Login form submission

use reqwest::header::SET_COOKIE;
use reqwest::multipart::Form;
use tracing::{debug, info};

use crate::SaiClient;
use crate::endpoint::login_url;
use crate::error::{ClientError, Result};

/// Collapses `Set-Cookie` values into one `Cookie` header value
///
/// Attributes after the first `;` of each cookie are dropped.
pub fn cookie_header<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .into_iter()
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

impl SaiClient {
    /// Posts the login form and keeps the session cookie the server issues
    ///
    /// The server answers a good login with a redirect to `success_redir`
    /// carrying the cookie; anything else is a rejection.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let url = login_url(&self.page_url)?;
        let form = Form::new()
            .text("lname", user.to_string())
            .text("lpass", password.to_string())
            .text("success_redir", self.page_url.to_string());

        debug!("Posting login for {} to {}", user, url);
        let response = self.http.post(url.as_str()).multipart(form).send().await?;
        let status = response.status();
        let cookie = cookie_header(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );

        match cookie {
            Some(cookie) if status.is_success() || status.is_redirection() => {
                info!("Logged in as {}", user);
                self.cookie = Some(cookie);
                Ok(())
            }
            _ => Err(ClientError::LoginRejected {
                status: status.as_u16(),
            }),
        }
    }
}
