use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cookie-bearing HTTP state for one login. Two clients share the jar: the
/// default one follows redirects, the other is used only for the login POST,
/// where success is signalled by a 302 that must not be followed.
pub struct Session {
    client: Client,
    no_redirect: Client,
}

impl Session {
    pub fn new() -> Result<Self, Error> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let no_redirect = Client::builder()
            .cookie_provider(jar)
            .redirect(Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Session { client, no_redirect })
    }

    pub fn client(self: &Self) -> &Client {
        &self.client
    }

    /// Log in against `auth_url`, leaving the authenticated session cookie
    /// in the jar for subsequent requests.
    pub async fn authenticate(
        self: &Self,
        auth_url: &str,
        creds: &Credentials,
    ) -> Result<(), Error> {
        let page = self.client.get(auth_url).send().await?.text().await?;
        let csrf_token = extract_csrf_token(&page)?;
        debug!("obtained csrf token from login page");

        let form = [
            ("username", creds.login.as_str()),
            ("password", creds.password.as_str()),
            ("csrf_token", csrf_token.as_str()),
        ];
        let response = self.no_redirect.post(auth_url).form(&form).send().await?;

        verify_login_status(response.status())
    }
}

/// Pull the one-time anti-forgery token out of the login page. A missing
/// token means the remote form changed shape, not that credentials are bad.
fn extract_csrf_token(page: &str) -> Result<String, Error> {
    let re = Regex::new(r#"value="(.*?)" id="csrf_token""#)
        .expect("Regex pattern should always compile");

    let captures = re
        .captures(page)
        .ok_or_else(|| Error::Protocol("login page has no csrf_token field".to_string()))?;

    Ok(captures[1].to_string())
}

fn verify_login_status(status: StatusCode) -> Result<(), Error> {
    if status != StatusCode::FOUND {
        return Err(Error::Authentication { status });
    }
    Ok(())
}
