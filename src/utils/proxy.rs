use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::FailoverError;
use crate::utils::http::{FetchRequest, Fetcher};

/// Expands a proxy template for `target`. `{url}` receives the
/// percent-encoded target, `{raw_url}` the target unchanged.
pub fn proxied_url(template: &str, target: &str) -> String {
    let encoded = utf8_percent_encode(target, NON_ALPHANUMERIC).to_string();
    template.replace("{url}", &encoded).replace("{raw_url}", target)
}

/// Tries each proxy template in order, one request at a time, and returns the
/// first body that came back with status 200 and passes `accept`.
pub async fn fetch_via_proxies<F, P>(
    fetcher: &F,
    target: &str,
    templates: &[String],
    headers: &[(String, String)],
    timeout: Duration,
    accept: P,
) -> Result<String, FailoverError>
where
    F: Fetcher + ?Sized,
    P: Fn(&str) -> bool,
{
    let mut attempts = 0;
    let mut last_error = String::from("no proxies configured");

    for (index, template) in templates.iter().enumerate() {
        let url = proxied_url(template, target);
        attempts += 1;

        let request = headers
            .iter()
            .fold(FetchRequest::get(url, timeout), |req, (name, value)| {
                req.header(name.as_str(), value.as_str())
            });

        match fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                if accept(&response.body) {
                    info!(proxy = index, attempts, "Proxy returned usable content");
                    return Ok(response.body);
                }
                warn!(proxy = index, "Proxy returned empty content");
                last_error = format!("proxy {} returned empty content", index);
            }
            Ok(response) => {
                warn!(proxy = index, status = response.status, "Proxy returned error status");
                last_error = format!("proxy {} returned status {}", index, response.status);
            }
            Err(e) => {
                warn!(proxy = index, error = %e, "Proxy request failed");
                last_error = format!("proxy {}: {}", index, e);
            }
        }
    }

    Err(FailoverError::AllProxiesFailed {
        target: target.to_string(),
        attempts,
        last: last_error,
    })
}
