//! Request authentication
//!
//! Abiquo accepts either HTTP basic auth or OAuth 1.0a signed requests.
//! OAuth requests are signed with HMAC-SHA1 as described in RFC 5849.

use std::fmt;
use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use url::Url;

use crate::error::{ClientError, Result};

/// OAuth 1.0a application and access-token credentials
#[derive(Clone)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: Option<String>,
    pub token_secret: Option<String>,
}

/// How requests to the API are authenticated
#[derive(Clone)]
pub enum Credentials {
    Basic {
        username: String,
        password: Option<String>,
    },
    OAuth1(OAuth1Credentials),
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::OAuth1(creds) => f
                .debug_struct("OAuth1")
                .field("consumer_key", &creds.consumer_key)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Short name of the authentication scheme
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Basic { .. } => "basic",
            Credentials::OAuth1(_) => "oauth1",
        }
    }
}

impl OAuth1Credentials {
    /// Build the `Authorization` header for a request
    ///
    /// # Errors
    /// Returns an error if no random nonce could be generated.
    pub fn authorization(&self, method: &str, url: &Url) -> Result<String> {
        let nonce = generate_nonce()?;
        let timestamp = Utc::now().timestamp().to_string();
        Ok(self.authorization_with(method, url, &nonce, &timestamp))
    }

    /// Build the `Authorization` header with a fixed nonce and timestamp
    #[must_use]
    pub fn authorization_with(
        &self,
        method: &str,
        url: &Url,
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
        ];
        if let Some(token) = &self.token {
            oauth_params.push(("oauth_token", token.as_str()));
        }
        oauth_params.push(("oauth_version", "1.0"));

        let base = signature_base_string(method, url, &oauth_params);
        let signature = self.sign(&base);

        let mut header = String::from("OAuth ");
        for (key, value) in &oauth_params {
            let _ = write!(header, "{key}=\"{}\", ", encode(value));
        }
        let _ = write!(header, "oauth_signature=\"{}\"", encode(&signature));
        header
    }

    fn sign(&self, base: &str) -> String {
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(self.token_secret.as_deref().unwrap_or_default())
        );
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
        STANDARD.encode(hmac::sign(&key, base.as_bytes()).as_ref())
    }
}

/// RFC 3986 unreserved-set percent encoding
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ClientError::Auth("failed to generate nonce".to_string()))?;
    Ok(bytes.iter().fold(String::with_capacity(32), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    }))
}

/// Signature base string (RFC 5849, section 3.4.1)
fn signature_base_string(method: &str, url: &Url, oauth_params: &[(&str, &str)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .collect();
    params.extend(oauth_params.iter().map(|(k, v)| (encode(k), encode(v))));
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(&base_uri(url)),
        encode(&normalized)
    )
}

/// Scheme, authority and path, without default ports, query or fragment
fn base_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}{}", url.scheme(), url.path()),
        None => format!("{}://{host}{}", url.scheme(), url.path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_credentials() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "dpf43f3p2l4k3l03".to_string(),
            consumer_secret: "kd94hf93k423kf44".to_string(),
            token: Some("nnch734d00sl2jdk".to_string()),
            token_secret: Some("pfkkdhi9sl3r4s00".to_string()),
        }
    }

    #[test]
    fn test_signature_base_string() {
        let url = Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .unwrap();
        let params = [
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_nonce", "kllo9940pd9333jh"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1191242096"),
            ("oauth_token", "nnch734d00sl2jdk"),
            ("oauth_version", "1.0"),
        ];
        let base = signature_base_string("GET", &url, &params);
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn test_authorization_header_signature() {
        let url = Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .unwrap();
        let header =
            example_credentials().authorization_with("GET", &url, "kllo9940pd9333jh", "1191242096");
        assert!(header.starts_with("OAuth oauth_consumer_key=\"dpf43f3p2l4k3l03\""));
        assert!(header.contains("oauth_token=\"nnch734d00sl2jdk\""));
        assert!(header.ends_with("oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""));
    }

    #[test]
    fn test_base_uri_keeps_explicit_port() {
        let url = Url::parse("https://API.example.com:8443/api/cloud?x=1").unwrap();
        assert_eq!(base_uri(&url), "https://api.example.com:8443/api/cloud");

        let url = Url::parse("https://api.example.com:443/api").unwrap();
        assert_eq!(base_uri(&url), "https://api.example.com/api");
    }

    #[test]
    fn test_nonce_is_random_hex() {
        let a = generate_nonce().unwrap();
        let b = generate_nonce().unwrap();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::Basic {
            username: "admin".to_string(),
            password: Some("xabiquo".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("xabiquo"));
        assert_eq!(creds.scheme(), "basic");
    }
}
