//! Amazon SES `SendRawEmail` over the query API

use std::{fmt, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use serde::Deserialize;
use spoolsend_common::outgoing;
use url::Url;

use super::{Receipt, Transport, sigv4};
use crate::error::{ConfigError, TransportError};

const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const LATEST_VERSION: &str = "2010-12-01";
const SERVICE: &str = "ses";

const fn default_timeout_secs() -> u64 {
    30
}

/// An access key pair, optionally with a session token
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Connection settings for SES
///
/// # Examples
///
/// ```ron
/// ses: (
///     version: "latest",
///     region: "eu-west-1",
///     credentials: ( key: "AKIA...", secret: "..." ),
/// )
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SesConfig {
    /// API version; `latest` selects the newest known query API version
    #[serde(default)]
    pub version: String,

    /// Region identifier, e.g. `eu-west-1`
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub credentials: Credentials,

    /// Override of `https://email.<region>.amazonaws.com/`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Upper bound on a single submission, in seconds
    ///
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn required(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField(field))
    } else {
        Ok(())
    }
}

impl SesConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns the first missing or invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        required(&self.version, "ses.version")?;
        required(&self.region, "ses.region")?;
        required(&self.credentials.key, "ses.credentials.key")?;
        required(&self.credentials.secret, "ses.credentials.secret")?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ses.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        self.endpoint().map(|_| ())
    }

    /// The API version sent with each request
    #[must_use]
    pub fn api_version(&self) -> &str {
        match self.version.trim() {
            "latest" => LATEST_VERSION,
            version => version,
        }
    }

    /// The endpoint requests are posted to
    ///
    /// # Errors
    /// If the configured override is not an absolute `http(s)` URL
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "ses.endpoint",
            reason,
        };

        let url = match &self.endpoint {
            Some(endpoint) => Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?,
            None => Url::parse(&format!("https://email.{}.amazonaws.com/", self.region.trim()))
                .map_err(|e| invalid(e.to_string()))?,
        };

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid(format!("{url} is not an http(s) URL")));
        }

        Ok(url)
    }
}

/// [`Transport`] submitting to SES with one shared HTTP client
#[derive(Debug)]
pub struct SesTransport {
    client: reqwest::Client,
    endpoint: Url,
    host: String,
    version: String,
    region: String,
    credentials: Credentials,
}

impl SesTransport {
    /// Build a transport from validated settings
    ///
    /// # Errors
    /// If the endpoint is unusable or the HTTP client cannot be built
    pub fn new(config: &SesConfig) -> Result<Self, TransportError> {
        let endpoint = config
            .endpoint()
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;

        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(TransportError::InvalidEndpoint(endpoint.to_string())),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            host,
            version: config.api_version().to_string(),
            region: config.region.trim().to_string(),
            credentials: config.credentials.clone(),
        })
    }

    fn form(&self, raw: &[u8]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "SendRawEmail")
            .append_pair("Version", &self.version)
            .append_pair("RawMessage.Data", &BASE64.encode(raw))
            .finish()
    }
}

/// Pull `<MessageId>` out of an XML response without a full parser
fn message_id(body: &str) -> Option<String> {
    let start = body.find("<MessageId>")? + "<MessageId>".len();
    let end = body[start..].find("</MessageId>")? + start;
    let id = body[start..end].trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[async_trait]
impl Transport for SesTransport {
    async fn submit(&self, raw: &[u8]) -> Result<Receipt, TransportError> {
        let body = self.form(raw);
        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);

        let mut headers = vec![
            ("content-type", CONTENT_TYPE),
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date.as_str()),
        ];
        if let Some(token) = self.credentials.session_token.as_deref() {
            headers.push(("x-amz-security-token", token));
        }

        let params = sigv4::SigningParams {
            access_key: &self.credentials.key,
            secret_key: &self.credentials.secret,
            region: &self.region,
            service: SERVICE,
        };
        let authorization =
            sigv4::authorization(&params, "POST", &self.endpoint, &headers, body.as_bytes(), now)?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, authorization);
        for (name, value) in headers.into_iter().filter(|(name, _)| *name != "host") {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let mut receipt = Receipt::new(status);
        receipt.message_id = message_id(&text);
        if !receipt.is_success() {
            receipt.detail = Some(text);
        }

        outgoing!(
            level = DEBUG,
            status,
            message_id = receipt.message_id.as_deref(),
            "SES responded"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config() -> SesConfig {
        ron::from_str(
            r#"(
                version: "latest",
                region: "eu-west-1",
                credentials: (key: "AKIDEXAMPLE", secret: "secret"),
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_and_endpoint() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.api_version(), "2010-12-01");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://email.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_missing_fields() {
        let mut missing = config();
        missing.region = "  ".to_string();
        assert_eq!(
            missing.validate(),
            Err(ConfigError::MissingField("ses.region"))
        );

        let missing: SesConfig = ron::from_str(r#"(region: "eu-west-1")"#).unwrap();
        assert_eq!(
            missing.validate(),
            Err(ConfigError::MissingField("ses.version"))
        );

        let mut missing = config();
        missing.credentials.secret = String::new();
        assert_eq!(
            missing.validate(),
            Err(ConfigError::MissingField("ses.credentials.secret"))
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = config();
        config.endpoint = Some("ftp://example.com".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "ses.endpoint",
                ..
            })
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", config().credentials);
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_form_encoding() {
        let transport = SesTransport::new(&config()).unwrap();
        let form = transport.form(b"Subject: hi\r\n\r\n?");
        assert_eq!(
            form,
            "Action=SendRawEmail&Version=2010-12-01&RawMessage.Data=U3ViamVjdDogaGkNCg0KPw%3D%3D"
        );
    }

    #[test]
    fn test_message_id_extraction() {
        let body = "<SendRawEmailResponse><SendRawEmailResult>\
                    <MessageId>0102-abc</MessageId>\
                    </SendRawEmailResult></SendRawEmailResponse>";
        assert_eq!(message_id(body), Some("0102-abc".to_string()));
        assert_eq!(message_id("<Error/>"), None);
    }
}
