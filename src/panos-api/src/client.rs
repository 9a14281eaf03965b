//! PAN-OS XML API client implementation

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::records::{parse_address_entry, parse_policy_entry, parse_system_info, parse_zone_entry};
use crate::xml::{XmlElement, check_status, parse_envelope};
use crate::xpath::{Location, Scope, device_groups_xpath};
use crate::{DEFAULT_TIMEOUT, FirewallRecord, PanosError, Result};

const SYSTEM_INFO_CMD: &str = "<show><system><info></info></system></show>";

/// Connection settings for a single firewall or Panorama.
#[derive(Debug)]
pub struct ClientConfig {
    /// Bare host (`fw01.example.com`) or a base URL with scheme.
    pub hostname: String,
    pub api_key: SecretString,
    pub timeout: Duration,
    pub verify_tls: bool,
    /// Remember the Panorama/firewall classification after the first
    /// successful detection.
    pub cache_target_kind: bool,
}

impl ClientConfig {
    pub fn new(hostname: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            cache_target_kind: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_target_cache(mut self, enabled: bool) -> Self {
        self.cache_target_kind = enabled;
        self
    }

    /// The `/api/` endpoint for the configured host.
    pub fn endpoint(&self) -> Result<String> {
        let host = self.hostname.trim();
        if host.is_empty() {
            return Err(PanosError::Config("hostname is empty".to_string()));
        }
        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(format!("{}/api/", host.trim_end_matches('/')))
        } else {
            Ok(format!("https://{}/api/", host.trim_end_matches('/')))
        }
    }
}

/// Kind of XML API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `type=config&action=get&xpath=...`
    ConfigGet,
    /// `type=op&cmd=...`
    OpCommand,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigGet => f.write_str("config-get"),
            Self::OpCommand => f.write_str("op-command"),
        }
    }
}

/// Classification of the management endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Panorama,
    Firewall,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Panorama => f.write_str("panorama"),
            Self::Firewall => f.write_str("firewall"),
        }
    }
}

/// Result of Panorama detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Device groups in document order.
    Panorama { device_groups: Vec<String> },
    Firewall,
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Panorama { .. } => TargetKind::Panorama,
            Self::Firewall => TargetKind::Firewall,
        }
    }

    /// Scopes queried for address objects on this target.
    fn address_scopes(&self, vsys: &str) -> Result<Vec<Scope>> {
        match self {
            Self::Panorama { device_groups } => {
                let mut scopes = vec![Scope::Shared];
                for name in device_groups {
                    scopes.push(Scope::device_group(name)?);
                }
                Ok(scopes)
            }
            Self::Firewall => Ok(vec![Scope::vsys(vsys)?]),
        }
    }
}

/// Client for the PAN-OS XML API.
///
/// Cheap to clone; clones share the connection pool and the target cache.
#[derive(Clone)]
pub struct PanosClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Arc<SecretString>,
    timeout: Duration,
    target_cache: Option<Arc<RwLock<Option<Target>>>>,
}

impl std::fmt::Debug for PanosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanosClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("target_cache", &self.target_cache.is_some())
            .finish()
    }
}

impl PanosClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(PanosError::Config("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| PanosError::Config(format!("failed to build HTTP client: {}", e.without_url())))?;

        if !config.verify_tls {
            tracing::warn!(endpoint = %endpoint, "TLS certificate verification is disabled");
        }

        Ok(Self {
            http,
            endpoint,
            api_key: Arc::new(config.api_key),
            timeout: config.timeout,
            target_cache: config
                .cache_target_kind
                .then(|| Arc::new(RwLock::new(None))),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue one API call and return the `<response>` root of a successful reply.
    pub async fn request(
        &self,
        kind: RequestKind,
        xpath_or_cmd: &str,
        extra: &[(&str, &str)],
    ) -> Result<XmlElement> {
        let mut query: Vec<(&str, &str)> = match kind {
            RequestKind::ConfigGet => vec![("type", "config"), ("action", "get"), ("xpath", xpath_or_cmd)],
            RequestKind::OpCommand => vec![("type", "op"), ("cmd", xpath_or_cmd)],
        };
        query.extend_from_slice(extra);
        tracing::debug!(%kind, target = xpath_or_cmd, "PAN-OS API request");
        query.push(("key", self.api_key.expose_secret()));

        let response = self
            .http
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        match parse_envelope(&body) {
            Ok(root) => {
                let root = check_status(root)?;
                if !status.is_success() {
                    return Err(PanosError::Http {
                        status: status.as_u16(),
                    });
                }
                Ok(root)
            }
            Err(_) if !status.is_success() => Err(PanosError::Http {
                status: status.as_u16(),
            }),
            Err(e) => Err(e),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> PanosError {
        // The URL carries the API key.
        let error = error.without_url();
        if error.is_timeout() {
            PanosError::Timeout(self.timeout)
        } else {
            PanosError::Transport(error)
        }
    }

    /// Names of the Panorama device groups.
    pub async fn device_groups(&self) -> Result<Vec<String>> {
        let root = self
            .request(RequestKind::ConfigGet, &device_groups_xpath(), &[])
            .await?;
        let Some(result) = root.child("result") else {
            return Ok(Vec::new());
        };
        Ok(result
            .container_entries("device-group")
            .into_iter()
            .filter_map(|entry| entry.attr("name"))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Decide whether the endpoint is a Panorama. Never fails: anything but a
    /// successful, non-empty device-group listing means a firewall.
    pub async fn detect_target(&self) -> Target {
        if let Some(cache) = &self.target_cache {
            if let Some(target) = cache.read().await.clone() {
                return target;
            }
        }

        let target = match self.device_groups().await {
            Ok(groups) if !groups.is_empty() => Target::Panorama {
                device_groups: groups,
            },
            Ok(_) => Target::Firewall,
            Err(e) => {
                tracing::debug!(error = %e, "device-group enumeration failed; assuming firewall");
                return Target::Firewall;
            }
        };
        tracing::info!(kind = %target.kind(), "detected management target");

        if let Some(cache) = &self.target_cache {
            *cache.write().await = Some(target.clone());
        }
        target
    }

    pub async fn get_system_info(&self) -> Result<FirewallRecord> {
        let root = self
            .request(RequestKind::OpCommand, SYSTEM_INFO_CMD, &[])
            .await?;
        let result = root.child("result").unwrap_or(&root);
        Ok(parse_system_info(result))
    }

    /// Address objects for `location`. Automatic locations query shared and
    /// every device group on a Panorama, the given vsys on a firewall.
    pub async fn get_address_objects(
        &self,
        location: &Location,
        vsys: &str,
    ) -> Result<Vec<FirewallRecord>> {
        let scopes = match location.resolve(vsys)? {
            Some(scope) => vec![scope],
            None => self.detect_target().await.address_scopes(vsys)?,
        };

        // A single scope fails as a whole; Panorama sweeps skip failing scopes
        // as long as at least one scope answers.
        if let [scope] = scopes.as_slice() {
            return self.scoped_addresses(scope).await;
        }

        let mut records = Vec::new();
        let mut answered = 0usize;
        let mut first_error = None;
        for scope in &scopes {
            match self.scoped_addresses(scope).await {
                Ok(mut found) => {
                    tracing::debug!(count = found.len(), scope = %scope.label(), "retrieved address objects");
                    answered += 1;
                    records.append(&mut found);
                }
                Err(e) => {
                    tracing::error!(scope = %scope.label(), error = %e, "failed to retrieve address objects");
                    first_error.get_or_insert(e);
                }
            }
        }
        if answered == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        tracing::info!(count = records.len(), scopes = scopes.len(), "retrieved address objects");
        Ok(records)
    }

    async fn scoped_addresses(&self, scope: &Scope) -> Result<Vec<FirewallRecord>> {
        let label = scope.label();
        let entries = self.config_entries(&scope.xpath("address"), "address").await?;
        Ok(entries
            .iter()
            .map(|entry| parse_address_entry(entry).with("location", label.as_str()))
            .collect())
    }

    /// Security zones of `vsys`. Zones only exist per virtual system.
    pub async fn get_security_zones(&self, vsys: &str) -> Result<Vec<FirewallRecord>> {
        let scope = Scope::vsys(vsys)?;
        let entries = self
            .config_entries(&scope.xpath("zone"), "zone")
            .await?;
        Ok(entries.iter().map(parse_zone_entry).collect())
    }

    /// Security rules for `location`. Automatic locations use the vsys rulebase.
    pub async fn get_security_policies(
        &self,
        location: &Location,
        vsys: &str,
    ) -> Result<Vec<FirewallRecord>> {
        let scope = match location.resolve(vsys)? {
            Some(scope) => scope,
            None => Scope::vsys(vsys)?,
        };
        let entries = self
            .config_entries(&scope.security_rules_xpath(), "rules")
            .await?;
        Ok(entries.iter().map(parse_policy_entry).collect())
    }

    async fn config_entries(&self, xpath: &str, container: &str) -> Result<Vec<XmlElement>> {
        let root = self.request(RequestKind::ConfigGet, xpath, &[]).await?;
        Ok(root
            .child("result")
            .map(|result| {
                result
                    .container_entries(container)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{DEVICE_ENTRY_XPATH, ErrorKind};

    const KEY: &str = "LUFRPT1-secret-key";

    fn client_for(server: &MockServer) -> PanosClient {
        PanosClient::new(ClientConfig::new(server.uri(), KEY)).unwrap()
    }

    fn xml(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/xml")
    }

    fn vsys_xpath(leaf: &str) -> String {
        format!("{DEVICE_ENTRY_XPATH}/vsys/entry[@name='vsys1']/{leaf}")
    }

    async fn mount_xpath(server: &MockServer, xpath: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(query_param("type", "config"))
            .and(query_param("action", "get"))
            .and(query_param("xpath", xpath))
            .and(query_param("key", KEY))
            .respond_with(xml(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            ClientConfig::new("fw01.example.com", KEY).endpoint().unwrap(),
            "https://fw01.example.com/api/"
        );
        assert_eq!(
            ClientConfig::new("http://127.0.0.1:8080/", KEY).endpoint().unwrap(),
            "http://127.0.0.1:8080/api/"
        );
        assert!(ClientConfig::new(" ", KEY).endpoint().is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ClientConfig::new("fw01", KEY);
        assert!(!format!("{config:?}").contains(KEY));
        let client = PanosClient::new(config).unwrap();
        assert!(!format!("{client:?}").contains(KEY));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = PanosClient::new(ClientConfig::new("fw01", "  ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_address_objects_vsys() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &vsys_xpath("address"),
            r#"<response status="success"><result><address><entry name="web-srv"><ip-netmask>10.0.0.5/32</ip-netmask><description>Web</description></entry></address></result></response>"#,
        )
        .await;

        let records = client_for(&server)
            .get_address_objects(&Location::Vsys, "vsys1")
            .await
            .unwrap();
        assert_eq!(
            records,
            vec![
                FirewallRecord::new()
                    .with("name", "web-srv")
                    .with("type", "ip-netmask")
                    .with("value", "10.0.0.5/32")
                    .with("description", "Web")
                    .with("location", "vsys:vsys1")
            ]
        );
    }

    #[tokio::test]
    async fn test_security_zones() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &vsys_xpath("zone"),
            r#"<response status="success"><result><zone><entry name="trust"><network><layer3><member>ethernet1/1</member><member>ethernet1/2</member></layer3></network></entry></zone></result></response>"#,
        )
        .await;

        let records = client_for(&server).get_security_zones("vsys1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), Some("trust"));
        assert_eq!(records[0].scalar("type"), Some("layer3"));
        assert_eq!(
            records[0].list("interfaces"),
            Some(&["ethernet1/1".to_string(), "ethernet1/2".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_security_policies_device_group_reads_pre_rulebase() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group/entry[@name='DG1']/pre-rulebase/security/rules"),
            r#"<response status="success"><result total-count="1"><rules><entry name="allow-dns"><action>allow</action></entry></rules></result></response>"#,
        )
        .await;

        let records = client_for(&server)
            .get_security_policies(&Location::parse("device-group:DG1"), "vsys1")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scalar("action"), Some("allow"));
        assert_eq!(records[0].list("services"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_empty_result() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &vsys_xpath("rulebase/security/rules"),
            r#"<response status="success" code="7"><result/></response>"#,
        )
        .await;

        let records = client_for(&server)
            .get_security_policies(&Location::Vsys, "vsys1")
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(xml(
                r#"<response status="error"><msg><line>API key authentication failed</line></msg></response>"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server).get_system_info().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.to_string(), "API error: API key authentication failed");
    }

    #[tokio::test]
    async fn test_error_envelope_with_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(403).set_body_raw(
                r#"<response status="error" code="403"><result><msg>Invalid Credential</msg></result></response>"#,
                "application/xml",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server).get_system_info().await.unwrap_err();
        assert!(matches!(
            err,
            PanosError::Api { ref message, ref code } if message == "Invalid Credential" && code.as_deref() == Some("403")
        ));
    }

    #[tokio::test]
    async fn test_http_status_without_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_system_info().await.unwrap_err();
        assert!(matches!(err, PanosError::Http { status: 503 }));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(xml("<html><body>login</body></html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_system_info().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(
                xml(r#"<response status="success"><result/></response>"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = PanosClient::new(
            ClientConfig::new(server.uri(), KEY).with_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let err = client.get_system_info().await.unwrap_err();
        assert!(matches!(err, PanosError::Timeout(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_connection_error_hides_key() {
        let client = PanosClient::new(
            ClientConfig::new("http://127.0.0.1:1", KEY).with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = client.get_system_info().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let mut chain = format!("{err} {err:?}");
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            chain.push_str(&inner.to_string());
            source = inner.source();
        }
        assert!(!chain.contains(KEY), "{chain}");
    }

    #[tokio::test]
    async fn test_system_info_op_command() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(query_param("type", "op"))
            .and(query_param("cmd", SYSTEM_INFO_CMD))
            .and(query_param("key", KEY))
            .respond_with(xml(
                r#"<response status="success"><result><system><hostname>fw01</hostname><model>PA-440</model></system></result></response>"#,
            ))
            .mount(&server)
            .await;

        let record = client_for(&server).get_system_info().await.unwrap();
        assert_eq!(record.scalar("hostname"), Some("fw01"));
        assert_eq!(record.scalar("model"), Some("PA-440"));
    }

    #[tokio::test]
    async fn test_panorama_address_objects() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group"),
            r#"<response status="success"><result><device-group><entry name="DG1"/><entry name="DG2"/></device-group></result></response>"#,
        )
        .await;
        mount_xpath(
            &server,
            "/config/shared/address",
            r#"<response status="success"><result><address><entry name="dns"><ip-netmask>8.8.8.8</ip-netmask></entry></address></result></response>"#,
        )
        .await;
        for (dg, name) in [("DG1", "branch-a"), ("DG2", "branch-b")] {
            mount_xpath(
                &server,
                &format!("{DEVICE_ENTRY_XPATH}/device-group/entry[@name='{dg}']/address"),
                &format!(
                    r#"<response status="success"><result><address><entry name="{name}"><fqdn>{name}.example.com</fqdn></entry></address></result></response>"#
                ),
            )
            .await;
        }

        let records = client_for(&server)
            .get_address_objects(&Location::parse("panorama.example.com"), "vsys1")
            .await
            .unwrap();
        let located: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.name().unwrap(), r.scalar("location").unwrap()))
            .collect();
        assert_eq!(
            located,
            vec![
                ("dns", "shared"),
                ("branch-a", "device-group:DG1"),
                ("branch-b", "device-group:DG2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_panorama_skips_failed_device_group() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group"),
            r#"<response status="success"><result><device-group><entry name="DG1"/><entry name="DG2"/></device-group></result></response>"#,
        )
        .await;
        mount_xpath(
            &server,
            "/config/shared/address",
            r#"<response status="success"><result/></response>"#,
        )
        .await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group/entry[@name='DG1']/address"),
            r#"<response status="error"><msg><line>No such node</line></msg></response>"#,
        )
        .await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group/entry[@name='DG2']/address"),
            r#"<response status="success"><result><address><entry name="x"><ip-range>10.0.0.1-10.0.0.2</ip-range></entry></address></result></response>"#,
        )
        .await;

        let records = client_for(&server)
            .get_address_objects(&Location::Auto, "vsys1")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scalar("location"), Some("device-group:DG2"));
    }

    #[tokio::test]
    async fn test_panorama_sweep_fails_when_every_scope_fails() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group"),
            r#"<response status="success"><result><device-group><entry name="DG1"/><entry name="DG2"/></device-group></result></response>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_address_objects(&Location::Auto, "vsys1")
            .await
            .unwrap_err();
        assert!(matches!(err, PanosError::Http { status: 503 }), "{err:?}");
    }

    #[tokio::test]
    async fn test_firewall_fallback_when_no_device_groups() {
        let server = MockServer::start().await;
        mount_xpath(
            &server,
            &format!("{DEVICE_ENTRY_XPATH}/device-group"),
            r#"<response status="success"><result/></response>"#,
        )
        .await;
        mount_xpath(
            &server,
            &vsys_xpath("address"),
            r#"<response status="success"><result><address><entry name="h1"><ip-netmask>10.1.1.1</ip-netmask></entry></address></result></response>"#,
        )
        .await;

        let client = client_for(&server);
        assert_eq!(client.detect_target().await, Target::Firewall);
        let records = client
            .get_address_objects(&Location::Auto, "vsys1")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scalar("location"), Some("vsys:vsys1"));
    }

    #[tokio::test]
    async fn test_detection_failure_means_firewall() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).detect_target().await, Target::Firewall);
    }

    #[tokio::test]
    async fn test_target_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(query_param("xpath", format!("{DEVICE_ENTRY_XPATH}/device-group")))
            .respond_with(xml(
                r#"<response status="success"><result><device-group><entry name="DG1"/></device-group></result></response>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            PanosClient::new(ClientConfig::new(server.uri(), KEY).with_target_cache(true)).unwrap();
        let expected = Target::Panorama {
            device_groups: vec!["DG1".to_string()],
        };
        assert_eq!(client.detect_target().await, expected);
        assert_eq!(client.clone().detect_target().await, expected);
        assert_eq!(expected.kind(), TargetKind::Panorama);
    }

    #[tokio::test]
    async fn test_zone_vsys_rejects_quote() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .get_security_zones("vsys1']")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
