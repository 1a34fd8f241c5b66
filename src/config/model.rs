use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use hyper::Uri;
use hyper::header::HeaderValue;
use url::{Host, Url};

/// Upper bound (exclusive) on the tested idle wait, in seconds.
pub const MAX_WAIT_SECS: u64 = 70;

/// Opens a connection, waits some period of time, then tries to complete an
/// HTTP request on that connection.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct ProbeArgs {
    /// URL to test
    #[arg(long, value_name = "URL", default_value = "https://news.ycombinator.com/")]
    pub url: String,

    /// Interval at which to send empty data as keepalives (0 means don't use
    /// keepalives)
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    pub keepalive: u64,
}

/// Validated probe configuration. Built once at startup and never mutated;
/// everything a trial needs to dial, wait and issue its request.
#[derive(Debug)]
pub struct ProbeConfig {
    /// The target URL as given.
    pub target: Url,

    /// Host to dial, IP literals without brackets.
    pub host: String,

    /// Explicit port, or the scheme's known default.
    pub port: u16,

    /// Whether the connection needs a TLS handshake after the idle wait.
    pub tls: bool,

    /// Gap between zero-length keepalive writes. `None` disables them and the
    /// idle wait becomes one uninterrupted sleep.
    pub keepalive: Option<Duration>,

    /// Origin-form request target (path plus query).
    pub uri: Uri,

    /// Value for the request's Host header.
    pub host_header: HeaderValue,
}

impl ProbeConfig {
    pub fn from_args(args: &ProbeArgs) -> anyhow::Result<Self> {
        Self::new(&args.url, args.keepalive)
    }

    pub fn new(target: &str, keepalive_secs: u64) -> anyhow::Result<Self> {
        let target: Url = target
            .parse()
            .with_context(|| format!("unable to parse url {target}"))?;

        let host = match target.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => bail!("url {target} has no host"),
        };
        let port = target
            .port_or_known_default()
            .with_context(|| format!("no port known for scheme {}", target.scheme()))?;
        let tls = match target.scheme() {
            "http" => false,
            "https" => true,
            other => bail!("unsupported scheme {other}"),
        };

        let uri: Uri = origin_form(&target)
            .parse()
            .with_context(|| format!("url {target} has no usable request path"))?;
        let host_header = HeaderValue::from_str(&authority(&target))
            .with_context(|| format!("url {target} has no usable host header"))?;

        let keepalive = (keepalive_secs > 0).then(|| Duration::from_secs(keepalive_secs));

        Ok(Self {
            target,
            host,
            port,
            tls,
            keepalive,
            uri,
            host_header,
        })
    }

    /// Gap between successive tested wait durations: the keepalive interval
    /// when keepalives are on, otherwise one second.
    pub fn step(&self) -> u64 {
        self.keepalive.map_or(1, |interval| interval.as_secs())
    }

    /// Wait durations to test, ascending, strictly below [`MAX_WAIT_SECS`].
    pub fn schedule(&self) -> impl Iterator<Item = u64> {
        (1..MAX_WAIT_SECS).step_by(self.step() as usize)
    }
}

fn origin_form(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn default_schedule_covers_one_through_sixty_nine() {
        let config = ProbeConfig::new("http://example.com/", 0).expect("valid config");
        let waits: Vec<u64> = config.schedule().collect();
        assert_eq!(waits.len(), 69);
        assert_eq!(waits.first(), Some(&1));
        assert_eq!(waits.last(), Some(&69));
    }

    #[test]
    fn keepalive_schedule_steps_by_the_interval() {
        let config = ProbeConfig::new("http://example.com/", 5).expect("valid config");
        let waits: Vec<u64> = config.schedule().collect();
        assert_eq!(
            waits,
            vec![1, 6, 11, 16, 21, 26, 31, 36, 41, 46, 51, 56, 61, 66]
        );
        assert!(waits.iter().all(|wait| *wait < MAX_WAIT_SECS));
    }

    #[test]
    fn keepalive_zero_means_disabled() {
        let config = ProbeConfig::new("http://example.com/", 0).expect("valid config");
        assert!(config.keepalive.is_none());
        assert_eq!(config.step(), 1);
    }

    #[test]
    fn ports_follow_the_scheme_unless_explicit() {
        let config = ProbeConfig::new("https://example.com/", 0).expect("valid config");
        assert_eq!(config.port, 443);
        assert!(config.tls);

        let config = ProbeConfig::new("http://example.com:8080/x?y=1", 0).expect("valid config");
        assert_eq!(config.port, 8080);
        assert!(!config.tls);
        assert_eq!(config.uri.to_string(), "/x?y=1");
        assert_eq!(config.host_header.to_str().unwrap(), "example.com:8080");
    }

    #[test]
    fn ipv6_literals_dial_unbracketed_but_keep_brackets_in_the_host_header() {
        let config = ProbeConfig::new("http://[::1]:8080/", 0).expect("valid config");
        assert_eq!(config.host, "::1");
        assert_eq!(config.host_header.to_str().unwrap(), "[::1]:8080");
    }

    #[test]
    fn bad_targets_are_rejected_up_front() {
        assert!(ProbeConfig::new("not a url", 0).is_err());
        assert!(ProbeConfig::new("http://", 0).is_err());
        assert!(ProbeConfig::new("mailto:probe@example.com", 0).is_err());
        assert!(ProbeConfig::new("gopher://example.com/", 0).is_err());
    }
}
