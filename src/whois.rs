//! Legacy WHOIS (RFC 3912) query client: plain TCP, one line out, free text
//! back until the server closes the connection.

use crate::{errors::LookupError, registry};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::info;

const WHOIS_PORT: u16 = 43;
const WHOIS_TIMEOUT: Duration = Duration::from_secs(10);

/// Append the default port unless the configured host already carries one.
fn ensure_port(server: &str) -> String {
    match server.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            server.to_string()
        }
        _ => format!("{server}:{WHOIS_PORT}"),
    }
}

/// Send `{query}\r\n` to `addr` and read to EOF. A dial timeout and a
/// combined read/write deadline both apply.
async fn raw_query(addr: &str, query: &str) -> Result<String, LookupError> {
    let mut stream = timeout(WHOIS_TIMEOUT, TcpStream::connect(addr)).await??;

    let response = timeout(WHOIS_TIMEOUT, async {
        stream.write_all(format!("{query}\r\n").as_bytes()).await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok::<_, std::io::Error>(response)
    })
    .await??;

    // Registries are not reliably UTF-8; replace rather than reject.
    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Query the WHOIS server registered for `tld`.
pub async fn whois_query(domain: &str, tld: &str) -> Result<String, LookupError> {
    let server = registry::whois_server_for_tld(tld).ok_or_else(|| {
        LookupError::NoRegistry(format!("no Whois server known for TLD: {tld}"))
    })?;

    info!("Querying WHOIS for domain: {domain} with TLD: {tld} on server: {server}");

    raw_query(&ensure_port(server), domain).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn default_port_appended() {
        assert_eq!(ensure_port("whois.cnnic.cn"), "whois.cnnic.cn:43");
        assert_eq!(ensure_port("whois.example.org:4343"), "whois.example.org:4343");
        assert_eq!(ensure_port("127.0.0.1:1043"), "127.0.0.1:1043");
    }

    #[tokio::test]
    async fn sends_crlf_query_and_reads_to_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 128];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"example.cn\r\n");
            socket
                .write_all(b"Sponsoring Registrar: Example\r\n")
                .await
                .unwrap();
            // Closing the socket signals end of response.
        });

        let response = raw_query(&addr.to_string(), "example.cn").await.unwrap();
        assert_eq!(response, "Sponsoring Registrar: Example\r\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_an_upstream_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = raw_query(&addr.to_string(), "example.cn").await.unwrap_err();
        assert!(matches!(err, LookupError::Upstream(_)));
    }

    #[tokio::test]
    async fn unknown_tld_yields_no_registry() {
        let err = whois_query("example.nosuchtld", "nosuchtld")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NoRegistry(_)));
    }
}
