/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::test_support
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Fixtures shared by unit tests across modules: zip archive
    builders and a one-shot local HTTP responder.

  Security / Safety Notes:
    Test-only; binds to loopback on an ephemeral port.

  Dependencies:
    zip for archive fixtures, tokio for the responder.

  Operational Scope:
    Compiled only under `cfg(test)`.

  Revision History:
    2026-10-19 COD  Collected shared test fixtures.
============================================================*/

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Build a zip archive at `path` containing the given entries.
pub(crate) fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).expect("create archive");
    let mut writer = ZipWriter::new(file);
    for (name, body) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(body.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish archive");
}

/// Serve the given raw HTTP responses, one per connection, in order.
/// Returns the base URL of the listener.
pub(crate) async fn serve(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });
    format!("http://{addr}")
}

/// Raw HTTP/1.1 response with a JSON content type and explicit length.
pub(crate) fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
