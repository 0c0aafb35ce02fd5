//! Request scan example against a running clamd.
//!
//! This example shows how to:
//! - Configure a scan client from JSON or defaults
//! - Check that the daemon answers
//! - Scan a request's uploads and parameters
//!
//! Run with: cargo run --example scan_request -- [endpoint]
//!
//! The endpoint defaults to `$CLAMD_ENDPOINT`, then the Debian socket path.

use clamgate::prelude::*;
use clamgate::TracingAlertSink;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

const EICAR: &str = r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Clamgate Request Scan Example ===\n");

    let mut config = ClamdConfig::from_json_str(r#"{"enabled": true, "min_scan_size": 8}"#)?;
    if let Some(endpoint) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CLAMD_ENDPOINT").ok())
    {
        config = config.with_endpoint(endpoint);
    }
    println!("Daemon endpoint: {}", config.socket_endpoint());

    let mut client =
        ScanClient::from_config(config).with_alert_sink(Arc::new(TracingAlertSink));

    if !client.test_connection().await {
        println!("\n⚠️  Daemon unreachable; scans will report Unavailable");
    }

    // A clean upload written to a temporary file, as a web server would.
    let mut upload = tempfile::NamedTempFile::new()?;
    upload.write_all(b"Quarterly report, nothing to see here.")?;

    let uploads = UploadNode::from(json!({
        "report": {
            "name": "report.txt",
            "tmp_name": upload.path().to_string_lossy(),
            "size": 38
        }
    }));
    let params = ParamNode::from(json!({
        "title": "Q3 numbers",
        "tags": ["finance", "internal"],
        "notes": EICAR
    }));

    let mut scanner = RequestScanner::new(client);
    let result = scanner.scan_request(&uploads, &params).await;

    println!("\n=== Scan Results ===");
    println!("Leaves scanned: {}", scanner.leaves_scanned());
    println!("Outcome: {}", result);

    for policy in [FailurePolicy::FailOpen, FailurePolicy::FailClosed] {
        let verdict = if result.should_block(policy) {
            "block"
        } else {
            "allow"
        };
        println!("Under {:?}: {}", policy, verdict);
    }

    Ok(())
}
