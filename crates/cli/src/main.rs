use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use rtsp::{Client, ClientConfig, Credentials, TcpTransport};

#[derive(Parser)]
#[command(
    name = "rtsp-client",
    about = "Announce an H.264 stream to an RTSP server and walk the record handshake"
)]
struct Args {
    /// Server address (host:port)
    #[arg(long, short, default_value = "127.0.0.1:554")]
    server: String,

    /// Base request URI (defaults to rtsp://<server>/)
    #[arg(long)]
    uri: Option<String>,

    /// Stream path appended to the base URI
    #[arg(long, default_value = "teststream")]
    stream: String,

    /// Local address advertised in the SDP
    #[arg(long, default_value = "127.0.0.1")]
    local_host: String,

    /// Local RTP port (RTCP uses the next port)
    #[arg(long, default_value_t = 50000)]
    rtp_port: u16,

    /// Per-request response timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Username for Basic authorization
    #[arg(long, requires = "password")]
    username: Option<String>,

    /// Password for Basic authorization
    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Raw Authorization header value (overrides --username/--password)
    #[arg(long)]
    authorization: Option<String>,

    /// Send Authorization on ANNOUNCE, SETUP, RECORD and TEARDOWN
    #[arg(long)]
    authorize: bool,

    /// Seconds to stay in RECORD before TEARDOWN
    #[arg(long, default_value_t = 0)]
    hold_secs: u64,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let credentials = match (&self.authorization, &self.username, &self.password) {
            (Some(header), _, _) => Some(Credentials::Header(header.clone())),
            (None, Some(username), Some(password)) => Some(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        ClientConfig {
            base_uri: self
                .uri
                .clone()
                .unwrap_or_else(|| format!("rtsp://{}/", self.server)),
            stream_name: self.stream.clone(),
            local_host: self.local_host.clone(),
            client_rtp_port: self.rtp_port,
            client_rtcp_port: self.rtp_port.saturating_add(1),
            response_timeout: Duration::from_millis(self.timeout_ms),
            credentials,
            sdp_session_name: "rtsp-client".to_string(),
            ..ClientConfig::default()
        }
    }
}

fn run(client: &mut Client, args: &Args) -> rtsp::Result<()> {
    client.start()?;

    client.options()?;
    if !client.session().missing_capabilities.is_empty() {
        eprintln!(
            "Server does not advertise: {:?}",
            client.session().missing_capabilities
        );
    }

    client.announce(args.authorize)?;
    println!(
        "Session: {}",
        client.session().session_id.as_deref().unwrap_or("<none>")
    );

    client.setup(args.authorize)?;
    if let Some(ports) = client.session().server_ports() {
        println!(
            "Server data port: {}, control port: {}",
            ports.data_port, ports.control_port
        );
    }

    client.record(args.authorize)?;
    if args.hold_secs > 0 {
        thread::sleep(Duration::from_secs(args.hold_secs));
    }

    client.teardown(args.authorize)?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let transport = TcpTransport::new(&args.server, Duration::from_millis(args.timeout_ms));
    let mut client = Client::new(args.config(), Box::new(transport));

    let result = run(&mut client, &args);
    client.shutdown();

    match result {
        Ok(()) => {
            println!("Session closed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, phase = ?client.phase(), "session aborted");
            eprintln!("RTSP session failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
