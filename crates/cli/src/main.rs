use aac_rtp::sdp::{AudioDescription, PROFILE_AAC_LC, generate_sdp};
use aac_rtp::source::{QueueWriter, byte_queue};
use aac_rtp::transport::{UdpRtpSender, UdpTransport};
use aac_rtp::{AacAdtsPacketizer, PacketizerConfig};
use clap::Parser;
use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "aac-rtp-sender",
    about = "Send an ADTS AAC stream as RTP (RFC 3640 aac-hbr)"
)]
struct Args {
    /// ADTS input file, or "-" for stdin
    #[arg(long, short, default_value = "-")]
    input: String,

    /// Receiver RTP address (host:port)
    #[arg(long, short)]
    dest: SocketAddr,

    /// Receiver RTCP port (default: RTP port + 1)
    #[arg(long)]
    rtcp_port: Option<u16>,

    /// Local bind address
    #[arg(long, short, default_value = "0.0.0.0:0")]
    bind: String,

    /// Audio sampling rate in Hz
    #[arg(long, short, default_value_t = 44100)]
    sampling_rate: u32,

    /// Channel count advertised in the SDP
    #[arg(long, default_value_t = 1)]
    channels: u8,

    /// RTP payload type
    #[arg(long, default_value_t = 96)]
    payload_type: u8,

    /// Maximum RTP packet size in bytes, header included
    #[arg(long, default_value_t = 1400)]
    max_packet_size: usize,

    /// Print the SDP for the stream and continue
    #[arg(long)]
    print_sdp: bool,
}

fn open_input(path: &str) -> io::Result<Box<dyn Read + Send>> {
    if path == "-" {
        Ok(Box::new(io::stdin()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

/// Pump the input into the packetizer's queue until EOF or the queue closes.
fn spawn_feeder(mut input: Box<dyn Read + Send>, mut writer: QueueWriter) -> io::Result<()> {
    thread::Builder::new()
        .name("adts-feeder".into())
        .spawn(move || match io::copy(&mut input, &mut writer) {
            Ok(n) => tracing::debug!(bytes = n, "input drained"),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => tracing::warn!(error = %e, "input read failed"),
        })?;
    Ok(())
}

fn print_sdp(args: &Args) {
    let audio = AudioDescription {
        payload_type: args.payload_type,
        sampling_rate: args.sampling_rate,
        channels: args.channels,
        profile: PROFILE_AAC_LC,
    };
    let ip: IpAddr = args.dest.ip();
    match generate_sdp(&audio, &ip.to_string(), args.dest.port(), "AAC stream") {
        Ok(sdp) => print!("{}", sdp),
        Err(e) => eprintln!("Cannot describe stream: {}", e),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let rtcp_dest = SocketAddr::new(
        args.dest.ip(),
        args.rtcp_port.unwrap_or(args.dest.port().wrapping_add(1)),
    );

    let udp = match UdpTransport::bind(args.bind.as_str()) {
        Ok(udp) => udp,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", args.bind, e);
            return;
        }
    };
    let sender = UdpRtpSender::new(udp, args.dest, args.payload_type);
    let report = sender.sender_report(rtcp_dest);

    let config = PacketizerConfig {
        max_packet_size: args.max_packet_size,
        ..Default::default()
    };
    let mut packetizer = AacAdtsPacketizer::with_config(sender, report, config);

    if let Err(e) = packetizer.set_sampling_rate(args.sampling_rate) {
        eprintln!("Invalid sampling rate: {}", e);
        return;
    }

    let input = match open_input(&args.input) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Failed to open {}: {}", args.input, e);
            return;
        }
    };
    let (writer, reader) = byte_queue();
    if let Err(e) = packetizer.set_source(reader) {
        eprintln!("Failed to attach input: {}", e);
        return;
    }

    if args.print_sdp {
        print_sdp(&args);
    }

    if let Err(e) = packetizer.start() {
        eprintln!("Failed to start packetizer: {}", e);
        return;
    }
    if let Err(e) = spawn_feeder(input, writer) {
        eprintln!("Failed to start input thread: {}", e);
        packetizer.stop();
        return;
    }

    // stdin carries the stream itself when input is "-", so only the
    // worker exiting ends the run in that case.
    let (enter_tx, enter_rx) = mpsc::channel::<()>();
    if args.input != "-" {
        println!(
            "Sending {} to {} (RTCP {}), press Enter to stop",
            args.input, args.dest, rtcp_dest
        );
        thread::spawn(move || {
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_ok() {
                let _ = enter_tx.send(());
            }
        });
    }

    while packetizer.is_running() {
        match enter_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    packetizer.stop();
    if let Some(exit) = packetizer.last_exit() {
        tracing::info!(%exit, ts = packetizer.rtp_timestamp(), "sender finished");
    }
}
