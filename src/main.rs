//! srtp-tool - inspect and exercise SRTP crypto contexts
//!
//! Reads the stream policy and master key from the config file and protects
//! or unprotects packets from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use srtp_context::config::Config;
use srtp_context::srtp::{self, CryptoParams, TEMPLATE_SSRC};
use srtp_context::{rtp, SrtpError};

#[derive(Parser)]
#[command(name = "srtp-tool")]
#[command(about = "SRTP/SRTCP crypto context tool (RFC 3711)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random master key and salt and store them in the config
    Keygen {
        /// Crypto suite, e.g. AES_CM_128_HMAC_SHA1_80
        #[arg(short, long)]
        suite: Option<String>,

        /// Print the keys without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the session keys derived for a packet index
    Derive {
        /// 48-bit SRTP packet index
        #[arg(short, long, default_value = "0")]
        index: u64,
    },

    /// Protect an RTP packet carrying a text payload and print it as hex
    Protect {
        /// Payload text
        payload: String,

        /// RTP sequence number
        #[arg(short, long, default_value = "0")]
        seq: u16,

        /// RTP payload type
        #[arg(long, default_value = "0")]
        pt: u8,

        /// RTP timestamp
        #[arg(long, default_value = "0")]
        timestamp: u32,
    },

    /// Verify and decrypt a hex encoded SRTP packet
    Unprotect {
        /// SRTP packet as hex
        packet: String,
    },

    /// Run sender and receiver contexts against each other
    Demo {
        /// Number of packets to send
        #[arg(short, long, default_value = "16")]
        packets: u16,

        /// First sequence number
        #[arg(long, default_value = "65530")]
        start_seq: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Keygen { suite, dry_run } => {
            let mut config = Config::load(config_path)?;
            if let Some(name) = suite {
                config.policy.suite = Some(name);
            }
            let params = config.crypto_params()?;
            keygen(&mut config, &params)?;
            if dry_run {
                print!("{}", toml::to_string_pretty(&config)?);
            } else {
                let path = config.save(config_path)?;
                tracing::info!("Saved new master key to {}", path.display());
            }
        }
        Commands::Derive { index } => {
            let config = Config::load(config_path)?;
            derive(&config, index)?;
        }
        Commands::Protect {
            payload,
            seq,
            pt,
            timestamp,
        } => {
            let config = Config::load(config_path)?;
            let ssrc = config.stream.ssrc;
            let mut ctx = config.rtp_context(ssrc)?;
            ctx.derive_srtp_keys((u64::from(ctx.roc()) << 16) | u64::from(seq));

            let mut packet = rtp::encode(pt, seq, timestamp, ssrc, payload.as_bytes());
            srtp::protect_rtp(&mut ctx, &mut packet)?;
            println!("{}", hex::encode(&packet));
        }
        Commands::Unprotect { packet } => {
            let config = Config::load(config_path)?;
            let mut packet = hex::decode(packet.trim()).context("Packet is not valid hex")?;
            let ssrc = rtp::rtp_ssrc(&packet).context("Packet shorter than an RTP header")?;
            let seq = rtp::sequence_number(&packet).context("Packet shorter than an RTP header")?;

            let mut ctx = config.rtp_context(ssrc)?;
            ctx.derive_srtp_keys((u64::from(ctx.roc()) << 16) | u64::from(seq));
            let index = srtp::unprotect_rtp(&mut ctx, &mut packet)?;

            let decoded = rtp::decode(&packet)?;
            println!("ssrc:    {:#010x}", decoded.ssrc);
            println!("index:   {}", index);
            println!("seq:     {}", decoded.sequence_number);
            println!("payload: {}", String::from_utf8_lossy(&decoded.payload));
        }
        Commands::Demo { packets, start_seq } => {
            let config = Config::load(config_path)?;
            demo(&config, packets, start_seq)?;
        }
    }

    Ok(())
}

fn keygen(config: &mut Config, params: &CryptoParams) -> Result<()> {
    let key_len = params.cipher_key_len.max(16);
    let mut key = zeroize::Zeroizing::new(vec![0u8; key_len]);
    let mut salt = zeroize::Zeroizing::new(vec![0u8; srtp::SESSION_SALT_LEN]);
    getrandom::getrandom(&mut key).map_err(|e| anyhow::anyhow!("Random source failed: {}", e))?;
    getrandom::getrandom(&mut salt).map_err(|e| anyhow::anyhow!("Random source failed: {}", e))?;
    config.set_master_key_material(&key, &salt);
    Ok(())
}

fn derive(config: &Config, index: u64) -> Result<()> {
    let ssrc = config.stream.ssrc;
    let mut rtp_ctx = config.rtp_context(ssrc)?;
    let mut rtcp_ctx = config.rtcp_context(ssrc)?;
    rtp_ctx.derive_srtp_keys(index);
    rtcp_ctx.derive_srtcp_keys();

    for (name, keys) in [
        ("SRTP", rtp_ctx.session_keys()),
        ("SRTCP", rtcp_ctx.session_keys()),
    ] {
        let Some(keys) = keys else {
            println!("{}: no keys (null policy)", name);
            continue;
        };
        println!("{} session keys:", name);
        println!("  cipher key: {}", hex::encode(keys.cipher_key.as_slice()));
        println!("  auth key:   {}", hex::encode(keys.auth_key.as_slice()));
        println!("  salt:       {}", hex::encode(keys.salt.as_slice()));
    }
    Ok(())
}

fn demo(config: &Config, packets: u16, start_seq: u16) -> Result<()> {
    let ssrc = config.stream.ssrc;
    let roc = config.stream.roc;
    let first_index = (u64::from(roc) << 16) | u64::from(start_seq);

    let mut sender = config.rtp_context(ssrc)?;
    let template = config.rtp_context(TEMPLATE_SSRC)?;
    let mut receiver =
        template.new_crypto_context_for_ssrc(ssrc, roc, template.key_derivation_rate());
    sender.derive_srtp_keys(first_index);
    receiver.derive_srtp_keys(first_index);

    tracing::info!(
        "Sending {} packets from seq {} (ssrc {:#010x}, {:?}/{:?})",
        packets,
        start_seq,
        ssrc,
        sender.encryption(),
        sender.authentication()
    );

    let mut seq = start_seq;
    let mut last = Vec::new();
    for n in 0..packets {
        let payload = format!("packet {}", n);
        let plain = rtp::encode(0, seq, u32::from(n) * 160, ssrc, payload.as_bytes());
        let mut packet = plain.clone();
        srtp::protect_rtp(&mut sender, &mut packet)?;
        last = packet.clone();

        let index = srtp::unprotect_rtp(&mut receiver, &mut packet)?;
        if packet != plain {
            bail!("Packet {} did not round trip", n);
        }
        tracing::debug!(seq, index, "Packet verified");
        seq = seq.wrapping_add(1);
    }
    println!(
        "{} packets verified, sender roc {}, receiver roc {}",
        packets,
        sender.roc(),
        receiver.roc()
    );

    if sender.params().is_null() {
        println!("Null policy, replay protection disabled");
    } else if !last.is_empty() {
        match srtp::unprotect_rtp(&mut receiver, &mut last) {
            Err(SrtpError::Replay(index)) => println!("Replayed packet {} rejected", index),
            Ok(_) => bail!("Replayed packet was accepted"),
            Err(e) => return Err(e.into()),
        }
    }

    let mut rtcp_tx = config.rtcp_context(ssrc)?;
    let mut rtcp_rx = config.rtcp_context(ssrc)?;
    rtcp_tx.derive_srtcp_keys();
    rtcp_rx.derive_srtcp_keys();
    let mut report = vec![0x80, 201, 0x00, 0x01];
    report.extend_from_slice(&ssrc.to_be_bytes());
    let plain = report.clone();
    srtp::protect_rtcp(&mut rtcp_tx, &mut report, 1)?;
    let index = srtp::unprotect_rtcp(&mut rtcp_rx, &mut report)?;
    if report != plain {
        bail!("RTCP report did not round trip");
    }
    println!("RTCP report {} verified", index);

    Ok(())
}
