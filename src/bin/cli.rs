//! framelink CLI Client
//!
//! Sends one request to a framelink server and prints the reply.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use framelink::{Client, ClientConfig, DataPayload, MessageType, Reply};
use tracing_subscriber::{fmt, EnvFilter};

/// framelink CLI
#[derive(Parser, Debug)]
#[command(name = "framelink-cli")]
#[command(about = "CLI for framelink servers")]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server with CHECK
    Check,

    /// Send a DATA frame (number + text)
    Data {
        /// The number to send
        number: u32,

        /// The text to send
        text: String,
    },

    /// Send a frame of any registered type
    Send {
        /// Message type name (registered on the fly if unknown)
        message_type: String,

        /// UTF-8 payload
        #[arg(default_value = "")]
        payload: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = ClientConfig::builder().read_timeout_ms(args.timeout_ms).build();
    let mut client = Client::with_config(config);
    if let Err(e) = client.open(&args.host, args.port) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    let result = match args.command {
        Commands::Check => client.request(MessageType::CHECK, &[]),
        Commands::Data { number, text } => {
            client.request(MessageType::DATA, &DataPayload::new(number, text).encode())
        }
        Commands::Send {
            message_type,
            payload,
        } => match MessageType::register(&message_type) {
            Ok(message_type) => {
                if !client.handlers().contains(message_type) {
                    client.register_handler(message_type, move |reply| {
                        Ok(Reply::Raw {
                            message_type,
                            payload: Bytes::copy_from_slice(reply),
                        })
                    });
                }
                client.request(message_type, payload.as_bytes())
            }
            Err(e) => Err(e),
        },
    };

    let _ = client.close();

    match result {
        Ok(reply) => print_reply(&reply),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Check(payload) => println!("CHECK {}", String::from_utf8_lossy(payload)),
        Reply::Data(data) => println!("DATA number={} text={}", data.number, data.text),
        Reply::Error(reason) => println!("ERROR {}", String::from_utf8_lossy(reason)),
        Reply::Raw {
            message_type,
            payload,
        } => println!("{} {}", message_type, String::from_utf8_lossy(payload)),
    }
}
