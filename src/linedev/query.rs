use std::time::Duration;

use clap::Parser;
use linedev::{
    DeviceSession, LineConfig, Mode, PortCatalog, PortDescriptor, PortFilter, QueryIdentify,
    SystemCatalog, error::LineResult,
};

#[derive(Parser, Debug, Clone)]
pub(crate) struct ListOptions {
    /// Only show ports whose manufacturer contains this text
    #[clap(short, long)]
    manufacturer: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct QueryOptions {
    /// Text to send, without delimiter
    #[clap(default_value = "VERSION")]
    text: String,

    /// Serial port; discovered when omitted
    #[clap(short, long)]
    serial: Option<String>,

    /// Baud rate
    #[clap(short, long, default_value_t = 9600)]
    baudrate: u32,

    /// Message delimiter: cr, lf, crlf or literal text
    #[clap(short, long, default_value = "cr")]
    delimiter: String,

    /// Read timeout in milliseconds
    #[clap(short, long, default_value_t = 1000)]
    timeout: u64,

    /// Only probe ports whose manufacturer contains this text
    #[clap(short, long)]
    manufacturer: Option<String>,

    /// Accept a device only if its reply to the query contains this text
    #[clap(short, long)]
    expect: Option<String>,
}

fn parse_delimiter(delimiter: &str) -> Vec<u8> {
    match delimiter.to_ascii_lowercase().as_str() {
        "cr" => b"\r".to_vec(),
        "lf" => b"\n".to_vec(),
        "crlf" => b"\r\n".to_vec(),
        _ => delimiter.as_bytes().to_vec(),
    }
}

pub(crate) fn handle_list(opts: ListOptions) -> LineResult<()> {
    let filter = PortFilter {
        manufacturer: opts.manufacturer,
        ..Default::default()
    };

    for port in SystemCatalog.available_ports()? {
        if !filter.matches(&port) {
            continue;
        }
        match (&port.manufacturer, port.vid, port.pid) {
            (manufacturer, Some(vid), Some(pid)) => println!(
                "{}\t{:04x}:{:04x}\t{}",
                port.name,
                vid,
                pid,
                manufacturer.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }

    Ok(())
}

pub(crate) fn handle_query(opts: QueryOptions) -> LineResult<()> {
    let config = LineConfig::default()
        .with_delimiter(parse_delimiter(&opts.delimiter))
        .with_baud_rate(opts.baudrate)
        .with_timeout(Duration::from_millis(opts.timeout))
        .with_mode(Mode::Sync);

    let mut builder = DeviceSession::builder(config).filter(PortFilter {
        manufacturer: opts.manufacturer,
        ..Default::default()
    });
    if let Some(name) = opts.serial {
        builder = builder.port(PortDescriptor::new(name));
    }
    if let Some(expected) = opts.expect {
        builder = builder.identify(QueryIdentify::new(opts.text.clone(), expected));
    }

    let mut session = builder.open()?;
    println!("{}", session.handshake(&opts.text)?);
    session.close();

    Ok(())
}
