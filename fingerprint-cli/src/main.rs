use std::io::{self, Write};
use std::time::Duration;

use fingerprint_proto::{CharBuffer, EnrollOutcome, SearchOutcome, Session};
use fingerprint_proto::{SerialConfig, UsbConfig};
use log::{error, info};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "fingerprint", about = "Talk to an R307-class fingerprint scanner")]
struct Opt {
    /// Use a USB bulk transport instead of serial.
    #[structopt(long)]
    usb: bool,

    /// Serial device path, e.g. /dev/ttyUSB0. Ignored when --usb is set.
    #[structopt(long, default_value = "/dev/ttyUSB0")]
    serial: String,

    /// Serial baud rate.
    #[structopt(long, default_value = "57600")]
    baud: u32,

    /// USB vendor id, hex or decimal.
    #[structopt(long, parse(try_from_str = parse_u16), default_value = "0x1A86")]
    vid: u16,

    /// USB product id, hex or decimal.
    #[structopt(long, parse(try_from_str = parse_u16), default_value = "0x7523")]
    pid: u16,

    /// Device password.
    #[structopt(long, default_value = "0")]
    password: u32,

    /// Emit library trace/debug logging.
    #[structopt(short, long)]
    verbose: bool,
}

fn parse_u16(s: &str) -> Result<u16, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

fn main() {
    pretty_env_logger::init();
    let opt = Opt::from_args();

    let result = if opt.usb {
        let config = UsbConfig {
            vendor_id: opt.vid,
            product_id: opt.pid,
            ..UsbConfig::default()
        };
        fingerprint_proto::open_usb(&config, opt.password).map(|mut s| {
            s.set_debug(opt.verbose);
            run_menu(s)
        })
    } else {
        let config = SerialConfig {
            device: opt.serial.clone(),
            baud: opt.baud,
            read_timeout: Duration::from_millis(500),
        };
        fingerprint_proto::open_serial(&config, opt.password).map(|mut s| {
            s.set_debug(opt.verbose);
            run_menu(s)
        })
    };

    if let Err(e) = result {
        error!("could not open device: {}", e);
        std::process::exit(1);
    }
}

fn run_menu<T: fingerprint_proto::transport::Transport>(mut session: Session<T>) {
    loop {
        println!("Choose your option:");
        println!("1 - Verify Password");
        println!("2 - System Params");
        println!("3 - Search");
        println!("4 - Enroll");
        println!("5 - Clear Database");
        println!("9 - Exit");

        let choice = match read_choice() {
            Some(c) => c,
            None => continue,
        };

        match choice {
            1 => match session.verify_password() {
                Ok(true) => info!("password verified"),
                Ok(false) => info!("password wrong"),
                Err(e) => error!("verify password failed: {}", e),
            },
            2 => match session.get_system_parameters() {
                Ok(params) => match serde_json::to_string(&JsonSystemParameters::from(params)) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("could not render system parameters: {}", e),
                },
                Err(e) => error!("get system parameters failed: {}", e),
            },
            3 => match session.search(CharBuffer::One, || false) {
                Ok(SearchOutcome::Match { position, accuracy }) => {
                    info!("match at position {} (accuracy {})", position, accuracy)
                }
                Ok(SearchOutcome::NoMatch) => info!("no match found"),
                Err(e) => error!("search failed: {}", e),
            },
            4 => match session.enroll(|| false, || println!("Lift and re-present your finger")) {
                Ok(EnrollOutcome::Stored(position)) => info!("enrolled at position {}", position),
                Ok(EnrollOutcome::AlreadyEnrolled(position)) => {
                    info!("already enrolled at position {}", position)
                }
                Ok(EnrollOutcome::FingersDoNotMatch) => info!("fingers do not match"),
                Ok(EnrollOutcome::DatabaseFull) => info!("database is full"),
                Err(e) => error!("enroll failed: {}", e),
            },
            5 => match session.clear_database() {
                Ok(()) => info!("database cleared"),
                Err(e) => error!("clear database failed: {}", e),
            },
            9 => {
                println!("Stopping the program - with Exit Option");
                break;
            }
            _ => println!("That's an invalid choice"),
        }
    }
}

fn read_choice() -> Option<i32> {
    print!("> ");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
        return None;
    }
    line.trim().parse().ok()
}

/// `SystemParameters` as rendered by the CLI's `2` action. Kept separate
/// from the library type so the wire-field names don't leak a JSON
/// contract into `fingerprint-proto` itself.
#[derive(serde::Serialize)]
struct JsonSystemParameters {
    status_register: u16,
    system_id: u16,
    storage_capacity: u16,
    security_level: u16,
    device_address: u32,
    packet_size_code: u16,
    baud_code: u16,
}

impl From<fingerprint_proto::SystemParameters> for JsonSystemParameters {
    fn from(p: fingerprint_proto::SystemParameters) -> Self {
        JsonSystemParameters {
            status_register: p.status_register,
            system_id: p.system_id,
            storage_capacity: p.storage_capacity,
            security_level: p.security_level,
            device_address: p.device_address,
            packet_size_code: p.packet_size_code,
            baud_code: p.baud_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_ids() {
        assert_eq!(parse_u16("0x1A86").unwrap(), 0x1A86);
        assert_eq!(parse_u16("6790").unwrap(), 6790);
    }
}
