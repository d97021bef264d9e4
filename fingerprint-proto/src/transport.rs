//! Transport abstraction: uniform `write` / `read_some` over serial or USB
//! bulk.

use std::time::Duration;

use crate::error::TransportError;

/// Two-operation capability the exchange engine needs. Implementations are
/// free to block; the engine treats both calls as synchronous.
pub trait Transport {
    /// Best-effort write. A short write or an I/O error is a terminal
    /// failure for the current exchange.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Reads at least one and up to `max` bytes. A timed-out read surfaces
    /// as `TransportError::Timeout`; an actually closed connection as
    /// `TransportError::EndOfStream`.
    fn read_some(&mut self, max: usize) -> Result<Vec<u8>, TransportError>;
}

#[cfg(feature = "serial")]
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub device: String,
    pub baud: u32,
    pub read_timeout: Duration,
}

#[cfg(feature = "serial")]
impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            device: String::new(),
            // 9600 * 6, the module's factory-default baud rate.
            baud: 57_600,
            read_timeout: Duration::from_millis(500),
        }
    }
}

#[cfg(feature = "serial")]
impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.device, config.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(config.read_timeout)
            .open()
            .map_err(TransportError::from)?;

        Ok(SerialTransport { port })
    }
}

#[cfg(feature = "serial")]
impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        use std::io::Write;
        self.port
            .write(bytes)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn read_some(&mut self, max: usize) -> Result<Vec<u8>, TransportError> {
        use std::io::Read;
        let mut buf = vec![0u8; max];
        match self.port.read(&mut buf) {
            Ok(0) => Err(TransportError::EndOfStream),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::ReadFailed(e.to_string())),
        }
    }
}

#[cfg(feature = "usb")]
pub struct UsbBulkTransport {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
    in_endpoint: u8,
    out_endpoint: u8,
    timeout: Duration,
    interface: u8,
}

#[cfg(feature = "usb")]
#[derive(Debug, Clone)]
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub configuration: u8,
    pub interface: u8,
    pub alt_setting: u8,
    pub in_endpoint: u8,
    pub out_endpoint: u8,
    pub timeout: Duration,
}

#[cfg(feature = "usb")]
impl Default for UsbConfig {
    fn default() -> Self {
        // A common R307 USB-serial dongle (CH340-based).
        UsbConfig {
            vendor_id: 0x1A86,
            product_id: 0x7523,
            configuration: 1,
            interface: 0,
            alt_setting: 0,
            in_endpoint: 0x82,
            out_endpoint: 0x02,
            timeout: Duration::from_millis(500),
        }
    }
}

#[cfg(feature = "usb")]
impl UsbBulkTransport {
    pub fn open(config: &UsbConfig) -> Result<Self, TransportError> {
        let handle = rusb::open_device_with_vid_pid(config.vendor_id, config.product_id)
            .ok_or_else(|| TransportError::ReadFailed("device not found".into()))?;

        handle.set_active_configuration(config.configuration)?;
        handle.claim_interface(config.interface)?;
        if config.alt_setting != 0 {
            handle.set_alternate_setting(config.interface, config.alt_setting)?;
        }

        Ok(UsbBulkTransport {
            handle,
            in_endpoint: config.in_endpoint,
            out_endpoint: config.out_endpoint,
            timeout: config.timeout,
            interface: config.interface,
        })
    }
}

#[cfg(feature = "usb")]
impl Transport for UsbBulkTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.handle
            .write_bulk(self.out_endpoint, bytes, self.timeout)
            .map_err(TransportError::from)
    }

    fn read_some(&mut self, max: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max];
        let n = self
            .handle
            .read_bulk(self.in_endpoint, &mut buf, self.timeout)?;
        if n == 0 {
            return Err(TransportError::EndOfStream);
        }
        buf.truncate(n);
        Ok(buf)
    }
}

#[cfg(feature = "usb")]
impl Drop for UsbBulkTransport {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }
}
