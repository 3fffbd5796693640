//! Native USB transport using the `rusb` crate.
//!
//! This module provides the transport implementation for native platforms
//! (Linux, macOS, Windows) on top of libusb.

use {
    crate::{
        error::{Error, Result},
        transport::{Transport, UsbConfig},
    },
    log::{debug, trace, warn},
    rusb::{Device, DeviceHandle, GlobalContext},
    std::time::Duration,
};

/// Interface carrying the printer's bulk endpoints.
const INTERFACE: u8 = 0;

/// Native USB transport.
///
/// The interface is claimed on open. Dropping the transport releases the
/// interface and closes the handle.
pub struct UsbTransport {
    handle: Option<DeviceHandle<GlobalContext>>,
    timeout: Duration,
}

impl UsbTransport {
    /// Open the first device matching the configured vendor/product id.
    ///
    /// Selects the device's first configuration and claims its data
    /// interface. Returns [`Error::DeviceNotFound`] only when nothing
    /// matches; failures opening a matching device (e.g. missing access
    /// rights) are returned as [`Error::Usb`].
    pub fn open(config: &UsbConfig) -> Result<Self> {
        let device = find_device(config)?.ok_or(Error::DeviceNotFound {
            vid: config.vid,
            pid: config.pid,
        })?;
        debug!(
            "Opening {:04x}:{:04x} at bus {} address {}",
            config.vid,
            config.pid,
            device.bus_number(),
            device.address()
        );
        let mut handle = device.open()?;

        // Not supported on every platform; claiming still works without it
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            trace!("Kernel driver auto-detach unavailable: {e}");
        }

        let configuration = handle
            .device()
            .config_descriptor(0)?
            .number();
        debug!("Selecting USB configuration {configuration}");
        if let Err(e) = handle.set_active_configuration(configuration) {
            // Busy means the configuration is already active and in use by us
            if e == rusb::Error::Busy {
                warn!("Configuration {configuration} busy, keeping active configuration");
            } else {
                return Err(e.into());
            }
        }

        handle.claim_interface(INTERFACE)?;

        Ok(Self {
            handle: Some(handle),
            timeout: config.timeout,
        })
    }

    /// Change the per-transfer timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Current per-transfer timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Release the interface and close the device.
    ///
    /// Further transfers fail with [`rusb::Error::NoDevice`].
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.release_interface(INTERFACE) {
                debug!("Failed to release interface {INTERFACE}: {e}");
            }
        }
    }

    fn handle(&self) -> Result<&DeviceHandle<GlobalContext>> {
        self.handle
            .as_ref()
            .ok_or(Error::Usb(rusb::Error::NoDevice))
    }
}

/// First attached device whose descriptor matches `config`.
fn find_device(config: &UsbConfig) -> Result<Option<Device<GlobalContext>>> {
    for device in rusb::devices()?.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                trace!(
                    "Skipping device at bus {} address {}: {e}",
                    device.bus_number(),
                    device.address()
                );
                continue;
            },
        };
        if descriptor_matches(descriptor.vendor_id(), descriptor.product_id(), config) {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

fn descriptor_matches(vid: u16, pid: u16, config: &UsbConfig) -> bool {
    vid == config.vid && pid == config.pid
}

impl Transport for UsbTransport {
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Result<()> {
        let written = self
            .handle()?
            .write_bulk(endpoint, data, self.timeout)?;
        trace!("Wrote {written}/{} bytes to endpoint {endpoint:#04x}", data.len());

        if written != data.len() {
            return Err(Error::ShortWrite {
                endpoint,
                expected: data.len(),
                actual: written,
            });
        }
        Ok(())
    }

    fn read(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self
            .handle()?
            .read_bulk(endpoint, &mut buf, self.timeout)?;
        trace!("Read {n} bytes from endpoint {endpoint:#04x}");
        buf.truncate(n);
        Ok(buf)
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        self.close();
    }
}
