//! BlueZ adapter over the system D-Bus.
//!
//! - read the adapter address
//! - register the HID SDP record through `ProfileManager1`
//! - set alias, power, pairability and device class (0x002508, gamepad)
//! - toggle discoverability while waiting for a console

use crate::bluetooth::{AdapterError, BluetoothAdapter};
use crate::controller::ControllerIdentity;
use crate::transport::BdAddr;
use std::collections::HashMap;
use std::process::Command;
use tracing::{debug, info, warn};
use zbus::blocking::fdo::PropertiesProxy;
use zbus::blocking::{Connection, Proxy};
use zbus::names::InterfaceName;
use zbus::zvariant::{ObjectPath, Value};

const BLUEZ: &str = "org.bluez";
const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
const PROFILE_PATH: &str = "/switchcon/hid";
const HID_UUID: &str = "00001124-0000-1000-8000-00805f9b34fb";
const GAMEPAD_CLASS: &str = "0x002508";

/// HID service record advertised to the console.
const SDP_RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<record>
    <attribute id="0x0001">
        <sequence>
            <uuid value="0x1124"/>
        </sequence>
    </attribute>
    <attribute id="0x0004">
        <sequence>
            <sequence>
                <uuid value="0x0100"/>
                <uint16 value="0x0011"/>
            </sequence>
            <sequence>
                <uuid value="0x0011"/>
            </sequence>
        </sequence>
    </attribute>
    <attribute id="0x0005">
        <sequence>
            <uuid value="0x1002"/>
        </sequence>
    </attribute>
    <attribute id="0x0006">
        <sequence>
            <uint16 value="0x656E"/>
            <uint16 value="0x006A"/>
            <uint16 value="0x0100"/>
        </sequence>
    </attribute>
    <attribute id="0x0009">
        <sequence>
            <sequence>
                <uuid value="0x1124"/>
                <uint16 value="0x0100"/>
            </sequence>
        </sequence>
    </attribute>
    <attribute id="0x000D">
        <sequence>
            <sequence>
                <sequence>
                    <uuid value="0x0100"/>
                    <uint16 value="0x0013"/>
                </sequence>
                <sequence>
                    <uuid value="0x0011"/>
                </sequence>
            </sequence>
        </sequence>
    </attribute>
    <attribute id="0x0100">
        <text value="Wireless Gamepad"/>
    </attribute>
    <attribute id="0x0101">
        <text value="Gamepad"/>
    </attribute>
    <attribute id="0x0102">
        <text value="Nintendo"/>
    </attribute>
    <attribute id="0x0200">
        <uint16 value="0x0100"/>
    </attribute>
    <attribute id="0x0201">
        <uint16 value="0x0111"/>
    </attribute>
    <attribute id="0x0202">
        <uint8 value="0x08"/>
    </attribute>
    <attribute id="0x0203">
        <uint8 value="0x00"/>
    </attribute>
    <attribute id="0x0204">
        <boolean value="true"/>
    </attribute>
    <attribute id="0x0205">
        <boolean value="true"/>
    </attribute>
    <attribute id="0x0206">
        <sequence>
            <sequence>
                <uint8 value="0x22"/>
                <text encoding="hex" value="05010905a1010601ff852109217508953081028530093075089530810285310931750896690181028532093275089669018102853309337508966901810285340934750896690181028535093575089530810285390939750895308102853a093a7508953081020501093009310933093426ff00463fff00750895048102750895018101c0"/>
            </sequence>
        </sequence>
    </attribute>
    <attribute id="0x0207">
        <sequence>
            <sequence>
                <uint16 value="0x0409"/>
                <uint16 value="0x0100"/>
            </sequence>
        </sequence>
    </attribute>
    <attribute id="0x020B">
        <uint16 value="0x0100"/>
    </attribute>
    <attribute id="0x020C">
        <uint16 value="0x0C80"/>
    </attribute>
    <attribute id="0x020D">
        <boolean value="true"/>
    </attribute>
    <attribute id="0x020E">
        <boolean value="true"/>
    </attribute>
</record>"#;

pub struct BluezAdapter {
    connection: Connection,
    path: String,
    address: BdAddr,
}

impl std::fmt::Debug for BluezAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BluezAdapter")
            .field("path", &self.path)
            .field("address", &self.address)
            .finish()
    }
}

impl BluezAdapter {
    /// Connects to the system bus and reads the address of the adapter at
    /// `path`, e.g. `/org/bluez/hci0`.
    pub fn open(path: &str) -> Result<Self, AdapterError> {
        info!("Opening Bluetooth adapter {}", path);
        let connection = Connection::system()?;

        let address = {
            let proxy = Self::properties(&connection, path)?;
            let raw = proxy.get(Self::interface(), "Address")?;
            let text =
                String::try_from(raw).map_err(|_| AdapterError::PropertyType("Address"))?;
            text.parse::<BdAddr>()?
        };
        info!("Adapter {} has address {}", path, address);

        Ok(Self {
            connection,
            path: path.to_string(),
            address,
        })
    }

    fn interface() -> InterfaceName<'static> {
        InterfaceName::from_static_str_unchecked(ADAPTER_INTERFACE)
    }

    fn properties<'a>(
        connection: &Connection,
        path: &'a str,
    ) -> Result<PropertiesProxy<'a>, AdapterError> {
        Ok(PropertiesProxy::builder(connection)
            .destination(BLUEZ)?
            .path(path)?
            .build()?)
    }

    fn set_property(&self, name: &str, value: Value<'_>) -> Result<(), AdapterError> {
        let proxy = Self::properties(&self.connection, &self.path)?;
        proxy.set(Self::interface(), name, &value)?;
        debug!("Set adapter property {} = {:?}", name, value);
        Ok(())
    }

    /// Device name used by hciconfig, the last path segment.
    fn device_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("hci0")
    }

    fn set_device_class(&self) {
        match Command::new("hciconfig")
            .args([self.device_name(), "class", GAMEPAD_CLASS])
            .output()
        {
            Ok(output) if output.status.success() => {
                debug!("Device class set to {}", GAMEPAD_CLASS)
            }
            Ok(output) => warn!(
                "hciconfig failed to set device class: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Unable to run hciconfig: {}", e),
        }
    }

    fn register_profile(&self) -> Result<(), AdapterError> {
        let proxy = Proxy::new(
            &self.connection,
            BLUEZ,
            "/org/bluez",
            "org.bluez.ProfileManager1",
        )?;

        let mut options: HashMap<&str, Value<'_>> = HashMap::new();
        options.insert("Role", Value::from("server"));
        options.insert("RequireAuthentication", Value::from(false));
        options.insert("RequireAuthorization", Value::from(false));
        options.insert("AutoConnect", Value::from(true));
        options.insert("ServiceRecord", Value::from(SDP_RECORD));

        let profile_path = ObjectPath::from_static_str_unchecked(PROFILE_PATH);
        let result: Result<(), zbus::Error> =
            proxy.call("RegisterProfile", &(profile_path, HID_UUID, options));

        match result {
            Ok(()) => info!("HID SDP profile registered"),
            Err(e) => {
                let message = e.to_string();
                if message.contains("AlreadyExists") || message.contains("Already Exists") {
                    debug!("HID SDP profile already registered");
                } else {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

impl BluetoothAdapter for BluezAdapter {
    fn address(&self) -> BdAddr {
        self.address
    }

    fn setup(&mut self, identity: &ControllerIdentity) -> Result<(), AdapterError> {
        info!(
            "Configuring adapter {} as {}",
            self.path, identity.controller_type
        );
        self.set_property("Powered", Value::from(true))?;
        self.set_property(
            "Alias",
            Value::from(identity.controller_type.display_name()),
        )?;
        self.set_property("Pairable", Value::from(true))?;
        self.set_property("PairableTimeout", Value::from(0u32))?;
        self.set_property("DiscoverableTimeout", Value::from(0u32))?;
        self.register_profile()?;
        self.set_device_class();
        Ok(())
    }

    fn set_discoverable(&mut self, discoverable: bool) -> Result<(), AdapterError> {
        info!("Setting adapter discoverable: {}", discoverable);
        self.set_property("Discoverable", Value::from(discoverable))
    }
}
