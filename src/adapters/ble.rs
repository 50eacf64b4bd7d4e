//! BLE temperature service adapter.
//!
//! Publishes the temperature history as one read-only GATT characteristic.
//! A read is answered by the [`HistoryReader`]: the newest `report_depth`
//! samples, most recent first, as little-endian i16 values.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: the attribute table, access handler and
//!   registration logging run as plain Rust, driven by tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic       | UUID                                    | Perms |
//! |----------------------|-----------------------------------------|-------|
//! | Temperature history  | `5c3a659e-897e-45e1-b016-007107c96df7`  | Read  |
//!
//! in primary service `5c3a659e-897e-45e1-b016-007107c96df6`.

use core::fmt;

use heapless::Vec;
use log::{debug, info, warn};

use crate::app::reader::HistoryReader;
use crate::error::Error;
use crate::history::HISTORY_CAPACITY;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x5c3a659e_897e_45e1_b016_007107c96df6;
pub const CHAR_TEMPERATURE: u128 = 0x5c3a659e_897e_45e1_b016_007107c96df7;

/// Largest attribute value we ever send (ATT_MTU 23 - 3 header bytes is
/// the default; the history report is 20).
pub const MAX_READ_BYTES: usize = 64;

/// ATT status codes returned by the access handler.
pub const ATT_OK: u8 = 0x00;
pub const ATT_ERR_WRITE_NOT_PERMITTED: u8 = 0x03;
pub const ATT_ERR_ATTR_NOT_FOUND: u8 = 0x0A;
pub const ATT_ERR_UNLIKELY: u8 = 0x0E;
pub const ATT_ERR_INSUFFICIENT_RES: u8 = 0x11;

// ───────────────────────────────────────────────────────────────
// Attribute table
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub uuid: u128,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: u128,
    pub primary: bool,
    pub characteristics: &'static [CharacteristicDef],
}

impl ServiceDef {
    /// Attribute handles the service consumes: one declaration, plus a
    /// declaration and a value per characteristic.
    pub fn attribute_count(&self) -> u16 {
        1 + 2 * self.characteristics.len() as u16
    }
}

/// Services registered with the stack at startup.
pub static GATT_SERVICES: &[ServiceDef] = &[ServiceDef {
    uuid: SERVICE_UUID,
    primary: true,
    characteristics: &[CharacteristicDef {
        uuid: CHAR_TEMPERATURE,
        readable: true,
        writable: false,
    }],
}];

/// Formats a 128-bit UUID in the canonical 8-4-4-4-12 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uuid128(pub u128);

impl fmt::Display for Uuid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xffff_ffff_ffff
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Registration callbacks
// ───────────────────────────────────────────────────────────────

/// What the stack just registered.  Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Service {
        uuid: u128,
        handle: u16,
    },
    Characteristic {
        uuid: u128,
        def_handle: u16,
        val_handle: u16,
    },
    Descriptor {
        uuid: u128,
        handle: u16,
    },
}

pub fn on_register(reg: &Registration) {
    match *reg {
        Registration::Service { uuid, handle } => {
            debug!("registered service {} with handle={}", Uuid128(uuid), handle);
        }
        Registration::Characteristic {
            uuid,
            def_handle,
            val_handle,
        } => {
            debug!(
                "registering characteristic {} with def_handle={} val_handle={}",
                Uuid128(uuid),
                def_handle,
                val_handle
            );
        }
        Registration::Descriptor { uuid, handle } => {
            debug!("registering descriptor {} with handle={}", Uuid128(uuid), handle);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Access handler
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    ReadChr,
    WriteChr,
}

/// Serves characteristic accesses for the temperature service.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureService<'a, const N: usize> {
    reader: HistoryReader<'a, N>,
}

impl<'a, const N: usize> TemperatureService<'a, N> {
    pub fn new(reader: HistoryReader<'a, N>) -> Self {
        Self { reader }
    }

    /// Handle an access to `chr_uuid`, appending any response to `out`.
    /// Returns an ATT status code (`ATT_OK` on success).
    pub fn access<const B: usize>(&self, chr_uuid: u128, op: AccessOp, out: &mut Vec<u8, B>) -> u8 {
        if chr_uuid != CHAR_TEMPERATURE {
            return ATT_ERR_ATTR_NOT_FOUND;
        }
        match op {
            AccessOp::WriteChr => ATT_ERR_WRITE_NOT_PERMITTED,
            AccessOp::ReadChr => match self.reader.read_into(out) {
                Ok(_) => ATT_OK,
                Err(e @ Error::ResponseTooLarge { .. }) => {
                    warn!("BLE: history read: {}", e);
                    ATT_ERR_INSUFFICIENT_RES
                }
                Err(e) => {
                    warn!("BLE: history read failed: {}", e);
                    ATT_ERR_UNLIKELY
                }
            },
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Connected,
    Failed,
}

/// Owns the stack lifecycle; on the device, bridges Bluedroid callbacks
/// to the [`TemperatureService`].
pub struct BleAdapter {
    state: BleState,
    device_name: heapless::String<24>,
}

impl BleAdapter {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn on_central_connected(&mut self) {
        info!("BLE: central connected");
        self.state = BleState::Connected;
    }

    pub fn on_central_disconnected(&mut self) {
        info!("BLE: central disconnected");
        if self.state != BleState::Idle {
            self.state = BleState::Advertising;
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start(&mut self, _service: TemperatureService<'static, HISTORY_CAPACITY>) {
        for svc in GATT_SERVICES {
            info!(
                "BLE(sim): advertising '{}' (service {}, {} attributes)",
                self.device_name,
                Uuid128(svc.uuid),
                svc.attribute_count()
            );
        }
        self.state = BleState::Advertising;
    }

    #[cfg(target_os = "espidf")]
    pub fn start(&mut self, service: TemperatureService<'static, HISTORY_CAPACITY>) {
        self.state = match esp::start(service, &self.device_name) {
            Ok(()) => BleState::Advertising,
            Err(e) => {
                log::error!("BLE: {}", e);
                BleState::Failed
            }
        };
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid bridge
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  The service (a `Copy` view over the process-lifetime history)
// and the event queue are parked in `OnceLock`s before the callbacks are
// registered; the atomics hold handles learned during registration.

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::OnceLock;

    use esp_idf_svc::sys::*;
    use log::info;

    use super::{
        AccessOp, CHAR_TEMPERATURE, GATT_SERVICES, MAX_READ_BYTES, Registration, SERVICE_UUID,
        TemperatureService, on_register,
    };
    use crate::error::Error;
    use crate::events::{Event, EventQueue};
    use crate::history::HISTORY_CAPACITY;

    static SERVICE: OnceLock<TemperatureService<'static, HISTORY_CAPACITY>> = OnceLock::new();
    static EVENTS: OnceLock<&'static EventQueue> = OnceLock::new();

    static TEMP_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);

    /// Route connect / disconnect notifications into the main-loop queue.
    pub fn set_event_queue(queue: &'static EventQueue) {
        let _ = EVENTS.set(queue);
    }

    fn push(event: Event) {
        if let Some(q) = EVENTS.get() {
            q.push(event);
            crate::events::wake_main_task();
        }
    }

    fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        unsafe {
            t.uuid.uuid128 = uuid.to_le_bytes();
        }
        t
    }

    unsafe fn start_advertising() {
        let mut adv_params = esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        unsafe { esp_ble_gap_start_advertising(&mut adv_params) };
    }

    pub fn start(
        service: TemperatureService<'static, HISTORY_CAPACITY>,
        device_name: &heapless::String<24>,
    ) -> Result<(), Error> {
        SERVICE
            .set(service)
            .map_err(|_| Error::Init("BLE service already started"))?;

        unsafe {
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK {
                return Err(Error::Init("bt_controller_init failed"));
            }
            if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK {
                return Err(Error::Init("bt_controller_enable failed"));
            }
            if esp_bluedroid_init() != ESP_OK {
                return Err(Error::Init("bluedroid_init failed"));
            }
            if esp_bluedroid_enable() != ESP_OK {
                return Err(Error::Init("bluedroid_enable failed"));
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            let mut name: heapless::Vec<u8, 25> = heapless::Vec::new();
            let _ = name.extend_from_slice(device_name.as_bytes());
            let _ = name.push(0);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);
            start_advertising();
        }
        info!("BLE(espidf): advertising as '{}'", device_name);
        Ok(())
    }

    unsafe extern "C" fn ble_gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("BLE GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
            }
            _ => {}
        }
    }

    unsafe extern "C" fn ble_gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: uuid128_to_esp(SERVICE_UUID),
                        inst_id: 0,
                    },
                    is_primary: GATT_SERVICES[0].primary,
                };
                let handles = GATT_SERVICES[0].attribute_count();
                unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, handles) };
            }
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let p = unsafe { &(*param).create };
                on_register(&Registration::Service {
                    uuid: SERVICE_UUID,
                    handle: p.service_handle,
                });
                let mut char_uuid = uuid128_to_esp(CHAR_TEMPERATURE);
                unsafe {
                    esp_ble_gatts_start_service(p.service_handle);
                    esp_ble_gatts_add_char(
                        p.service_handle,
                        &mut char_uuid,
                        ESP_GATT_PERM_READ as esp_gatt_perm_t,
                        ESP_GATT_CHAR_PROP_BIT_READ as esp_gatt_char_prop_t,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let p = unsafe { &(*param).add_char };
                TEMP_CHAR_HANDLE.store(u32::from(p.attr_handle), Ordering::Relaxed);
                on_register(&Registration::Characteristic {
                    uuid: CHAR_TEMPERATURE,
                    // Bluedroid only reports the value handle; the
                    // declaration sits immediately before it.
                    def_handle: p.attr_handle.saturating_sub(1),
                    val_handle: p.attr_handle,
                });
            }
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
                let p = unsafe { &(*param).read };
                if !p.need_rsp {
                    return;
                }
                let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
                let mut out: heapless::Vec<u8, MAX_READ_BYTES> = heapless::Vec::new();
                let status = if u32::from(p.handle) == TEMP_CHAR_HANDLE.load(Ordering::Relaxed) {
                    match SERVICE.get() {
                        Some(svc) => svc.access(CHAR_TEMPERATURE, AccessOp::ReadChr, &mut out),
                        None => super::ATT_ERR_UNLIKELY,
                    }
                } else {
                    super::ATT_ERR_ATTR_NOT_FOUND
                };
                unsafe {
                    rsp.attr_value.handle = p.handle;
                    rsp.attr_value.len = out.len() as u16;
                    rsp.attr_value.value[..out.len()].copy_from_slice(&out);
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        status as esp_gatt_status_t,
                        &mut rsp,
                    );
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                info!("BLE GATTS: client connected (conn_id={})", p.conn_id);
                push(Event::BleConnected);
            }
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                info!("BLE GATTS: client disconnected");
                push(Event::BleDisconnected);
                unsafe { start_advertising() };
            }
            _ => {}
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::set_event_queue;
