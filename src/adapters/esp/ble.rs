//! Bluedroid GATT server with one notify characteristic.
//!
//! | Item         | UUID                                     | Props        |
//! |--------------|------------------------------------------|--------------|
//! | Service      | `0001a7d3-d8a4-4fea-8174-1736e808c066`   |              |
//! | Data stream  | `0002a7d3-d8a4-4fea-8174-1736e808c066`   | Read+Notify  |
//! | CCCD         | `0x2902`                                 | Read+Write   |
//!
//! Bluedroid callbacks are C function pointers without a user-data
//! argument. Each notifier registers its [`RadioLink`] under its GATT
//! application id in [`LINKS`]; callbacks find it by the interface the
//! stack assigned to that application.

use std::sync::Arc;

use esp_idf_svc::sys::*;
use log::{error, info, warn};

use crate::adapters::radio::{LinkRegistry, NotifyTransport, RadioLink};
use crate::error::TransportError;

pub const SERVICE_UUID: u128 = 0x0001a7d3_d8a4_4fea_8174_1736e808c066;
pub const DATA_CHAR_UUID: u128 = 0x0002a7d3_d8a4_4fea_8174_1736e808c066;
const CCCD_UUID: u16 = 0x2902;
const APP_ID: u16 = 0;

static LINKS: LinkRegistry<2> = LinkRegistry::new();

fn uuid128(uuid: u128) -> esp_bt_uuid_t {
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

fn uuid16(uuid: u16) -> esp_bt_uuid_t {
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

fn adv_params() -> esp_ble_adv_params_t {
    esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    }
}

unsafe extern "C" fn gap_event_handler(
    event: esp_gap_ble_cb_event_t,
    _param: *mut esp_ble_gap_cb_param_t,
) {
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
            let mut params = adv_params();
            unsafe { esp_ble_gap_start_advertising(&mut params) };
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            info!("BLE: advertising");
        }
        _ => {}
    }
}

unsafe extern "C" fn gatts_event_handler(
    event: esp_gatts_cb_event_t,
    gatts_if: esp_gatt_if_t,
    param: *mut esp_ble_gatts_cb_param_t,
) {
    let gatts_if = u16::from(gatts_if);
    let link = if event == esp_gatts_cb_event_t_ESP_GATTS_REG_EVT {
        let app_id = unsafe { (*param).reg.app_id };
        LINKS.bind(app_id, gatts_if)
    } else {
        LINKS.lookup(gatts_if)
    };
    let Some(link) = link else {
        warn!("BLE: event {} for unknown interface {}", event, gatts_if);
        return;
    };

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe { esp_ble_gatts_create_service(gatts_if as esp_gatt_if_t, &mut svc_id, 4) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc = unsafe { (*param).create.service_handle };
            link.set_service_handle(svc);
            let mut char_uuid = uuid128(DATA_CHAR_UUID);
            unsafe {
                esp_ble_gatts_start_service(svc);
                esp_ble_gatts_add_char(
                    svc,
                    &mut char_uuid,
                    ESP_GATT_PERM_READ as esp_gatt_perm_t,
                    (ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY) as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            link.set_data_handle(handle);
            let Some(svc) = link.service_handle() else {
                return;
            };
            let mut descr_uuid = uuid16(CCCD_UUID);
            unsafe {
                esp_ble_gatts_add_char_descr(
                    svc,
                    &mut descr_uuid,
                    (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let handle = unsafe { (*param).add_char_descr.attr_handle };
            link.set_cccd_handle(handle);
            info!("BLE: data characteristic ready");
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            link.connected(conn_id);
            info!("BLE: central connected (conn_id={})", conn_id);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            link.disconnected();
            info!("BLE: central disconnected");
            let mut params = adv_params();
            unsafe { esp_ble_gap_start_advertising(&mut params) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let value = if p.value.is_null() {
                &[][..]
            } else {
                unsafe { core::slice::from_raw_parts(p.value, usize::from(p.len)) }
            };
            if let Some(on) = link.descriptor_written(p.handle, value) {
                info!("BLE: notifications {}", if on { "enabled" } else { "disabled" });
            }
        }
        _ => {}
    }
}

/// [`NotifyTransport`] over the Bluedroid stack.
pub struct BleNotifier {
    name: heapless::String<32>,
    link: Arc<RadioLink>,
}

impl BleNotifier {
    /// Bring up the controller and Bluedroid, register the service and
    /// start advertising as `name`.
    pub fn start(name: &str) -> Result<Self, EspError> {
        let mut c_name = heapless::String::<32>::new();
        for c in name.chars().take(30) {
            let _ = c_name.push(c);
        }
        let _ = c_name.push('\0');

        let link = Arc::new(RadioLink::default());
        if LINKS.register(APP_ID, Arc::clone(&link)).is_err() {
            esp!(ESP_ERR_NO_MEM as esp_err_t)?;
        }

        unsafe {
            esp!(esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT))?;
            let mut bt_cfg = esp_bt_controller_config_t::default();
            esp!(esp_bt_controller_init(&mut bt_cfg))?;
            esp!(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE))?;
            esp!(esp_bluedroid_init())?;
            esp!(esp_bluedroid_enable())?;
            esp!(esp_ble_gap_register_callback(Some(gap_event_handler)))?;
            esp!(esp_ble_gatts_register_callback(Some(gatts_event_handler)))?;
            esp!(esp_ble_gatts_app_register(APP_ID))?;
            esp!(esp_ble_gap_set_device_name(c_name.as_ptr() as *const _))?;

            let mut adv_data: esp_ble_adv_data_t = core::mem::zeroed();
            adv_data.include_name = true;
            adv_data.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8;
            esp!(esp_ble_gap_config_adv_data(&mut adv_data))?;
        }
        info!("BLE: stack up, advertising as '{}'", name);
        c_name.pop();
        Ok(Self { name: c_name, link })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl NotifyTransport for BleNotifier {
    fn has_subscriber(&self) -> bool {
        self.link.has_subscriber()
    }

    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let (Some(interface), Some(conn), Some(handle)) = (
            self.link.interface(),
            self.link.conn_id(),
            self.link.data_handle(),
        ) else {
            return Err(TransportError::NotConnected);
        };
        let mut buf = [0u8; crate::adapters::radio::MAX_PAYLOAD];
        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                interface as esp_gatt_if_t,
                conn,
                handle,
                len as u16,
                buf.as_mut_ptr(),
                false,
            )
        };
        if ret != ESP_OK {
            warn!("BLE: notify failed ({})", ret);
            return Err(TransportError::SendFailed);
        }
        Ok(())
    }
}

impl Drop for BleNotifier {
    fn drop(&mut self) {
        LINKS.unregister(APP_ID);
        unsafe {
            esp_ble_gap_stop_advertising();
            if esp_bluedroid_disable() != ESP_OK {
                error!("BLE: bluedroid disable failed");
            }
            esp_bluedroid_deinit();
            esp_bt_controller_disable();
            esp_bt_controller_deinit();
        }
        info!("BLE: stack shut down");
    }
}
