//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements / serves        | Connects to              |
//! |------------|----------------------------|--------------------------|
//! | `ble`      | GATT read of the history   | Bluedroid GATT server    |
//! | `log_sink` | EventSink                  | Serial log output        |
//! | `time`     | `DelayNs`, uptime          | ESP32 system timer       |

pub mod ble;
pub mod log_sink;
pub mod time;
