//! Nordic UART GATT profile used by the MatataLab controller
//!
//! The controller exposes a serial port over BLE: packets are written to the
//! RX characteristic and notifications arrive on the TX characteristic.

/// Nordic UART service
pub const SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// Write characteristic (UART RX on the peripheral side)
pub const WRITE_CHAR_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";

/// Notify characteristic (UART TX on the peripheral side)
pub const NOTIFY_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// ATT header bytes subtracted from the negotiated PDU size
pub const ATT_HEADER_LEN: u16 = 3;

/// Advertised names of the controller and the bot
pub const KNOWN_NAMES: [&str; 2] = ["MatataCon", "MatataBot"];

/// Largest single write for a negotiated PDU size
pub fn write_chunk_size(max_pdu: u16) -> Option<usize> {
    (max_pdu > ATT_HEADER_LEN).then(|| usize::from(max_pdu - ATT_HEADER_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_chunk_size() {
        assert_eq!(write_chunk_size(23), Some(20));
        assert_eq!(write_chunk_size(247), Some(244));
        assert_eq!(write_chunk_size(3), None);
    }
}
