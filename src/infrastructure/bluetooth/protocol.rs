//! WinRT helpers for the UART profile: GUID parsing and buffer conversion

use anyhow::Result;
use windows::core::GUID;
use windows::Storage::Streams::{DataReader, DataWriter, IBuffer};

pub fn parse_uuid(uuid_str: &str) -> Result<GUID> {
    let hex = uuid_str.replace('-', "");
    if hex.len() != 32 || !hex.is_ascii() {
        anyhow::bail!("Invalid UUID format: {}", uuid_str);
    }

    let mut data4 = [0u8; 8];
    for (i, byte) in data4.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[16 + i * 2..18 + i * 2], 16)?;
    }

    Ok(GUID {
        data1: u32::from_str_radix(&hex[0..8], 16)?,
        data2: u16::from_str_radix(&hex[8..12], 16)?,
        data3: u16::from_str_radix(&hex[12..16], 16)?,
        data4,
    })
}

pub fn read_buffer(buffer: &IBuffer) -> Result<Vec<u8>> {
    let reader = DataReader::FromBuffer(buffer)?;
    let mut bytes = vec![0u8; buffer.Length()? as usize];
    reader.ReadBytes(&mut bytes)?;
    Ok(bytes)
}

pub fn write_buffer(bytes: &[u8]) -> Result<IBuffer> {
    let writer = DataWriter::new()?;
    writer.WriteBytes(bytes)?;
    Ok(writer.DetachBuffer()?)
}
