//! Hex address converter for 32-byte public keys.

use crate::ports::AddressConverter;

/// Length of an account public key
pub const ADDRESS_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct HexAddressConverter;

impl AddressConverter for HexAddressConverter {
    fn decode(&self, address: &str) -> Result<Vec<u8>, String> {
        let trimmed = address.strip_prefix("0x").unwrap_or(address);
        let raw = hex::decode(trimmed).map_err(|e| e.to_string())?;
        if raw.len() != ADDRESS_LEN {
            return Err(format!(
                "expected {} bytes, got {}",
                ADDRESS_LEN,
                raw.len()
            ));
        }
        Ok(raw)
    }

    fn encode(&self, raw: &[u8]) -> String {
        hex::encode(raw)
    }

    fn address_len(&self) -> usize {
        ADDRESS_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_encode() {
        let converter = HexAddressConverter;
        let address = "01".repeat(32);
        let raw = converter.decode(&address).unwrap();
        assert_eq!(raw, vec![1u8; 32]);
        assert_eq!(converter.encode(&raw), address);
    }

    #[test]
    fn test_rejects_bad_input() {
        let converter = HexAddressConverter;
        assert!(converter.decode("zz").is_err());
        assert!(converter.decode("0102").is_err());
    }
}
