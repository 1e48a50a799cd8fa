use tiny_keccak::{Hasher, Keccak};

/// EIP-55 mixed-case checksum encoding of a hex-encoded address.
pub fn checksum(address: &str) -> String {
    let address = address.trim_start_matches("0x").to_lowercase();

    let address_hash = {
        let mut hasher = Keccak::v256();
        let mut output = [0_u8; 32];
        hasher.update(address.as_bytes());
        hasher.finalize(&mut output);
        hex::encode(output)
    };

    address
        .char_indices()
        .fold(String::from("0x"), |mut acc, (index, address_char)| {
            // this cannot fail since `address_hash` is always a 64-char hex string
            let n = u8::from_str_radix(&address_hash[index..index + 1], 16)
                .expect("hex digit from keccak output");

            if n > 7 {
                acc.push(address_char.to_ascii_uppercase())
            } else {
                acc.push(address_char)
            }

            acc
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checksums_known_address() {
        // the mixed-case form of an all-lowercase address, per EIP-55's test vectors
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let expected = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

        assert_eq!(expected, checksum(lower));
    }
}
