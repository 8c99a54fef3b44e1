//! Contract address derivation

use ember_primitives::Address;
use rlp::RlpStream;

use crate::keccak256;

/// Address of the contract created by `sender` at account nonce `nonce`:
/// the low 20 bytes of `keccak256(rlp([sender, nonce]))`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender.as_bytes().to_vec());
    stream.append(&nonce);
    Address::from_hash(&keccak256(&stream.out()))
}
